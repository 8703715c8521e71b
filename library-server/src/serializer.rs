//! JSON:API documents for resource records
//!
//! Consumes wire-cased records plus the schema's identifier field; never
//! touches storage casing.

use std::collections::BTreeMap;

use library_core::pagination::{PAGE_NUMBER_KEY, PAGE_SIZE_KEY};
use library_core::{Paginated, Record, ResourceSchema};
use serde_json::{json, Map, Value};

pub struct Serializer<'a> {
    schema: &'static ResourceSchema,
    base_url: &'a str,
}

impl<'a> Serializer<'a> {
    pub fn new(schema: &'static ResourceSchema, base_url: &'a str) -> Self {
        Self { schema, base_url }
    }

    /// `{base}/library/{collection}`
    pub fn collection_url(&self) -> String {
        format!(
            "{}/library/{}",
            self.base_url.trim_end_matches('/'),
            self.schema.collection
        )
    }

    pub fn resource_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), urlencoding::encode(id))
    }

    /// Collection document with pagination links and meta.
    ///
    /// `query` is the raw request query; it is echoed in every link with the
    /// page keys replaced.
    pub fn serialize_collection(
        &self,
        page: &Paginated<Record>,
        query: &BTreeMap<String, String>,
    ) -> Value {
        let total_pages = page.total_pages();
        let link = |number: u32| self.page_link(query, number, page.page_size);

        let mut links = Map::new();
        links.insert("self".into(), self.params_link(&self.collection_url(), query).into());
        links.insert("first".into(), link(1).into());
        links.insert("last".into(), link(total_pages).into());
        if page.has_prev() {
            links.insert("prev".into(), link(page.page_number - 1).into());
        }
        if page.has_next() {
            links.insert("next".into(), link(page.page_number + 1).into());
        }

        json!({
            "links": links,
            "meta": {
                "totalResults": page.total_results,
                "totalPages": total_pages,
                "currentPageNumber": page.page_number,
                "currentPageSize": page.page_size,
            },
            "data": page.items.iter().map(|r| self.resource_object(r)).collect::<Vec<_>>(),
        })
    }

    /// Single-resource document; `self_link` is the top-level link
    /// (the collection URL for a create, the resource URL otherwise).
    pub fn serialize_resource(&self, record: &Record, self_link: &str) -> Value {
        json!({
            "links": { "self": self_link },
            "data": self.resource_object(record),
        })
    }

    pub fn resource_object(&self, record: &Record) -> Value {
        let identifier = self.schema.identifier_field();
        let id = record.get(&identifier).map(id_string).unwrap_or_default();
        let attributes: Map<String, Value> = record
            .iter()
            .filter(|(key, _)| **key != identifier)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        json!({
            "type": self.schema.resource_type,
            "id": id,
            "attributes": attributes,
            "links": { "self": self.resource_url(&id) },
        })
    }

    fn page_link(&self, query: &BTreeMap<String, String>, number: u32, size: u32) -> String {
        let mut params: BTreeMap<String, String> = query
            .iter()
            .filter(|(key, _)| key.as_str() != PAGE_NUMBER_KEY && key.as_str() != PAGE_SIZE_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.insert(PAGE_NUMBER_KEY.to_owned(), number.to_string());
        params.insert(PAGE_SIZE_KEY.to_owned(), size.to_string());
        self.params_link(&self.collection_url(), &params)
    }

    fn params_link(&self, url: &str, params: &BTreeMap<String, String>) -> String {
        if params.is_empty() {
            return url.to_owned();
        }
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", url, query)
    }
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_core::schema::{BOOKS, BORROWS};
    use library_core::Pagination;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn resource_object_splits_identifier() {
        let s = Serializer::new(&BOOKS, "http://localhost:3030/");
        let obj = s.resource_object(&record(json!({"bookId": 7, "title": "dune"})));
        assert_eq!(obj["type"], "book");
        assert_eq!(obj["id"], "7");
        assert_eq!(obj["attributes"], json!({"title": "dune"}));
        assert_eq!(obj["links"]["self"], "http://localhost:3030/library/books/7");
    }

    #[test]
    fn collection_links_and_meta() {
        let s = Serializer::new(&BORROWS, "http://api");
        let page = Paginated::new(
            vec![record(json!({"borrowId": 1, "status": "ongoing"}))],
            30,
            Pagination::new(2, 10),
        );
        let mut query = BTreeMap::new();
        query.insert("filter[status]".to_owned(), "ongoing".to_owned());
        query.insert("page[number]".to_owned(), "2".to_owned());
        query.insert("page[size]".to_owned(), "10".to_owned());

        let doc = s.serialize_collection(&page, &query);
        assert_eq!(doc["meta"]["totalResults"], 30);
        assert_eq!(doc["meta"]["totalPages"], 3);
        assert_eq!(doc["data"].as_array().unwrap().len(), 1);

        let next = doc["links"]["next"].as_str().unwrap();
        assert!(next.starts_with("http://api/library/borrows?"));
        assert!(next.contains("page%5Bnumber%5D=3"));
        assert!(next.contains("filter%5Bstatus%5D=ongoing"));
        assert!(doc["links"]["prev"].as_str().unwrap().contains("page%5Bnumber%5D=1"));
        assert!(doc["links"]["last"].as_str().unwrap().contains("page%5Bnumber%5D=3"));
    }

    #[test]
    fn single_page_has_no_prev_or_next() {
        let s = Serializer::new(&BOOKS, "http://api");
        let page: Paginated<Record> = Paginated::new(vec![], 0, Pagination::default());
        let doc = s.serialize_collection(&page, &BTreeMap::new());
        assert_eq!(doc["links"]["self"], "http://api/library/books");
        assert!(doc["links"].get("next").is_none());
        assert!(doc["links"].get("prev").is_none());
        assert_eq!(doc["data"], json!([]));
    }
}
