//! `libraryctl explain`: show the SQL a request would run, without a database

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::json;

use library_core::statement::{count_rows, select_by_id, select_page};
use library_core::{compile, parse, ResourceSchema, Statement};

#[derive(Parser, Debug)]
pub struct ExplainArgs {
    /// Collection: books, members or borrows
    pub collection: String,

    /// Query string, e.g. 'filter[title][fuzzy]=dune&page[size]=10'
    #[arg(default_value = "")]
    pub query: String,

    /// Explain a lookup by identifier instead of a list
    #[arg(long)]
    pub id: Option<String>,

    /// Emit JSON instead of annotated SQL
    #[arg(long)]
    pub json: bool,
}

pub fn run_explain(args: ExplainArgs) -> Result<()> {
    let statements = explain(&args.collection, &args.query, args.id.as_deref())?;

    if args.json {
        let out: Vec<_> = statements
            .iter()
            .map(|(label, stmt)| {
                json!({
                    "statement": label,
                    "sql": stmt.sql,
                    "params": stmt.params.iter().map(|p| p.to_sql_literal()).collect::<Vec<_>>(),
                    "inlined": stmt.display_sql(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (label, stmt) in &statements {
        println!("-- {}", label);
        println!("{}", stmt.sql);
        for (i, param) in stmt.params.iter().enumerate() {
            println!("--   ${} = {}", i + 1, param.to_sql_literal());
        }
        println!("-- inlined: {}", stmt.display_sql());
        println!();
    }
    Ok(())
}

/// Statements for a list (count + page) or a lookup by id.
pub fn explain(
    collection: &str,
    query: &str,
    id: Option<&str>,
) -> Result<Vec<(&'static str, Statement)>> {
    let schema = ResourceSchema::by_collection(collection)
        .ok_or_else(|| anyhow!("unknown collection '{}' (books, members, borrows)", collection))?;

    if let Some(id) = id {
        let key = schema.parse_id(id)?;
        return Ok(vec![("lookup", select_by_id(schema, key))]);
    }

    let parsed = parse(decode_query(query)?);
    let clause = compile(&parsed.filters)?;
    let binds = schema.bind_filters(&clause)?;
    let page = parsed.pagination();

    Ok(vec![
        ("count", count_rows(schema, &clause, binds.clone())),
        ("page", select_page(schema, &clause, binds, &page)),
    ])
}

/// Split and percent-decode `a=b&c=d`.
fn decode_query(query: &str) -> Result<Vec<(String, String)>> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<(String, String)> {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode(key)?, decode(value)?))
        })
        .collect()
}

fn decode(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .with_context(|| format!("invalid percent-encoding in '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_core::BindValue;

    #[test]
    fn list_explains_count_and_page() {
        let statements = explain(
            "books",
            "filter%5Btitle%5D%5Bfuzzy%5D=dune&page[number]=2&page[size]=10",
            None,
        )
        .unwrap();

        assert_eq!(statements.len(), 2);
        let (label, page) = &statements[1];
        assert_eq!(*label, "page");
        assert_eq!(
            page.sql,
            "SELECT * FROM library_api_books WHERE title LIKE $1 ORDER BY book_id \
             OFFSET $2 ROWS FETCH NEXT $3 ROWS ONLY"
        );
        assert_eq!(page.params[0], BindValue::Text("%dune%".into()));
        assert_eq!(page.params[1], BindValue::Int(10));
    }

    #[test]
    fn lookup_by_id() {
        let statements = explain("members", "", Some("3")).unwrap();
        assert_eq!(statements[0].1.display_sql(), "SELECT * FROM library_api_members WHERE member_id = 3");
    }

    #[test]
    fn date_filters_are_wrapped_when_inlined() {
        let statements = explain("borrows", "filter[dueDate][lt]=01-MAY-24", None).unwrap();
        assert!(statements[0]
            .1
            .display_sql()
            .contains("due_date < TO_DATE('2024-05-01', 'YYYY-MM-DD')"));
    }

    #[test]
    fn plus_decodes_to_space() {
        let pairs = decode_query("filter[author]=le+guin").unwrap();
        assert_eq!(pairs, vec![("filter[author]".to_owned(), "le guin".to_owned())]);
    }

    #[test]
    fn unknown_collection_is_an_error() {
        assert!(explain("authors", "", None).is_err());
    }
}
