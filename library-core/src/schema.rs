//! Resource schemas: tables, columns and write conventions
//!
//! Column names are snake_case throughout (`book_id`, never `bookid`); the
//! wire form is always derived with [`to_wire_casing`]. The catalogue is
//! static and never changes after startup.

use chrono::NaiveDate;
use serde_json::Value;

use crate::casing::to_wire_casing;
use crate::compile::WhereClause;
use crate::dates::parse_date_literal;
use crate::error::{DomainError, Result};
use crate::filter::Operator;
use crate::record::Record;
use crate::statement::BindValue;

/// Storage type of a column; decides how wire values are coerced before binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    Date,
}

/// Casing applied to text values on write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextCase {
    /// Free text
    Lower,
    /// Code-like values (state and country codes)
    Upper,
    /// Identifiers stored exactly as given (ISBN, phone number)
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub case: TextCase,
}

const fn text(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Text, case: TextCase::Lower }
}

const fn code(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Text, case: TextCase::Upper }
}

const fn verbatim(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Text, case: TextCase::Preserve }
}

const fn integer(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Integer, case: TextCase::Preserve }
}

const fn boolean(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Boolean, case: TextCase::Preserve }
}

const fn date(name: &'static str) -> Column {
    Column { name, ty: ColumnType::Date, case: TextCase::Preserve }
}

/// Foreign-key column and the resource it points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef {
    pub column: &'static str,
    pub resource: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialValue {
    Text(&'static str),
    Bool(bool),
    /// Current date in the configured time zone
    Today,
}

/// Value set on create. `Text`/`Bool` always override client input;
/// `Today` only fills a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Initial {
    pub column: &'static str,
    pub value: InitialValue,
}

#[derive(Debug)]
pub struct ResourceSchema {
    /// JSON:API resource type
    pub resource_type: &'static str,
    /// Collection path segment under `/library`
    pub collection: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [Column],
    pub required: &'static [&'static str],
    pub initial: &'static [Initial],
    pub parents: &'static [ParentRef],
}

pub static BOOKS: ResourceSchema = ResourceSchema {
    resource_type: "book",
    collection: "books",
    table: "library_api_books",
    primary_key: "book_id",
    columns: &[
        integer("book_id"),
        text("title"),
        text("author"),
        integer("publication_year"),
        verbatim("isbn"),
        text("genre"),
        text("description"),
        boolean("available"),
    ],
    required: &["title", "author"],
    initial: &[Initial { column: "available", value: InitialValue::Bool(true) }],
    parents: &[],
};

pub static MEMBERS: ResourceSchema = ResourceSchema {
    resource_type: "member",
    collection: "members",
    table: "library_api_members",
    primary_key: "member_id",
    columns: &[
        integer("member_id"),
        text("first_name"),
        text("last_name"),
        text("email"),
        text("address"),
        text("city"),
        code("state"),
        code("country"),
        verbatim("phone_number"),
        text("status"),
    ],
    required: &["first_name", "last_name", "email"],
    initial: &[Initial { column: "status", value: InitialValue::Text("active") }],
    parents: &[],
};

pub static BORROWS: ResourceSchema = ResourceSchema {
    resource_type: "borrow",
    collection: "borrows",
    table: "library_api_borrows",
    primary_key: "borrow_id",
    columns: &[
        integer("borrow_id"),
        integer("book_id"),
        integer("member_id"),
        date("borrow_date"),
        date("due_date"),
        date("return_date"),
        text("status"),
    ],
    required: &["book_id", "member_id", "due_date"],
    initial: &[
        Initial { column: "status", value: InitialValue::Text("ongoing") },
        Initial { column: "borrow_date", value: InitialValue::Today },
    ],
    parents: &[
        ParentRef { column: "book_id", resource: "book" },
        ParentRef { column: "member_id", resource: "member" },
    ],
};

pub static RESOURCES: [&ResourceSchema; 3] = [&BOOKS, &MEMBERS, &BORROWS];

impl ResourceSchema {
    /// Look a schema up by its collection path segment (`books`, `members`, `borrows`).
    pub fn by_collection(collection: &str) -> Option<&'static ResourceSchema> {
        RESOURCES.iter().copied().find(|s| s.collection == collection)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn known_column(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| {
            DomainError::validation(format!(
                "unknown attribute '{}' for {}",
                to_wire_casing(name),
                self.resource_type
            ))
        })
    }

    /// Wire name of the primary key, used as the JSON:API identifier field
    pub fn identifier_field(&self) -> String {
        to_wire_casing(self.primary_key)
    }

    /// Coerce a path identifier into the primary key's type.
    pub fn parse_id(&self, raw: &str) -> Result<BindValue> {
        let column = self.known_column(self.primary_key)?;
        typed_value(column, &Value::String(raw.to_owned()))
    }

    /// Type every parameter of a compiled WHERE clause against this schema.
    ///
    /// Filter values are bound as given; write casing is not applied.
    pub fn bind_filters(&self, clause: &WhereClause) -> Result<Vec<BindValue>> {
        clause
            .params
            .iter()
            .map(|param| {
                let column = self.known_column(&param.column)?;
                match param.op {
                    Operator::Like | Operator::Raw(_) if column.ty != ColumnType::Text => {
                        Err(DomainError::validation(format!(
                            "operator '{}' is only supported on text attributes, not '{}'",
                            param.op.as_sql(),
                            to_wire_casing(column.name)
                        )))
                    }
                    Operator::Like | Operator::Raw(_) => Ok(BindValue::Text(param.value.clone())),
                    _ => typed_value(column, &Value::String(param.value.clone())),
                }
            })
            .collect()
    }

    /// Reject attributes (storage casing) that are not columns of this resource.
    pub fn check_attributes(&self, record: &Record) -> Result<()> {
        record.keys().try_for_each(|key| self.known_column(key).map(|_| ()))
    }

    /// Apply create-time values. See [`Initial`].
    pub fn apply_initial_values(&self, record: &mut Record, today: NaiveDate) {
        for initial in self.initial {
            match initial.value {
                InitialValue::Text(value) => {
                    record.insert(initial.column, value);
                }
                InitialValue::Bool(value) => {
                    record.insert(initial.column, value);
                }
                InitialValue::Today => {
                    if record.is_missing(initial.column) {
                        record.insert(initial.column, today.format("%Y-%m-%d").to_string());
                    }
                }
            }
        }
    }

    /// Every required attribute must be present and non-null.
    pub fn check_required(&self, record: &Record) -> Result<()> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|column| record.is_missing(column))
            .map(|column| to_wire_casing(column))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "missing required attribute(s) for {}: {}",
                self.resource_type,
                missing.join(", ")
            )))
        }
    }

    /// Typed, write-cased values for every non-key column present in `record`,
    /// in schema column order.
    pub fn write_values(&self, record: &Record) -> Result<Vec<(&'static str, BindValue)>> {
        self.check_attributes(record)?;

        self.columns
            .iter()
            .filter(|column| column.name != self.primary_key)
            .filter_map(|column| record.get(column.name).map(|value| (column, value)))
            .map(|(column, value)| {
                let bound = match typed_value(column, value)? {
                    BindValue::Text(s) => BindValue::Text(apply_case(column.case, s)),
                    other => other,
                };
                Ok((column.name, bound))
            })
            .collect()
    }

    /// Parent relationship named by a foreign-key constraint, e.g.
    /// `library_api_borrows_member_id_fkey` -> member.
    pub fn parent_for_constraint(&self, constraint: &str) -> Option<&ParentRef> {
        self.parents.iter().find(|p| constraint.contains(p.column))
    }
}

fn apply_case(case: TextCase, value: String) -> String {
    match case {
        TextCase::Lower => value.to_lowercase(),
        TextCase::Upper => value.to_uppercase(),
        TextCase::Preserve => value,
    }
}

fn typed_value(column: &Column, value: &Value) -> Result<BindValue> {
    let invalid = || {
        DomainError::validation(format!(
            "invalid value {} for attribute '{}'",
            value,
            to_wire_casing(column.name)
        ))
    };

    if value.is_null() {
        return Ok(BindValue::Null(column.ty));
    }

    match column.ty {
        ColumnType::Text => match value {
            Value::String(s) => Ok(BindValue::Text(s.clone())),
            Value::Number(n) => Ok(BindValue::Text(n.to_string())),
            Value::Bool(b) => Ok(BindValue::Text(b.to_string())),
            _ => Err(invalid()),
        },
        ColumnType::Integer => match value {
            Value::Number(n) => n.as_i64().map(BindValue::Int).ok_or_else(invalid),
            Value::String(s) => s.trim().parse().map(BindValue::Int).map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        ColumnType::Boolean => match value {
            Value::Bool(b) => Ok(BindValue::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(BindValue::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(BindValue::Bool(false)),
            _ => Err(invalid()),
        },
        ColumnType::Date => match value {
            Value::String(s) => parse_date_literal(s).map(BindValue::Date),
            _ => Err(invalid()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::error::DomainErrorKind;
    use crate::filter::parse;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn lookup_by_collection() {
        assert_eq!(ResourceSchema::by_collection("borrows").unwrap().table, "library_api_borrows");
        assert!(ResourceSchema::by_collection("authors").is_none());
    }

    #[test]
    fn identifier_field_is_wire_cased() {
        assert_eq!(BOOKS.identifier_field(), "bookId");
        assert_eq!(BORROWS.identifier_field(), "borrowId");
    }

    #[test]
    fn parse_id_requires_integer() {
        assert_eq!(MEMBERS.parse_id("42").unwrap(), BindValue::Int(42));
        let err = MEMBERS.parse_id("abc").unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::ValidationFailure);
    }

    #[test]
    fn filters_are_typed_by_column() {
        let parsed = parse([
            ("filter[publicationYear][gte]", "1990"),
            ("filter[available]", "TRUE"),
            ("filter[title][fuzzy]", "Dune"),
        ]);
        let clause = compile(&parsed.filters).unwrap();
        let binds = BOOKS.bind_filters(&clause).unwrap();
        assert_eq!(
            binds,
            vec![
                BindValue::Bool(true),
                BindValue::Int(1990),
                BindValue::Text("%Dune%".into()),
            ]
        );
    }

    #[test]
    fn date_filters_accept_legacy_form() {
        let parsed = parse([("filter[dueDate][lt]", "01-MAY-24")]);
        let clause = compile(&parsed.filters).unwrap();
        let binds = BORROWS.bind_filters(&clause).unwrap();
        assert_eq!(binds, vec![BindValue::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())]);
    }

    #[test]
    fn unknown_filter_column_is_rejected() {
        let parsed = parse([("filter[colour]", "red")]);
        let clause = compile(&parsed.filters).unwrap();
        let err = BOOKS.bind_filters(&clause).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn like_on_integer_column_is_rejected() {
        let parsed = parse([("filter[publicationYear][fuzzy]", "19")]);
        let clause = compile(&parsed.filters).unwrap();
        assert!(BOOKS.bind_filters(&clause).is_err());
    }

    #[test]
    fn write_values_apply_casing() {
        let member = record(json!({
            "member_id": 3,
            "first_name": "Ursula",
            "state": "ca",
            "country": "us",
            "phone_number": "555-0100 Ext",
            "status": "Active"
        }));
        let values = MEMBERS.write_values(&member).unwrap();
        assert_eq!(
            values,
            vec![
                ("first_name", BindValue::Text("ursula".into())),
                ("state", BindValue::Text("CA".into())),
                ("country", BindValue::Text("US".into())),
                ("phone_number", BindValue::Text("555-0100 Ext".into())),
                ("status", BindValue::Text("active".into())),
            ]
        );
    }

    #[test]
    fn write_values_reject_unknown_attributes() {
        let err = BOOKS.write_values(&record(json!({"colour": "red"}))).unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::ValidationFailure);
    }

    #[test]
    fn null_is_typed() {
        let values = BORROWS.write_values(&record(json!({"return_date": null}))).unwrap();
        assert_eq!(values, vec![("return_date", BindValue::Null(ColumnType::Date))]);
    }

    #[test]
    fn initial_values_for_borrow() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut borrow = record(json!({"status": "returned"}));
        BORROWS.apply_initial_values(&mut borrow, today);
        assert_eq!(borrow.get("status"), Some(&json!("ongoing")));
        assert_eq!(borrow.get("borrow_date"), Some(&json!("2024-06-01")));

        let mut borrow = record(json!({"borrow_date": "2024-05-20"}));
        BORROWS.apply_initial_values(&mut borrow, today);
        assert_eq!(borrow.get("borrow_date"), Some(&json!("2024-05-20")));
    }

    #[test]
    fn required_attributes_reported_in_wire_casing() {
        let err = BORROWS
            .check_required(&record(json!({"book_id": 1})))
            .unwrap_err();
        assert!(err.to_string().contains("memberId"));
        assert!(err.to_string().contains("dueDate"));
    }

    #[test]
    fn parent_from_constraint_name() {
        let parent = BORROWS
            .parent_for_constraint("library_api_borrows_member_id_fkey")
            .unwrap();
        assert_eq!(parent.resource, "member");
        assert!(BOOKS.parent_for_constraint("anything").is_none());
    }
}
