//! WHERE-clause compiler
//!
//! Every predicate value becomes a positional placeholder (`$1`, `$2`, ...);
//! only column names and operators reach the SQL text. Columns are checked
//! against a strict identifier pattern, pass-through operators against a
//! fixed allowlist.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::casing::to_storage_casing;
use crate::error::{DomainError, Result};
use crate::filter::{FilterDescriptor, Operator};

static COLUMN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("invalid column regex"));

/// Operators accepted verbatim from `filter[<field>][<op>]`
const PASS_THROUGH_OPERATORS: &[&str] =
    &["ILIKE", "NOT LIKE", "NOT ILIKE", "<>", "~", "~*", "!~", "!~*"];

/// Canonical spelling of an allowed pass-through operator.
///
/// Case and runs of whitespace are ignored, so `not  ilike` resolves to
/// `NOT ILIKE`.
pub fn pass_through_operator(token: &str) -> Option<&'static str> {
    let normalized = token
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    PASS_THROUGH_OPERATORS
        .iter()
        .copied()
        .find(|op| *op == normalized)
}

/// One bound value of a compiled WHERE clause, still untyped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundParam {
    /// Column in storage casing
    pub column: String,
    pub op: Operator,
    /// Value as bound; LIKE patterns already carry their `%` wildcards
    pub value: String,
}

/// Compiled WHERE fragment with its parameters in placeholder order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereClause {
    /// `WHERE a = $1 AND b > $2`, or empty to match every row
    pub sql: String,
    pub params: Vec<BoundParam>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Placeholder index that follows this clause's parameters
    pub fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }
}

/// Compile filter descriptors into a parameterized WHERE fragment.
///
/// Predicates are joined with AND in field order. LIKE binds `%value%`; its
/// case sensitivity is whatever the store's collation gives, values are not
/// lowercased here.
pub fn compile(filters: &BTreeMap<String, FilterDescriptor>) -> Result<WhereClause> {
    let mut conditions = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());

    for (field, descriptor) in filters {
        let column = to_storage_casing(field);
        if !COLUMN_RE.is_match(&column) {
            return Err(DomainError::validation(format!(
                "invalid filter field '{}'",
                field
            )));
        }

        let op = match descriptor.operator() {
            Operator::Raw(token) => match pass_through_operator(&token) {
                Some(canonical) => Operator::Raw(canonical.to_owned()),
                None => {
                    return Err(DomainError::validation(format!(
                        "unsupported filter operator '{}' on '{}'",
                        token, field
                    )))
                }
            },
            op => op,
        };

        let value = match op {
            Operator::Like => format!("%{}%", descriptor.value()),
            _ => descriptor.value().to_owned(),
        };

        conditions.push(format!("{} {} ${}", column, op.as_sql(), params.len() + 1));
        params.push(BoundParam { column, op, value });
    }

    let sql = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    tracing::debug!(where_sql = %sql, params = params.len(), "compiled filters");

    Ok(WhereClause { sql, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use crate::filter::parse;

    #[test]
    fn empty_filters_match_everything() {
        let clause = compile(&BTreeMap::new()).unwrap();
        assert_eq!(clause.sql, "");
        assert!(clause.params.is_empty());
        assert_eq!(clause.next_placeholder(), 1);
    }

    #[test]
    fn equality_binds_value() {
        let parsed = parse([("filter[publicationYear]", "1990")]);
        let clause = compile(&parsed.filters).unwrap();
        assert_eq!(clause.sql, "WHERE publication_year = $1");
        assert_eq!(clause.params[0].value, "1990");
        assert_eq!(clause.params[0].column, "publication_year");
    }

    #[test]
    fn like_binds_wrapped_pattern() {
        let parsed = parse([("filter[genre][fuzzy]", "sci")]);
        let clause = compile(&parsed.filters).unwrap();
        assert_eq!(clause.sql, "WHERE genre LIKE $1");
        assert_eq!(clause.params[0].value, "%sci%");
        assert!(!clause.sql.contains("sci"));
    }

    #[test]
    fn values_never_reach_sql_text() {
        let parsed = parse([("filter[title]", "x' OR '1'='1")]);
        let clause = compile(&parsed.filters).unwrap();
        assert_eq!(clause.sql, "WHERE title = $1");
        assert_eq!(clause.params[0].value, "x' OR '1'='1");
    }

    #[test]
    fn multiple_filters_join_with_and() {
        let parsed = parse([
            ("filter[status]", "ongoing"),
            ("filter[dueDate][lt]", "2024-05-01"),
        ]);
        let clause = compile(&parsed.filters).unwrap();
        assert_eq!(clause.sql, "WHERE due_date < $1 AND status = $2");
        assert!(!clause.sql.contains(" OR "));
        assert_eq!(clause.params.len(), 2);
    }

    #[test]
    fn rejects_non_identifier_fields() {
        let parsed = parse([("filter[title;drop table x]", "a")]);
        let err = compile(&parsed.filters).unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::ValidationFailure);
    }

    #[test]
    fn raw_operator_is_checked() {
        let parsed = parse([("filter[title][ILIKE]", "%dune%")]);
        let clause = compile(&parsed.filters).unwrap();
        assert_eq!(clause.sql, "WHERE title ILIKE $1");

        let parsed = parse([("filter[title][= 1; --]", "x")]);
        assert!(compile(&parsed.filters).is_err());
    }

    #[test]
    fn pass_through_operators_are_canonicalized() {
        let parsed = parse([("filter[title][not  ilike]", "%dune%")]);
        let clause = compile(&parsed.filters).unwrap();
        assert_eq!(clause.sql, "WHERE title NOT ILIKE $1");
        assert_eq!(clause.params[0].op, Operator::Raw("NOT ILIKE".into()));

        for op in ["<>", "~", "~*", "!~", "!~*", "NOT LIKE"] {
            assert_eq!(pass_through_operator(op), Some(op));
        }
    }

    #[test]
    fn operator_cannot_smuggle_or_into_where_clause() {
        let parsed = parse([
            ("filter[available]", "true"),
            ("filter[title][=title OR title=]", "x"),
        ]);
        let err = compile(&parsed.filters).unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::ValidationFailure);

        for token in ["OR", "= title OR title =", "IS NOT", "LIKE title", "=", ">="] {
            assert_eq!(pass_through_operator(token), None, "{token}");
        }
    }
}
