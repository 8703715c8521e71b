//! SQL statement builders for the four persistence operations

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::compile::WhereClause;
use crate::dates::wrap_date_literals_in_sql;
use crate::error::{DomainError, Result};
use crate::pagination::Pagination;
use crate::schema::{ColumnType, ResourceSchema};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+)").expect("invalid placeholder regex"));

/// A typed value bound to a positional placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// NULL carries the column type so the store can type the parameter
    Null(ColumnType),
    Text(String),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
}

impl BindValue {
    /// SQL literal spelling, for logs and `explain` output only.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null(_) => "NULL".to_owned(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string().to_uppercase(),
            Self::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        }
    }
}

/// Whether a statement produces rows or only an affected-row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Command,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl Statement {
    pub fn query(sql: impl Into<String>, params: Vec<BindValue>) -> Self {
        Self {
            kind: StatementKind::Query,
            sql: sql.into(),
            params,
        }
    }

    pub fn command(sql: impl Into<String>, params: Vec<BindValue>) -> Self {
        Self {
            kind: StatementKind::Command,
            sql: sql.into(),
            params,
        }
    }

    /// SQL with every placeholder replaced by its literal and date literals
    /// wrapped in TO_DATE. Never executed.
    pub fn display_sql(&self) -> String {
        // Single pass: inlined text is never scanned for placeholders again.
        let sql = PLACEHOLDER_RE.replace_all(&self.sql, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| self.params.get(i))
                .map(BindValue::to_sql_literal)
                .unwrap_or_else(|| caps[0].to_owned())
        });
        wrap_date_literals_in_sql(&sql)
    }
}

fn join_sql(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `SELECT *` for one page, ordered by primary key.
///
/// `binds` must be the typed parameters of `clause`; OFFSET and FETCH follow them.
pub fn select_page(
    schema: &ResourceSchema,
    clause: &WhereClause,
    mut binds: Vec<BindValue>,
    page: &Pagination,
) -> Statement {
    let from = format!("SELECT * FROM {}", schema.table);
    let order = format!("ORDER BY {}", schema.primary_key);
    let paging = page.sql_fragment(clause.next_placeholder());

    binds.push(BindValue::Int(page.offset() as i64));
    binds.push(BindValue::Int(page.limit() as i64));

    Statement::query(join_sql(&[&from, &clause.sql, &order, &paging]), binds)
}

/// `SELECT COUNT(*)` over the same WHERE fragment as the page query
pub fn count_rows(schema: &ResourceSchema, clause: &WhereClause, binds: Vec<BindValue>) -> Statement {
    let from = format!("SELECT COUNT(*) AS total FROM {}", schema.table);
    Statement::query(join_sql(&[&from, &clause.sql]), binds)
}

pub fn select_by_id(schema: &ResourceSchema, id: BindValue) -> Statement {
    Statement::query(
        format!(
            "SELECT * FROM {} WHERE {} = $1",
            schema.table, schema.primary_key
        ),
        vec![id],
    )
}

/// `UPDATE .. SET` over exactly the given columns, keyed on the primary key.
pub fn update_by_id(
    schema: &ResourceSchema,
    id: BindValue,
    assignments: Vec<(&str, BindValue)>,
) -> Result<Statement> {
    if assignments.is_empty() {
        return Err(DomainError::validation(format!(
            "nothing to update for {}",
            schema.resource_type
        )));
    }

    let set = assignments
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{} = ${}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let key_placeholder = assignments.len() + 1;

    let mut params: Vec<BindValue> = assignments.into_iter().map(|(_, v)| v).collect();
    params.push(id);

    Ok(Statement::command(
        format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            schema.table, set, schema.primary_key, key_placeholder
        ),
        params,
    ))
}

/// `INSERT .. RETURNING *`; the primary key is left to the store's identity column.
pub fn insert(schema: &ResourceSchema, values: Vec<(&str, BindValue)>) -> Result<Statement> {
    if values.is_empty() {
        return Err(DomainError::validation(format!(
            "no attributes supplied for new {}",
            schema.resource_type
        )));
    }

    let columns = values
        .iter()
        .map(|(column, _)| *column)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=values.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Statement::query(
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            schema.table, columns, placeholders
        ),
        values.into_iter().map(|(_, v)| v).collect(),
    ))
}
