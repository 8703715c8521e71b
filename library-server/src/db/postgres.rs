//! sqlx/Postgres implementation of the connection provider

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use library_core::{BindValue, ColumnType, Record, Statement, StatementKind};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, Transaction, TypeInfo};

use super::connection::{Connection, ConnectionProvider, DbError, ExecOutcome};

/// Hands out one pool transaction per handle
#[derive(Clone)]
pub struct PgProvider {
    pool: PgPool,
    statement_timeout: Option<Duration>,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: None,
        }
    }

    /// Have Postgres cancel statements running longer than `timeout`.
    ///
    /// Set with `SET LOCAL` on every transaction, so it ends with the
    /// transaction and never leaks to the next user of the connection.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionProvider for PgProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DbError> {
        let mut tx = self.pool.begin().await?;
        if let Some(timeout) = self.statement_timeout {
            // SET takes no bind parameters; the value is a plain integer
            sqlx::query(&format!("SET LOCAL statement_timeout = {}", timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }
        Ok(Box::new(PgConnection { tx }))
    }
}

struct PgConnection {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Connection for PgConnection {
    async fn execute(&mut self, statement: &Statement) -> Result<ExecOutcome, DbError> {
        let query = statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind_value);

        match statement.kind {
            StatementKind::Query => {
                let rows = query.fetch_all(&mut *self.tx).await?;
                let records = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
                Ok(ExecOutcome::rows(records))
            }
            StatementKind::Command => {
                let result = query.execute(&mut *self.tx).await?;
                Ok(ExecOutcome::affected(result.rows_affected()))
            }
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &BindValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        BindValue::Null(ColumnType::Text) => query.bind(None::<String>),
        BindValue::Null(ColumnType::Integer) => query.bind(None::<i64>),
        BindValue::Null(ColumnType::Boolean) => query.bind(None::<bool>),
        BindValue::Null(ColumnType::Date) => query.bind(None::<NaiveDate>),
        BindValue::Text(s) => query.bind(s.clone()),
        BindValue::Int(i) => query.bind(*i),
        BindValue::Bool(b) => query.bind(*b),
        BindValue::Date(d) => query.bind(*d),
    }
}

/// Decode a row into a record keyed by column name; dates become `YYYY-MM-DD`.
fn decode_row(row: &PgRow) -> Result<Record, DbError> {
    row.columns()
        .iter()
        .map(|column| -> Result<(String, Value), DbError> {
            let i = column.ordinal();
            let value = match column.type_info().name() {
                "INT2" => row.try_get::<Option<i16>, _>(i)?.map(Value::from),
                "INT4" => row.try_get::<Option<i32>, _>(i)?.map(Value::from),
                "INT8" => row.try_get::<Option<i64>, _>(i)?.map(Value::from),
                "FLOAT4" => row.try_get::<Option<f32>, _>(i)?.map(Value::from),
                "FLOAT8" => row.try_get::<Option<f64>, _>(i)?.map(Value::from),
                "BOOL" => row.try_get::<Option<bool>, _>(i)?.map(Value::from),
                "DATE" => row
                    .try_get::<Option<NaiveDate>, _>(i)?
                    .map(|d| Value::from(d.format("%Y-%m-%d").to_string())),
                "TIMESTAMPTZ" => row
                    .try_get::<Option<DateTime<Utc>>, _>(i)?
                    .map(|t| Value::from(t.to_rfc3339())),
                "TIMESTAMP" => row
                    .try_get::<Option<NaiveDateTime>, _>(i)?
                    .map(|t| Value::from(t.to_string())),
                _ => row.try_get::<Option<String>, _>(i)?.map(Value::from),
            };
            Ok((column.name().to_owned(), value.unwrap_or(Value::Null)))
        })
        .collect()
}
