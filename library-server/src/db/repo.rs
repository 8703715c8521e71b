//! Resource repository: list, get-by-id, update and create over one schema
//!
//! Every operation owns one [`TransactionContext`]. Parsing, compilation and
//! attribute validation run before the connection is acquired; storage errors
//! are translated only after the rollback has been issued.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use library_core::statement::{count_rows, insert, select_by_id, select_page, update_by_id};
use library_core::{
    compile, BindValue, DomainError, Paginated, ParsedQuery, Record, ResourceSchema, Result,
    Statement,
};
use serde_json::Value;

use super::connection::{ConnectionProvider, DbError};
use super::transaction::TransactionContext;
use crate::translate::translate;

pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-process settings shared by every repository
#[derive(Debug, Clone)]
pub struct RepoSettings {
    /// Zone used for create-time "today" defaults
    pub time_zone: Tz,
    pub statement_timeout: Duration,
}

impl Default for RepoSettings {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::America::Los_Angeles,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }
}

impl RepoSettings {
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.time_zone).date_naive()
    }
}

/// Failure inside an open transaction, before translation
enum Failure {
    Store(DbError),
    Domain(DomainError),
}

impl From<DbError> for Failure {
    fn from(err: DbError) -> Self {
        Self::Store(err)
    }
}

impl From<DomainError> for Failure {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

pub struct ResourceRepo<'a> {
    provider: &'a dyn ConnectionProvider,
    schema: &'static ResourceSchema,
    settings: &'a RepoSettings,
}

impl<'a> ResourceRepo<'a> {
    pub fn new(
        provider: &'a dyn ConnectionProvider,
        schema: &'static ResourceSchema,
        settings: &'a RepoSettings,
    ) -> Self {
        Self {
            provider,
            schema,
            settings,
        }
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    /// One page of rows matching the query's filters, keys in wire casing.
    ///
    /// `totalResults` comes from a COUNT over the same WHERE fragment in the
    /// same transaction.
    pub async fn list(&self, query: &ParsedQuery) -> Result<Paginated<Record>> {
        let clause = compile(&query.filters)?;
        let binds = self.schema.bind_filters(&clause)?;
        let page = query.pagination();
        let count = count_rows(self.schema, &clause, binds.clone());
        let select = select_page(self.schema, &clause, binds, &page);

        let mut tx = self.begin().await?;
        let result = self.count_and_fetch(&mut tx, &count, &select).await;
        let (total, rows) = self.finish(tx, result).await?;

        let items = rows.into_iter().map(Record::into_wire_casing).collect();
        Ok(Paginated::new(items, total, page))
    }

    /// `Ok(None)` when no row has this identifier.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Record>> {
        let key = self.schema.parse_id(id)?;
        let select = select_by_id(self.schema, key);

        let mut tx = self.begin().await?;
        let result = self.fetch_single(&mut tx, &select).await;
        let row = self.finish(tx, result).await?;

        Ok(row.map(Record::into_wire_casing))
    }

    /// Merge `attributes` into the stored row and write it back.
    ///
    /// Returns `Ok(None)` when the row does not exist, otherwise the row as
    /// re-read after commit.
    pub async fn update(&self, id: &str, attributes: Record) -> Result<Option<Record>> {
        let key = self.schema.parse_id(id)?;
        let mut changes = attributes.into_storage_casing();
        changes.remove(self.schema.primary_key);
        self.schema.check_attributes(&changes)?;

        let select = select_by_id(self.schema, key.clone());
        let mut tx = self.begin().await?;

        let existing = match self.fetch_single(&mut tx, &select).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                tx.rollback().await;
                return Ok(None);
            }
            Err(failure) => return self.finish(tx, Err(failure)).await,
        };

        let merged = self.stored_columns(existing).merge(changes);
        let result = self.write_back(&mut tx, key, &merged).await;
        self.finish(tx, result).await?;
        tracing::info!(resource = self.schema.resource_type, id, "updated");

        match self.get_by_id(id).await? {
            Some(row) => Ok(Some(row)),
            None => Err(DomainError::persistence(format!(
                "{} '{}' disappeared after update",
                self.schema.resource_type, id
            ))),
        }
    }

    /// Insert a new row and return it, generated key included.
    pub async fn create(&self, attributes: Record) -> Result<Record> {
        let mut record = attributes.into_storage_casing();
        record.remove(self.schema.primary_key);
        self.schema.check_attributes(&record)?;
        self.schema
            .apply_initial_values(&mut record, self.settings.today());
        self.schema.check_required(&record)?;
        let statement = insert(self.schema, self.schema.write_values(&record)?)?;

        let mut tx = self.begin().await?;
        let result = self.insert_row(&mut tx, &statement).await;
        let row = self.finish(tx, result).await?;

        tracing::info!(
            resource = self.schema.resource_type,
            id = %row.get(self.schema.primary_key).unwrap_or(&serde_json::Value::Null),
            "created"
        );
        Ok(row.into_wire_casing())
    }

    async fn begin(&self) -> Result<TransactionContext> {
        TransactionContext::begin(
            self.provider,
            self.schema.resource_type,
            self.settings.statement_timeout,
        )
        .await
        .map_err(|err| DomainError::persistence(format!("connection unavailable: {}", err)))
    }

    /// Commit on success; otherwise roll back, then translate.
    async fn finish<T>(
        &self,
        tx: TransactionContext,
        result: std::result::Result<T, Failure>,
    ) -> Result<T> {
        match result {
            Ok(value) => {
                tx.commit().await.map_err(|err| translate(self.schema, &err))?;
                Ok(value)
            }
            Err(failure) => {
                tx.rollback().await;
                Err(match failure {
                    Failure::Store(err) => translate(self.schema, &err),
                    Failure::Domain(err) => err,
                })
            }
        }
    }

    async fn count_and_fetch(
        &self,
        tx: &mut TransactionContext,
        count: &Statement,
        select: &Statement,
    ) -> std::result::Result<(i64, Vec<Record>), Failure> {
        let total = tx
            .execute(count)
            .await?
            .rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(Value::as_i64)
            .ok_or_else(|| DomainError::persistence("count query returned no total"))?;
        let rows = tx.execute(select).await?.rows;
        Ok((total, rows))
    }

    async fn fetch_single(
        &self,
        tx: &mut TransactionContext,
        select: &Statement,
    ) -> std::result::Result<Option<Record>, Failure> {
        let mut rows = tx.execute(select).await?.rows;
        if rows.len() > 1 {
            return Err(DomainError::consistency(format!(
                "expected a single {} but got {} rows for one identifier",
                self.schema.resource_type,
                rows.len()
            ))
            .into());
        }
        Ok(rows.pop())
    }

    async fn write_back(
        &self,
        tx: &mut TransactionContext,
        key: BindValue,
        merged: &Record,
    ) -> std::result::Result<(), Failure> {
        let assignments = self.schema.write_values(merged)?;
        let statement = update_by_id(self.schema, key, assignments)?;
        let outcome = tx.execute(&statement).await?;
        if outcome.rows_affected != 1 {
            return Err(DomainError::persistence(format!(
                "expected to update one {} but {} rows were affected",
                self.schema.resource_type, outcome.rows_affected
            ))
            .into());
        }
        Ok(())
    }

    async fn insert_row(
        &self,
        tx: &mut TransactionContext,
        statement: &Statement,
    ) -> std::result::Result<Record, Failure> {
        let mut rows = tx.execute(statement).await?.rows;
        if rows.len() != 1 {
            return Err(DomainError::persistence(format!(
                "expected one inserted {} but got {} rows",
                self.schema.resource_type,
                rows.len()
            ))
            .into());
        }
        rows.pop()
            .ok_or_else(|| DomainError::persistence("insert returned no row").into())
    }

    /// Drop columns the schema does not know, so a wider table never fails the merge.
    fn stored_columns(&self, row: Record) -> Record {
        row.into_iter()
            .filter(|(column, _)| self.schema.column(column).is_some())
            .collect()
    }
}
