//! Per-operation transaction ownership
//!
//! Acquired -> Executing -> Committed | RolledBack -> Released.
//! Release happens on drop, so it is reached on every exit path. Commit and
//! rollback share the statement timeout; a handle that misses it is dropped
//! instead of awaited.

use std::time::Duration;

use library_core::Statement;

use super::connection::{Connection, ConnectionProvider, DbError, ExecOutcome};

pub struct TransactionContext {
    conn: Option<Box<dyn Connection>>,
    resource: &'static str,
    statement_timeout: Duration,
}

impl TransactionContext {
    pub async fn begin(
        provider: &dyn ConnectionProvider,
        resource: &'static str,
        statement_timeout: Duration,
    ) -> Result<Self, DbError> {
        let conn = provider.acquire().await.map_err(|err| {
            tracing::warn!(resource, error = %err, "failed to acquire connection");
            err
        })?;
        tracing::debug!(resource, "connection acquired");

        Ok(Self {
            conn: Some(conn),
            resource,
            statement_timeout,
        })
    }

    /// Execute one statement, bounded by the statement timeout.
    pub async fn execute(&mut self, statement: &Statement) -> Result<ExecOutcome, DbError> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DbError::new("transaction already finished"))?;

        tracing::debug!(
            resource = self.resource,
            sql = %statement.sql,
            params = statement.params.len(),
            "executing statement"
        );

        let outcome = match tokio::time::timeout(self.statement_timeout, conn.execute(statement)).await {
            Ok(result) => result,
            Err(_) => Err(DbError::new(format!(
                "statement timed out after {:?}",
                self.statement_timeout
            ))),
        };

        match &outcome {
            Ok(out) => tracing::debug!(
                resource = self.resource,
                rows = out.rows.len(),
                rows_affected = out.rows_affected,
                "statement complete"
            ),
            Err(err) => tracing::warn!(resource = self.resource, error = %err, "statement failed"),
        }
        outcome
    }

    pub async fn commit(mut self) -> Result<(), DbError> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| DbError::new("transaction already finished"))?;

        let outcome = match tokio::time::timeout(self.statement_timeout, conn.commit()).await {
            Ok(result) => result,
            Err(_) => Err(DbError::new(format!(
                "commit timed out after {:?}",
                self.statement_timeout
            ))),
        };

        match outcome {
            Ok(()) => {
                tracing::debug!(resource = self.resource, "committed");
                Ok(())
            }
            Err(err) => {
                tracing::error!(resource = self.resource, error = %err, "commit failed");
                Err(err)
            }
        }
    }

    /// Roll back. A failed rollback is logged, not returned: the caller is
    /// already propagating the error that caused it.
    ///
    /// A rollback stuck behind a timed-out statement is abandoned once the
    /// statement timeout elapses; the connection is dropped with it.
    pub async fn rollback(mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        match tokio::time::timeout(self.statement_timeout, conn.rollback()).await {
            Ok(Ok(())) => tracing::debug!(resource = self.resource, "rolled back"),
            Ok(Err(err)) => {
                tracing::warn!(resource = self.resource, error = %err, "rollback failed")
            }
            Err(_) => tracing::warn!(
                resource = self.resource,
                timeout = ?self.statement_timeout,
                "rollback timed out, discarding connection"
            ),
        }
    }
}

impl Drop for TransactionContext {
    fn drop(&mut self) {
        if self.conn.is_some() {
            tracing::warn!(resource = self.resource, "transaction dropped while open");
        }
        tracing::debug!(resource = self.resource, "connection released");
    }
}
