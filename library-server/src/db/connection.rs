//! Connection provider seam
//!
//! The persistence layer only needs something that hands out one exclusive
//! transaction handle per operation. Postgres implements it in
//! [`super::postgres`]; tests drive the same state machine with a fake.

use async_trait::async_trait;
use library_core::{Record, Statement};

/// SQLSTATE for a foreign-key violation
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Raw storage error, before translation into the domain taxonomy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DbError {
    /// SQLSTATE, when the store reported one
    pub code: Option<String>,
    /// Violated constraint name, when the store reported one
    pub constraint: Option<String>,
    pub message: String,
}

impl DbError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            constraint: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.code.as_deref() == Some(FOREIGN_KEY_VIOLATION)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => Self {
                code: db.code().map(|c| c.into_owned()),
                constraint: db.constraint().map(str::to_owned),
                message: db.message().to_owned(),
            },
            _ => Self::new(err.to_string()),
        }
    }
}

/// Result of executing one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutcome {
    /// Returned rows, keys in storage casing
    pub rows: Vec<Record>,
    pub rows_affected: u64,
}

impl ExecOutcome {
    pub fn rows(rows: Vec<Record>) -> Self {
        Self {
            rows_affected: rows.len() as u64,
            rows,
        }
    }

    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected,
        }
    }
}

/// One live transaction. Dropping the handle releases it; an uncommitted
/// handle is rolled back by the store.
#[async_trait]
pub trait Connection: Send {
    async fn execute(&mut self, statement: &Statement) -> Result<ExecOutcome, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Acquire a connection with an open transaction.
    async fn acquire(&self) -> Result<Box<dyn Connection>, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_key_detection() {
        let err = DbError::new("insert violates fk").with_code("23503");
        assert!(err.is_foreign_key_violation());
        assert!(!DbError::new("boom").with_code("23505").is_foreign_key_violation());
        assert!(!DbError::new("boom").is_foreign_key_violation());
    }

    #[test]
    fn non_database_sqlx_errors_keep_their_text() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.code, None);
        assert!(!err.message.is_empty());
    }
}
