//! Domain error taxonomy for the library data-access layer.
//!
//! A lookup that matches nothing is not an error here: operations return
//! `Ok(None)` and leave the response semantics to the caller.

use thiserror::Error;

/// Error kind without payload, for callers that only branch on category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainErrorKind {
    ValidationFailure,
    IntegrityViolation,
    PersistenceFailure,
    ConsistencyError,
}

/// Main error type for library-core and the persistence operations built on it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input detected before any I/O (bad date, unknown attribute, ...)
    #[error("Validation failed: {reason}")]
    ValidationFailure { reason: String },

    /// A storage constraint rejected the write (missing parent row)
    #[error("Integrity constraint violated: {message}")]
    IntegrityViolation { message: String },

    /// Any other storage-layer failure, including unexpected affected-row counts
    #[error("Persistence failure: {message}")]
    PersistenceFailure { message: String },

    /// The store returned data that breaks a schema invariant (duplicate primary key)
    #[error("Consistency error: {message}")]
    ConsistencyError { message: String },
}

/// Result type alias for library-core operations
pub type Result<T> = std::result::Result<T, DomainError>;

impl DomainError {
    /// Create a validation failure
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationFailure {
            reason: reason.into(),
        }
    }

    /// Create an integrity violation
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            message: message.into(),
        }
    }

    /// Create a persistence failure
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceFailure {
            message: message.into(),
        }
    }

    /// Create a consistency error
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::ConsistencyError {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DomainErrorKind {
        match self {
            Self::ValidationFailure { .. } => DomainErrorKind::ValidationFailure,
            Self::IntegrityViolation { .. } => DomainErrorKind::IntegrityViolation,
            Self::PersistenceFailure { .. } => DomainErrorKind::PersistenceFailure,
            Self::ConsistencyError { .. } => DomainErrorKind::ConsistencyError,
        }
    }

    /// Human-readable detail without the category prefix
    pub fn detail(&self) -> &str {
        match self {
            Self::ValidationFailure { reason } => reason,
            Self::IntegrityViolation { message }
            | Self::PersistenceFailure { message }
            | Self::ConsistencyError { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::validation("unknown attribute 'colour'");
        assert_eq!(
            err.to_string(),
            "Validation failed: unknown attribute 'colour'"
        );

        let err = DomainError::integrity("referenced member does not exist");
        assert!(err.to_string().starts_with("Integrity constraint violated"));
    }

    #[test]
    fn test_kind_and_detail() {
        let err = DomainError::consistency("duplicate key");
        assert_eq!(err.kind(), DomainErrorKind::ConsistencyError);
        assert_eq!(err.detail(), "duplicate key");

        let err = DomainError::persistence("timeout");
        assert_eq!(err.kind(), DomainErrorKind::PersistenceFailure);
    }
}
