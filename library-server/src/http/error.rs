//! API error type with IntoResponse
//!
//! Errors become JSON:API `errors` documents. Storage-side failures are logged
//! and answered with a generic body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use library_core::DomainError;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// Error from the persistence layer, mapped by kind
    Domain(DomainError),

    /// No row with this identifier (404)
    NotFound { resource: &'static str, id: String },

    /// Path segment is not a known collection (404)
    UnknownCollection(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(DomainError::ValidationFailure { .. }) => StatusCode::BAD_REQUEST,
            Self::Domain(DomainError::IntegrityViolation { .. }) => StatusCode::CONFLICT,
            Self::Domain(DomainError::PersistenceFailure { .. })
            | Self::Domain(DomainError::ConsistencyError { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound { .. } | Self::UnknownCollection(_) => StatusCode::NOT_FOUND,
        }
    }

    fn title_and_detail(&self) -> (&'static str, String) {
        match self {
            Self::Domain(e @ DomainError::ValidationFailure { .. }) => {
                ("Bad Request", e.detail().to_owned())
            }
            Self::Domain(e @ DomainError::IntegrityViolation { .. }) => {
                ("Integrity Constraint Violated", e.detail().to_owned())
            }
            Self::Domain(e) => {
                tracing::error!(error = %e, "request failed in persistence layer");
                ("Internal Server Error", "an internal error occurred".to_owned())
            }
            Self::NotFound { resource, id } => (
                "Not Found",
                format!("A {} with the specified ID '{}' was not found.", resource, id),
            ),
            Self::UnknownCollection(name) => {
                ("Not Found", format!("unknown resource collection '{}'", name))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (title, detail) = self.title_and_detail();
        let body = json!({
            "errors": [{
                "status": status.as_u16().to_string(),
                "title": title,
                "detail": detail,
            }]
        });

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}
