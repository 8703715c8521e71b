//! GET /health: liveness plus a database round trip

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::db::TransactionContext;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// `reachable` or `unreachable`
    pub database: &'static str,
}

/// Opens and rolls back an empty transaction. 503 when no connection can be
/// acquired, so a load balancer stops routing to an instance without a store.
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let probe = TransactionContext::begin(
        state.provider.as_ref(),
        "health",
        state.settings.statement_timeout,
    )
    .await;

    let (code, status, database) = match probe {
        Ok(tx) => {
            tx.rollback().await;
            (StatusCode::OK, "ok", "reachable")
        }
        Err(err) => {
            tracing::warn!(error = %err, "health check: database unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };

    (
        code,
        Json(HealthReport {
            status,
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
