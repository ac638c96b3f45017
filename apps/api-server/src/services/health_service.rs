//! Health check service.
//!
//! Reports database connectivity and migration status for monitoring.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use stockadoodle_db::migrations::migration_status;
use tracing::warn;

use crate::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "serving" or "not_serving"
    pub status: &'static str,
    pub message: String,
    pub database: bool,
    pub migrations_applied: usize,
    pub migrations_total: usize,
    pub version: &'static str,
    pub server_time: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let (total, applied) = match migration_status(state.db.pool()).await {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, "Could not read migration status");
            (0, 0)
        }
    };

    let (code, status, message) = if !database {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "not_serving",
            "Database unreachable".to_string(),
        )
    } else if applied < total {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "not_serving",
            format!("{} of {} migrations applied", applied, total),
        )
    } else {
        (
            StatusCode::OK,
            "serving",
            "All systems operational".to_string(),
        )
    };

    (
        code,
        Json(HealthResponse {
            status,
            message,
            database,
            migrations_applied: applied,
            migrations_total: total,
            version: env!("CARGO_PKG_VERSION"),
            server_time: Utc::now(),
        }),
    )
}
