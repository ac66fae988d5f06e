use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the scripts directory is present.
    pub scripts_dir_ok: bool,
}

/// GET /health -- returns service status and scripts directory health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let scripts_dir_ok = tokio::fs::metadata(state.repository().root())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let status = if scripts_dir_ok { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        scripts_dir_ok,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
