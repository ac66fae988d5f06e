pub mod health;
pub mod scripts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /scripts                      list stored scripts (GET)
/// /scripts/{*script_path}       read (GET), execute (POST), store (PUT),
///                               delete (DELETE)
/// /validate                     check source without storing (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(scripts::router())
}
