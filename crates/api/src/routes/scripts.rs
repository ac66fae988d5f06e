//! Route definitions for script endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::scripts;
use crate::state::AppState;

/// Routes mounted under `/api/v1`.
///
/// ```text
/// GET    /scripts                   -> list_scripts
/// GET    /scripts/{*script_path}    -> get_script
/// POST   /scripts/{*script_path}    -> execute_script
/// PUT    /scripts/{*script_path}    -> store_script
/// DELETE /scripts/{*script_path}    -> delete_script
/// POST   /validate                  -> validate_script
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scripts", get(scripts::list_scripts))
        .route(
            "/scripts/{*script_path}",
            get(scripts::get_script)
                .post(scripts::execute_script)
                .put(scripts::store_script)
                .delete(scripts::delete_script),
        )
        .route("/validate", post(scripts::validate_script))
}
