//! Handlers for script execution and script management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use scriptbox_core::error::CoreError;
use scriptbox_core::scripting::repository::ScriptRepository;
use scriptbox_core::scripting::validator::{self, ValidationVerdict};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::response::{DataResponse, ScriptExecutionResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for script execution.
#[derive(Debug, Deserialize)]
pub struct ScriptExecutionRequest {
    /// JSON object passed to the script's `main()` function.
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Request body for storing a script.
#[derive(Debug, Deserialize)]
pub struct StoreScriptRequest {
    /// Python source text.
    pub content: String,
    /// Overwrite an existing script at the same path.
    #[serde(default)]
    pub replace: bool,
}

/// Request body for the validation endpoint.
#[derive(Debug, Deserialize)]
pub struct ValidateScriptRequest {
    pub content: String,
}

/// A stored script's identity.
#[derive(Debug, Serialize)]
pub struct StoredScript {
    pub logical_path: String,
}

/// A stored script's source text.
#[derive(Debug, Serialize)]
pub struct ScriptContent {
    pub logical_path: String,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// POST /scripts/{*script_path}
///
/// Run the script's `main(data)` with the request's `data` object. A script
/// that fails, times out or returns something other than a dict yields
/// `200` with `success: false`.
pub async fn execute_script(
    State(state): State<AppState>,
    Path(script_path): Path<String>,
    Json(request): Json<ScriptExecutionRequest>,
) -> AppResult<Json<ScriptExecutionResponse>> {
    let outcome = state
        .orchestrator
        .execute(&script_path, &request.data)
        .await
        .inspect_err(|e| tracing::error!(error = %e, script_path = %script_path, "Script execution error"))?;

    Ok(Json(outcome.into()))
}

// ---------------------------------------------------------------------------
// Management
// ---------------------------------------------------------------------------

/// PUT /scripts/{*script_path}
///
/// Validate and store a script. Rejected source yields `400` with the
/// validator's message; an existing script yields `409` unless `replace`
/// is set.
pub async fn store_script(
    State(state): State<AppState>,
    Path(script_path): Path<String>,
    Json(request): Json<StoreScriptRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<StoredScript>>)> {
    if request.content.trim().is_empty() {
        return Err(AppError::BadRequest("content is required".to_string()));
    }

    let stored = state
        .repository()
        .store(&script_path, &request.content, request.replace)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: StoredScript {
                logical_path: stored.logical_path,
            },
        }),
    ))
}

/// GET /scripts
///
/// List the logical paths of all stored scripts.
pub async fn list_scripts(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let scripts = state.repository().list().await?;
    Ok(Json(DataResponse { data: scripts }))
}

/// DELETE /scripts/{*script_path}
pub async fn delete_script(
    State(state): State<AppState>,
    Path(script_path): Path<String>,
) -> AppResult<StatusCode> {
    state.repository().delete(&script_path).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /scripts/{*script_path}
///
/// Return the stored source of one script.
pub async fn get_script(
    State(state): State<AppState>,
    Path(script_path): Path<String>,
) -> AppResult<Json<DataResponse<ScriptContent>>> {
    let script = state.repository().resolve(&script_path).await?;
    Ok(Json(DataResponse {
        data: ScriptContent {
            logical_path: script.logical_path,
            content: script.source_text,
        },
    }))
}

/// POST /validate
///
/// Check source text without storing it. Parsing runs on the blocking pool.
pub async fn validate_script(
    Json(request): Json<ValidateScriptRequest>,
) -> AppResult<Json<DataResponse<ValidationVerdict>>> {
    let verdict = tokio::task::spawn_blocking(move || validator::validate(&request.content))
        .await
        .map_err(|e| CoreError::Internal(format!("Validation task failed: {e}")))?;

    Ok(Json(DataResponse { data: verdict }))
}
