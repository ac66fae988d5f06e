//! Shared response envelope types for API handlers.
//!
//! Management endpoints use a `{ "data": ... }` envelope ([`DataResponse`]).
//! Script execution answers with [`ScriptExecutionResponse`], whose shape is
//! part of the public calling contract for scripts.

use scriptbox_core::scripting::outcome::ExecutionOutcome;
use serde::Serialize;
use serde_json::{Map, Value};

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Body returned by `POST /scripts/{*script_path}`.
///
/// A failed script still yields HTTP 200; `success` tells the two apart.
#[derive(Debug, Serialize)]
pub struct ScriptExecutionResponse {
    pub success: bool,
    pub result: Option<Map<String, Value>>,
    pub error: Option<String>,
    /// Wall-clock seconds spent on the call.
    pub execution_time: f64,
}

impl From<ExecutionOutcome> for ScriptExecutionResponse {
    fn from(outcome: ExecutionOutcome) -> Self {
        let success = outcome.is_success();
        let execution_time = outcome.elapsed_seconds();
        let (result, error) = match outcome {
            ExecutionOutcome::Success { result, .. } => (Some(result), None),
            ExecutionOutcome::Failure { reason, .. } => (None, Some(reason)),
        };
        Self {
            success,
            result,
            error,
            execution_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[test]
    fn failure_maps_to_unsuccessful_body() {
        let outcome = ExecutionOutcome::failure("boom").with_elapsed(Duration::from_millis(500));
        let body = serde_json::to_value(ScriptExecutionResponse::from(outcome)).expect("json");
        assert_eq!(
            body,
            json!({"success": false, "result": null, "error": "boom", "execution_time": 0.5})
        );
    }

    #[test]
    fn success_maps_to_result_body() {
        let mut result = Map::new();
        result.insert("doubled".to_string(), json!(42));
        let outcome = ExecutionOutcome::success(result).with_elapsed(Duration::from_millis(250));
        let body = serde_json::to_value(ScriptExecutionResponse::from(outcome)).expect("json");
        assert_eq!(
            body,
            json!({"success": true, "result": {"doubled": 42}, "error": null, "execution_time": 0.25})
        );
    }
}
