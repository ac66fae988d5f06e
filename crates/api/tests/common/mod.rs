#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use scriptbox_api::config::ServerConfig;
use scriptbox_api::router::build_app_router;
use scriptbox_api::state::AppState;
use scriptbox_core::scripting::config::ExecutionConfig;

/// A test application backed by throwaway scripts and harness directories.
///
/// The directories live as long as this value does.
pub struct TestApp {
    pub router: Router,
    pub scripts: TempDir,
    pub harness: TempDir,
}

impl TestApp {
    /// A fresh router handle for one `oneshot` request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Write a script straight into the scripts directory.
    pub fn write_script(&self, name: &str, body: &str) {
        let path = self.scripts.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, body).unwrap();
    }

    /// Number of entries left in the harness directory.
    pub fn harness_entries(&self) -> usize {
        std::fs::read_dir(self.harness.path()).unwrap().count()
    }
}

/// Build a test `ServerConfig` rooted at the given directories.
///
/// Scripts are limited to 2 seconds so timeout tests stay quick.
pub fn test_config(scripts_dir: &Path, harness_dir: &Path) -> ServerConfig {
    let mut execution = ExecutionConfig::new(scripts_dir);
    execution.max_execution_time = Duration::from_secs(2);
    execution.harness_dir = harness_dir.to_path_buf();

    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        log_json: false,
        execution,
    }
}

/// Build the full application router with all middleware layers, the same
/// way `main.rs` does.
pub fn build_test_app() -> TestApp {
    let scripts = tempfile::tempdir().unwrap();
    let harness = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(scripts.path(), harness.path()));

    TestApp {
        router: build_app_router(state),
        scripts,
        harness,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
