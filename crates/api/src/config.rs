use std::path::PathBuf;
use std::time::Duration;

use scriptbox_core::scripting::config::{
    ExecutionConfig, DEFAULT_MAX_EXECUTION_SECS, DEFAULT_PYTHON_BIN,
};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `330`). Must exceed the
    /// script execution limit; see [`ServerConfig::check_timeouts`].
    pub request_timeout_secs: u64,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
    /// Script store and execution settings.
    pub execution: ExecutionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `8000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `330`                      |
    /// | `LOG_FORMAT`                | `text` (`json` for JSON)   |
    /// | `SCRIPTS_DIR`               | `./scripts`                |
    /// | `MAX_SCRIPT_EXECUTION_TIME` | `300`                      |
    /// | `ALLOWED_SCRIPT_EXTENSIONS` | `.py`                      |
    /// | `PYTHON_BIN`                | `python3`                  |
    /// | `HARNESS_DIR`               | system temp dir            |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "330".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let log_json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let scripts_dir =
            PathBuf::from(std::env::var("SCRIPTS_DIR").unwrap_or_else(|_| "./scripts".into()));

        let max_execution_secs: u64 = std::env::var("MAX_SCRIPT_EXECUTION_TIME")
            .unwrap_or_else(|_| DEFAULT_MAX_EXECUTION_SECS.to_string())
            .parse()
            .expect("MAX_SCRIPT_EXECUTION_TIME must be a valid u64");

        let allowed_extensions: Vec<String> = split_list(
            &std::env::var("ALLOWED_SCRIPT_EXTENSIONS").unwrap_or_else(|_| ".py".into()),
        )
        .into_iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('.')))
        .collect();

        let python_bin =
            std::env::var("PYTHON_BIN").unwrap_or_else(|_| DEFAULT_PYTHON_BIN.to_string());

        let mut execution = ExecutionConfig::new(scripts_dir);
        execution.max_execution_time = Duration::from_secs(max_execution_secs);
        execution.allowed_extensions = allowed_extensions;
        execution.python_bin = python_bin;
        if let Ok(dir) = std::env::var("HARNESS_DIR") {
            execution.harness_dir = PathBuf::from(dir);
        }

        let config = Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            log_json,
            execution,
        };
        config
            .check_timeouts()
            .unwrap_or_else(|msg| panic!("Invalid timeout configuration: {msg}"));
        config
    }

    /// The HTTP timeout must outlast the script deadline, otherwise a slow
    /// script is cut off with `408` instead of reporting its own `Failure`.
    pub fn check_timeouts(&self) -> Result<(), String> {
        let script_limit = self.execution.max_execution_time;
        if Duration::from_secs(self.request_timeout_secs) <= script_limit {
            return Err(format!(
                "REQUEST_TIMEOUT_SECS ({}) must be greater than MAX_SCRIPT_EXECUTION_TIME ({})",
                self.request_timeout_secs,
                script_limit.as_secs()
            ));
        }
        Ok(())
    }
}

/// Split a comma-separated env value, dropping empty entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
