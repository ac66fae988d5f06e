//! Execution settings shared by the store and the execution pipeline.
//!
//! Loaded once at start-up and handed to the orchestrator by value. Nothing
//! here changes after construction, so it is freely shared across
//! concurrent executions.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default wall-clock limit for one execution (5 minutes).
pub const DEFAULT_MAX_EXECUTION_SECS: u64 = 300;

/// Default interpreter used to run harnesses.
pub const DEFAULT_PYTHON_BIN: &str = "python3";

/// Maximum stdout or stderr size captured per stream (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Settings consumed by the script store and the execution pipeline.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Root directory confining all stored scripts. Also the working
    /// directory of every child process.
    pub scripts_dir: PathBuf,
    /// Hard wall-clock deadline for a single execution.
    pub max_execution_time: Duration,
    /// File extensions (with leading dot) a stored script may carry.
    pub allowed_extensions: Vec<String>,
    /// Python interpreter used to launch harnesses.
    pub python_bin: String,
    /// Directory under which per-call harness directories are created.
    pub harness_dir: PathBuf,
    /// Cap on captured bytes per output stream.
    pub max_output_bytes: usize,
}

impl ExecutionConfig {
    /// Defaults for everything except the scripts root.
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            max_execution_time: Duration::from_secs(DEFAULT_MAX_EXECUTION_SECS),
            allowed_extensions: vec![".py".to_string()],
            python_bin: DEFAULT_PYTHON_BIN.to_string(),
            harness_dir: std::env::temp_dir(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Whether `path` ends in one of the allowed extensions.
    pub fn is_allowed_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.') == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExecutionConfig::new("/srv/scripts");
        assert_eq!(config.scripts_dir, PathBuf::from("/srv/scripts"));
        assert_eq!(config.max_execution_time, Duration::from_secs(300));
        assert_eq!(config.allowed_extensions, vec![".py"]);
        assert_eq!(config.python_bin, "python3");
    }

    #[test]
    fn extension_check_ignores_leading_dot() {
        let mut config = ExecutionConfig::new("/srv/scripts");
        assert!(config.is_allowed_extension(Path::new("geology/test.py")));
        assert!(!config.is_allowed_extension(Path::new("geology/test.sh")));
        assert!(!config.is_allowed_extension(Path::new("geology/test")));

        config.allowed_extensions = vec!["py".into(), ".pyw".into()];
        assert!(config.is_allowed_extension(Path::new("a.pyw")));
        assert!(config.is_allowed_extension(Path::new("a.py")));
    }
}
