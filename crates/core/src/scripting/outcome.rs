//! Types flowing between the pipeline stages.
//!
//! [`RunResult`] is what the process runner observed, [`ExecutionOutcome`]
//! is what the caller gets back, and [`ScriptError`] covers the
//! infrastructure failures that are neither.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Everything captured from a child process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Complete stdout captured from the process (lossy UTF-8).
    pub stdout: String,
    /// Complete stderr captured from the process (lossy UTF-8).
    pub stderr: String,
}

/// What the process runner saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// The child exited on its own before the deadline.
    Completed {
        output: ProcessOutput,
        elapsed: Duration,
    },
    /// The child was still running at the deadline and has been killed.
    TimedOut {
        /// The configured deadline.
        timeout: Duration,
        elapsed: Duration,
    },
}

impl RunResult {
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Completed { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}

/// Result of one execution as reported to the caller.
///
/// `Failure` is a normal outcome (the user's script misbehaved), not an
/// error of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success {
        result: Map<String, Value>,
        elapsed_seconds: f64,
    },
    Failure {
        reason: String,
        elapsed_seconds: f64,
    },
}

impl ExecutionOutcome {
    pub fn success(result: Map<String, Value>) -> Self {
        Self::Success {
            result,
            elapsed_seconds: 0.0,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            elapsed_seconds: 0.0,
        }
    }

    /// Replace the recorded elapsed time.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        match &mut self {
            Self::Success {
                elapsed_seconds, ..
            }
            | Self::Failure {
                elapsed_seconds, ..
            } => *elapsed_seconds = elapsed.as_secs_f64(),
        }
        self
    }

    pub fn elapsed_seconds(&self) -> f64 {
        match self {
            Self::Success {
                elapsed_seconds, ..
            }
            | Self::Failure {
                elapsed_seconds, ..
            } => *elapsed_seconds,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Infrastructure failures of the execution pipeline.
///
/// These indicate a problem with the host (disk, interpreter, permissions),
/// not with the user's script.
#[derive(Debug)]
pub enum ScriptError {
    /// The harness artifact could not be written to disk.
    BuilderIo(std::io::Error),
    /// The child process could not be launched.
    Spawn {
        /// Program that was being launched.
        program: String,
        source: std::io::Error,
    },
    /// Waiting on or reading from a running child failed.
    Io(std::io::Error),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuilderIo(err) => write!(f, "Failed to create harness artifact: {err}"),
            Self::Spawn { program, source } => {
                write!(f, "Failed to spawn '{program}': {source}")
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BuilderIo(err) | Self::Io(err) | Self::Spawn { source: err, .. } => Some(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
