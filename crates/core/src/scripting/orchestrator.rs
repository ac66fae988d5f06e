//! Central script orchestrator.
//!
//! Coordinates script lookup, harness generation, process execution and
//! output decoding. Holds only immutable configuration, so one instance is
//! shared (behind an `Arc`) by every concurrent request.

use std::time::Instant;

use serde_json::{Map, Value};

use super::config::ExecutionConfig;
use super::decoder;
use super::harness::HarnessBuilder;
use super::outcome::{ExecutionOutcome, RunResult, ScriptError};
use super::repository::ScriptRepository;
use super::runner::ProcessRunner;
use crate::error::CoreError;

/// Errors that stop an execution before it can produce an outcome.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// The logical path does not name a runnable script.
    #[error("{0}")]
    NotFound(String),

    /// The host could not build or launch the harness.
    #[error(transparent)]
    Infrastructure(#[from] ScriptError),

    /// The script store failed for a reason other than a missing script.
    #[error("Script repository error: {0}")]
    Repository(CoreError),
}

impl From<CoreError> for ExecuteError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => Self::NotFound(msg),
            other => Self::Repository(other),
        }
    }
}

/// Runs stored scripts by logical path.
///
/// Each call is fully independent: a fresh harness, a fresh child process,
/// no caching between calls.
pub struct ScriptOrchestrator<R> {
    repository: R,
    config: ExecutionConfig,
    builder: HarnessBuilder,
    runner: ProcessRunner,
}

impl<R: ScriptRepository> ScriptOrchestrator<R> {
    pub fn new(repository: R, config: ExecutionConfig) -> Self {
        Self {
            builder: HarnessBuilder::new(config.harness_dir.clone()),
            runner: ProcessRunner::from_config(&config),
            repository,
            config,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Run the script at `target_path` with `payload`.
    ///
    /// Pipeline: resolve -> build harness -> run under the configured
    /// deadline -> decode. The returned outcome's elapsed time covers the
    /// whole call. The harness artifact is owned by this call and removed
    /// on every exit path.
    #[tracing::instrument(
        skip(self, payload),
        fields(execution_id = %uuid::Uuid::now_v7())
    )]
    pub async fn execute(
        &self,
        target_path: &str,
        payload: &Map<String, Value>,
    ) -> Result<ExecutionOutcome, ExecuteError> {
        let started = Instant::now();

        // 1. Resolve the logical path.
        let script = self.repository.resolve(target_path).await.map_err(|e| {
            tracing::warn!(error = %e, "Script resolution failed");
            ExecuteError::from(e)
        })?;

        // 2. Build the harness.
        let artifact = self.builder.build(&script.storage_location, payload)?;

        // 3. Run it.
        tracing::info!(
            logical_path = %script.logical_path,
            source_bytes = script.source_text.len(),
            "Executing script"
        );
        let run = self
            .runner
            .run(artifact, &self.config.scripts_dir, self.config.max_execution_time)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Harness could not be run"))?;

        if let RunResult::Completed { output, .. } = &run {
            if !output.stderr.is_empty() {
                tracing::debug!(stderr = %output.stderr, "Script wrote to stderr");
            }
        }

        // 4. Decode.
        let outcome = decoder::decode(run).with_elapsed(started.elapsed());
        let elapsed_seconds = outcome.elapsed_seconds();
        match &outcome {
            ExecutionOutcome::Success { .. } => {
                tracing::info!(elapsed_seconds, "Script executed successfully");
            }
            ExecutionOutcome::Failure { reason, .. } => {
                tracing::warn!(elapsed_seconds, reason = %reason, "Script execution failed");
            }
        }
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
