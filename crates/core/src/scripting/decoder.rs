//! Turns a [`RunResult`] into an [`ExecutionOutcome`].
//!
//! Never fails: a misbehaving script is an expected occurrence, so every
//! problem with its exit status or output becomes a `Failure` value.

use std::time::Duration;

use serde_json::Value;

use super::outcome::{ExecutionOutcome, RunResult};

/// Reason used when a failed process wrote nothing to either stream.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Reason used when the entry function returned something other than a dict.
pub const NOT_A_MAPPING: &str = "entry function must return a mapping";

/// Decode a run into an outcome, recording the run's own elapsed time.
pub fn decode(run: RunResult) -> ExecutionOutcome {
    let elapsed = run.elapsed();
    let outcome = match run {
        RunResult::TimedOut { timeout, .. } => ExecutionOutcome::failure(format!(
            "execution exceeded {} seconds",
            format_seconds(timeout)
        )),
        RunResult::Completed { output, .. } if output.exit_code != 0 => {
            let reason = [output.stderr.trim(), output.stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_ERROR);
            ExecutionOutcome::failure(reason)
        }
        RunResult::Completed { output, .. } => decode_stdout(&output.stdout),
    };
    outcome.with_elapsed(elapsed)
}

fn decode_stdout(stdout: &str) -> ExecutionOutcome {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return ExecutionOutcome::success(Default::default());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ExecutionOutcome::success(map),
        Ok(_) => ExecutionOutcome::failure(NOT_A_MAPPING),
        Err(e) => ExecutionOutcome::failure(format!("output is not valid JSON: {e}")),
    }
}

/// `1` for whole seconds, `0.5` otherwise.
fn format_seconds(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        d.as_secs_f64().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
