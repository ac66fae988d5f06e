//! Child process management for harness runs.
//!
//! [`ProcessRunner::run`] launches the interpreter on a harness, captures
//! stdout/stderr, and enforces the wall-clock deadline. It does not look at
//! exit codes or output; that is the decoder's job.
//!
//! On Unix the child leads its own process group, and the whole group is
//! killed when the call ends, so background processes a script starts can
//! neither hold the output pipes open past the deadline nor outlive the call.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::Instant;

use super::config::ExecutionConfig;
use super::harness::HarnessArtifact;
use super::outcome::{ProcessOutput, RunResult, ScriptError};

/// Launches harnesses with a given interpreter.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    python_bin: String,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(python_bin: impl Into<String>, max_output_bytes: usize) -> Self {
        Self {
            python_bin: python_bin.into(),
            max_output_bytes,
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(config.python_bin.clone(), config.max_output_bytes)
    }

    /// Run `artifact` in `working_dir`, killing it once `timeout` elapses.
    ///
    /// The deadline covers both the child's exit and draining its output, so
    /// the call returns within `timeout` even if a descendant keeps the pipes
    /// open. Takes ownership of the artifact and drops it (removing it from
    /// disk) only after the child has exited or been killed, on every path.
    pub async fn run(
        &self,
        artifact: HarnessArtifact,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<RunResult, ScriptError> {
        let mut cmd = Command::new(&self.python_bin);
        cmd.args(artifact.args())
            .current_dir(working_dir)
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Covers the caller dropping this future mid-run.
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let deadline = start + timeout;

        let mut child = cmd.spawn().map_err(|source| ScriptError::Spawn {
            program: self.python_bin.clone(),
            source,
        })?;
        let group = ProcessGroup::of(&child);

        tracing::debug!(
            pid = child.id(),
            script = %artifact.script_path().display(),
            harness_dir = %artifact.dir().display(),
            "Harness process started"
        );

        // Drain both pipes concurrently so a chatty child cannot block on a
        // full pipe while we wait on it.
        let limit = self.max_output_bytes as u64;
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let mut stdout_task = tokio::spawn(async move { read_stream(stdout_handle, limit).await });
        let mut stderr_task = tokio::spawn(async move { read_stream(stderr_handle, limit).await });

        let finished = tokio::time::timeout_at(deadline, async {
            let status = child.wait().await?;
            let stdout_bytes = (&mut stdout_task).await.unwrap_or_default();
            let stderr_bytes = (&mut stderr_task).await.unwrap_or_default();
            Ok::<_, std::io::Error>((status, stdout_bytes, stderr_bytes))
        })
        .await;

        // Whatever happened, nothing the script started survives the call.
        group.kill();

        let result = match finished {
            Ok(Ok((status, stdout_bytes, stderr_bytes))) => {
                let elapsed = start.elapsed();
                let output = ProcessOutput {
                    exit_code: status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                };
                tracing::debug!(
                    exit_code = output.exit_code,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Harness process exited"
                );
                Ok(RunResult::Completed { output, elapsed })
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                Err(ScriptError::Io(e))
            }
            Err(_elapsed) => {
                // The direct child may already have exited while a descendant
                // held the pipes; killing it then is a no-op.
                if let Err(e) = child.kill().await {
                    tracing::debug!(error = %e, "Harness process already gone at deadline");
                }
                stdout_task.abort();
                stderr_task.abort();
                let elapsed = start.elapsed();
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Harness process killed after deadline"
                );
                Ok(RunResult::TimedOut { timeout, elapsed })
            }
        };

        drop(artifact);
        result
    }
}

/// The process group led by a spawned harness.
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn of(child: &tokio::process::Child) -> Self {
        Self { pgid: child.id() }
    }

    /// SIGKILL every member of the group. A group with no members left is
    /// not an error.
    #[cfg(unix)]
    fn kill(&self) {
        let Some(pgid) = self.pgid.and_then(|id| libc::pid_t::try_from(id).ok()) else {
            return;
        };
        // SAFETY: killpg only sends a signal; it touches no memory of ours.
        let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                tracing::warn!(pgid, error = %err, "Failed to kill harness process group");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

/// Read an entire output stream into a byte buffer, capped at `limit` bytes.
///
/// Anything past the cap is read and discarded so the child never stalls on
/// a full pipe.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>, limit: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(limit).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
