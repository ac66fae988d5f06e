//! Per-call harness generation.
//!
//! A harness is a private temporary directory holding a fixed wrapper
//! program (`harness.py`) and the caller's payload (`payload.json`). The
//! wrapper receives the target script path and the payload path as
//! command-line arguments, so user data never becomes program text.
//!
//! The directory is removed when the [`HarnessArtifact`] is dropped.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::TempDir;

use super::outcome::ScriptError;

/// Prefix of every harness directory created under the harness root.
pub const HARNESS_DIR_PREFIX: &str = "scriptbox-harness-";

const WRAPPER_FILE: &str = "harness.py";
const PAYLOAD_FILE: &str = "payload.json";

/// Wrapper program run by the interpreter.
///
/// Exits non-zero with a message on stderr when the script has no callable
/// `main`. Prints at most one line of JSON, and nothing when `main` returns
/// `None`.
const WRAPPER_SOURCE: &str = r#"import importlib.util
import json
import sys
from pathlib import Path


def _run(script_path, payload_path):
    script = Path(script_path).resolve()
    sys.path.insert(0, str(script.parent))

    spec = importlib.util.spec_from_file_location("user_script", str(script))
    if spec is None or spec.loader is None:
        sys.stderr.write("Cannot load script from %s\n" % script)
        return 1
    module = importlib.util.module_from_spec(spec)
    spec.loader.exec_module(module)

    entry = getattr(module, "main", None)
    if not callable(entry):
        sys.stderr.write("Script must contain a 'main' function\n")
        return 1

    with open(payload_path, encoding="utf-8") as fh:
        data = json.load(fh)

    result = entry(data)
    if result is not None:
        sys.stdout.write(json.dumps(result, ensure_ascii=False))
        sys.stdout.write("\n")
    return 0


if __name__ == "__main__":
    sys.exit(_run(sys.argv[1], sys.argv[2]))
"#;

/// A generated, self-contained runnable unit for one execution.
///
/// Owns its temporary directory; dropping the artifact deletes it.
#[derive(Debug)]
pub struct HarnessArtifact {
    dir: TempDir,
    script_path: PathBuf,
}

impl HarnessArtifact {
    /// Directory holding the wrapper and payload.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn wrapper_path(&self) -> PathBuf {
        self.dir.path().join(WRAPPER_FILE)
    }

    pub fn payload_path(&self) -> PathBuf {
        self.dir.path().join(PAYLOAD_FILE)
    }

    /// The target script this harness drives.
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Interpreter arguments: wrapper, target script, payload file.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            self.wrapper_path().into_os_string(),
            self.script_path.clone().into_os_string(),
            self.payload_path().into_os_string(),
        ]
    }
}

/// Builds [`HarnessArtifact`]s under a fixed root directory.
#[derive(Debug, Clone)]
pub struct HarnessBuilder {
    root: PathBuf,
}

impl HarnessBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a uniquely named harness for `script_location` carrying
    /// `payload`.
    pub fn build(
        &self,
        script_location: &Path,
        payload: &Map<String, Value>,
    ) -> Result<HarnessArtifact, ScriptError> {
        let dir = tempfile::Builder::new()
            .prefix(HARNESS_DIR_PREFIX)
            .tempdir_in(&self.root)
            .map_err(ScriptError::BuilderIo)?;

        let payload_json = serde_json::to_vec(payload)
            .map_err(|e| ScriptError::BuilderIo(std::io::Error::other(e)))?;

        fs::write(dir.path().join(WRAPPER_FILE), WRAPPER_SOURCE).map_err(ScriptError::BuilderIo)?;
        fs::write(dir.path().join(PAYLOAD_FILE), payload_json).map_err(ScriptError::BuilderIo)?;

        let script_path = script_location
            .canonicalize()
            .unwrap_or_else(|_| script_location.to_path_buf());

        tracing::debug!(
            harness_dir = %dir.path().display(),
            script = %script_path.display(),
            "Harness artifact created"
        );

        Ok(HarnessArtifact { dir, script_path })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
