//! Script storage keyed by logical path.
//!
//! The orchestrator only needs [`ScriptRepository::resolve`]. The
//! filesystem-backed [`FsScriptRepository`] also implements the submission
//! side (store, list, delete) and serves stored source back to authors, so
//! the service runs without a database.
//!
//! Logical paths are `/`-separated names such as `geology/test.py`. They are
//! never joined onto the filesystem unchecked: every segment is vetted and
//! the resolved file must stay under the configured root.

use std::path::{Path, PathBuf};

use tokio::fs;

use super::config::ExecutionConfig;
use super::validator;
use crate::error::CoreError;

/// File and directory names that are never treated as scripts.
const SERVICE_NAMES: &[&str] = &["__pycache__", ".git", ".DS_Store"];

/// Extensions of editor/interpreter leftovers that are never listed.
const SERVICE_EXTENSIONS: &[&str] = &["pyc", "pyo", "pyd", "tmp", "swp", "bak"];

/// A stored script located for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScript {
    pub logical_path: String,
    /// Absolute, canonical location of the source file.
    pub storage_location: PathBuf,
    pub source_text: String,
}

/// Lookup of stored scripts by logical path.
pub trait ScriptRepository: Send + Sync {
    /// Resolve `logical_path` to an existing file with an allowed extension.
    ///
    /// Returns [`CoreError::NotFound`] when there is no such script.
    fn resolve(
        &self,
        logical_path: &str,
    ) -> impl std::future::Future<Output = Result<ResolvedScript, CoreError>> + Send;
}

/// Scripts stored as plain files under a root directory, the logical path
/// doubling as the relative file path.
#[derive(Debug, Clone)]
pub struct FsScriptRepository {
    config: ExecutionConfig,
}

impl FsScriptRepository {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.scripts_dir
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), CoreError> {
        fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    /// Validate and store `content` under `logical_path`.
    ///
    /// Refuses to overwrite an existing script unless `replace` is set. The
    /// file is written to a sibling temp file and renamed into place.
    pub async fn store(
        &self,
        logical_path: &str,
        content: &str,
        replace: bool,
    ) -> Result<ResolvedScript, CoreError> {
        let relative = parse_logical_path(logical_path).map_err(CoreError::Validation)?;

        if !self.config.is_allowed_extension(&relative) {
            return Err(CoreError::Validation(format!(
                "Script filename must have one of the extensions {}",
                self.config.allowed_extensions.join(", ")
            )));
        }

        let source = content.to_string();
        tokio::task::spawn_blocking(move || validator::check(&source))
            .await
            .map_err(|e| CoreError::Internal(format!("Validation task failed: {e}")))?
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let location = self.root().join(&relative);
        let exists = fs::try_exists(&location).await?;
        if exists && !replace {
            return Err(CoreError::Conflict(format!(
                "Script '{logical_path}' already exists. Use replace=true to replace it."
            )));
        }

        let parent = location
            .parent()
            .ok_or_else(|| CoreError::Validation(format!("Invalid script path '{logical_path}'")))?;
        fs::create_dir_all(parent).await?;
        self.ensure_confined(parent, logical_path)
            .await
            .map_err(|_| CoreError::Validation(format!("Invalid script path '{logical_path}'")))?;

        let file_name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("script");
        let staging = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&staging, content).await?;
        if let Err(e) = fs::rename(&staging, &location).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }

        tracing::info!(logical_path, replaced = exists, "Script stored");

        Ok(ResolvedScript {
            logical_path: logical_path.to_string(),
            storage_location: fs::canonicalize(&location).await?,
            source_text: content.to_string(),
        })
    }

    /// All stored scripts' logical paths, sorted.
    pub async fn list(&self) -> Result<Vec<String>, CoreError> {
        let mut found = Vec::new();
        let mut pending = vec![PathBuf::new()];

        while let Some(relative_dir) = pending.pop() {
            let mut entries = match fs::read_dir(self.root().join(&relative_dir)).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let relative = relative_dir.join(entry.file_name());
                if is_service_file(&relative) {
                    continue;
                }
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(relative);
                } else if file_type.is_file() && self.config.is_allowed_extension(&relative) {
                    if let Some(logical) = to_logical_path(&relative) {
                        found.push(logical);
                    }
                }
            }
        }

        found.sort();
        Ok(found)
    }

    /// Remove the script at `logical_path`.
    pub async fn delete(&self, logical_path: &str) -> Result<(), CoreError> {
        let resolved = self.resolve(logical_path).await?;
        fs::remove_file(&resolved.storage_location).await?;
        tracing::info!(logical_path, "Script deleted");
        Ok(())
    }

    /// Fail unless `path` (which must exist) lies under the root once
    /// symlinks are resolved.
    async fn ensure_confined(&self, path: &Path, logical_path: &str) -> Result<PathBuf, CoreError> {
        let root = fs::canonicalize(self.root()).await?;
        let canonical = fs::canonicalize(path).await?;
        if canonical.starts_with(&root) {
            Ok(canonical)
        } else {
            tracing::warn!(logical_path, "Script path escapes the scripts directory");
            Err(CoreError::NotFound(format!("Script '{logical_path}' not found")))
        }
    }
}

impl ScriptRepository for FsScriptRepository {
    async fn resolve(&self, logical_path: &str) -> Result<ResolvedScript, CoreError> {
        let not_found = || CoreError::NotFound(format!("Script '{logical_path}' not found"));

        let relative = parse_logical_path(logical_path).map_err(|_| not_found())?;
        let location = self.root().join(&relative);

        match fs::metadata(&location).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(not_found()),
        }

        if !self.config.is_allowed_extension(&relative) {
            return Err(CoreError::NotFound(format!(
                "Script '{logical_path}' has invalid extension. Allowed: {}",
                self.config.allowed_extensions.join(", ")
            )));
        }

        let storage_location = self.ensure_confined(&location, logical_path).await?;
        let source_text = fs::read_to_string(&storage_location)
            .await
            .map_err(|e| CoreError::Internal(format!("Cannot read script '{logical_path}': {e}")))?;

        Ok(ResolvedScript {
            logical_path: logical_path.to_string(),
            storage_location,
            source_text,
        })
    }
}

/// Turn a logical path into a relative filesystem path, rejecting anything
/// that is not a plain sequence of names.
pub fn parse_logical_path(logical_path: &str) -> Result<PathBuf, String> {
    if logical_path.is_empty() {
        return Err("Script path must not be empty".to_string());
    }

    let mut relative = PathBuf::new();
    for segment in logical_path.split('/') {
        let invalid = segment.is_empty()
            || segment == "."
            || segment == ".."
            || segment.contains(['\\', '\0']);
        if invalid {
            return Err(format!("Invalid script path '{logical_path}'"));
        }
        relative.push(segment);
    }
    Ok(relative)
}

fn to_logical_path(relative: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    parts.map(|p| p.join("/"))
}

fn is_service_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    if SERVICE_NAMES.contains(&name) {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SERVICE_EXTENSIONS.contains(&ext))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::scripting::test_helpers::write_script;

    const VALID: &str = "def main(data: dict) -> dict:\n    return data\n";

    fn repo(root: &Path) -> FsScriptRepository {
        FsScriptRepository::new(&ExecutionConfig::new(root))
    }

    #[test]
    fn parse_rejects_traversal() {
        assert!(parse_logical_path("geology/test.py").is_ok());
        for bad in ["", "/etc/passwd", "../x.py", "a/../../x.py", "a//b.py", "./a.py", "a\\b.py", "a/"] {
            assert!(parse_logical_path(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn resolve_existing_script() {
        let root = tempfile::tempdir().expect("root");
        write_script(root.path(), "geology/test.py", VALID);

        let resolved = repo(root.path())
            .resolve("geology/test.py")
            .await
            .expect("resolve");
        assert_eq!(resolved.logical_path, "geology/test.py");
        assert_eq!(resolved.source_text, VALID);
        assert!(resolved.storage_location.is_absolute());
        assert!(resolved.storage_location.ends_with("geology/test.py"));
    }

    #[tokio::test]
    async fn resolve_missing_and_traversal_are_not_found() {
        let root = tempfile::tempdir().expect("root");
        let repo = repo(root.path());
        assert_matches!(repo.resolve("nope.py").await, Err(CoreError::NotFound(_)));
        assert_matches!(repo.resolve("../etc/passwd").await, Err(CoreError::NotFound(_)));
        assert_matches!(repo.resolve("").await, Err(CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn resolve_directory_is_not_found() {
        let root = tempfile::tempdir().expect("root");
        std::fs::create_dir_all(root.path().join("folder.py")).expect("mkdir");
        assert_matches!(
            repo(root.path()).resolve("folder.py").await,
            Err(CoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn resolve_disallowed_extension() {
        let root = tempfile::tempdir().expect("root");
        write_script(root.path(), "run.sh", "echo hi\n");
        assert_matches!(
            repo(root.path()).resolve("run.sh").await,
            Err(CoreError::NotFound(msg)) if msg.contains("invalid extension")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_symlink_outside_root_is_not_found() {
        let outside = tempfile::tempdir().expect("outside");
        let root = tempfile::tempdir().expect("root");
        let target = write_script(outside.path(), "secret.py", VALID);
        std::os::unix::fs::symlink(&target, root.path().join("link.py")).expect("symlink");

        assert_matches!(
            repo(root.path()).resolve("link.py").await,
            Err(CoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn store_then_resolve() {
        let root = tempfile::tempdir().expect("root");
        let repo = repo(root.path());

        let stored = repo.store("geology/test.py", VALID, false).await.expect("store");
        assert_eq!(stored.logical_path, "geology/test.py");

        let resolved = repo.resolve("geology/test.py").await.expect("resolve");
        assert_eq!(resolved.source_text, VALID);
        assert_eq!(resolved.storage_location, stored.storage_location);
    }

    #[tokio::test]
    async fn store_rejects_invalid_source() {
        let root = tempfile::tempdir().expect("root");
        let result = repo(root.path())
            .store("bad.py", "def run(data):\n    pass\n", false)
            .await;
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("'main'"));
        assert!(!root.path().join("bad.py").exists());
    }

    #[tokio::test]
    async fn store_rejects_wrong_extension() {
        let root = tempfile::tempdir().expect("root");
        let result = repo(root.path()).store("bad.txt", VALID, false).await;
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn store_conflict_unless_replace() {
        let root = tempfile::tempdir().expect("root");
        let repo = repo(root.path());
        repo.store("a.py", VALID, false).await.expect("first store");

        assert_matches!(
            repo.store("a.py", VALID, false).await,
            Err(CoreError::Conflict(_))
        );

        let replacement = "def main(data):\n    return {\"v\": 2}\n";
        repo.store("a.py", replacement, true).await.expect("replace");
        let resolved = repo.resolve("a.py").await.expect("resolve");
        assert_eq!(resolved.source_text, replacement);
    }

    #[tokio::test]
    async fn list_skips_service_files() {
        let root = tempfile::tempdir().expect("root");
        write_script(root.path(), "b.py", VALID);
        write_script(root.path(), "geology/a.py", VALID);
        write_script(root.path(), "geology/__pycache__/a.cpython-312.pyc", "");
        write_script(root.path(), "notes.txt", "hello");
        write_script(root.path(), "old.py.bak", VALID);

        let listed = repo(root.path()).list().await.expect("list");
        assert_eq!(listed, vec!["b.py".to_string(), "geology/a.py".to_string()]);
    }

    #[tokio::test]
    async fn list_missing_root_is_empty() {
        let root = tempfile::tempdir().expect("root");
        let repo = repo(&root.path().join("missing"));
        assert!(repo.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let root = tempfile::tempdir().expect("root");
        let repo = repo(root.path());
        repo.store("gone.py", VALID, false).await.expect("store");

        repo.delete("gone.py").await.expect("delete");
        assert_matches!(repo.resolve("gone.py").await, Err(CoreError::NotFound(_)));
        assert_matches!(repo.delete("gone.py").await, Err(CoreError::NotFound(_)));
    }
}
