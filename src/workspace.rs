//! Request-scoped staging directory.
//!
//! A [`Workspace`] is created before any download starts and removed exactly
//! once: by an explicit [`Workspace::cleanup`] or, failing that, on drop.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "patent-bundle-";

/// Errors from workspace lifecycle operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The staging directory could not be created.
    #[error("failed to create workspace under {parent}: {source}")]
    Create {
        /// Directory the workspace was to be created in.
        parent: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The staging directory could not be removed.
    #[error("failed to remove workspace {path}: {source}")]
    Cleanup {
        /// Workspace directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Exclusively owned temporary directory for one request.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Creates a workspace in the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Create`] if the directory cannot be created.
    pub fn create() -> Result<Self, WorkspaceError> {
        Self::create_in(&std::env::temp_dir())
    }

    /// Creates a workspace inside `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Create`] if the directory cannot be created.
    pub fn create_in(parent: &Path) -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)
            .map_err(|source| WorkspaceError::Create {
                parent: parent.to_path_buf(),
                source,
            })?;
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "workspace created");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Workspace directory. Still returned after cleanup, but no longer exists.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true until the workspace has been cleaned up.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.dir.is_some()
    }

    /// Removes the directory and everything in it.
    ///
    /// Idempotent. A directory that is already gone counts as removed.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Cleanup`] if removal fails for any other reason.
    pub fn cleanup(&mut self) -> Result<(), WorkspaceError> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        match dir.close() {
            Ok(()) => {
                debug!(path = %self.path.display(), "workspace removed");
                Ok(())
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(WorkspaceError::Cleanup {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(error) = self.cleanup() {
            warn!(error = %error, "workspace cleanup on drop failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_uses_prefix() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::create_in(parent.path()).unwrap();
        assert!(workspace.path().is_dir());
        assert!(workspace.is_active());
        let name = workspace.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(WORKSPACE_PREFIX), "unexpected name {name}");
    }

    #[test]
    fn test_cleanup_removes_contents_and_is_idempotent() {
        let parent = tempfile::tempdir().unwrap();
        let mut workspace = Workspace::create_in(parent.path()).unwrap();
        std::fs::write(workspace.path().join("000_US1.pdf"), b"%PDF").unwrap();
        let path = workspace.path().to_path_buf();

        workspace.cleanup().unwrap();
        assert!(!path.exists());
        assert!(!workspace.is_active());
        workspace.cleanup().unwrap();
    }

    #[test]
    fn test_cleanup_tolerates_already_removed_directory() {
        let parent = tempfile::tempdir().unwrap();
        let mut workspace = Workspace::create_in(parent.path()).unwrap();
        std::fs::remove_dir_all(workspace.path()).unwrap();
        workspace.cleanup().unwrap();
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::create_in(parent.path()).unwrap();
        let path = workspace.path().to_path_buf();
        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn test_create_in_missing_parent_fails() {
        let parent = tempfile::tempdir().unwrap();
        let missing = parent.path().join("does-not-exist");
        assert!(matches!(
            Workspace::create_in(&missing),
            Err(WorkspaceError::Create { .. })
        ));
    }
}
