//! Ephemeral per-entry workspace
//!
//! Each registry entry gets a fresh directory under the system temp location.
//! The directory is removed when the [`Workspace`] is dropped, so every exit
//! path of the walker (success, validation failure, fetch failure, panic
//! unwinding) releases it.

use std::env;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{IndexError, Result};

const WORKSPACE_PREFIX: &str = "plugin-index-";

/// Directory name inside the workspace that receives the fetched source tree
const SOURCE_DIR: &str = "source";

/// Returns a directory path suitable for creating temporary directories.
/// Never returns a relative path, so a relative TMPDIR cannot place workspaces
/// under the current working directory.
pub fn temp_dir_base() -> PathBuf {
    let t = env::temp_dir();
    if t.is_absolute() {
        t
    } else {
        #[cfg(windows)]
        {
            env::var("TEMP")
                .or_else(|_| env::var("TMP"))
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("C:\\Windows\\Temp"))
        }
        #[cfg(not(windows))]
        {
            PathBuf::from("/tmp")
        }
    }
}

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Allocate a new workspace under [`temp_dir_base`]
    pub fn create() -> Result<Self> {
        Self::create_in(&temp_dir_base())
    }

    /// Allocate a new workspace under `base`
    pub fn create_in(base: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(base)
            .map_err(|e| IndexError::IoError {
                message: format!("Failed to create workspace in {}: {e}", base.display()),
            })?;
        tracing::debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fixed location inside the workspace the fetcher materializes into.
    /// It does not exist until a fetch creates it.
    pub fn destination(&self) -> PathBuf {
        self.dir.path().join(SOURCE_DIR)
    }

    /// Remove the workspace now, reporting failure instead of ignoring it
    pub fn release(self) -> Result<()> {
        let path = self.path().display().to_string();
        self.dir.close().map_err(|e| IndexError::IoError {
            message: format!("Failed to remove workspace {path}: {e}"),
        })?;
        tracing::debug!(%path, "released workspace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_base_is_absolute() {
        assert!(temp_dir_base().is_absolute());
    }

    #[test]
    fn test_workspace_created_with_prefix() {
        let base = TempDir::new().unwrap();
        let workspace = Workspace::create_in(base.path()).unwrap();

        assert!(workspace.path().is_dir());
        let name = workspace.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(WORKSPACE_PREFIX));
    }

    #[test]
    fn test_destination_does_not_exist_yet() {
        let base = TempDir::new().unwrap();
        let workspace = Workspace::create_in(base.path()).unwrap();

        let dst = workspace.destination();
        assert!(dst.starts_with(workspace.path()));
        assert!(!dst.exists());
    }

    #[test]
    fn test_release_removes_directory() {
        let base = TempDir::new().unwrap();
        let workspace = Workspace::create_in(base.path()).unwrap();
        std::fs::create_dir_all(workspace.destination().join("nested")).unwrap();
        let path = workspace.path().to_path_buf();

        workspace.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let base = TempDir::new().unwrap();
        let path = {
            let workspace = Workspace::create_in(base.path()).unwrap();
            std::fs::write(workspace.path().join("file"), "x").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_create_in_missing_base_fails() {
        let base = TempDir::new().unwrap();
        let missing = base.path().join("does-not-exist");
        let err = Workspace::create_in(&missing).unwrap_err();
        assert!(matches!(err, IndexError::IoError { .. }));
    }
}
