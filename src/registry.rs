//! Registry walk: turn the registry directory into catalog entries
//!
//! Each file under the registry directory points at one plugin's source. The
//! walker fetches every source into its own workspace, loads the manifest
//! found there and projects it into a [`CatalogEntry`]. The first failure of
//! any entry aborts the whole walk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::cancel::Cancellation;
use crate::catalog::CatalogEntry;
use crate::error::{IndexError, Result, Stage};
use crate::fetcher::Fetcher;
use crate::manifest::{ManifestValidator, decode_yaml, load_manifest};
use crate::progress::ProgressDisplay;
use crate::workspace::Workspace;

/// Pointer file in the registry directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub repository: String,
}

impl RegistryEntry {
    /// Read and decode a registry entry file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| IndexError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let entry: Self = decode_yaml(&content, path)?;

        let blank = |value: &str| value.trim().is_empty();
        if blank(&entry.name) || blank(&entry.repository) {
            return Err(IndexError::Decode {
                path: path.display().to_string(),
                reason: "name and repository must not be empty".to_string(),
            });
        }
        Ok(entry)
    }
}

/// List every entry file under `registry_dir` in lexical path order
pub fn entry_files(registry_dir: &Path) -> Result<Vec<PathBuf>> {
    let walk_error = |reason: String| IndexError::Walk {
        path: registry_dir.display().to_string(),
        reason,
    };

    if !registry_dir.is_dir() {
        return Err(walk_error("not a directory".to_string()));
    }

    WalkDir::new(registry_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) => Some(Ok(entry.into_path())),
            Err(e) => Some(Err(walk_error(e.to_string()))),
        })
        .collect()
}

/// Drives fetch, load and projection for every registry entry
pub struct Walker<'a> {
    fetcher: &'a Fetcher,
    validator: &'a ManifestValidator,
    working_dir: PathBuf,
    workspace_base: Option<PathBuf>,
    cancel: Cancellation,
}

impl<'a> Walker<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        validator: &'a ManifestValidator,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            validator,
            working_dir: working_dir.into(),
            workspace_base: None,
            cancel: Cancellation::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Create workspaces under `base` instead of the system temp directory
    #[allow(dead_code)] // Used by tests
    pub fn with_workspace_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.workspace_base = Some(base.into());
        self
    }

    /// Build catalog entries for every file under `registry_dir`, in
    /// enumeration order. Stops at the first failing entry.
    pub fn build_catalog(&self, registry_dir: &Path) -> Result<Vec<CatalogEntry>> {
        let files = entry_files(registry_dir)?;
        tracing::debug!(count = files.len(), registry = %registry_dir.display(), "found registry entries");

        let progress = ProgressDisplay::new(files.len() as u64);
        let mut catalog = Vec::with_capacity(files.len());

        for file in &files {
            progress.start_entry(&file.display().to_string());
            match self.process(file) {
                Ok(entry) => {
                    catalog.push(entry);
                    progress.inc();
                }
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            }
        }

        progress.finish();
        Ok(catalog)
    }

    fn process(&self, file: &Path) -> Result<CatalogEntry> {
        let context = file.display().to_string();

        let entry = RegistryEntry::from_file(file).map_err(|e| e.in_entry(&context, Stage::Decode))?;

        if self.cancel.is_cancelled() {
            return Err(IndexError::Cancelled {
                locator: entry.repository,
            }
            .in_entry(&context, Stage::Fetch));
        }

        tracing::info!(
            "Downloading the plugin '{}' from {}",
            entry.name,
            entry.repository
        );

        let workspace = match &self.workspace_base {
            Some(base) => Workspace::create_in(base),
            None => Workspace::create(),
        }
        .map_err(|e| e.in_entry(&context, Stage::Fetch))?;

        let destination = workspace.destination();
        self.fetcher
            .fetch(&entry.repository, &destination, &self.working_dir, &self.cancel)
            .map_err(|e| e.in_entry(&context, Stage::Fetch))?;

        let manifest = load_manifest(&destination, self.validator)
            .map_err(|e| e.in_entry(&context, Stage::Load))?;
        tracing::debug!(plugin = %manifest.name, version = ?manifest.version, "manifest validated");

        if let Err(e) = workspace.release() {
            tracing::warn!(error = %e, "failed to release workspace");
        }

        Ok(CatalogEntry::from(&manifest))
    }
}

#[cfg(test)]
mod tests;
