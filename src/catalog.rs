//! Catalog (index.yaml) aggregation and output

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::manifest::Manifest;

/// Default catalog location, relative to the current directory
pub const DEFAULT_CATALOG_PATH: &str = "site/data/index.yaml";

/// Public-facing summary of one plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub repository: String,
    pub maintainer: String,
    pub summary: String,
    pub output: bool,
}

impl From<&Manifest> for CatalogEntry {
    fn from(manifest: &Manifest) -> Self {
        Self {
            name: manifest.name.clone(),
            repository: manifest.repository.clone(),
            maintainer: manifest.maintainer.clone(),
            summary: manifest.summary.clone(),
            output: manifest.output,
        }
    }
}

/// Serialize `entries` to `path`, replacing any existing file.
///
/// The whole document is rendered before the file is truncated; an I/O error
/// during the write itself can still leave a partial file.
pub fn write_catalog(entries: &[CatalogEntry], path: &Path) -> Result<()> {
    let write_error = |reason: String| IndexError::Write {
        path: path.display().to_string(),
        reason,
    };

    let yaml = serde_yaml::to_string(entries).map_err(|e| write_error(e.to_string()))?;
    fs::write(path, yaml).map_err(|e| write_error(e.to_string()))?;

    tracing::debug!(path = %path.display(), entries = entries.len(), "wrote catalog");
    Ok(())
}
