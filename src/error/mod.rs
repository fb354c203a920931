//! Error types and handling for plugin-index
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Variants are grouped by the pipeline stage that raises them:
//! - decode: malformed registry entries and manifests
//! - fetch: unreachable sources and unsupported locators
//! - validation: manifests missing required fields
//! - write: the catalog could not be produced
//!
//! [`IndexError::Entry`] wraps any of the above with the registry entry and
//! stage that failed, keeping the original error as its `source()`.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Pipeline stage a registry entry was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the registry entry file
    Decode,
    /// Materializing the plugin source
    Fetch,
    /// Loading and validating the plugin manifest
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Fetch => "fetch",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

/// Main error type for plugin-index operations
#[derive(Error, Diagnostic, Debug)]
pub enum IndexError {
    // Decode errors
    #[error("Failed to decode {path}: {reason}")]
    #[diagnostic(
        code(plugin_index::decode::failed),
        help("The file must be a non-empty YAML mapping")
    )]
    Decode { path: String, reason: String },

    // Fetch errors
    #[error("Failed to fetch {locator}: {reason}")]
    #[diagnostic(code(plugin_index::fetch::failed))]
    Fetch { locator: String, reason: String },

    #[error("Unsupported source locator: {locator}")]
    #[diagnostic(
        code(plugin_index::fetch::unsupported),
        help(
            "Supported forms: git::<url>, https://host/repo.git, git@host:repo.git, \
             github.com/owner/repo, https://host/archive.tar.gz, ./path, file:///path"
        )
    )]
    UnsupportedLocator { locator: String },

    #[error("Fetch of {locator} was cancelled")]
    #[diagnostic(
        code(plugin_index::fetch::cancelled),
        help("Raise --timeout if the source is slow to respond")
    )]
    Cancelled { locator: String },

    // Validation errors
    #[error("Manifest {path} is missing required fields: {}", fields.join(", "))]
    #[diagnostic(
        code(plugin_index::manifest::invalid),
        help("Required fields are name, repository, maintainer and summary")
    )]
    Validation { path: String, fields: Vec<String> },

    // Registry errors
    #[error("Failed to walk registry {path}: {reason}")]
    #[diagnostic(code(plugin_index::registry::walk_failed))]
    Walk { path: String, reason: String },

    #[error("Registry entry {entry} failed at {stage}")]
    #[diagnostic(code(plugin_index::registry::entry_failed))]
    Entry {
        entry: String,
        stage: Stage,
        #[source]
        source: Box<IndexError>,
    },

    // Write errors
    #[error("Failed to write catalog {path}: {reason}")]
    #[diagnostic(code(plugin_index::catalog::write_failed))]
    Write { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(plugin_index::fs::io_error))]
    IoError { message: String },
}

impl IndexError {
    /// Attach registry entry and stage context to an error
    pub fn in_entry(self, entry: impl Into<String>, stage: Stage) -> Self {
        IndexError::Entry {
            entry: entry.into(),
            stage,
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any entry context
    #[allow(dead_code)] // Used by tests
    pub fn root(&self) -> &IndexError {
        match self {
            IndexError::Entry { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, IndexError>;
