//! Protocol-agnostic source fetcher
//!
//! [`Fetcher::fetch`] materializes the content behind a locator into a
//! destination directory. The protocol is chosen by asking each registered
//! [`Protocol`] handler, in registration order, whether it recognizes the
//! locator; a `<name>::` prefix forces a specific handler instead.
//!
//! Built-in handlers:
//! - [`GitProtocol`]: git repositories over HTTPS, SSH and file://
//! - [`HttpProtocol`]: tar and tar.gz archives over HTTP(S)
//! - [`FileProtocol`]: local directories and files
//!
//! The destination is either absent or fully populated once `fetch` returns.

mod file;
mod git;
mod http;
mod locator;

use std::fs;
use std::path::{Path, PathBuf};

pub use file::FileProtocol;
pub use git::GitProtocol;
pub use http::HttpProtocol;
pub use locator::Locator;

use crate::cancel::Cancellation;
use crate::error::{IndexError, Result};
use crate::fs::{CopyOptions, copy_dir_recursive};
use crate::workspace::temp_dir_base;

/// A retrieval mechanism for one family of locators
pub trait Protocol {
    /// Handler name, also accepted as a forced `<name>::` prefix
    fn name(&self) -> &'static str;

    /// Whether a forced `<forced>::` prefix selects this handler
    fn accepts_forced(&self, forced: &str) -> bool {
        forced == self.name()
    }

    /// Return the normalized source this handler would fetch, or `None` when
    /// the source is not one it recognizes. The result may end in a
    /// `//subdir` suffix when a shorthand names a path inside the source.
    fn detect(&self, source: &str, working_dir: &Path) -> Option<String>;

    /// Materialize `source` into `destination`, which does not exist yet
    fn fetch(&self, source: &str, destination: &Path, cancel: &Cancellation) -> Result<()>;

    /// Rearrange a fetched tree that is used whole. Skipped when a `//subdir`
    /// selects part of the tree, so subdir paths address the raw layout.
    fn normalize_tree(&self, _source: &str, _tree: &Path) -> Result<()> {
        Ok(())
    }
}

/// Registry of protocol handlers
pub struct Fetcher {
    protocols: Vec<Box<dyn Protocol>>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::with_default_protocols()
    }
}

impl Fetcher {
    /// Fetcher with no handlers; every locator is unsupported until one is registered
    pub fn new() -> Self {
        Self {
            protocols: Vec::new(),
        }
    }

    /// Fetcher with the git, http and file handlers, tried in that order
    pub fn with_default_protocols() -> Self {
        let mut fetcher = Self::new();
        fetcher.register(GitProtocol);
        fetcher.register(HttpProtocol::default());
        fetcher.register(FileProtocol);
        fetcher
    }

    /// Append a handler; it is consulted after all previously registered ones
    pub fn register<P: Protocol + 'static>(&mut self, protocol: P) -> &mut Self {
        self.protocols.push(Box::new(protocol));
        self
    }

    /// Fetch `locator` into `destination`.
    ///
    /// `destination` must not exist. Relative local locators are resolved
    /// against `working_dir`. On failure nothing is left at `destination`.
    pub fn fetch(
        &self,
        locator: &str,
        destination: &Path,
        working_dir: &Path,
        cancel: &Cancellation,
    ) -> Result<()> {
        let parsed = Locator::parse(locator)?;

        if destination.exists() {
            return Err(IndexError::Fetch {
                locator: locator.to_string(),
                reason: format!("destination {} already exists", destination.display()),
            });
        }
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled {
                locator: locator.to_string(),
            });
        }

        let (protocol, detected) = self.select(&parsed, locator, working_dir)?;
        let (source, detected_subdir) = locator::split_subdir(&detected);
        let subdir = match (detected_subdir, parsed.subdir) {
            (Some(outer), Some(inner)) => Some(format!("{outer}/{inner}")),
            (outer, inner) => outer.or(inner),
        };
        if let Some(subdir) = &subdir {
            locator::validate_subdir(subdir, locator)?;
        }
        tracing::debug!(protocol = protocol.name(), %source, ?subdir, "selected protocol");

        let result = match &subdir {
            Some(subdir) => fetch_subdir(protocol, &source, subdir, destination, cancel, locator),
            None => protocol
                .fetch(&source, destination, cancel)
                .and_then(|()| protocol.normalize_tree(&source, destination)),
        };

        if result.is_err() && destination.exists() {
            if let Err(e) = fs::remove_dir_all(destination) {
                tracing::warn!(
                    path = %destination.display(),
                    error = %e,
                    "failed to remove partial fetch"
                );
            }
        }
        result
    }

    fn select(
        &self,
        parsed: &Locator,
        locator: &str,
        working_dir: &Path,
    ) -> Result<(&dyn Protocol, String)> {
        let unsupported = || IndexError::UnsupportedLocator {
            locator: locator.to_string(),
        };

        if let Some(forced) = &parsed.forced {
            let protocol = self
                .protocols
                .iter()
                .find(|p| p.accepts_forced(forced))
                .ok_or_else(unsupported)?;
            let source = protocol
                .detect(&parsed.source, working_dir)
                .unwrap_or_else(|| resolve_relative(&parsed.source, working_dir));
            return Ok((protocol.as_ref(), source));
        }

        self.protocols
            .iter()
            .find_map(|p| {
                p.detect(&parsed.source, working_dir)
                    .map(|source| (p.as_ref(), source))
            })
            .ok_or_else(unsupported)
    }
}

/// Resolve a scheme-less relative path against `working_dir`
fn resolve_relative(source: &str, working_dir: &Path) -> String {
    if locator::scheme(source).is_some() || Path::new(source).is_absolute() {
        return source.to_string();
    }
    working_dir.join(source).display().to_string()
}

/// Fetch the whole source into a staging directory, then copy only `subdir`
/// into `destination`
fn fetch_subdir(
    protocol: &dyn Protocol,
    source: &str,
    subdir: &str,
    destination: &Path,
    cancel: &Cancellation,
    locator: &str,
) -> Result<()> {
    let staging = tempfile::Builder::new()
        .prefix("plugin-index-staging-")
        .tempdir_in(temp_dir_base())
        .map_err(|e| IndexError::Fetch {
            locator: locator.to_string(),
            reason: format!("failed to create staging directory: {e}"),
        })?;
    let tree: PathBuf = staging.path().join("tree");
    protocol.fetch(source, &tree, cancel)?;

    let selected = tree.join(subdir);
    if !selected.is_dir() {
        return Err(IndexError::Fetch {
            locator: locator.to_string(),
            reason: format!("subdirectory '{subdir}' not found in fetched source"),
        });
    }

    copy_dir_recursive(&selected, destination, &CopyOptions::default(), cancel).map_err(|e| {
        if cancel.is_cancelled() {
            IndexError::Cancelled {
                locator: locator.to_string(),
            }
        } else {
            IndexError::Fetch {
                locator: locator.to_string(),
                reason: format!("failed to copy subdirectory '{subdir}': {e}"),
            }
        }
    })
}
