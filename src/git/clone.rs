//! Repository cloning

use std::path::Path;

use git2::{FetchOptions, RemoteCallbacks, Repository, build::RepoBuilder};

use super::auth::setup_auth_callbacks;
use super::error::interpret_git_error;
use super::url::{is_local_url, normalize_file_url, normalize_ssh_url};
use crate::cancel::Cancellation;
use crate::error::{IndexError, Result};

/// Options for [`clone`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneOptions {
    /// History depth for remote URLs; `None` fetches full history.
    /// Ignored for local URLs, which libgit2 cannot fetch shallowly.
    pub depth: Option<i32>,
}

/// Clone a git repository into `target`, which must not exist yet.
///
/// The transfer aborts as soon as `cancel` fires; the caller is responsible
/// for removing whatever was written to `target`.
pub fn clone(
    url: &str,
    target: &Path,
    options: CloneOptions,
    cancel: &Cancellation,
) -> Result<Repository> {
    let mut callbacks = RemoteCallbacks::new();
    setup_auth_callbacks(&mut callbacks);
    callbacks.transfer_progress(|_| !cancel.is_cancelled());

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    if let Some(depth) = options.depth {
        if !is_local_url(url) {
            fetch_options.depth(depth);
        }
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    let url_to_clone = normalize_ssh_url(url);
    let url_to_clone = normalize_file_url(&url_to_clone);
    tracing::debug!(url = %url_to_clone, depth = ?options.depth, "cloning");

    builder.clone(url_to_clone.as_ref(), target).map_err(|e| {
        if cancel.is_cancelled() {
            IndexError::Cancelled {
                locator: url.to_string(),
            }
        } else {
            IndexError::Fetch {
                locator: url.to_string(),
                reason: interpret_git_error(&e),
            }
        }
    })
}
