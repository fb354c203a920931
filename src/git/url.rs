//! URL normalization for git operations
//!
//! This module handles:
//! - Normalizing SSH URLs from SCP-style to ssh:// format
//! - Normalizing file:// URLs for libgit2 compatibility

use std::borrow::Cow;
use std::path::Path;

/// Whether the URL points at the local filesystem (shallow fetches are not
/// supported by libgit2's local transport)
pub fn is_local_url(url: &str) -> bool {
    url.starts_with("file://") || url.starts_with('/') || Path::new(url).is_absolute()
}

/// Normalize SSH URLs from SCP-style (git@host:path) to ssh:// format.
///
/// libgit2 may have issues with SCP-style SSH URLs, so we convert them to
/// the explicit ssh:// format.
pub fn normalize_ssh_url(url: &str) -> Cow<'_, str> {
    if !url.starts_with("git@") {
        return Cow::Borrowed(url);
    }

    match url.split_once(':') {
        Some((host_part, path_part)) => {
            let path = path_part.strip_prefix('/').unwrap_or(path_part);
            Cow::Owned(format!("ssh://{host_part}/{path}"))
        }
        None => Cow::Borrowed(url),
    }
}

/// Normalize file:// URLs so libgit2 can resolve them on Unix.
pub fn normalize_file_url(url: &str) -> Cow<'_, str> {
    let Some(after) = url.strip_prefix("file://") else {
        return Cow::Borrowed(url);
    };
    if after.contains('\\') {
        return Cow::Owned(format!("file:///{}", after.replace('\\', "/")));
    }
    if !after.is_empty() && !after.starts_with('/') {
        return Cow::Owned(format!("file:///{after}"));
    }
    Cow::Borrowed(url)
}
