//! HTTP(S) archive protocol handler
//!
//! Downloads a tar or tar.gz archive and unpacks it into the destination.
//! When the archive is used whole and every entry sits under one top-level
//! directory (as in GitHub source archives), that directory is stripped.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use flate2::read::GzDecoder;
use tar::Archive;

use super::Protocol;
use super::locator::{join_query, scheme, split_query};
use crate::cancel::Cancellation;
use crate::error::{IndexError, Result};

/// Request timeout used when the run has no deadline
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Cap on the downloaded archive size
const MAX_ARCHIVE_SIZE: u64 = 256 * 1024 * 1024;

/// Cap on each decompressed archive entry
const MAX_ENTRY_SIZE: u64 = 100 * 1024 * 1024;

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Tar,
    TarGz,
}

impl ArchiveFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "tar" => Some(Self::Tar),
            "tar.gz" | "tgz" => Some(Self::TarGz),
            _ => None,
        }
    }

    fn from_path(path: &str) -> Option<Self> {
        let path = path.to_ascii_lowercase();
        if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if path.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpProtocol {
    user_agent: String,
}

impl Default for HttpProtocol {
    fn default() -> Self {
        Self {
            user_agent: format!("plugin-index/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn fetch_error(source: &str, reason: impl Into<String>) -> IndexError {
    IndexError::Fetch {
        locator: source.to_string(),
        reason: reason.into(),
    }
}

/// Check if bytes start with the gzip magic number (0x1f 0x8b)
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x1f, 0x8b])
}

/// Split the `archive` parameter off the query, returning the URL to request
/// and the archive format
fn resolve_format(source: &str) -> Result<(String, ArchiveFormat)> {
    let (base, params) = split_query(source);
    let (archive, rest): (Vec<_>, Vec<_>) = params.into_iter().partition(|(k, _)| k == "archive");

    let format = match archive.last() {
        Some((_, name)) => ArchiveFormat::from_name(name)
            .ok_or_else(|| fetch_error(source, format!("unsupported archive format '{name}'")))?,
        None => ArchiveFormat::from_path(base)
            .ok_or_else(|| fetch_error(source, "cannot determine archive format"))?,
    };

    let url = match join_query(&rest) {
        Some(query) => format!("{base}?{query}"),
        None => base.to_string(),
    };
    Ok((url, format))
}

/// How often a waiting fetch re-checks its cancellation token
const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl HttpProtocol {
    /// Download `url` on a worker thread, returning as soon as the body is
    /// complete or `cancel` fires. A cancelled worker is left to hit its own
    /// client timeout; it owns nothing on disk.
    fn download(&self, url: &str, source: &str, cancel: &Cancellation) -> Result<Vec<u8>> {
        let timeout = cancel.remaining().unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(IndexError::Cancelled {
                locator: source.to_string(),
            });
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(timeout)
            .build()
            .map_err(|e| fetch_error(source, format!("failed to build HTTP client: {e}")))?;

        let (tx, rx) = mpsc::channel();
        let request = client.get(url);
        let worker_source = source.to_string();
        let worker_cancel = cancel.clone();
        thread::spawn(move || {
            let _ = tx.send(read_body(request, &worker_source, &worker_cancel));
        });

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(body) => {
                    let body = body?;
                    tracing::debug!(url, bytes = body.len(), "downloaded archive");
                    return Ok(body);
                }
                Err(RecvTimeoutError::Timeout) if cancel.is_cancelled() => {
                    return Err(IndexError::Cancelled {
                        locator: source.to_string(),
                    });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(fetch_error(source, "download worker exited unexpectedly"));
                }
            }
        }
    }
}

/// Send `request` and read the whole body, enforcing the size cap
fn read_body(
    request: reqwest::blocking::RequestBuilder,
    source: &str,
    cancel: &Cancellation,
) -> Result<Vec<u8>> {
    let cancelled_or = |err: IndexError| {
        if cancel.is_cancelled() {
            IndexError::Cancelled {
                locator: source.to_string(),
            }
        } else {
            err
        }
    };

    let mut response = request
        .send()
        .map_err(|e| cancelled_or(fetch_error(source, format!("request failed: {e}"))))?
        .error_for_status()
        .map_err(|e| fetch_error(source, e.to_string()))?;

    if response
        .content_length()
        .is_some_and(|len| len > MAX_ARCHIVE_SIZE)
    {
        return Err(fetch_error(
            source,
            format!("archive larger than {MAX_ARCHIVE_SIZE} bytes"),
        ));
    }

    let mut body = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled {
                locator: source.to_string(),
            });
        }
        let read = response
            .read(&mut chunk)
            .map_err(|e| cancelled_or(fetch_error(source, format!("failed to read body: {e}"))))?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
        if body.len() as u64 > MAX_ARCHIVE_SIZE {
            return Err(fetch_error(
                source,
                format!("archive larger than {MAX_ARCHIVE_SIZE} bytes"),
            ));
        }
    }
    Ok(body)
}

/// Unpack a tar stream into `destination`, refusing entries that would land
/// outside it
fn unpack<R: Read>(
    reader: R,
    destination: &Path,
    source: &str,
    cancel: &Cancellation,
) -> Result<()> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(false);
    #[cfg(unix)]
    archive.set_unpack_xattrs(false);

    let entries = archive
        .entries()
        .map_err(|e| fetch_error(source, format!("failed to read archive entries: {e}")))?;

    for entry in entries {
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled {
                locator: source.to_string(),
            });
        }

        let mut entry =
            entry.map_err(|e| fetch_error(source, format!("failed to read archive entry: {e}")))?;

        if entry.size() > MAX_ENTRY_SIZE {
            return Err(fetch_error(
                source,
                format!(
                    "archive entry too large ({} bytes, max {MAX_ENTRY_SIZE} bytes)",
                    entry.size()
                ),
            ));
        }

        let path = entry
            .path()
            .map_err(|e| fetch_error(source, format!("invalid path in archive: {e}")))?
            .into_owned();
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes {
            return Err(fetch_error(
                source,
                format!("archive entry {} escapes the destination", path.display()),
            ));
        }

        let unpacked = entry.unpack_in(destination).map_err(|e| {
            fetch_error(source, format!("failed to unpack {}: {e}", path.display()))
        })?;
        if !unpacked {
            return Err(fetch_error(
                source,
                format!("archive entry {} escapes the destination", path.display()),
            ));
        }
    }
    Ok(())
}

/// Replace `destination` with its only child when that child is a directory
fn strip_single_top_level(destination: &Path) -> io::Result<()> {
    let mut entries = fs::read_dir(destination)?.collect::<io::Result<Vec<_>>>()?;
    if entries.len() != 1 || !entries[0].file_type()?.is_dir() {
        return Ok(());
    }
    let Some(inner) = entries.pop().map(|e| e.path()) else {
        return Ok(());
    };

    let mut shell = destination.as_os_str().to_owned();
    shell.push(".unpacked");
    let shell = Path::new(&shell);

    fs::rename(destination, shell)?;
    let inner_in_shell = shell.join(inner.strip_prefix(destination).unwrap_or(&inner));
    fs::rename(inner_in_shell, destination)?;
    fs::remove_dir_all(shell)
}

impl Protocol for HttpProtocol {
    fn name(&self) -> &'static str {
        "http"
    }

    fn accepts_forced(&self, forced: &str) -> bool {
        matches!(forced, "http" | "https")
    }

    fn detect(&self, source: &str, _working_dir: &Path) -> Option<String> {
        if !matches!(scheme(source), Some("http" | "https")) {
            return None;
        }
        let (base, params) = split_query(source);
        let is_archive = ArchiveFormat::from_path(base).is_some()
            || params.iter().any(|(k, _)| k == "archive");
        is_archive.then(|| source.to_string())
    }

    fn fetch(&self, source: &str, destination: &Path, cancel: &Cancellation) -> Result<()> {
        let (url, format) = resolve_format(source)?;
        let body = self.download(&url, source, cancel)?;

        fs::create_dir_all(destination).map_err(|e| {
            fetch_error(
                source,
                format!("failed to create {}: {e}", destination.display()),
            )
        })?;

        if format == ArchiveFormat::TarGz || is_gzip(&body) {
            unpack(GzDecoder::new(body.as_slice()), destination, source, cancel)
        } else {
            unpack(body.as_slice(), destination, source, cancel)
        }
    }

    fn normalize_tree(&self, source: &str, tree: &Path) -> Result<()> {
        strip_single_top_level(tree)
            .map_err(|e| fetch_error(source, format!("failed to arrange archive contents: {e}")))
    }
}
