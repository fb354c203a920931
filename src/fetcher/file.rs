//! Local filesystem protocol handler
//!
//! Accepts `file://` URLs, absolute paths, and any other scheme-less source,
//! which is treated as a path relative to the working directory. Registered
//! last so git shorthands and SCP-style URLs are claimed first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::Protocol;
use super::locator::scheme;
use crate::cancel::Cancellation;
use crate::error::{IndexError, Result};
use crate::fs::{CopyOptions, copy_dir_recursive};

#[derive(Debug, Default, Clone, Copy)]
pub struct FileProtocol;

fn to_path(source: &str, working_dir: &Path) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

impl Protocol for FileProtocol {
    fn name(&self) -> &'static str {
        "file"
    }

    fn detect(&self, source: &str, working_dir: &Path) -> Option<String> {
        let path = match scheme(source) {
            Some("file") => {
                let rest = source.trim_start_matches("file://");
                to_path(rest, working_dir)
            }
            Some(_) => return None,
            None if source.starts_with("git@") => return None,
            None => to_path(source, working_dir),
        };
        Some(path.display().to_string())
    }

    fn fetch(&self, source: &str, destination: &Path, cancel: &Cancellation) -> Result<()> {
        let path = Path::new(source);
        let failed = |reason: String| IndexError::Fetch {
            locator: source.to_string(),
            reason,
        };

        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => failed(format!("{} does not exist", path.display())),
            _ => failed(format!("cannot access {}: {e}", path.display())),
        })?;

        let copied = if metadata.is_dir() {
            copy_dir_recursive(path, destination, &CopyOptions::exclude_git(), cancel)
        } else {
            let file_name = path
                .file_name()
                .ok_or_else(|| failed(format!("{} has no file name", path.display())))?;
            fs::create_dir_all(destination)
                .and_then(|()| fs::copy(path, destination.join(file_name)).map(|_| ()))
        };

        copied.map_err(|e| {
            if cancel.is_cancelled() {
                IndexError::Cancelled {
                    locator: source.to_string(),
                }
            } else {
                failed(format!("failed to copy {}: {e}", path.display()))
            }
        })
    }
}
