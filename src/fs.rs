//! Recursive directory copy used by the file protocol and subdir extraction

use std::fs;
use std::io;
use std::path::Path;

use crate::cancel::Cancellation;

#[derive(Default, Clone)]
pub struct CopyOptions {
    pub exclude: Vec<String>,
}

impl CopyOptions {
    pub fn exclude_git() -> Self {
        Self {
            exclude: vec![".git".to_string()],
        }
    }

    fn is_excluded(&self, name: &std::ffi::OsStr) -> bool {
        self.exclude.iter().any(|excluded| name == excluded.as_str())
    }
}

/// Copy `src` into `dst` recursively, creating `dst` when missing.
///
/// Fails with [`io::ErrorKind::Interrupted`] once `cancel` fires. Symlinks are
/// followed for files; symlinked directories are skipped to avoid cycles.
pub fn copy_dir_recursive(
    src: &Path,
    dst: &Path,
    options: &CopyOptions,
    cancel: &Cancellation,
) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    let mut entries = fs::read_dir(src)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        if cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "copy cancelled"));
        }

        let file_name = entry.file_name();
        if options.is_excluded(&file_name) {
            continue;
        }

        let src_path = entry.path();
        let dst_path = dst.join(&file_name);
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path, options, cancel)?;
        } else if file_type.is_symlink() && src_path.is_dir() {
            tracing::debug!(path = %src_path.display(), "skipping symlinked directory");
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
