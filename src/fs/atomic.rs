//! Atomic file replacement.
//!
//! Every write follows the same pattern:
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! A poller listing the store directory therefore sees either the previous
//! document or the new one, never a truncated file. Source and destination
//! must be on the same filesystem for the rename to be atomic. A crash can
//! leave a `.{filename}.{pid}.tmp` file behind; store listings skip it.

use crate::error::{PinboardError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            PinboardError::StoreError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        PinboardError::StoreError(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })?;

    // Persist the directory entry as well; best effort.
    #[cfg(unix)]
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Temporary sibling path: `.{filename}.{pid}.tmp`.
///
/// The pid keeps two processes writing the same target from sharing a temp file.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            PinboardError::StoreError(format!("invalid file path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.{}.tmp", filename, std::process::id())))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        PinboardError::StoreError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            PinboardError::StoreError(format!(
                "failed to write temporary file '{}': {}",
                path.display(),
                e
            ))
        })
}
