//! Per-document lock files for the directory store.
//!
//! A document's compare-and-swap (read version, compare, write) is only atomic
//! if no other writer interleaves. Writers on one machine, or on a shared
//! filesystem, serialize through a lock file next to the documents:
//! `<store>/.locks/<id>.lock`.
//!
//! Lock files are created with **create_new** semantics, so exactly one
//! process holds a given lock. The file carries JSON metadata (owner, pid,
//! creation time, action) so a held lock can be explained and a lock left
//! behind by a crashed writer can be recognized as stale and taken over.
//!
//! Locks are released by an RAII guard. A failed release is logged, never
//! a panic.

use crate::error::{PinboardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory (inside the store root) holding lock files.
pub const LOCKS_DIR: &str = ".locks";

/// Lock metadata stored in lock files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Timestamp when the lock was created (RFC3339).
    pub created_at: DateTime<Utc>,

    /// The store operation being performed (update/delete).
    pub action: String,
}

impl LockMetadata {
    /// Create new lock metadata with the current timestamp.
    pub fn new(action: &str) -> Self {
        Self {
            owner: owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    /// Parse lock metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PinboardError::LockError(format!(
                "failed to read lock file '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            PinboardError::LockError(format!(
                "failed to parse lock file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Serialize lock metadata to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            PinboardError::LockError(format!("failed to serialize lock metadata: {}", e))
        })
    }

    /// Age of the lock relative to `now`. Clock skew never yields a negative age.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.created_at)
            .max(chrono::Duration::zero())
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age_at(Utc::now());
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();

        if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Whether the lock is older than `threshold` at `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match chrono::Duration::from_std(threshold) {
            Ok(threshold) => self.age_at(now) > threshold,
            Err(_) => false,
        }
    }
}

fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// RAII guard for a lock file.
///
/// When dropped, the lock file is deleted.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

/// Acquire a lock file using create_new semantics.
///
/// Fails with `LockError` if the file already exists and is not stale. A
/// stale lock (older than `stale_after`, or unreadable and older than
/// `stale_after` by mtime) is removed and acquisition is retried once.
pub fn acquire_lock(lock_path: &Path, action: &str, stale_after: Duration) -> Result<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            PinboardError::LockError(format!(
                "failed to create locks directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let metadata = LockMetadata::new(action);
    match try_create(lock_path, &metadata) {
        Err(LockAttempt::Held) if is_stale(lock_path, stale_after) => {
            tracing::warn!(lock = %lock_path.display(), "removing stale lock");
            let _ = fs::remove_file(lock_path);
            try_create(lock_path, &metadata).map_err(|a| a.into_error(lock_path))
        }
        other => other.map_err(|a| a.into_error(lock_path)),
    }
}

/// Acquire the lock for one document in a store directory.
pub fn acquire_document_lock(
    store_root: &Path,
    doc_id: &str,
    action: &str,
    stale_after: Duration,
) -> Result<LockGuard> {
    acquire_lock(&document_lock_path(store_root, doc_id), action, stale_after)
}

/// `<store_root>/.locks/<id>.lock`
pub fn document_lock_path(store_root: &Path, doc_id: &str) -> PathBuf {
    store_root.join(LOCKS_DIR).join(format!("{}.lock", doc_id))
}

enum LockAttempt {
    Held,
    Failed(String),
}

impl LockAttempt {
    fn into_error(self, lock_path: &Path) -> PinboardError {
        match self {
            LockAttempt::Held => {
                let holder = match LockMetadata::from_file(lock_path) {
                    Ok(meta) => format!(
                        " (held by {} for {}, action: {})",
                        meta.owner,
                        meta.age_string(),
                        meta.action
                    ),
                    Err(_) => String::new(),
                };
                PinboardError::LockError(format!(
                    "lock '{}' is held by another process{}",
                    lock_path.display(),
                    holder
                ))
            }
            LockAttempt::Failed(msg) => PinboardError::LockError(msg),
        }
    }
}

fn try_create(lock_path: &Path, metadata: &LockMetadata) -> std::result::Result<LockGuard, LockAttempt> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                LockAttempt::Held
            } else {
                LockAttempt::Failed(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = metadata
        .to_json()
        .map_err(|e| LockAttempt::Failed(e.to_string()))?;

    if let Err(e) = file.write_all(json.as_bytes()).and_then(|_| file.sync_all()) {
        let _ = fs::remove_file(lock_path);
        return Err(LockAttempt::Failed(format!(
            "failed to write lock metadata: {}",
            e
        )));
    }

    Ok(LockGuard::new(lock_path.to_path_buf()))
}

fn is_stale(lock_path: &Path, stale_after: Duration) -> bool {
    match LockMetadata::from_file(lock_path) {
        Ok(meta) => meta.is_stale_at(Utc::now(), stale_after),
        // Half-written or foreign lock file: fall back to its mtime.
        Err(_) => fs::metadata(lock_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > stale_after),
    }
}
