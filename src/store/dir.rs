//! Directory-backed document store.
//!
//! Each document is one file, `<root>/<id>.md`, in frontmatter form:
//!
//! ```text
//! ---
//! id: 3f2a...
//! title: 'pinboard: @web01:uptime'
//! schedule:
//!   start: 2026-03-01T10:01:00Z
//!   end: 2026-03-01T10:30:00Z
//! version: 2
//! created_at: 2026-03-01T10:00:00Z
//! ---
//! <body, byte for byte>
//! ```
//!
//! Files are replaced atomically, so a concurrent `list` never reads a torn
//! document. Updates and deletes take the document's lock file first, which
//! makes the version compare-and-swap hold across processes sharing the
//! directory.

use super::{
    Document, DocumentStore, NewDocument, Schedule, TimeWindow, new_document_id, sort_for_listing,
};
use crate::error::{PinboardError, Result};
use crate::fs::atomic_write_file;
use crate::locks::acquire_document_lock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DOCUMENT_EXT: &str = "md";
const DELIMITER: &str = "---";

/// Header stored above the body of every document file.
#[derive(Debug, Serialize, Deserialize)]
struct DocumentHeader {
    id: String,
    title: String,
    schedule: Schedule,
    version: u64,
    created_at: DateTime<Utc>,
}

/// Document store rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    lock_stale_after: Duration,
}

impl DirStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new<P: Into<PathBuf>>(root: P, lock_stale_after: Duration) -> Self {
        Self {
            root: root.into(),
            lock_stale_after,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_document_id(id) {
            return Err(PinboardError::NotFound(id.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", id, DOCUMENT_EXT)))
    }

    fn load(&self, id: &str) -> Result<Document> {
        let path = self.document_path(id)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PinboardError::NotFound(id.to_string())
            } else {
                PinboardError::StoreError(format!(
                    "failed to read document '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;

        let doc = parse_document(&content)?;
        if doc.id != id {
            return Err(PinboardError::StoreError(format!(
                "document '{}' declares id '{}'",
                path.display(),
                doc.id
            )));
        }
        Ok(doc)
    }

    fn save(&self, doc: &Document) -> Result<()> {
        let path = self.document_path(&doc.id)?;
        atomic_write_file(path, &render_document(doc)?)
    }
}

impl DocumentStore for DirStore {
    fn list(&self, window: &TimeWindow) -> Result<Vec<Document>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PinboardError::StoreError(format!(
                    "failed to read store directory '{}': {}",
                    self.root.display(),
                    e
                )));
            }
        };

        let mut docs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PinboardError::StoreError(format!("failed to read store directory entry: {}", e))
            })?;
            let path = entry.path();

            let Some(id) = document_id_from_path(&path) else {
                continue;
            };

            match self.load(&id) {
                Ok(doc) if window.intersects(&doc.schedule) => docs.push(doc),
                Ok(_) => {}
                // Deleted between read_dir and load.
                Err(PinboardError::NotFound(_)) => {}
                Err(e) => tracing::warn!(doc = %id, error = %e, "skipping unreadable document"),
            }
        }

        sort_for_listing(&mut docs);
        Ok(docs)
    }

    fn get(&self, id: &str) -> Result<Document> {
        self.load(id)
    }

    fn create(&self, new: NewDocument) -> Result<Document> {
        let doc = Document {
            id: new_document_id(),
            title: new.title,
            body: new.body,
            schedule: new.schedule,
            version: 1,
            created_at: Utc::now(),
        };
        self.save(&doc)?;
        tracing::debug!(doc = %doc.id, "document created");
        Ok(doc)
    }

    fn update(&self, doc: &Document) -> Result<Document> {
        self.document_path(&doc.id)?;
        let _lock = acquire_document_lock(&self.root, &doc.id, "update", self.lock_stale_after)?;

        let stored = self.load(&doc.id)?;
        if stored.version != doc.version {
            return Err(PinboardError::Conflict {
                id: doc.id.clone(),
                expected: doc.version,
                actual: stored.version,
            });
        }

        let updated = Document {
            title: doc.title.clone(),
            body: doc.body.clone(),
            schedule: doc.schedule,
            version: stored.version + 1,
            ..stored
        };
        self.save(&updated)?;
        tracing::debug!(doc = %updated.id, version = updated.version, "document updated");
        Ok(updated)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.document_path(id)?;
        let _lock = acquire_document_lock(&self.root, id, "delete", self.lock_stale_after)?;

        fs::remove_file(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PinboardError::NotFound(id.to_string())
            } else {
                PinboardError::StoreError(format!(
                    "failed to delete document '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;
        tracing::debug!(doc = %id, "document deleted");
        Ok(())
    }
}

/// Ids become file names, so only a conservative alphabet is accepted.
fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `<root>/<id>.md` -> `id`. Hidden files (atomic-write temporaries) are skipped.
fn document_id_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXT) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') || !is_valid_document_id(stem) {
        return None;
    }
    Some(stem.to_string())
}

fn render_document(doc: &Document) -> Result<String> {
    let header = DocumentHeader {
        id: doc.id.clone(),
        title: doc.title.clone(),
        schedule: doc.schedule,
        version: doc.version,
        created_at: doc.created_at,
    };
    let yaml = serde_yaml::to_string(&header).map_err(|e| {
        PinboardError::StoreError(format!("failed to serialize document header: {}", e))
    })?;

    let mut output = String::with_capacity(yaml.len() + doc.body.len() + 8);
    output.push_str(DELIMITER);
    output.push('\n');
    output.push_str(&yaml);
    output.push_str(DELIMITER);
    output.push('\n');
    output.push_str(&doc.body);
    Ok(output)
}

fn parse_document(content: &str) -> Result<Document> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
        .ok_or_else(|| {
            PinboardError::StoreError(
                "document must start with '---' header delimiter".to_string(),
            )
        })?;

    let (header_yaml, body) = split_header(rest).ok_or_else(|| {
        PinboardError::StoreError("document missing closing '---' header delimiter".to_string())
    })?;

    let header: DocumentHeader = serde_yaml::from_str(header_yaml).map_err(|e| {
        PinboardError::StoreError(format!("failed to parse document header: {}", e))
    })?;

    Ok(Document {
        id: header.id,
        title: header.title,
        body: body.to_string(),
        schedule: header.schedule,
        version: header.version,
        created_at: header.created_at,
    })
}

/// Split `rest` at the first line consisting only of `---`.
/// The body starts after that line's terminator and is returned untouched.
fn split_header(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let bare = line.trim_end_matches('\n').trim_end_matches('\r');
        if bare == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
