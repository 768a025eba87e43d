//! In-process document store.

use super::{Document, DocumentStore, NewDocument, TimeWindow, new_document_id, sort_for_listing};
use crate::error::{PinboardError, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Document store kept in memory. Shared between threads behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn docs(&self) -> Result<MutexGuard<'_, BTreeMap<String, Document>>> {
        self.docs
            .lock()
            .map_err(|_| PinboardError::StoreError("memory store mutex poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn list(&self, window: &TimeWindow) -> Result<Vec<Document>> {
        let docs = self.docs()?;
        let mut listed: Vec<Document> = docs
            .values()
            .filter(|d| window.intersects(&d.schedule))
            .cloned()
            .collect();
        sort_for_listing(&mut listed);
        Ok(listed)
    }

    fn get(&self, id: &str) -> Result<Document> {
        self.docs()?
            .get(id)
            .cloned()
            .ok_or_else(|| PinboardError::NotFound(id.to_string()))
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
        self.docs()?.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    fn update(&self, doc: &Document) -> Result<Document> {
        let mut docs = self.docs()?;
        let stored = docs
            .get_mut(&doc.id)
            .ok_or_else(|| PinboardError::NotFound(doc.id.clone()))?;

        if stored.version != doc.version {
            return Err(PinboardError::Conflict {
                id: doc.id.clone(),
                expected: doc.version,
                actual: stored.version,
            });
        }

        stored.title = doc.title.clone();
        stored.body = doc.body.clone();
        stored.schedule = doc.schedule;
        stored.version += 1;
        Ok(stored.clone())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.docs()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PinboardError::NotFound(id.to_string()))
    }
}
