//! Document store abstraction.
//!
//! A document is the only transport between controller and agents: a short
//! `title` holding the encoded task and a free-text `body` holding the output
//! ledger. Scheduling fields bound which documents an agent polls.
//!
//! Updates are compare-and-swap on [`Document::version`]: a writer submits the
//! version it read, and the store refuses the write with
//! [`PinboardError::Conflict`](crate::error::PinboardError::Conflict) if anyone
//! else wrote in between. This closes the lost-update window of a plain
//! read-modify-write on the shared body.

mod dir;
mod memory;

pub use dir::DirStore;
pub use memory::MemoryStore;

use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time span during which a document is visible to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Schedule {
    /// Schedule starting `delay` from `now` and ending `duration` from `now`.
    pub fn starting_in(now: DateTime<Utc>, delay: Duration, duration: Duration) -> Self {
        Self {
            start: now + delay,
            end: now + duration,
        }
    }
}

/// Listing filter. Open bounds are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Every document regardless of schedule.
    pub fn all() -> Self {
        Self::default()
    }

    /// `[from, from + span)`.
    pub fn between(from: DateTime<Utc>, span: Duration) -> Self {
        Self {
            start: Some(from),
            end: Some(from + span),
        }
    }

    /// `[from, unbounded)`.
    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            start: Some(from),
            end: None,
        }
    }

    /// Whether a document scheduled at `schedule` is visible in this window.
    pub fn intersects(&self, schedule: &Schedule) -> bool {
        let after_start = self.start.is_none_or(|start| schedule.end > start);
        let before_end = self.end.is_none_or(|end| schedule.start < end);
        after_start && before_end
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque id assigned by the store.
    pub id: String,
    /// Encoded task. Never rewritten after creation.
    pub title: String,
    /// Free text plus appended output blocks.
    pub body: String,
    pub schedule: Schedule,
    /// Bumped by the store on every successful update.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a document.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub body: String,
    pub schedule: Schedule,
}

/// Operations every document store provides.
pub trait DocumentStore: Send + Sync {
    /// Documents whose schedule intersects `window`, ordered by start then id.
    fn list(&self, window: &TimeWindow) -> Result<Vec<Document>>;

    /// Fetch one document by exact id.
    fn get(&self, id: &str) -> Result<Document>;

    /// Create a document and return it with its assigned id and version.
    fn create(&self, new: NewDocument) -> Result<Document>;

    /// Replace the title and body of `doc.id` if the stored version still
    /// equals `doc.version`. Returns the stored document with its new version.
    fn update(&self, doc: &Document) -> Result<Document>;

    /// Delete a document by exact id.
    fn delete(&self, id: &str) -> Result<()>;
}

/// Fresh opaque document id.
pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Order used by every `list` implementation.
pub(crate) fn sort_for_listing(docs: &mut [Document]) {
    docs.sort_by(|a, b| {
        a.schedule
            .start
            .cmp(&b.schedule.start)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn schedule(start: u32, end: u32) -> Schedule {
        Schedule {
            start: at(start),
            end: at(end),
        }
    }

    #[test]
    fn unbounded_window_sees_everything() {
        assert!(TimeWindow::all().intersects(&schedule(1, 2)));
    }

    #[test]
    fn window_intersection_is_half_open() {
        let window = TimeWindow::between(at(10), Duration::hours(2));

        assert!(window.intersects(&schedule(9, 11)));
        assert!(window.intersects(&schedule(11, 13)));
        assert!(window.intersects(&schedule(8, 14)));

        // Ends exactly at window start, or starts exactly at window end.
        assert!(!window.intersects(&schedule(8, 10)));
        assert!(!window.intersects(&schedule(12, 13)));
    }

    #[test]
    fn since_window_has_no_upper_bound() {
        let window = TimeWindow::since(at(10));
        assert!(window.intersects(&schedule(20, 21)));
        assert!(!window.intersects(&schedule(5, 9)));
    }

    #[test]
    fn schedule_starting_in_offsets_from_now() {
        let s = Schedule::starting_in(at(10), Duration::minutes(1), Duration::minutes(30));
        assert_eq!(s.start, at(10) + Duration::minutes(1));
        assert_eq!(s.end, at(10) + Duration::minutes(30));
    }

    #[test]
    fn document_ids_are_unique_hex() {
        let a = new_document_id();
        let b = new_document_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
