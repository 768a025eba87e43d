use crate::agent::executor::{CommandExecutor, host_header};
use crate::agent::shutdown::StopFlag;
use crate::error::{PinboardError, Result};
use crate::protocol::append_block;
use crate::store::{Document, DocumentStore, MemoryStore, NewDocument, Schedule, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Executor that records commands and answers from a script.
pub(crate) struct ScriptedExecutor {
    host_id: String,
    replies: HashMap<String, String>,
    stop_on: Option<(String, StopFlag)>,
    pub(crate) calls: Vec<String>,
}

impl ScriptedExecutor {
    pub(crate) fn new(host_id: &str) -> Self {
        Self {
            host_id: host_id.to_string(),
            replies: HashMap::new(),
            stop_on: None,
            calls: Vec::new(),
        }
    }

    pub(crate) fn reply(mut self, command: &str, output: &str) -> Self {
        self.replies.insert(command.to_string(), output.to_string());
        self
    }

    /// Request `stop` whenever `command` runs.
    pub(crate) fn stop_on(mut self, command: &str, stop: StopFlag) -> Self {
        self.stop_on = Some((command.to_string(), stop));
        self
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(&mut self, command: &str) -> String {
        self.calls.push(command.to_string());
        if let Some((trigger, stop)) = &self.stop_on
            && trigger == command
        {
            stop.request();
        }
        let output = self
            .replies
            .get(command)
            .cloned()
            .unwrap_or_else(|| format!("ran {}", command));
        format!("{}{}", host_header(&self.host_id), output)
    }
}

/// Schedule visible from `now` for the next half hour.
pub(crate) fn schedule_at(now: DateTime<Utc>) -> Schedule {
    Schedule {
        start: now + Duration::minutes(1),
        end: now + Duration::minutes(30),
    }
}

/// Create a document in `store` scheduled around `now`.
pub(crate) fn seed(
    store: &dyn DocumentStore,
    now: DateTime<Utc>,
    title: &str,
    body: &str,
) -> Document {
    store
        .create(NewDocument {
            title: title.to_string(),
            body: body.to_string(),
            schedule: schedule_at(now),
        })
        .unwrap()
}

/// Store wrapper that lets a competing host write first.
///
/// Before each of the next `races` updates, the competitor's block is
/// appended to the stored document, so the caller's update arrives stale.
pub(crate) struct ContendedStore {
    pub(crate) inner: Arc<MemoryStore>,
    competitor: String,
    races: Mutex<u32>,
    pub(crate) updates: Mutex<u32>,
}

impl ContendedStore {
    pub(crate) fn new(inner: Arc<MemoryStore>, competitor: &str, races: u32) -> Self {
        Self {
            inner,
            competitor: competitor.to_string(),
            races: Mutex::new(races),
            updates: Mutex::new(0),
        }
    }

    fn race(&self, id: &str) -> Result<()> {
        let mut races = self.races.lock().unwrap();
        if *races == 0 {
            return Ok(());
        }
        *races -= 1;

        let mut current = self.inner.get(id)?;
        current.body = append_block(&current.body, &self.competitor, "competing write");
        self.inner.update(&current)?;
        Ok(())
    }
}

impl DocumentStore for ContendedStore {
    fn list(&self, window: &TimeWindow) -> Result<Vec<Document>> {
        self.inner.list(window)
    }

    fn get(&self, id: &str) -> Result<Document> {
        self.inner.get(id)
    }

    fn create(&self, new: NewDocument) -> Result<Document> {
        self.inner.create(new)
    }

    fn update(&self, doc: &Document) -> Result<Document> {
        *self.updates.lock().unwrap() += 1;
        self.race(&doc.id)?;
        self.inner.update(doc)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id)
    }
}

/// Store whose every operation fails.
pub(crate) struct BrokenStore;

impl DocumentStore for BrokenStore {
    fn list(&self, _window: &TimeWindow) -> Result<Vec<Document>> {
        Err(PinboardError::StoreError("store unavailable".to_string()))
    }

    fn get(&self, id: &str) -> Result<Document> {
        Err(PinboardError::StoreError(format!("cannot read {}", id)))
    }

    fn create(&self, _new: NewDocument) -> Result<Document> {
        Err(PinboardError::StoreError("store unavailable".to_string()))
    }

    fn update(&self, doc: &Document) -> Result<Document> {
        Err(PinboardError::StoreError(format!("cannot write {}", doc.id)))
    }

    fn delete(&self, id: &str) -> Result<()> {
        Err(PinboardError::StoreError(format!("cannot delete {}", id)))
    }
}
