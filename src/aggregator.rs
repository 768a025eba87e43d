//! Controller-side view of task documents.
//!
//! Creates task documents and summarizes what agents have written back into
//! them. Rendering for the operator lives in `commands`.

use crate::error::Result;
use crate::protocol::{
    TaskTitle, TargetSpec, decode_title, encode_title, executed_hosts, has_any_report, scan,
};
use crate::store::{Document, DocumentStore, NewDocument, Schedule, TimeWindow};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Whether any agent has answered a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Pending,
    ExecutedBy(BTreeSet<String>),
}

/// One row of `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub id: String,
    pub task: TaskTitle,
    pub state: ExecutionState,
}

/// Everything recorded against one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub id: String,
    pub title: String,
    /// Closed output blocks by host.
    pub outputs: BTreeMap<String, String>,
    /// Hosts whose block was never closed and therefore cannot be shown.
    pub discarded: Vec<String>,
}

/// Result of [`Aggregator::purge_executed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub deleted: usize,
    pub failed: usize,
}

/// Timing for newly created task documents and listing lookback.
#[derive(Debug, Clone, Copy)]
pub struct TaskTiming {
    pub start_delay: Duration,
    pub duration: Duration,
    pub lookback: Duration,
}

impl TaskTiming {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            start_delay: config.task_start_delay(),
            duration: config.task_duration(),
            lookback: config.list_lookback(),
        }
    }
}

pub struct Aggregator {
    store: Arc<dyn DocumentStore>,
    prefix: String,
    timing: TaskTiming,
}

impl Aggregator {
    pub fn new(store: Arc<dyn DocumentStore>, prefix: impl Into<String>, timing: TaskTiming) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            timing,
        }
    }

    /// Create a task document for `command` addressed to `target`.
    pub fn submit(&self, now: DateTime<Utc>, target: &TargetSpec, command: &str) -> Result<Document> {
        let doc = self.store.create(NewDocument {
            title: encode_title(&self.prefix, target, command),
            body: String::new(),
            schedule: Schedule::starting_in(now, self.timing.start_delay, self.timing.duration),
        })?;
        tracing::debug!(doc = %doc.id, target = %target, "task submitted");
        Ok(doc)
    }

    /// Task documents scheduled within the lookback, with who has answered.
    pub fn list_tasks(&self, now: DateTime<Utc>) -> Result<Vec<TaskStatus>> {
        let docs = self.store.list(&TimeWindow::since(now - self.timing.lookback))?;

        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let task = decode_title(&self.prefix, &doc.title)?;
                let hosts = executed_hosts(&doc.body);
                let state = if hosts.is_empty() {
                    ExecutionState::Pending
                } else {
                    ExecutionState::ExecutedBy(hosts)
                };
                Some(TaskStatus {
                    id: doc.id,
                    task,
                    state,
                })
            })
            .collect())
    }

    /// Outputs of the first document whose id starts with `id_prefix`.
    ///
    /// Any document qualifies, task or not. `None` if nothing matches.
    pub fn get_output(&self, id_prefix: &str) -> Result<Option<TaskOutput>> {
        let docs = self.store.list(&TimeWindow::all())?;

        Ok(docs
            .into_iter()
            .find(|doc| doc.id.starts_with(id_prefix))
            .map(|doc| {
                let ledger = scan(&doc.body);
                TaskOutput {
                    id: doc.id,
                    title: doc.title,
                    outputs: ledger.outputs,
                    discarded: ledger.discarded,
                }
            }))
    }

    /// Delete every document carrying at least one output block.
    ///
    /// Blunt by design of the protocol: one report from any host is enough,
    /// even if other targeted hosts have not answered. Individual delete
    /// failures are logged and counted, not fatal.
    pub fn purge_executed(&self) -> Result<PurgeSummary> {
        let docs = self.store.list(&TimeWindow::all())?;
        let mut summary = PurgeSummary::default();

        for doc in docs.iter().filter(|d| has_any_report(&d.body)) {
            match self.store.delete(&doc.id) {
                Ok(()) => summary.deleted += 1,
                Err(e) => {
                    tracing::warn!(doc = %doc.id, error = %e, "failed to delete document");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
