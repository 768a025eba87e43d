//! Stopping the agent loop.
//!
//! Two things can end a running agent: a termination signal from the OS, and
//! an `exit` task, which asks for a stop after a grace delay so the reply can
//! be written back first. Both end up setting a [`StopFlag`] that the poll
//! loop checks between documents and while it waits for the next tick.

use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Shared stop request.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    requested: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Request a stop on SIGINT or SIGTERM. In-flight commands are not
    /// interrupted; the loop notices the request at its next check.
    pub fn watch_signals(&self) -> std::io::Result<()> {
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.requested))?;
        }
        Ok(())
    }

    /// Sleep up to `duration` in short slices, returning early on a stop
    /// request. Returns `true` if stopped.
    pub fn sleep(&self, duration: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(100);

        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(SLICE.min(deadline - now));
        }
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// An action run on a background thread after a delay, unless cancelled.
pub struct DeferredShutdown;

impl DeferredShutdown {
    /// Run `action` once `delay` has elapsed. Dropping the returned handle
    /// does not cancel it.
    pub fn schedule<F>(delay: Duration, action: F) -> ShutdownHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(CancelState::default());
        let waiter = Arc::clone(&state);

        let thread = thread::spawn(move || {
            let guard = match waiter.cancelled.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let (guard, _) = match waiter.wake.wait_timeout_while(guard, delay, |c| !*c) {
                Ok(result) => result,
                Err(poisoned) => poisoned.into_inner(),
            };
            let cancelled = *guard;
            drop(guard);

            if !cancelled {
                action();
            }
            !cancelled
        });

        ShutdownHandle {
            state,
            thread: Some(thread),
        }
    }
}

/// Handle to a scheduled [`DeferredShutdown`].
#[derive(Debug)]
pub struct ShutdownHandle {
    state: Arc<CancelState>,
    thread: Option<JoinHandle<bool>>,
}

impl ShutdownHandle {
    /// Cancel the pending action. Returns `true` if it had not run yet.
    pub fn cancel(mut self) -> bool {
        {
            let mut cancelled = match self.state.cancelled.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *cancelled = true;
        }
        self.state.wake.notify_all();
        !self.join()
    }

    /// Block until the action has run or been cancelled. Returns `true` if it ran.
    pub fn wait(mut self) -> bool {
        self.join()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    fn join(&mut self) -> bool {
        match self.thread.take() {
            Some(thread) => thread.join().unwrap_or(false),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn stop_flag_clones_share_state() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!other.is_requested());

        flag.request();

        assert!(other.is_requested());
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn termination_signals_request_stop() {
        for signal in [SIGTERM, SIGINT] {
            let flag = StopFlag::new();
            flag.watch_signals().unwrap();
            assert!(!flag.is_requested());

            signal_hook::low_level::raise(signal).unwrap();

            let deadline = Instant::now() + Duration::from_secs(5);
            while !flag.is_requested() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            assert!(flag.is_requested(), "signal {} did not request a stop", signal);
        }
    }

    #[test]
    fn sleep_returns_early_when_requested() {
        let flag = StopFlag::new();
        flag.request();

        let started = Instant::now();
        assert!(flag.sleep(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn sleep_runs_full_duration_without_request() {
        let flag = StopFlag::new();

        let started = Instant::now();
        assert!(!flag.sleep(Duration::from_millis(150)));
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn deferred_action_runs_after_delay() {
        let flag = StopFlag::new();
        let target = flag.clone();

        let started = Instant::now();
        let handle = DeferredShutdown::schedule(Duration::from_millis(50), move || target.request());

        assert!(handle.wait());
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(flag.is_requested());
    }

    #[test]
    fn cancelled_action_never_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let handle = DeferredShutdown::schedule(Duration::from_secs(30), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let started = Instant::now();
        assert!(handle.cancel());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_after_firing_reports_false() {
        let handle = DeferredShutdown::schedule(Duration::ZERO, || {});
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!handle.cancel());
    }

    #[test]
    fn dropping_handle_does_not_cancel() {
        let flag = StopFlag::new();
        let target = flag.clone();

        drop(DeferredShutdown::schedule(Duration::from_millis(10), move || {
            target.request()
        }));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !flag.is_requested() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(flag.is_requested());
    }
}
