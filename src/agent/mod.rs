//! Agent side of the protocol.
//!
//! - `scheduler`: the poll loop that finds, runs and answers tasks
//! - `executor`: how a command is run on this host
//! - `shutdown`: stop flag, signal handling and the deferred stop used by `exit`

pub mod executor;
pub mod scheduler;
pub mod shutdown;

pub use executor::{CommandExecutor, ShellExecutor};
pub use scheduler::{PassSummary, PollScheduler, ReportOutcome, SchedulerSettings, TickSchedule};
pub use shutdown::{DeferredShutdown, ShutdownHandle, StopFlag};
