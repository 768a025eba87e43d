//! Tasking protocol carried over document titles and bodies.
//!
//! - **Codec**: encodes a task's target and command into a document title
//! - **Dispatch**: decides whether the local agent should run a task
//! - **Ledger**: appends and recovers per-host output blocks in a shared body
//!
//! Everything here is pure string logic. Store access lives in `store`, and
//! the polling loop that ties it together lives in `agent::scheduler`.

pub mod codec;
pub mod dispatch;
pub mod ledger;

pub use codec::{
    TargetSpec, TaskTitle, TitleForm, decode_title, encode_title, parse_exec_argument,
};
pub use dispatch::should_execute;
pub use ledger::{
    LedgerScan, append_block, decode_all, encode_block, executed_hosts, has_any_report,
    has_reported, is_valid_host_id, scan,
};
