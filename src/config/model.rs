//! Config struct definition and default implementation.

use super::defaults::*;
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};

/// Configuration shared by the controller commands and the agent.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Store settings
    // =========================================================================
    /// Directory holding document files.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Seconds after which a document lock left behind by a crashed writer
    /// may be taken over.
    #[serde(default = "default_lock_stale_secs")]
    pub lock_stale_secs: u64,

    // =========================================================================
    // Protocol settings
    // =========================================================================
    /// Marker every task title starts with. Controller and agents must agree.
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,

    // =========================================================================
    // Agent settings
    // =========================================================================
    /// Milliseconds between poll passes.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How far ahead of now a document may be scheduled and still be polled.
    #[serde(default = "default_poll_horizon_hours")]
    pub poll_horizon_hours: u32,

    /// Attempts at writing a report back before giving up for this pass.
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    /// Seconds after which a running shell command is killed. 0 disables.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Delay between replying to `exit` and stopping the agent.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    // =========================================================================
    // Controller settings
    // =========================================================================
    /// How far back `list` looks for task documents.
    #[serde(default = "default_list_lookback_hours")]
    pub list_lookback_hours: u32,

    /// Offset from now at which a new task document's schedule starts.
    #[serde(default = "default_task_start_delay_secs")]
    pub task_start_delay_secs: u32,

    /// Offset from now at which a new task document's schedule ends.
    #[serde(default = "default_task_duration_minutes")]
    pub task_duration_minutes: u32,

    // =========================================================================
    // Logging settings
    // =========================================================================
    /// `EnvFilter` directive. `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            lock_stale_secs: default_lock_stale_secs(),
            title_prefix: default_title_prefix(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_horizon_hours: default_poll_horizon_hours(),
            max_write_attempts: default_max_write_attempts(),
            command_timeout_secs: default_command_timeout_secs(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            list_lookback_hours: default_list_lookback_hours(),
            task_start_delay_secs: default_task_start_delay_secs(),
            task_duration_minutes: default_task_duration_minutes(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}
