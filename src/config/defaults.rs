//! Default values for config fields.

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pinboard.yaml";

pub(crate) fn default_store_dir() -> String {
    ".pinboard/documents".to_string()
}
pub(crate) fn default_title_prefix() -> String {
    "pinboard:".to_string()
}
pub(crate) fn default_poll_interval_ms() -> u64 {
    10_000
}
pub(crate) fn default_poll_horizon_hours() -> u32 {
    24
}
pub(crate) fn default_list_lookback_hours() -> u32 {
    24
}
pub(crate) fn default_task_start_delay_secs() -> u32 {
    60
}
pub(crate) fn default_task_duration_minutes() -> u32 {
    30
}
pub(crate) fn default_max_write_attempts() -> u32 {
    3
}
pub(crate) fn default_shutdown_grace_ms() -> u64 {
    2_000
}
pub(crate) fn default_command_timeout_secs() -> u64 {
    0
}
pub(crate) fn default_lock_stale_secs() -> u64 {
    300
}
pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
