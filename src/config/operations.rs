//! Config loading, validation, and derived values.

use super::defaults::DEFAULT_CONFIG_FILE;
use super::model::Config;
use crate::error::{PinboardError, Result};
use crate::logging::LoggerConfig;
use crate::store::DirStore;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            PinboardError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Resolve the config for a command invocation.
    ///
    /// An explicit path must exist. Without one, `pinboard.yaml` in the
    /// working directory is used if present, otherwise the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                PinboardError::UserError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            PinboardError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `title_prefix` must be non-blank and single-line
    /// - `poll_interval_ms` and `poll_horizon_hours` must be positive
    /// - `max_write_attempts` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.title_prefix.trim().is_empty() {
            return Err(invalid("title_prefix must not be empty"));
        }

        if self.title_prefix.contains('\n') || self.title_prefix.contains('\r') {
            return Err(invalid("title_prefix must be a single line"));
        }

        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be greater than 0"));
        }

        if self.poll_horizon_hours == 0 {
            return Err(invalid("poll_horizon_hours must be greater than 0"));
        }

        if self.max_write_attempts == 0 {
            return Err(invalid("max_write_attempts must be greater than 0"));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_horizon(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.poll_horizon_hours))
    }

    pub fn list_lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.list_lookback_hours))
    }

    pub fn task_start_delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.task_start_delay_secs))
    }

    pub fn task_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.task_duration_minutes))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// `None` when commands may run indefinitely.
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs)
    }

    /// Directory store described by this config.
    pub fn open_store(&self) -> DirStore {
        DirStore::new(&self.store_dir, self.lock_stale_after())
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            level: self.log_level.clone(),
            format: self.log_format,
            with_targets: false,
        }
    }
}

fn invalid(reason: &str) -> PinboardError {
    PinboardError::UserError(format!("config validation failed: {}", reason))
}
