//! Process-wide logging setup.
//!
//! Diagnostics go through `tracing` and are written to stderr, keeping
//! stdout free for operator-facing output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text logs.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log format: {0}")]
    InvalidFormat(String),

    #[error("invalid log level '{level}': {reason}")]
    InvalidLevel { level: String, reason: String },

    #[error("logger already initialized")]
    AlreadyInitialized,
}

/// Logger settings, usually taken from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// `EnvFilter` directive, e.g. `info` or `pinboard=debug,warn`.
    pub level: String,
    pub format: LogFormat,
    pub with_targets: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            with_targets: false,
        }
    }
}

impl LoggerConfig {
    /// Build the filter. `RUST_LOG`, when set, wins over the configured level.
    pub fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        if let Ok(directive) = std::env::var(EnvFilter::DEFAULT_ENV)
            && !directive.trim().is_empty()
        {
            return EnvFilter::try_new(&directive).map_err(|e| LoggerError::InvalidLevel {
                level: directive,
                reason: e.to_string(),
            });
        }
        EnvFilter::try_new(&self.level).map_err(|e| LoggerError::InvalidLevel {
            level: self.level.clone(),
            reason: e.to_string(),
        })
    }
}

/// Install the global subscriber.
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = cfg.env_filter()?;

    match cfg.format {
        LogFormat::Text => {
            let layer = tfmt::layer()
                .with_writer(std::io::stderr)
                .with_target(cfg.with_targets);
            init_subscriber(tracing_subscriber::registry().with(filter).with(layer))
        }
        LogFormat::Json => {
            let layer = tfmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(std::io::stderr)
                .with_target(cfg.with_targets);
            init_subscriber(tracing_subscriber::registry().with(filter).with(layer))
        }
    }
}

fn init_subscriber<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" text ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!(matches!(
            "journald".parse::<LogFormat>(),
            Err(LoggerError::InvalidFormat(_))
        ));
    }

    #[test]
    fn format_round_trips_through_yaml() {
        let format: LogFormat = serde_yaml::from_str("json").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(format.to_string(), "json");
    }

    #[test]
    #[serial]
    fn invalid_level_is_rejected() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::remove_var(EnvFilter::DEFAULT_ENV) };
        let cfg = LoggerConfig {
            level: "pinboard=verbose".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            cfg.env_filter(),
            Err(LoggerError::InvalidLevel { .. })
        ));
    }

    #[test]
    #[serial]
    fn second_init_reports_already_initialized() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::remove_var(EnvFilter::DEFAULT_ENV) };
        let cfg = LoggerConfig::default();

        // Another test may have installed a subscriber first; either way the
        // second call must fail.
        let _ = init_logger(&cfg);
        assert!(matches!(
            init_logger(&cfg),
            Err(LoggerError::AlreadyInitialized)
        ));
    }
}
