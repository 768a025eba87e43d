//! Configuration model for pinboard.
//!
//! This module defines the Config struct that represents `pinboard.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.

mod defaults;
mod model;
mod operations;


pub use defaults::DEFAULT_CONFIG_FILE;
pub use model::Config;
