//! Pinboard: store-and-poll tasking over shared title/body documents.
//!
//! This is the main entry point for the `pinboard` CLI. It parses arguments,
//! loads the config, sets up logging, dispatches to the appropriate command
//! handler, and handles errors with proper exit codes.

mod cli;
mod commands;
pub mod agent;
pub mod aggregator;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod logging;
pub mod protocol;
pub mod store;

#[cfg(test)]
mod test_support;

use cli::Cli;
use context::AppContext;
use logging::{LoggerError, init_logger};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let result = AppContext::load(cli.config.as_deref()).and_then(|ctx| {
        match init_logger(&ctx.config.logger_config()) {
            Ok(()) | Err(LoggerError::AlreadyInitialized) => {}
            Err(e) => eprintln!("Warning: {}", e),
        }
        commands::dispatch(&ctx, cli.command)
    });

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
