//! Command implementations for pinboard.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Controller commands print operator-facing text to stdout;
//! diagnostics go through `tracing`.

mod agent;
mod clear;
mod console;
mod exec;
mod get;
mod list;

use crate::cli::Command;
use crate::context::AppContext;
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Exec(args) => exec::cmd_exec(ctx, &args.words.join(" ")),
        Command::List => list::cmd_list(ctx),
        Command::Get(args) => get::cmd_get(ctx, &args.id_prefix),
        Command::Clear => clear::cmd_clear(ctx),
        Command::Console => console::cmd_console(ctx),
        Command::Agent(args) => agent::cmd_agent(ctx, args),
    }
}
