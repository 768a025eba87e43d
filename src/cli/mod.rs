//! CLI argument parsing for pinboard.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pinboard: store-and-poll tasking over shared documents.
///
/// A controller posts tasks as documents in a shared store. Agents poll the
/// store, run the tasks addressed to them, and append their output to the
/// document:
/// - `exec`, `list`, `get`, `clear` and `console` act as the controller
/// - `agent` runs the polling side on this host
#[derive(Parser, Debug)]
#[command(name = "pinboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: ./pinboard.yaml if present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for pinboard.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Post a task for agents to run.
    ///
    /// `exec uptime` targets every host, `exec @web01:uptime` only web01,
    /// `exec @*:uptime` every host explicitly.
    Exec(ExecArgs),

    /// List recent tasks and which hosts have answered.
    List,

    /// Show the output each host recorded for a task.
    Get(GetArgs),

    /// Delete every task that at least one host has answered.
    Clear,

    /// Interactive controller shell.
    Console,

    /// Poll the store and run tasks addressed to this host.
    Agent(AgentArgs),
}

/// Arguments for the `exec` command.
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Command to run, optionally prefixed with `@<host>:` or `@*:`.
    /// Words are joined with single spaces.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub words: Vec<String>,
}

/// Arguments for the `get` command.
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Task id or any unique prefix of it.
    pub id_prefix: String,
}

/// Arguments for the `agent` command.
#[derive(Parser, Debug)]
pub struct AgentArgs {
    /// Run a single poll pass and exit.
    #[arg(long)]
    pub once: bool,

    /// Override the configured poll interval.
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
