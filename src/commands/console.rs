//! Implementation of the `pinboard console` command.
//!
//! A line-oriented controller shell over the same operations as the
//! one-shot commands. Errors are printed and the shell keeps going.

use super::clear::clear_executed;
use super::exec::submit_task;
use super::get::render_output;
use super::list::render_task_list;
use crate::context::AppContext;
use crate::error::{PinboardError, Result};
use chrono::Utc;
use std::io::{self, BufRead, Write};

const HELP: &str = "\
Commands:
  exec <cmd>         - Execute on all hosts
  exec @host:<cmd>   - Execute on specific host
  exec @*:<cmd>      - Execute on all hosts (explicit)
  list               - List recent tasks
  get <id-prefix>    - Show task output
  clear              - Clear executed tasks
  help               - Show this help
  exit               - Leave the console";

/// Execute the `pinboard console` command.
pub fn cmd_console(ctx: &AppContext) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_console(ctx, stdin.lock(), stdout.lock())
}

/// Whether the console should keep reading after a line.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub(crate) fn run_console<R: BufRead, W: Write>(
    ctx: &AppContext,
    input: R,
    mut output: W,
) -> Result<()> {
    writeln!(output, "Pinboard console").map_err(write_error)?;
    writeln!(output, "{}", HELP).map_err(write_error)?;
    writeln!(output, "{}", "-".repeat(40)).map_err(write_error)?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ").map_err(write_error)?;
        output.flush().map_err(write_error)?;

        let Some(line) = lines.next() else {
            writeln!(output).map_err(write_error)?;
            break;
        };
        let line = line.map_err(|e| {
            PinboardError::UserError(format!("failed to read console input: {}", e))
        })?;

        if handle_line(ctx, &line, &mut output)? == Flow::Exit {
            break;
        }
    }

    Ok(())
}

fn handle_line<W: Write>(ctx: &AppContext, line: &str, output: &mut W) -> Result<Flow> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Flow::Continue);
    };
    let rest: Vec<&str> = words.collect();

    let reply: Result<String> = match verb {
        "exec" if rest.is_empty() => Ok("Usage: exec <command>".to_string()),
        "exec" => submit_task(ctx, &rest.join(" ")),
        "list" => ctx
            .aggregator()
            .list_tasks(Utc::now())
            .map(|tasks| render_task_list(&tasks)),
        "get" => match rest.first() {
            Some(prefix) => ctx
                .aggregator()
                .get_output(prefix)
                .map(|found| render_output(found.as_ref())),
            None => Ok("Usage: get <id-prefix>".to_string()),
        },
        "clear" => clear_executed(ctx),
        "help" => Ok(HELP.to_string()),
        "exit" => return Ok(Flow::Exit),
        other => Ok(format!("Unknown command: {}", other)),
    };

    let written = match reply {
        Ok(text) => writeln!(output, "{}", text.trim_end()),
        Err(e) => writeln!(output, "Error: {}", e),
    };
    written.map_err(write_error)?;

    Ok(Flow::Continue)
}

fn write_error(e: io::Error) -> PinboardError {
    PinboardError::UserError(format!("failed to write console output: {}", e))
}
