//! Implementation of the `pinboard exec` command.

use crate::context::AppContext;
use crate::error::{PinboardError, Result};
use crate::protocol::{TitleForm, parse_exec_argument};
use chrono::Utc;

/// Execute the `pinboard exec` command.
pub fn cmd_exec(ctx: &AppContext, input: &str) -> Result<()> {
    println!("{}", submit_task(ctx, input)?);
    Ok(())
}

/// Post `input` (`cmd`, `@host:cmd` or `@*:cmd`) as a task and return the
/// confirmation line.
pub(crate) fn submit_task(ctx: &AppContext, input: &str) -> Result<String> {
    let parsed = parse_exec_argument(input);
    if parsed.command.trim().is_empty() {
        return Err(PinboardError::UserError(
            "Usage: exec <command>".to_string(),
        ));
    }

    if parsed.form == TitleForm::EmptyTarget {
        tracing::warn!("task has an empty target after '@' and will not run on any host");
    }

    let doc = ctx
        .aggregator()
        .submit(Utc::now(), &parsed.target, &parsed.command)?;

    Ok(format!("Task created for {}: {}", parsed.target, doc.id))
}
