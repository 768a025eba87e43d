//! Implementation of the `pinboard clear` command.

use crate::context::AppContext;
use crate::error::Result;

/// Execute the `pinboard clear` command.
///
/// Deletes every task any host has answered. Failed deletes are logged and
/// left out of the count.
pub fn cmd_clear(ctx: &AppContext) -> Result<()> {
    println!("{}", clear_executed(ctx)?);
    Ok(())
}

pub(crate) fn clear_executed(ctx: &AppContext) -> Result<String> {
    let summary = ctx.aggregator().purge_executed()?;
    Ok(format!("Cleared {} executed tasks", summary.deleted))
}
