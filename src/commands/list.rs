//! Implementation of the `pinboard list` command.

use crate::aggregator::{ExecutionState, TaskStatus};
use crate::context::AppContext;
use crate::error::Result;
use crate::protocol::TaskTitle;
use chrono::Utc;

/// Ids longer than this are shortened in listings.
const SHORT_ID_LEN: usize = 8;

/// Execute the `pinboard list` command.
pub fn cmd_list(ctx: &AppContext) -> Result<()> {
    let tasks = ctx.aggregator().list_tasks(Utc::now())?;
    print!("{}", render_task_list(&tasks));
    Ok(())
}

pub(crate) fn render_task_list(tasks: &[TaskStatus]) -> String {
    let mut out = String::new();
    out.push_str("\nRecent Tasks:\n");
    out.push_str(&format!("{:<12} {:<32} {}\n", "ID", "Command", "Status"));
    out.push_str(&"-".repeat(60));
    out.push('\n');

    if tasks.is_empty() {
        out.push_str("(no tasks)\n");
    }

    for task in tasks {
        out.push_str(&format!(
            "{:<12} {:<32} {}\n",
            short_id(&task.id),
            task_text(&task.task),
            status_text(&task.state)
        ));
    }
    out
}

/// First eight characters plus `...` for longer ids.
pub(crate) fn short_id(id: &str) -> String {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((cut, _)) => format!("{}...", &id[..cut]),
        None => id.to_string(),
    }
}

/// The task as the operator typed it.
fn task_text(task: &TaskTitle) -> String {
    match task.target.token() {
        Some(token) => format!("@{}:{}", token, task.command),
        None => task.command.clone(),
    }
}

fn status_text(state: &ExecutionState) -> String {
    match state {
        ExecutionState::Pending => "Pending".to_string(),
        ExecutionState::ExecutedBy(hosts) => {
            let hosts: Vec<&str> = hosts.iter().map(String::as_str).collect();
            format!("Executed ({})", hosts.join(", "))
        }
    }
}
