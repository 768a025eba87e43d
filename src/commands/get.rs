//! Implementation of the `pinboard get` command.

use crate::aggregator::TaskOutput;
use crate::context::AppContext;
use crate::error::Result;

/// Execute the `pinboard get` command.
pub fn cmd_get(ctx: &AppContext, id_prefix: &str) -> Result<()> {
    let output = ctx.aggregator().get_output(id_prefix)?;
    print!("{}", render_output(output.as_ref()));
    Ok(())
}

pub(crate) fn render_output(output: Option<&TaskOutput>) -> String {
    let Some(output) = output else {
        return "Task not found\n".to_string();
    };

    let mut out = format!("\nCommand: {}\n\nOutputs:\n========\n", output.title);

    if output.outputs.is_empty() {
        out.push_str("Task not yet executed by any host\n");
    }

    for (host, body) in &output.outputs {
        out.push_str(&format!("\n--- Host: {} ---\n{}\n", host, body.trim()));
    }

    if !output.discarded.is_empty() {
        out.push_str(&format!(
            "\nIncomplete output discarded for: {}\n",
            output.discarded.join(", ")
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn output(outputs: &[(&str, &str)], discarded: &[&str]) -> TaskOutput {
        TaskOutput {
            id: "abc".to_string(),
            title: "pinboard: uptime".to_string(),
            outputs: outputs
                .iter()
                .map(|(h, b)| (h.to_string(), b.to_string()))
                .collect::<BTreeMap<_, _>>(),
            discarded: discarded.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn missing_task_is_reported() {
        assert_eq!(render_output(None), "Task not found\n");
    }

    #[test]
    fn unanswered_task_is_reported() {
        let rendered = render_output(Some(&output(&[], &[])));
        assert!(rendered.contains("Command: pinboard: uptime\n"));
        assert!(rendered.contains("Task not yet executed by any host"));
    }

    #[test]
    fn host_blocks_are_sorted_and_trimmed() {
        let rendered = render_output(Some(&output(
            &[("web01", "\n[Host: web01]\nup\n\n"), ("db02", "[Host: db02]\nup")],
            &[],
        )));

        let db = rendered.find("--- Host: db02 ---").unwrap();
        let web = rendered.find("--- Host: web01 ---").unwrap();
        assert!(db < web);
        assert!(rendered.contains("--- Host: web01 ---\n[Host: web01]\nup\n"));
        assert!(!rendered.contains("not yet executed"));
    }

    #[test]
    fn discarded_hosts_are_listed() {
        let rendered = render_output(Some(&output(&[("b", "ok")], &["a"])));
        assert!(rendered.contains("Incomplete output discarded for: a"));
    }
}
