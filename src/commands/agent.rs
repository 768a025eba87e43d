//! Implementation of the `pinboard agent` command.

use crate::agent::{PollScheduler, SchedulerSettings, ShellExecutor, StopFlag};
use crate::cli::AgentArgs;
use crate::context::AppContext;
use crate::error::{PinboardError, Result};
use crate::protocol::is_valid_host_id;
use std::sync::Arc;
use std::time::Duration;

/// Execute the `pinboard agent` command.
///
/// Polls the store as this host until interrupted or told to `exit`.
pub fn cmd_agent(ctx: &AppContext, args: AgentArgs) -> Result<()> {
    let host_id = local_host_id()?;

    let mut settings = SchedulerSettings::from_config(&ctx.config);
    if let Some(ms) = args.interval_ms {
        if ms == 0 {
            return Err(PinboardError::UserError(
                "--interval-ms must be greater than 0".to_string(),
            ));
        }
        settings.interval = Duration::from_millis(ms);
    }

    let stop = StopFlag::new();
    if let Err(e) = stop.watch_signals() {
        tracing::warn!(error = %e, "failed to install signal handlers");
    }

    eprintln!("pinboard agent started");
    eprintln!("  host:     {}", host_id);
    eprintln!("  store:    {}", ctx.config.store_dir);
    eprintln!("  interval: {}ms", settings.interval.as_millis());
    eprintln!();

    let executor = ShellExecutor::new(host_id.clone(), stop.clone(), ctx.config.shutdown_grace())
        .with_timeout(ctx.config.command_timeout());
    let mut scheduler = PollScheduler::new(Arc::clone(&ctx.store), executor, host_id, settings);

    let passes = scheduler.run(&stop, args.once);
    tracing::info!(host = %scheduler.host_id(), passes, "agent stopped");
    Ok(())
}

/// This host's identity as reported by the OS.
fn local_host_id() -> Result<String> {
    let host = hostname::get()
        .map_err(|e| PinboardError::ExecError(format!("failed to read hostname: {}", e)))?
        .to_string_lossy()
        .to_string();

    if !is_valid_host_id(&host) {
        return Err(PinboardError::ExecError(format!(
            "hostname '{}' cannot be used as an agent identity",
            host
        )));
    }
    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::protocol::{has_reported, parse_exec_argument};
    use crate::store::{DocumentStore, MemoryStore};
    use crate::test_support::seed;
    use chrono::Utc;

    #[test]
    fn local_host_id_is_usable() {
        let host = local_host_id().unwrap();
        assert!(is_valid_host_id(&host));
    }

    #[test]
    fn zero_interval_override_is_rejected() {
        let ctx = AppContext::with_store(Config::default(), Arc::new(MemoryStore::new()));
        let err = cmd_agent(
            &ctx,
            AgentArgs {
                once: true,
                interval_ms: Some(0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, PinboardError::UserError(_)));
    }

    #[cfg(unix)]
    #[test]
    #[serial_test::serial]
    fn once_answers_tasks_for_this_host() {
        let store = Arc::new(MemoryStore::new());
        let ctx = AppContext::with_store(Config::default(), store.clone());
        let host = local_host_id().unwrap();
        let task = parse_exec_argument(&format!("@{}:echo hello", host));
        let title = crate::protocol::encode_title("pinboard:", &task.target, &task.command);
        let doc = seed(store.as_ref(), Utc::now(), &title, "");

        cmd_agent(
            &ctx,
            AgentArgs {
                once: true,
                interval_ms: None,
            },
        )
        .unwrap();

        let body = store.get(&doc.id).unwrap().body;
        assert!(has_reported(&body, &host));
        assert!(body.contains("hello"));
    }
}
