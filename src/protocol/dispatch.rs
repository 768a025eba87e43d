//! Dispatch resolution: does a task target this agent?

use super::codec::TargetSpec;

/// Returns `true` if an agent identified as `local_host` should run a task
/// addressed to `target`.
///
/// Host targets compare by exact string equality, so the empty target produced
/// by a malformed `@:` title never matches a real agent.
pub fn should_execute(target: &TargetSpec, local_host: &str) -> bool {
    match target {
        TargetSpec::Broadcast | TargetSpec::Wildcard => true,
        TargetSpec::Host(host) => host == local_host,
    }
}
