//! Title codec for tasks.
//!
//! A task title is the configured prefix followed by either the bare command
//! (broadcast) or `@<target>:<command>` (host-targeted, `*` for wildcard):
//!
//! ```text
//! pinboard: uptime
//! pinboard: @web01:systemctl status nginx
//! pinboard: @*:df -h
//! ```
//!
//! Decoding never fails. Text without the prefix is simply not a task, and
//! every lenient reading of malformed target syntax is reported through
//! [`TitleForm`] so callers can tell them apart.

use std::fmt;

/// Token used for the explicit "any host" target.
pub const WILDCARD_TOKEN: &str = "*";

/// Who should execute a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetSpec {
    /// Untargeted title: every agent runs it.
    Broadcast,
    /// `@<name>:` form: only the agent whose identity equals `name` runs it.
    Host(String),
    /// `@*:` form: every agent runs it, but the title keeps the explicit target.
    Wildcard,
}

impl TargetSpec {
    /// Parse the token between `@` and `:`.
    pub fn from_token(token: &str) -> Self {
        if token == WILDCARD_TOKEN {
            TargetSpec::Wildcard
        } else {
            TargetSpec::Host(token.to_string())
        }
    }

    /// The token written after `@`, or `None` for broadcast.
    pub fn token(&self) -> Option<&str> {
        match self {
            TargetSpec::Broadcast => None,
            TargetSpec::Host(h) => Some(h.as_str()),
            TargetSpec::Wildcard => Some(WILDCARD_TOKEN),
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Broadcast => write!(f, "all hosts"),
            TargetSpec::Host(h) => write!(f, "@{}", h),
            TargetSpec::Wildcard => write!(f, "@{}", WILDCARD_TOKEN),
        }
    }
}

/// How a recognized title was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleForm {
    /// No leading `@`: the whole text is the command.
    Untargeted,
    /// `@<token>:<command>` with a non-empty token.
    Targeted,
    /// `@:<command>`. Target is `Host("")`, which matches no real agent.
    EmptyTarget,
    /// Leading `@` but no `:`. The whole text, `@` included, is a broadcast command.
    UnterminatedTarget,
}

/// A decoded task title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTitle {
    pub target: TargetSpec,
    pub command: String,
    pub form: TitleForm,
}

/// Encode a target and command into a document title.
pub fn encode_title(prefix: &str, target: &TargetSpec, command: &str) -> String {
    match target.token() {
        None => format!("{} {}", prefix, command),
        Some(token) => format!("{} @{}:{}", prefix, token, command),
    }
}

/// Decode a document title.
///
/// Returns `None` when the title does not start with `prefix`.
pub fn decode_title(prefix: &str, title: &str) -> Option<TaskTitle> {
    let rest = title.strip_prefix(prefix)?;
    Some(decode_task_text(rest))
}

/// Parse operator input of the form `@host:cmd`, `@*:cmd` or `cmd`.
///
/// This is the grammar a title uses after its prefix, so a controller can
/// hand the raw `exec` argument through and encode the parts it gets back.
pub fn parse_exec_argument(input: &str) -> TaskTitle {
    decode_task_text(input)
}

fn decode_task_text(text: &str) -> TaskTitle {
    let rest = text.trim();

    let Some(targeted) = rest.strip_prefix('@') else {
        return TaskTitle {
            target: TargetSpec::Broadcast,
            command: rest.to_string(),
            form: TitleForm::Untargeted,
        };
    };

    // Only the first ':' separates; the command may contain more.
    match targeted.split_once(':') {
        Some(("", command)) => TaskTitle {
            target: TargetSpec::Host(String::new()),
            command: command.to_string(),
            form: TitleForm::EmptyTarget,
        },
        Some((token, command)) => TaskTitle {
            target: TargetSpec::from_token(token),
            command: command.to_string(),
            form: TitleForm::Targeted,
        },
        None => TaskTitle {
            target: TargetSpec::Broadcast,
            command: rest.to_string(),
            form: TitleForm::UnterminatedTarget,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "pinboard:";

    #[test]
    fn encode_broadcast_keeps_command_verbatim() {
        let title = encode_title(PREFIX, &TargetSpec::Broadcast, "ls -la /tmp");
        assert_eq!(title, "pinboard: ls -la /tmp");
    }

    #[test]
    fn encode_host_and_wildcard() {
        assert_eq!(
            encode_title(PREFIX, &TargetSpec::Host("web01".into()), "whoami"),
            "pinboard: @web01:whoami"
        );
        assert_eq!(
            encode_title(PREFIX, &TargetSpec::Wildcard, "whoami"),
            "pinboard: @*:whoami"
        );
    }

    #[test]
    fn decode_host_targeted_title() {
        let decoded = decode_title(PREFIX, "pinboard: @web01:whoami").unwrap();
        assert_eq!(decoded.target, TargetSpec::Host("web01".into()));
        assert_eq!(decoded.command, "whoami");
        assert_eq!(decoded.form, TitleForm::Targeted);
    }

    #[test]
    fn decode_splits_on_first_colon_only() {
        let decoded = decode_title(PREFIX, "pinboard: @db02:echo a:b:c").unwrap();
        assert_eq!(decoded.target, TargetSpec::Host("db02".into()));
        assert_eq!(decoded.command, "echo a:b:c");
    }

    #[test]
    fn decode_wildcard_and_broadcast_stay_distinct() {
        let wildcard = decode_title(PREFIX, "pinboard: @*:uptime").unwrap();
        let broadcast = decode_title(PREFIX, "pinboard: uptime").unwrap();

        assert_eq!(wildcard.target, TargetSpec::Wildcard);
        assert_eq!(broadcast.target, TargetSpec::Broadcast);
        assert_eq!(wildcard.command, broadcast.command);
        assert_eq!(broadcast.form, TitleForm::Untargeted);
    }

    #[test]
    fn decode_empty_target_is_named_and_inert() {
        let decoded = decode_title(PREFIX, "pinboard: @:reboot").unwrap();
        assert_eq!(decoded.target, TargetSpec::Host(String::new()));
        assert_eq!(decoded.command, "reboot");
        assert_eq!(decoded.form, TitleForm::EmptyTarget);
    }

    #[test]
    fn decode_at_without_colon_is_broadcast_of_whole_text() {
        let decoded = decode_title(PREFIX, "pinboard: @web01").unwrap();
        assert_eq!(decoded.target, TargetSpec::Broadcast);
        assert_eq!(decoded.command, "@web01");
        assert_eq!(decoded.form, TitleForm::UnterminatedTarget);
    }

    #[test]
    fn decode_trailing_colon_gives_empty_command() {
        let decoded = decode_title(PREFIX, "pinboard: @web01:").unwrap();
        assert_eq!(decoded.target, TargetSpec::Host("web01".into()));
        assert_eq!(decoded.command, "");
    }

    #[test]
    fn decode_trims_whitespace_after_prefix() {
        let decoded = decode_title(PREFIX, "pinboard:    hostname   ").unwrap();
        assert_eq!(decoded.command, "hostname");
    }

    #[test]
    fn titles_without_prefix_are_not_tasks() {
        assert!(decode_title(PREFIX, "Weekly sync").is_none());
        assert!(decode_title(PREFIX, "").is_none());
        assert!(decode_title(PREFIX, " pinboard: ls").is_none());
        assert!(decode_title(PREFIX, "Pinboard: ls").is_none());
    }

    #[test]
    fn decode_inverts_encode() {
        let targets = [
            TargetSpec::Broadcast,
            TargetSpec::Wildcard,
            TargetSpec::Host("web01".into()),
            TargetSpec::Host("build-agent.internal".into()),
        ];
        let commands = ["whoami", "echo a:b", "ls -la", "cat /etc/hosts | wc -l"];

        for target in &targets {
            for command in commands {
                let title = encode_title(PREFIX, target, command);
                let decoded = decode_title(PREFIX, &title).unwrap();
                assert_eq!(&decoded.target, target, "title: {}", title);
                assert_eq!(decoded.command, command, "title: {}", title);
            }
        }
    }

    #[test]
    fn parse_exec_argument_reads_operator_input() {
        let parsed = parse_exec_argument("@web01:uname -a");
        assert_eq!(parsed.target, TargetSpec::Host("web01".into()));
        assert_eq!(parsed.command, "uname -a");

        let parsed = parse_exec_argument("uname -a");
        assert_eq!(parsed.target, TargetSpec::Broadcast);
        assert_eq!(parsed.command, "uname -a");
    }

    #[test]
    fn target_display_matches_controller_wording() {
        assert_eq!(TargetSpec::Broadcast.to_string(), "all hosts");
        assert_eq!(TargetSpec::Wildcard.to_string(), "@*");
        assert_eq!(TargetSpec::Host("web01".into()).to_string(), "@web01");
    }
}
