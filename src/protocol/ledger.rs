//! Output ledger: per-host result blocks inside a shared free-text body.
//!
//! Each agent appends one block to the body of the task document:
//!
//! ```text
//! <existing body>
//!
//! [OUTPUT-web01]
//! <result lines>
//! [/OUTPUT-web01]
//! ```
//!
//! Host ids must not contain `[`, `]` or line breaks, otherwise markers become
//! ambiguous (see [`is_valid_host_id`]). The format is append-only by
//! convention only; nothing in the text stops a writer from rewriting it.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Literal that opens every start marker.
pub const START_MARKER_OPEN: &str = "[OUTPUT-";

/// Literal that opens every end marker.
pub const END_MARKER_OPEN: &str = "[/OUTPUT-";

/// A whole line that is a start marker, capturing the host id.
static START_MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[OUTPUT-(.+)\]$").expect("Invalid start marker regex"));

/// A whole line that is an end marker, capturing the host id.
static END_MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[/OUTPUT-(.+)\]$").expect("Invalid end marker regex"));

/// One host's result as stored in a document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub host: String,
    pub body: String,
}

/// Start marker for `host`, e.g. `[OUTPUT-web01]`.
pub fn start_marker(host: &str) -> String {
    format!("{}{}]", START_MARKER_OPEN, host)
}

/// End marker for `host`, e.g. `[/OUTPUT-web01]`.
pub fn end_marker(host: &str) -> String {
    format!("{}{}]", END_MARKER_OPEN, host)
}

/// Whether `host` can be written into markers without ambiguity.
pub fn is_valid_host_id(host: &str) -> bool {
    !host.is_empty() && !host.contains(['[', ']', '\n', '\r'])
}

/// Encode one result block, ready to be concatenated onto the current body.
pub fn encode_block(host: &str, result: &str) -> String {
    format!(
        "\n\n{}\n{}\n{}",
        start_marker(host),
        result,
        end_marker(host)
    )
}

/// Return `body` with a result block for `host` appended.
pub fn append_block(body: &str, host: &str, result: &str) -> String {
    let mut out = String::with_capacity(body.len() + result.len() + 2 * host.len() + 24);
    out.push_str(body);
    out.push_str(&encode_block(host, result));
    out
}

/// Whether `host` already reported into `body`.
///
/// A plain substring check on the start marker. It does not require a
/// matching end marker, so a half-written block still counts as reported.
pub fn has_reported(body: &str, host: &str) -> bool {
    body.contains(&start_marker(host))
}

/// Whether any host at all reported into `body`.
pub fn has_any_report(body: &str) -> bool {
    body.contains(START_MARKER_OPEN)
}

/// Hosts with a well-formed start marker line anywhere in `body`.
///
/// Pairing with end markers is not checked. Used for status display only.
pub fn executed_hosts(body: &str) -> BTreeSet<String> {
    body.split('\n')
        .filter_map(|line| match_marker(&START_MARKER_LINE, line))
        .map(str::to_string)
        .collect()
}

/// Decode every closed block in `body` into a host -> result mapping.
///
/// When a host appears in more than one closed block the last one wins.
pub fn decode_all(body: &str) -> BTreeMap<String, String> {
    scan(body).outputs
}

/// Result of a full ledger scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerScan {
    /// Closed blocks, keyed by the host named in their start marker.
    pub outputs: BTreeMap<String, String>,
    /// Hosts whose block was opened but never closed, in order of appearance.
    pub discarded: Vec<String>,
}

/// Scan `body` line by line and report closed and discarded blocks.
pub fn scan(body: &str) -> LedgerScan {
    let mut scanner = LedgerScanner::new();
    let mut result = LedgerScan::default();

    for line in body.split('\n') {
        match scanner.feed(line) {
            Some(ScanEvent::Closed(record)) => {
                result.outputs.insert(record.host, record.body);
            }
            Some(ScanEvent::Discarded(host)) => result.discarded.push(host),
            None => {}
        }
    }
    if let Some(host) = scanner.finish() {
        result.discarded.push(host);
    }

    result
}

/// Scanner state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// Outside any block; non-marker lines are ignored.
    Idle,
    /// Inside a block opened by `host`, collecting `lines`.
    Capturing { host: String, lines: Vec<String> },
}

/// Something the scanner produced while consuming a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// An end marker closed the current block.
    Closed(OutputRecord),
    /// A new start marker replaced a block that was still open.
    Discarded(String),
}

/// Line-driven two-state scanner over a document body.
///
/// Transitions:
/// - `Idle` + start marker -> `Capturing(id)`
/// - `Capturing` + start marker -> `Capturing(new id)`, the open block is discarded
/// - `Capturing` + end marker (any id) -> `Idle`, the block is emitted under the
///   id from its start marker
/// - `Capturing` + other line -> line appended to the block
/// - `Idle` + anything else -> ignored
#[derive(Debug, Clone)]
pub struct LedgerScanner {
    state: ScanState,
}

impl Default for LedgerScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Consume one line (without its trailing `\n`).
    pub fn feed(&mut self, line: &str) -> Option<ScanEvent> {
        if let Some(host) = match_marker(&START_MARKER_LINE, line) {
            let previous = std::mem::replace(
                &mut self.state,
                ScanState::Capturing {
                    host: host.to_string(),
                    lines: Vec::new(),
                },
            );
            return match previous {
                ScanState::Capturing { host, .. } => Some(ScanEvent::Discarded(host)),
                ScanState::Idle => None,
            };
        }

        if match_marker(&END_MARKER_LINE, line).is_some() {
            return match std::mem::replace(&mut self.state, ScanState::Idle) {
                ScanState::Capturing { host, lines } => Some(ScanEvent::Closed(OutputRecord {
                    host,
                    body: lines.join("\n"),
                })),
                ScanState::Idle => None,
            };
        }

        if let ScanState::Capturing { lines, .. } = &mut self.state {
            lines.push(line.to_string());
        }
        None
    }

    /// End of input. Returns the host of a block left open, if any.
    pub fn finish(self) -> Option<String> {
        match self.state {
            ScanState::Capturing { host, .. } => Some(host),
            ScanState::Idle => None,
        }
    }
}

fn match_marker<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
