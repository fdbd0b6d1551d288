//! Step protocol between task scripts and the progress table.
//!
//! A script reports progress by printing `__STEP__: <message>` lines, or
//! `__STEP_NO_PROGRESS__: <message>` for a message that does not count as a
//! step. Its expected number of steps is the number of `# (STEP) ...`
//! comments in the code that runs, plus one for completion.
use std::sync::LazyLock;

use regex::Regex;

use crate::logging::{Logger, TaskId};
use crate::scripts::{Command, analyze_file};

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("step pattern is valid")
}

static STEP: LazyLock<Regex> = LazyLock::new(|| compile(r"^__STEP__:\s*(.*)$"));
static STEP_NO_PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^__STEP_NO_PROGRESS__:\s*(.*)$"));
static STEP_COMMENT: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*#\s*\(STEP\)\s*(.*)$"));

/// A step marker found in task output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMarker<'a> {
    /// Completed step.
    Advance(&'a str),
    /// Status message only.
    Message(&'a str),
}

/// Parse a line of task output.
#[must_use]
pub fn parse_marker(line: &str) -> Option<StepMarker<'_>> {
    let message = |re: &Regex| {
        re.captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    };
    message(&STEP)
        .map(StepMarker::Advance)
        .or_else(|| message(&STEP_NO_PROGRESS).map(StepMarker::Message))
}

/// Number of `# (STEP)` comments in `lines`.
#[must_use]
pub fn count_step_comments(lines: &[String]) -> usize {
    lines.iter().filter(|l| STEP_COMMENT.is_match(l)).count()
}

/// Expected number of steps of a command: its step comments plus one.
///
/// Only the function's own lines are counted for function-bound commands.
/// Scripts that cannot be analyzed count as a single step.
#[must_use]
pub fn step_total(command: &Command) -> usize {
    let Ok(analysis) = analyze_file(&command.script) else {
        return 1;
    };
    let lines = match &command.function {
        Some(function) => analysis
            .function(function)
            .map(|block| analysis.block_lines(block))
            .unwrap_or_default(),
        None => analysis.lines.as_slice(),
    };
    count_step_comments(lines) + 1
}

/// Apply one output line to a task's progress.
pub fn apply(line: &str, id: TaskId, log: &Logger) {
    match parse_marker(line) {
        Some(StepMarker::Advance(msg)) => log.update_task(id, msg, true),
        Some(StepMarker::Message(msg)) => log.update_task(id, msg, false),
        None => {}
    }
}
