//! Argument whitelist policy.
use super::TaskSet;
use crate::logging::Log;

/// Arguments every task accepts regardless of its whitelist.
pub const ALWAYS_ALLOWED: &[&str] = &["--force"];

/// Suffix turning a whitelist entry into a prefix match.
const WILDCARD: char = '*';

fn admits(pattern: &str, arg: &str) -> bool {
    pattern
        .strip_suffix(WILDCARD)
        .map_or(pattern == arg, |prefix| arg.starts_with(prefix))
}

/// Arguments of `args` that `allowed` does not admit, in order.
///
/// `None` admits everything.
#[must_use]
pub fn disallowed_args<'a>(allowed: Option<&[String]>, args: &'a [String]) -> Vec<&'a str> {
    let Some(allowed) = allowed else {
        return Vec::new();
    };
    args.iter()
        .map(String::as_str)
        .filter(|arg| {
            !allowed
                .iter()
                .map(String::as_str)
                .chain(ALWAYS_ALLOWED.iter().copied())
                .any(|pattern| admits(pattern, arg))
        })
        .collect()
}

/// Disable every enabled task whose effective arguments its whitelist
/// rejects.
#[must_use]
pub fn resolve_args(mut tasks: TaskSet, log: &dyn Log) -> TaskSet {
    for task in tasks.values_mut().filter(|t| t.enabled) {
        let effective = task.args.effective();
        let wrong = disallowed_args(task.args.allowed.as_deref(), &effective);
        if wrong.is_empty() {
            continue;
        }
        task.enabled = false;
        log.warn(&format!(
            "Task '{}' was disabled because some args ({}) are not in allowed args ({})",
            task.name,
            wrong.join(", "),
            task.args.allowed.as_deref().unwrap_or_default().join(", ")
        ));
    }
    log.debug("Checked task arguments");
    tasks
}
