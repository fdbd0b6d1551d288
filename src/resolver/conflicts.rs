//! Superseding tasks disable the tasks they conflict with.
use std::collections::HashSet;

use super::TaskSet;
use crate::logging::Log;

/// Disable the victims of every enabled superseding task.
///
/// Superseders are taken from the tasks enabled on entry and processed in
/// configuration order, so a superseder disabled by an earlier one still
/// applies. When two superseders name the same victim, the victim is
/// reported again by the later one and that reason is the final one.
#[must_use]
pub fn resolve_conflicts(mut tasks: TaskSet, log: &dyn Log) -> TaskSet {
    let superseders: Vec<(String, Vec<String>)> = tasks
        .values()
        .filter(|t| t.enabled && !t.supersedes.is_empty())
        .map(|t| (t.name.clone(), t.supersedes.clone()))
        .collect();

    let mut superseded: HashSet<String> = HashSet::new();
    for (name, victims) in superseders {
        for victim in victims {
            let Some(task) = tasks.get_mut(&victim) else {
                log.warn(&format!(
                    "Task '{name}' supersedes '{victim}', which is not defined"
                ));
                continue;
            };
            if !task.enabled && !superseded.contains(&victim) {
                continue;
            }
            task.enabled = false;
            log.warn(&format!(
                "Disabling task '{victim}' because it conflicts with superseding task '{name}'"
            ));
            superseded.insert(victim);
        }
    }
    log.debug("Checked for conflicting/superseding tasks");
    tasks
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::TaskDefinition;
    use crate::logging::MemoryLog;
    use crate::resolver::test_support::{enabled, set, task};

    fn superseding(name: &str, victims: &[&str]) -> TaskDefinition {
        let mut t = task(name, &[]);
        t.supersedes = victims.iter().map(ToString::to_string).collect();
        t
    }

    #[test]
    fn superseder_disables_enabled_victim() {
        let log = MemoryLog::new();
        let tasks = resolve_conflicts(set([superseding("s", &["v"]), task("v", &[])]), &log);
        assert_eq!(enabled(&tasks), vec!["s"]);
        assert_eq!(
            log.warnings(),
            vec!["Disabling task 'v' because it conflicts with superseding task 's'"]
        );
    }

    #[test]
    fn disabled_superseder_has_no_effect() {
        let log = MemoryLog::new();
        let mut s = superseding("s", &["v"]);
        s.enabled = false;
        let tasks = resolve_conflicts(set([s, task("v", &[])]), &log);
        assert_eq!(enabled(&tasks), vec!["v"]);
        assert!(log.warnings().is_empty());
    }

    #[test]
    fn already_disabled_victim_is_not_reported() {
        let log = MemoryLog::new();
        let mut v = task("v", &[]);
        v.enabled = false;
        let _ = resolve_conflicts(set([superseding("s", &["v"]), v]), &log);
        assert!(log.warnings().is_empty());
    }

    #[test]
    fn later_superseder_gives_final_reason() {
        let log = MemoryLog::new();
        let tasks = resolve_conflicts(
            set([
                superseding("first", &["v"]),
                task("v", &[]),
                superseding("second", &["v"]),
            ]),
            &log,
        );
        assert_eq!(enabled(&tasks), vec!["first", "second"]);
        assert_eq!(
            log.warnings().last().map(String::as_str),
            Some("Disabling task 'v' because it conflicts with superseding task 'second'")
        );
    }

    #[test]
    fn mutual_superseders_both_apply() {
        let log = MemoryLog::new();
        let tasks = resolve_conflicts(
            set([superseding("a", &["b"]), superseding("b", &["a"])]),
            &log,
        );
        assert!(enabled(&tasks).is_empty());
    }

    #[test]
    fn unknown_victim_is_warned_about() {
        let log = MemoryLog::new();
        let tasks = resolve_conflicts(set([superseding("s", &["ghost"])]), &log);
        assert_eq!(enabled(&tasks), vec!["s"]);
        assert_eq!(
            log.warnings(),
            vec!["Task 's' supersedes 'ghost', which is not defined"]
        );
    }
}
