//! Task graph resolution.
//!
//! [`resolve`] turns the layered configuration into the ordered list of
//! [`ResolvedTask`]s that should run. It is a pipeline of stage functions;
//! each takes the task collection by value and returns it, or fails with a
//! fatal [`ResolveError`]. Problems that only affect one task disable that
//! task and are reported through [`Log::warn`].
//!
//! 1. default configuration ([`defaults`])
//! 2. custom configuration and inline task specs ([`custom`])
//! 3. layer merge and 4. field backfill ([`layers`])
//! 5. dependencies ([`dependencies`])
//! 6. arguments ([`args`])
//! 7. conflicts ([`conflicts`])
//! 8. config file paths ([`paths`])
//! 9. zero-enabled check and 10. projection
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::{PackageLocator, TaskDefinition};
use crate::error::ResolveError;
use crate::logging::Log;
use crate::scripts::Command;

pub mod args;
pub mod conflicts;
pub mod custom;
pub mod defaults;
pub mod dependencies;
pub mod graph;
pub mod layers;
pub mod paths;

pub use graph::Dag;

/// Tasks by name, in configuration order.
pub type TaskSet = IndexMap<String, TaskDefinition>;

/// Inputs of a resolution run.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Default configuration defining every task.
    pub default_config: PathBuf,
    /// Optional custom configuration layered on top.
    pub config_file: Option<PathBuf>,
    /// Directory that relative per-task config files are resolved against.
    pub config_directory: PathBuf,
    /// Inline task specs, `name[:arg...]`.
    pub tasks: Vec<String>,
    /// Enable every task not otherwise mentioned. Overrides the custom
    /// configuration's `enable_all`.
    pub enable_all: Option<bool>,
    /// Enable the dependencies of enabled tasks instead of disabling tasks
    /// with disabled dependencies. Overrides the custom configuration's
    /// `enable_dependencies`.
    pub enable_dependencies: Option<bool>,
}

/// A task ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTask {
    /// Task name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Script and function to run.
    pub command: Command,
    /// Absolute per-task config file.
    pub config_file: Option<PathBuf>,
    /// Tasks that must finish first.
    pub depends_on: Vec<String>,
    /// Whether the task runs with elevated privileges.
    pub privileged: bool,
    /// Final argument list.
    pub args: Vec<String>,
}

/// Resolve the tasks to run.
///
/// # Errors
///
/// Returns a [`ResolveError`] for every fatal condition: an invalid default
/// configuration, an unreadable custom configuration, a missing dependency or
/// dependency cycle, a missing per-task config file, or no enabled tasks.
pub fn resolve(
    opts: &ResolveOptions,
    log: &dyn Log,
    locator: &dyn PackageLocator,
) -> Result<Vec<ResolvedTask>, ResolveError> {
    let defaults = defaults::load_defaults(&opts.default_config, locator, log)?;
    let custom = custom::load_custom(opts, &defaults, locator, log)?;
    let merged = layers::merge_layers(&defaults, &custom);
    let tasks = layers::backfill_fields(merged, custom.toggles.enable_all, log);
    let tasks =
        dependencies::resolve_dependencies(tasks, custom.toggles.enable_dependencies, log)?;
    let tasks = args::resolve_args(tasks, log);
    let tasks = conflicts::resolve_conflicts(tasks, log);
    let config_files = paths::finalize_paths(&tasks, &opts.config_directory)?;
    let tasks = ensure_enabled(tasks)?;
    log.debug(&format!(
        "Final enabled tasks: {}",
        tasks
            .values()
            .filter(|t| t.enabled)
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    Ok(project(tasks, &config_files))
}

/// Fail if every task ended up disabled.
///
/// # Errors
///
/// Returns [`ResolveError::NoEnabledTasks`].
pub fn ensure_enabled(tasks: TaskSet) -> Result<TaskSet, ResolveError> {
    if tasks.values().any(|t| t.enabled) {
        Ok(tasks)
    } else {
        Err(ResolveError::NoEnabledTasks)
    }
}

/// One [`ResolvedTask`] per enabled task, in configuration order.
#[must_use]
pub fn project(tasks: TaskSet, config_files: &IndexMap<String, PathBuf>) -> Vec<ResolvedTask> {
    tasks
        .into_values()
        .filter(|t| t.enabled)
        .filter_map(|task| {
            let args = task.args.effective();
            let script = task.script?;
            Some(ResolvedTask {
                config_file: config_files.get(&task.name).cloned(),
                command: Command::new(script, task.function),
                name: task.name,
                description: task.description,
                depends_on: task.depends_on,
                privileged: task.privileged,
                args,
            })
        })
        .collect()
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::test_support::{set, task};
    use super::*;

    #[test]
    fn ensure_enabled_rejects_all_disabled() {
        let mut a = task("a", &[]);
        a.enabled = false;
        assert!(matches!(
            ensure_enabled(set([a])),
            Err(ResolveError::NoEnabledTasks)
        ));
        assert!(ensure_enabled(set([task("b", &[])])).is_ok());
    }

    #[test]
    fn project_keeps_enabled_tasks_in_order() {
        let mut skipped = task("skipped", &[]);
        skipped.enabled = false;
        let mut b = task("b", &["a"]);
        b.function = Some("install".to_string());
        b.args.custom = vec!["--c".to_string()];
        b.args.default = vec!["--d".to_string()];
        let mut files = IndexMap::new();
        files.insert("b".to_string(), PathBuf::from("/conf/b.yaml"));

        let resolved = project(set([task("a", &[]), skipped, b]), &files);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name, "a");
        assert_eq!(resolved[0].config_file, None);
        assert_eq!(resolved[1].command.function.as_deref(), Some("install"));
        assert_eq!(resolved[1].args, vec!["--c", "--d"]);
        assert_eq!(resolved[1].depends_on, vec!["a"]);
        assert_eq!(
            resolved[1].config_file.as_deref(),
            Some(std::path::Path::new("/conf/b.yaml"))
        );
    }
}
