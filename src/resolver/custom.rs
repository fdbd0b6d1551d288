//! Custom configuration and inline task specs.
//!
//! Nothing in these layers is fatal except an unreadable custom file: a task
//! with invalid fields is disabled, an unknown task is dropped, and each case
//! is reported through [`Log::warn`].
use serde_yaml::{Mapping, Value};

use super::ResolveOptions;
use super::defaults::TaskMappings;
use crate::config::loader::kind_name;
use crate::config::schema::{self, Layer};
use crate::config::{PackageLocator, load_yaml};
use crate::error::ResolveError;
use crate::logging::Log;

/// Run-level switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggles {
    /// Tasks no layer mentions start enabled.
    pub enable_all: bool,
    /// Enabled tasks enable their dependencies.
    pub enable_dependencies: bool,
}

/// The layers on top of the default configuration.
#[derive(Debug, Clone, Default)]
pub struct CustomLayers {
    /// Tasks from the custom configuration file.
    pub file: TaskMappings,
    /// Tasks named on the command line.
    pub inline: TaskMappings,
    /// Resolved run-level switches.
    pub toggles: Toggles,
}

const ENABLE_ALL: &str = "enable_all";
const ENABLE_DEPENDENCIES: &str = "enable_dependencies";
const ENABLED: &str = "enabled";

/// Load the custom configuration (if any) and parse the inline task specs.
///
/// # Errors
///
/// Returns [`ResolveError::Config`] if the custom configuration file cannot
/// be loaded.
pub fn load_custom(
    opts: &ResolveOptions,
    defaults: &TaskMappings,
    locator: &dyn PackageLocator,
    log: &dyn Log,
) -> Result<CustomLayers, ResolveError> {
    let mut raw = match &opts.config_file {
        Some(path) => {
            log.debug(&format!("Loading custom config {}", path.display()));
            load_yaml(path, locator)?
        }
        None => {
            log.debug("No custom config file given");
            Mapping::new()
        }
    };
    let toggles = Toggles {
        enable_all: toggle(opts.enable_all, &mut raw, ENABLE_ALL, log),
        enable_dependencies: toggle(
            opts.enable_dependencies,
            &mut raw,
            ENABLE_DEPENDENCIES,
            log,
        ),
    };
    let file = check_file_tasks(raw, defaults, log);
    let inline = parse_inline(&opts.tasks, defaults, log);
    log.debug("Custom config is valid");
    Ok(CustomLayers {
        file,
        inline,
        toggles,
    })
}

/// Remove a toggle from `raw` and combine it with the command-line value,
/// which wins when given.
fn toggle(cli: Option<bool>, raw: &mut Mapping, key: &str, log: &dyn Log) -> bool {
    let value = raw.remove(key);
    if let Some(flag) = cli {
        return flag;
    }
    match value {
        None => false,
        Some(Value::Bool(flag)) => flag,
        Some(other) => {
            log.warn(&format!(
                "Ignoring '{key}' value - must be a boolean, not a {}",
                kind_name(&other)
            ));
            false
        }
    }
}

fn disabled() -> Mapping {
    let mut task = Mapping::new();
    task.insert(Value::String(ENABLED.to_string()), Value::Bool(false));
    task
}

/// Validate the task entries of the custom configuration.
fn check_file_tasks(raw: Mapping, defaults: &TaskMappings, log: &dyn Log) -> TaskMappings {
    let mut tasks = TaskMappings::new();
    for (key, value) in raw {
        let Some(name) = key.as_str() else {
            log.warn(&format!(
                "Ignoring custom config entry with a {} key",
                kind_name(&key)
            ));
            continue;
        };
        if !defaults.contains_key(name) {
            log.warn(&format!(
                "Task '{name}' in custom config is disabled because it is not defined in the default config"
            ));
            continue;
        }
        let task = match value {
            Value::Mapping(task) => {
                let problems = schema::validate(&task, Layer::Custom);
                if problems.is_empty() {
                    with_enabled(task)
                } else {
                    log.warn(&format!(
                        "Disabling task '{name}' because of invalid fields: {}",
                        problems.join("; ")
                    ));
                    disabled()
                }
            }
            other => {
                log.warn(&format!(
                    "Disabling task '{name}' because it is not defined by a mapping, but a {}",
                    kind_name(&other)
                ));
                disabled()
            }
        };
        tasks.insert(name.to_string(), task);
    }
    tasks
}

/// A task mentioned in a custom layer without `enabled` is enabled.
fn with_enabled(mut task: Mapping) -> Mapping {
    if !task.contains_key(ENABLED) {
        task.insert(Value::String(ENABLED.to_string()), Value::Bool(true));
    }
    task
}

/// Parse `name[:arg...]` specs into enabled tasks with custom args.
fn parse_inline(specs: &[String], defaults: &TaskMappings, log: &dyn Log) -> TaskMappings {
    let mut tasks = TaskMappings::new();
    for spec in specs {
        let mut parts = spec.split(':');
        let name = parts.next().unwrap_or_default();
        let args: Vec<Value> = parts.map(|a| Value::String(a.to_string())).collect();
        if !defaults.contains_key(name) {
            log.warn(&format!(
                "Task '{name}' given on the command line is not defined in the default config"
            ));
            continue;
        }
        let mut task = with_enabled(Mapping::new());
        if !args.is_empty() {
            let mut task_args = Mapping::new();
            task_args.insert(Value::String("custom".to_string()), Value::Sequence(args));
            task.insert(Value::String("args".to_string()), Value::Mapping(task_args));
        }
        tasks.insert(name.to_string(), task);
    }
    if tasks.is_empty() {
        log.debug("No inline tasks given");
    }
    tasks
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::package_path::MockPackageLocator;
    use crate::config::schema::get_path;
    use crate::logging::MemoryLog;
    use std::fs;

    fn defaults() -> TaskMappings {
        ["a", "b"]
            .into_iter()
            .map(|n| (n.to_string(), Mapping::new()))
            .collect()
    }

    fn load(custom: Option<&str>, opts: ResolveOptions, log: &MemoryLog) -> CustomLayers {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = opts;
        if let Some(text) = custom {
            let path = tmp.path().join("custom.yaml");
            fs::write(&path, text).unwrap();
            opts.config_file = Some(path);
        }
        let mut locator = MockPackageLocator::new();
        locator.expect_locate().returning(|_| None);
        load_custom(&opts, &defaults(), &locator, log).unwrap()
    }

    #[test]
    fn toggles_come_from_file_unless_given() {
        let log = MemoryLog::new();
        let layers = load(
            Some("enable_all: true\nenable_dependencies: true\n"),
            ResolveOptions::default(),
            &log,
        );
        assert_eq!(
            layers.toggles,
            Toggles {
                enable_all: true,
                enable_dependencies: true
            }
        );
        assert!(layers.file.is_empty());

        let opts = ResolveOptions {
            enable_all: Some(false),
            ..ResolveOptions::default()
        };
        let layers = load(Some("enable_all: true\n"), opts, &log);
        assert!(!layers.toggles.enable_all);
    }

    #[test]
    fn non_boolean_toggle_is_ignored_with_warning() {
        let log = MemoryLog::new();
        let layers = load(Some("enable_all: 'yes'\n"), ResolveOptions::default(), &log);
        assert!(!layers.toggles.enable_all);
        assert_eq!(
            log.warnings(),
            vec!["Ignoring 'enable_all' value - must be a boolean, not a string"]
        );
    }

    #[test]
    fn mentioned_tasks_are_enabled() {
        let log = MemoryLog::new();
        let layers = load(
            Some("a:\n  config_file: a.yaml\nb:\n  enabled: false\n"),
            ResolveOptions::default(),
            &log,
        );
        assert_eq!(get_path(&layers.file["a"], "enabled"), Some(&Value::Bool(true)));
        assert_eq!(get_path(&layers.file["b"], "enabled"), Some(&Value::Bool(false)));
        assert!(log.warnings().is_empty());
    }

    #[test]
    fn invalid_tasks_are_disabled() {
        let log = MemoryLog::new();
        let layers = load(
            Some("a:\n  script: other.bash\nb: [x]\n"),
            ResolveOptions::default(),
            &log,
        );
        assert_eq!(layers.file["a"], disabled());
        assert_eq!(layers.file["b"], disabled());
        let warnings = log.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("field 'script' is not allowed in the custom config"));
        assert!(warnings[1].contains("not defined by a mapping, but a sequence"));
    }

    #[test]
    fn unknown_tasks_are_dropped() {
        let log = MemoryLog::new();
        let opts = ResolveOptions {
            tasks: vec!["ghost:x".to_string()],
            ..ResolveOptions::default()
        };
        let layers = load(Some("phantom:\n  enabled: true\n"), opts, &log);
        assert!(layers.file.is_empty());
        assert!(layers.inline.is_empty());
        assert_eq!(log.warnings().len(), 2);
    }

    #[test]
    fn inline_specs_carry_custom_args() {
        let log = MemoryLog::new();
        let opts = ResolveOptions {
            tasks: vec!["a:--x:--y".to_string(), "b".to_string()],
            ..ResolveOptions::default()
        };
        let layers = load(None, opts, &log);
        let a = &layers.inline["a"];
        assert_eq!(get_path(a, "enabled"), Some(&Value::Bool(true)));
        assert_eq!(
            get_path(a, "args.custom"),
            Some(&Value::Sequence(vec![
                Value::String("--x".to_string()),
                Value::String("--y".to_string())
            ]))
        );
        assert!(get_path(&layers.inline["b"], "args").is_none());
    }

    #[test]
    fn missing_custom_file_is_fatal() {
        let opts = ResolveOptions {
            config_file: Some("/nonexistent/custom.yaml".into()),
            ..ResolveOptions::default()
        };
        let locator = MockPackageLocator::new();
        let err = load_custom(&opts, &defaults(), &locator, &MemoryLog::new()).unwrap_err();
        assert!(matches!(err, ResolveError::Config(_)));
    }
}
