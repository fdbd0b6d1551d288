//! Typed task record built from a backfilled task mapping.
use serde_yaml::{Mapping, Value};

use super::schema::get_path;

/// Argument policy and values of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskArgs {
    /// Whitelist; `None` means any argument is accepted.
    pub allowed: Option<Vec<String>>,
    /// Arguments from the default configuration.
    pub default: Vec<String>,
    /// Arguments from the custom configuration or inline spec.
    pub custom: Vec<String>,
    /// Use only the custom arguments.
    pub override_default: bool,
}

impl TaskArgs {
    /// Arguments the task runs with: custom followed by default, or custom
    /// alone when `override_default` is set.
    #[must_use]
    pub fn effective(&self) -> Vec<String> {
        let mut args = self.custom.clone();
        if !self.override_default {
            args.extend(self.default.iter().cloned());
        }
        args
    }
}

/// One task after all configuration layers have been merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    /// Task name (the key in the configuration).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Script path; `None` if it was null or an unresolvable package path.
    pub script: Option<String>,
    /// Function inside the script, if the task is function-bound.
    pub function: Option<String>,
    /// Per-task configuration file, relative to the configuration directory.
    pub config_file: Option<String>,
    /// Tasks that must finish first.
    pub depends_on: Vec<String>,
    /// Tasks disabled when this one is enabled.
    pub supersedes: Vec<String>,
    /// Whether the task runs with elevated privileges.
    pub privileged: bool,
    /// Whether the task is scheduled.
    pub enabled: bool,
    /// Argument policy and values.
    pub args: TaskArgs,
}

impl TaskDefinition {
    /// Build a task from a mapping whose fields have been backfilled.
    ///
    /// Fields of the wrong shape fall back to their empty value.
    #[must_use]
    pub fn from_mapping(name: &str, task: &Mapping) -> Self {
        Self {
            name: name.to_string(),
            description: string(task, "description").unwrap_or_default(),
            script: string(task, "script"),
            function: string(task, "function"),
            config_file: string(task, "config_file"),
            depends_on: strings(task, "depends_on").unwrap_or_default(),
            supersedes: strings(task, "supersedes").unwrap_or_default(),
            privileged: boolean(task, "privileged"),
            enabled: boolean(task, "enabled"),
            args: TaskArgs {
                allowed: strings(task, "args.allowed"),
                default: strings(task, "args.default").unwrap_or_default(),
                custom: strings(task, "args.custom").unwrap_or_default(),
                override_default: boolean(task, "args.override_default"),
            },
        }
    }
}

fn string(task: &Mapping, path: &str) -> Option<String> {
    get_path(task, path)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn strings(task: &Mapping, path: &str) -> Option<Vec<String>> {
    get_path(task, path)?.as_sequence().map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect()
    })
}

fn boolean(task: &Mapping, path: &str) -> bool {
    get_path(task, path)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn effective_args_combine_custom_then_default() {
        let args = TaskArgs {
            allowed: None,
            default: vec!["--d".to_string()],
            custom: vec!["--c".to_string()],
            override_default: false,
        };
        assert_eq!(args.effective(), vec!["--c", "--d"]);
    }

    #[test]
    fn effective_args_override_default() {
        let args = TaskArgs {
            allowed: None,
            default: vec!["--d".to_string()],
            custom: vec!["--c".to_string()],
            override_default: true,
        };
        assert_eq!(args.effective(), vec!["--c"]);
    }

    #[test]
    fn from_mapping_reads_nested_fields() {
        let map: Mapping = serde_yaml::from_str(
            "description: d\nscript: /s/a.py\nfunction: null\ndepends_on: [x]\n\
             privileged: true\nenabled: true\nargs:\n  allowed: null\n  default: [--a]\n",
        )
        .unwrap();
        let task = TaskDefinition::from_mapping("t", &map);
        assert_eq!(task.script.as_deref(), Some("/s/a.py"));
        assert_eq!(task.function, None);
        assert_eq!(task.depends_on, vec!["x"]);
        assert!(task.privileged && task.enabled);
        assert_eq!(task.args.allowed, None);
        assert_eq!(task.args.default, vec!["--a"]);
    }
}
