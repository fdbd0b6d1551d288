//! Loading and validation of the default configuration.
//!
//! Every problem found here is fatal: the default configuration ships with
//! the task scripts and has to be internally consistent.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

use super::args::disallowed_args;
use crate::config::loader::kind_name;
use crate::config::schema::{self, Layer, Presence};
use crate::config::{DEFAULTS_KEY, PackageLocator, RESERVED_PREFIX, TaskDefinition, load_yaml, overlay};
use crate::error::{ConfigError, ResolveError};
use crate::logging::Log;
use crate::scripts::Command;

/// Raw task mappings by name, in configuration order.
pub type TaskMappings = IndexMap<String, Mapping>;

/// Load the default configuration at `path` and validate every task.
///
/// The `_defaults` entry is merged under each task and other `_`-prefixed
/// keys are dropped. Relative script paths are resolved against the
/// directory of `path`. Optional fields are backfilled, so the result can be
/// used as the base layer for `"default"` sentinels.
///
/// # Errors
///
/// Returns the first fatal [`ResolveError`] found.
pub fn load_defaults(
    path: &Path,
    locator: &dyn PackageLocator,
    log: &dyn Log,
) -> Result<TaskMappings, ResolveError> {
    log.debug(&format!("Loading default config {}", path.display()));
    let raw = load_yaml(path, locator)?;
    let mut tasks = collect_tasks(&raw, path)?;

    let problems: Vec<String> = tasks
        .iter()
        .flat_map(|(name, task)| {
            schema::validate(task, Layer::Default)
                .into_iter()
                .map(move |p| format!("{name}: {p}"))
        })
        .collect();
    if !problems.is_empty() {
        return Err(ResolveError::Schema { problems });
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut commands: HashMap<Command, String> = HashMap::new();
    for (name, task) in &mut tasks {
        schema::backfill(task, |spec| spec.default_config != Presence::Forbidden);
        let def = TaskDefinition::from_mapping(name, task);
        if def.description.trim().is_empty() {
            return Err(ResolveError::EmptyDescription { task: name.clone() });
        }
        let script = resolve_script(name, task, base_dir)?;
        task.insert(
            Value::String("script".to_string()),
            Value::String(script.display().to_string()),
        );

        let command = Command::new(script, def.function.clone());
        if let Some(other) = commands.get(&command) {
            return Err(ResolveError::DuplicateCommand {
                task: name.clone(),
                other: other.clone(),
                command: command.to_string(),
            });
        }
        command.validate().map_err(|source| ResolveError::Script {
            task: name.clone(),
            source,
        })?;
        commands.insert(command, name.clone());

        let wrong = disallowed_args(def.args.allowed.as_deref(), &def.args.default);
        if !wrong.is_empty() {
            return Err(ResolveError::DisallowedDefaultArgs {
                task: name.clone(),
                args: wrong.into_iter().map(ToString::to_string).collect(),
                allowed: def.args.allowed.unwrap_or_default(),
            });
        }
    }

    for (name, task) in &tasks {
        let def = TaskDefinition::from_mapping(name, task);
        if let Some(dep) = def.depends_on.iter().find(|d| !tasks.contains_key(*d)) {
            return Err(ResolveError::UnknownDependency {
                task: name.clone(),
                dependency: dep.clone(),
            });
        }
    }

    log.debug("Default config file is valid");
    Ok(tasks)
}

/// Split the top level into task mappings with `_defaults` merged under
/// each.
fn collect_tasks(raw: &Mapping, path: &Path) -> Result<TaskMappings, ResolveError> {
    let source = path.display().to_string();
    if raw.is_empty() {
        return Err(ConfigError::Empty(source).into());
    }
    let defaults = match raw.get(DEFAULTS_KEY) {
        None => Mapping::new(),
        Some(Value::Mapping(map)) => map.clone(),
        Some(other) => {
            return Err(ResolveError::Schema {
                problems: vec![format!(
                    "{DEFAULTS_KEY}: must be a mapping, found a {}",
                    kind_name(other)
                )],
            });
        }
    };

    let mut tasks = TaskMappings::new();
    let mut problems = Vec::new();
    for (key, value) in raw {
        let Some(name) = key.as_str() else {
            problems.push(format!("task names must be strings, found a {}", kind_name(key)));
            continue;
        };
        if name.starts_with(RESERVED_PREFIX) {
            continue;
        }
        match value {
            Value::Mapping(task) => {
                tasks.insert(name.to_string(), overlay(&defaults, task, false));
            }
            other => problems.push(format!(
                "{name}: task must be a mapping, found a {}",
                kind_name(other)
            )),
        }
    }
    if !problems.is_empty() {
        return Err(ResolveError::Schema { problems });
    }
    if tasks.is_empty() {
        return Err(ConfigError::Empty(source).into());
    }
    Ok(tasks)
}

/// Absolute, existing script path of a task.
fn resolve_script(name: &str, task: &Mapping, base_dir: &Path) -> Result<PathBuf, ResolveError> {
    let script = schema::get_path(task, "script")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ResolveError::UnresolvedScript {
            task: name.to_string(),
        })?;
    let path = base_dir.join(script);
    if !path.is_file() {
        return Err(ResolveError::MissingScript {
            task: name.to_string(),
            script: path.display().to_string(),
        });
    }
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::package_path::MockPackageLocator;
    use crate::logging::MemoryLog;
    use std::fs;

    const TOOLS: &str = "install() {\n  :\n}\n\nconfigure() {\n  :\n}\n";
    const MAIN: &str = "run() {\n  :\n}\n\nif [[ \"${BASH_SOURCE[0]}\" == \"$0\" ]]; then\n  run \"$@\"\nfi\n";

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("tools.bash"), TOOLS).unwrap();
            fs::write(dir.path().join("main.bash"), MAIN).unwrap();
            Self { dir }
        }

        fn load(&self, yaml: &str) -> Result<TaskMappings, ResolveError> {
            let path = self.dir.path().join("default.yaml");
            fs::write(&path, yaml).unwrap();
            let mut locator = MockPackageLocator::new();
            locator.expect_locate().returning(|_| None);
            load_defaults(&path, &locator, &MemoryLog::new())
        }
    }

    #[test]
    fn defaults_are_merged_and_helpers_skipped() {
        let fx = Fixture::new();
        let tasks = fx
            .load(
                "_defaults:\n  script: tools.bash\n  privileged: true\n_anchors: {}\n\
                 install:\n  description: Install\n  function: install\n\
                 configure:\n  description: Configure\n  function: configure\n  privileged: false\n",
            )
            .unwrap();
        assert_eq!(tasks.keys().collect::<Vec<_>>(), vec!["install", "configure"]);
        let install = TaskDefinition::from_mapping("install", &tasks["install"]);
        assert!(install.privileged);
        assert_eq!(
            install.script.as_deref(),
            Some(fx.dir.path().join("tools.bash").display().to_string().as_str())
        );
        assert_eq!(install.depends_on, Vec::<String>::new());
        let configure = TaskDefinition::from_mapping("configure", &tasks["configure"]);
        assert!(!configure.privileged);
    }

    #[test]
    fn empty_config_is_fatal() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.load(""),
            Err(ResolveError::Config(ConfigError::Empty(_)))
        ));
        assert!(matches!(
            fx.load("_defaults:\n  privileged: true\n"),
            Err(ResolveError::Config(ConfigError::Empty(_)))
        ));
    }

    #[test]
    fn missing_file_is_fatal() {
        let fx = Fixture::new();
        let locator = MockPackageLocator::new();
        let err = load_defaults(&fx.dir.path().join("nope.yaml"), &locator, &MemoryLog::new())
            .unwrap_err();
        assert!(matches!(err, ResolveError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn schema_problems_are_collected() {
        let fx = Fixture::new();
        let err = fx
            .load("a:\n  script: main.bash\n  colour: red\nb: [1.0]\n")
            .unwrap_err();
        let ResolveError::Schema { problems } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(problems, vec!["b: task must be a mapping, found a sequence"]);

        let err = fx.load("a:\n  script: main.bash\n  colour: red\n").unwrap_err();
        let ResolveError::Schema { problems } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(
            problems,
            vec![
                "a: unknown field 'colour'",
                "a: missing required field 'description'"
            ]
        );
    }

    #[test]
    fn empty_description_is_fatal() {
        let fx = Fixture::new();
        let err = fx.load("a:\n  description: ' '\n  script: main.bash\n").unwrap_err();
        assert!(matches!(err, ResolveError::EmptyDescription { .. }));
    }

    #[test]
    fn unresolved_and_missing_scripts_are_fatal() {
        let fx = Fixture::new();
        let err = fx
            .load("a:\n  description: d\n  script: package://gone/a.bash\n")
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvedScript { .. }));

        let err = fx.load("a:\n  description: d\n  script: other.bash\n").unwrap_err();
        assert!(matches!(err, ResolveError::MissingScript { .. }));
    }

    #[test]
    fn duplicate_command_is_fatal() {
        let fx = Fixture::new();
        let err = fx
            .load(
                "a:\n  description: d\n  script: tools.bash\n  function: install\n\
                 b:\n  description: d\n  script: tools.bash\n  function: install\n",
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DuplicateCommand { ref task, ref other, .. } if task == "b" && other == "a"
        ));
    }

    #[test]
    fn missing_function_and_entrypoint_are_fatal() {
        let fx = Fixture::new();
        let err = fx
            .load("a:\n  description: d\n  script: tools.bash\n  function: remove\n")
            .unwrap_err();
        assert!(err.to_string().contains("'remove' function not found"));

        let err = fx.load("a:\n  description: d\n  script: tools.bash\n").unwrap_err();
        assert!(err.to_string().contains("found 0"));
    }

    #[test]
    fn unknown_dependency_is_fatal() {
        let fx = Fixture::new();
        let err = fx
            .load("a:\n  description: d\n  script: main.bash\n  depends_on: [ghost]\n")
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownDependency { ref dependency, .. } if dependency == "ghost"));
    }

    #[test]
    fn default_args_must_pass_own_whitelist() {
        let fx = Fixture::new();
        let err = fx
            .load(
                "a:\n  description: d\n  script: main.bash\n  args:\n    allowed: ['--opt*']\n    default: [--optx, --bar]\n",
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Task 'a': some default args (--bar) are not in allowed args (--opt*)"
        );
    }
}
