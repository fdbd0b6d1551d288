//! Concurrent execution of resolved tasks.
//!
//! Every task gets its own thread. A thread waits until all of its
//! dependencies have finished, successfully or not, then runs its command
//! with output going to `<log_dir>/<task>.log`. Progress is reported through
//! the [`Logger`] task table using the step protocol in [`steps`].
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::thread;

use serde::Serialize;

use crate::exec::Executor;
use crate::logging::{Logger, TaskId};
use crate::resolver::ResolvedTask;

pub mod privilege;
pub mod runner;
pub mod steps;
pub mod tracker;

pub use privilege::{CredentialPrompt, Elevation, EnvAskpass, PrivilegeBroker};
pub use tracker::CompletionTracker;

/// Environment variable holding the absolute path of a task's config file.
pub const CONFIG_FILE_ENV: &str = "PROVISION_CONFIG_FILE";

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    /// Task name.
    pub name: String,
    /// Whether the task process exited successfully.
    pub success: bool,
    /// Exit code; `None` if the task never ran or was killed by a signal.
    pub exit_code: Option<i32>,
    /// File holding the task's output.
    pub logfile: PathBuf,
}

/// Run `tasks` concurrently, honouring their dependencies.
///
/// A task starts once every dependency that is part of `tasks` has finished.
/// A failed dependency does not prevent its dependents from running.
/// Outcomes are returned in the order of `tasks`.
pub fn run_tasks(
    tasks: &[ResolvedTask],
    executor: &dyn Executor,
    prompt: &dyn CredentialPrompt,
    log: &Logger,
) -> Vec<TaskOutcome> {
    log.stage("Running tasks");
    if let Err(e) = fs::create_dir_all(log.log_dir()) {
        log.warn(&format!(
            "Cannot create log directory {}: {e}",
            log.log_dir().display()
        ));
    }

    let ids: Vec<TaskId> = tasks
        .iter()
        .map(|t| log.add_task(&t.name, steps::step_total(&t.command)))
        .collect();
    let planned: HashSet<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let tracker = CompletionTracker::new();
    let broker = PrivilegeBroker::new(prompt);

    thread::scope(|s| {
        let handles: Vec<_> = tasks
            .iter()
            .zip(ids)
            .map(|(task, id)| {
                let deps: Vec<&str> = task
                    .depends_on
                    .iter()
                    .map(String::as_str)
                    .filter(|d| planned.contains(d))
                    .collect();
                let (tracker, broker) = (&tracker, &broker);
                let handle = s.spawn(move || {
                    let _finished = tracker.finish_on_drop(&task.name);
                    tracker.wait_for(&deps);
                    runner::run_task(task, id, executor, broker, log)
                });
                (task, id, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(task, id, handle)| {
                handle.join().unwrap_or_else(|_| {
                    log.error(&format!("Task '{}' panicked", task.name));
                    log.finish_task(id, false);
                    TaskOutcome {
                        name: task.name.clone(),
                        success: false,
                        exit_code: None,
                        logfile: log.logfile(id).unwrap_or_default(),
                    }
                })
            })
            .collect()
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::privilege::MockCredentialPrompt;
    use super::*;
    use crate::exec::MockExecutor;
    use crate::logging::{TaskStatus, isolated_logger};
    use crate::scripts::Command;
    use std::ffi::OsString;

    fn task(name: &str, depends_on: &[&str]) -> ResolvedTask {
        ResolvedTask {
            name: name.to_string(),
            description: format!("{name} task"),
            command: Command::new(format!("/scripts/{name}.bash"), None),
            config_file: None,
            depends_on: depends_on.iter().map(ToString::to_string).collect(),
            privileged: false,
            args: Vec::new(),
        }
    }

    fn no_prompt() -> MockCredentialPrompt {
        let mut prompt = MockCredentialPrompt::new();
        prompt.expect_askpass().never();
        prompt
    }

    fn script_of(run: &crate::exec::Invocation) -> String {
        run.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .find(|a| a.starts_with("/scripts/"))
            .unwrap()
    }

    #[test]
    fn dependencies_run_first() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::new().with_program("bash");
        let tasks = vec![task("a", &[]), task("b", &["a"]), task("c", &["b"])];
        let outcomes = run_tasks(&tasks, &executor, &no_prompt(), &log);

        assert!(outcomes.iter().all(|o| o.success));
        let order: Vec<String> = executor.runs().iter().map(script_of).collect();
        assert_eq!(
            order,
            vec!["/scripts/a.bash", "/scripts/b.bash", "/scripts/c.bash"]
        );
    }

    #[test]
    fn failed_dependency_does_not_block_dependents() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::new()
            .with_program("bash")
            .with_response("a.bash", &[], 3);
        let tasks = vec![task("a", &[]), task("b", &["a"])];
        let outcomes = run_tasks(&tasks, &executor, &no_prompt(), &log);

        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].exit_code, Some(3));
        assert!(outcomes[1].success);
        assert_eq!(log.failure_count(), 1);
    }

    #[test]
    fn dependencies_outside_the_plan_are_ignored() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::new().with_program("bash");
        let outcomes = run_tasks(&[task("b", &["gone"])], &executor, &no_prompt(), &log);
        assert!(outcomes[0].success);
    }

    #[test]
    fn missing_interpreter_fails_task() {
        let (log, tmp, _guard) = isolated_logger();
        let executor = MockExecutor::new();
        let outcomes = run_tasks(&[task("a", &[])], &executor, &no_prompt(), &log);

        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].exit_code, None);
        assert_eq!(outcomes[0].logfile, tmp.path().join("a.log"));
        let logged = fs::read_to_string(&outcomes[0].logfile).unwrap();
        assert!(logged.contains("Interpreter 'bash'"));
        assert!(executor.runs().is_empty());
    }

    #[test]
    fn config_file_is_exported() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::new().with_program("bash");
        let mut t = task("a", &[]);
        t.config_file = Some(PathBuf::from("/cfg/a.yaml"));
        t.args = vec!["--x".to_string()];
        let _ = run_tasks(&[t], &executor, &no_prompt(), &log);

        let run = &executor.runs()[0];
        assert_eq!(run.to_string(), "/usr/bin/bash /scripts/a.bash --x");
        assert_eq!(
            run.env,
            vec![(CONFIG_FILE_ENV.to_string(), OsString::from("/cfg/a.yaml"))]
        );
    }

    #[test]
    fn privileged_tasks_run_through_sudo() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::new()
            .with_program("bash")
            .with_program("sudo")
            .with_response("id -u", &["1000"], 0);
        let mut a = task("a", &[]);
        a.privileged = true;
        let mut b = task("b", &["a"]);
        b.privileged = true;
        let outcomes = run_tasks(&[a, b, task("c", &[])], &executor, &no_prompt(), &log);

        assert!(outcomes.iter().all(|o| o.success));
        let runs = executor.runs();
        let task_runs: Vec<String> = runs
            .iter()
            .filter(|r| r.args.iter().any(|a| a.to_string_lossy().starts_with("/scripts/")))
            .map(ToString::to_string)
            .collect();
        assert!(task_runs.contains(&"sudo -n -E -- /usr/bin/bash /scripts/a.bash".to_string()));
        assert!(task_runs.contains(&"sudo -n -E -- /usr/bin/bash /scripts/b.bash".to_string()));
        assert!(task_runs.contains(&"/usr/bin/bash /scripts/c.bash".to_string()));
        assert_eq!(runs.iter().filter(|r| r.to_string() == "id -u").count(), 1);
    }

    #[test]
    fn privileged_tasks_run_directly_as_root() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::new()
            .with_program("bash")
            .with_response("id -u", &["0"], 0);
        let mut a = task("a", &[]);
        a.privileged = true;
        let _ = run_tasks(&[a], &executor, &no_prompt(), &log);
        assert_eq!(
            executor.runs().last().unwrap().to_string(),
            "/usr/bin/bash /scripts/a.bash"
        );
    }

    #[test]
    fn step_markers_update_progress() {
        let (log, _tmp, _guard) = isolated_logger();
        let executor = MockExecutor::new().with_program("bash").with_response(
            "a.bash",
            &["__STEP__: one", "noise", "__STEP_NO_PROGRESS__: waiting"],
            0,
        );
        let outcomes = run_tasks(&[task("a", &[])], &executor, &no_prompt(), &log);
        assert!(outcomes[0].success);

        let progress = &log.task_progress()[0];
        assert_eq!(progress.status, TaskStatus::Succeeded);
        assert_eq!(progress.step.as_deref(), Some("waiting"));
        assert_eq!(progress.completed, progress.total);
        let logged = fs::read_to_string(&outcomes[0].logfile).unwrap();
        assert!(logged.contains("noise"));
    }
}
