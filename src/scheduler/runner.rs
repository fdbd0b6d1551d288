//! Running a single resolved task.
use std::fs;

use super::privilege::{self, PrivilegeBroker};
use super::{CONFIG_FILE_ENV, TaskOutcome, steps};
use crate::error::ExecError;
use crate::exec::{Executor, Invocation};
use crate::logging::{Logger, TaskId};
use crate::resolver::ResolvedTask;

/// Build the process invocation of `task`.
///
/// # Errors
///
/// Fails if the script language is unknown, its interpreter is not on
/// `PATH`, or a privileged task cannot be elevated.
pub fn invocation(
    task: &ResolvedTask,
    executor: &dyn Executor,
    broker: &PrivilegeBroker<'_>,
    log: &Logger,
) -> Result<Invocation, ExecError> {
    let language = task.command.language()?;
    let interpreter =
        executor
            .which(language.interpreter())
            .ok_or(ExecError::InterpreterNotFound {
                language: language.name(),
                program: language.interpreter(),
            })?;
    let mut inv = Invocation::new(interpreter).args(language.invocation_args(
        &task.command.script,
        task.command.function.as_deref(),
        &task.args,
    ));
    if let Some(config) = &task.config_file {
        inv = inv.env(CONFIG_FILE_ENV, config.as_os_str());
    }
    if task.privileged {
        inv = privilege::wrap(inv, broker.elevate(executor, log)?);
    }
    Ok(inv)
}

/// Run `task` to completion and record the result under `id`.
pub fn run_task(
    task: &ResolvedTask,
    id: TaskId,
    executor: &dyn Executor,
    broker: &PrivilegeBroker<'_>,
    log: &Logger,
) -> TaskOutcome {
    let logfile = log
        .logfile(id)
        .unwrap_or_else(|| log.log_dir().join(format!("{}.log", task.name)));
    let result = invocation(task, executor, broker, log).and_then(|inv| {
        log.debug(&format!("Task '{}': {inv}", task.name));
        executor.run_logged(&inv, &logfile, &mut |line: &str| {
            steps::apply(line, id, log);
        })
    });

    let (success, exit_code) = match result {
        Ok(exit) => {
            if !exit.success {
                log.debug(&format!(
                    "Task '{}' exited with code {}",
                    task.name,
                    exit.code
                        .map_or_else(|| "none (signal)".to_string(), |c| format!("{c}"))
                ));
            }
            (exit.success, exit.code)
        }
        Err(err) => {
            log.error(&format!("Task '{}': {err}", task.name));
            if let Err(e) = fs::write(&logfile, format!("{err}\n")) {
                log.debug(&format!("Cannot write {}: {e}", logfile.display()));
            }
            (false, None)
        }
    };
    log.finish_task(id, success);
    TaskOutcome {
        name: task.name.clone(),
        success,
        exit_code,
        logfile,
    }
}
