//! Command: resolve the selected tasks and run them.
use anyhow::Result;

use crate::cli::RunOpts;
use crate::config::{PackageLocator, SearchPathLocator};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Logger;
use crate::resolver::ResolvedTask;
use crate::scheduler::{self, CredentialPrompt, EnvAskpass, TaskOutcome};

/// Run the `run` command against the real system.
///
/// # Errors
///
/// Returns an error if resolution fails or any task failed.
pub fn run(opts: &RunOpts, log: &Logger) -> Result<String> {
    run_with(opts, &SearchPathLocator::from_env(), &SystemExecutor, &EnvAskpass, log)
}

/// Run the `run` command with explicit collaborators.
///
/// # Errors
///
/// Returns an error if resolution fails or any task failed.
pub fn run_with(
    opts: &RunOpts,
    locator: &dyn PackageLocator,
    executor: &dyn Executor,
    prompt: &dyn CredentialPrompt,
    log: &Logger,
) -> Result<String> {
    log.info(&format!("provision {}", super::VERSION));
    let tasks = super::resolve_plan(&opts.select, locator, log)?;
    let outcomes = execute(&tasks, executor, prompt, log)?;
    Ok(format!("{} task(s) succeeded", outcomes.len()))
}

/// Run resolved tasks, print the summary and bail if any task failed.
///
/// # Errors
///
/// Returns an error naming the number of failed tasks.
pub fn execute(
    tasks: &[ResolvedTask],
    executor: &dyn Executor,
    prompt: &dyn CredentialPrompt,
    log: &Logger,
) -> Result<Vec<TaskOutcome>> {
    let outcomes = scheduler::run_tasks(tasks, executor, prompt, log);
    log.print_summary();

    let count = outcomes.iter().filter(|o| !o.success).count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(outcomes)
}
