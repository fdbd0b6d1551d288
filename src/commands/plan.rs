//! Command: resolve the selected tasks and print the plan without running it.
use std::io::Write as _;

use anyhow::{Context as _, Result};

use crate::cli::PlanOpts;
use crate::config::{PackageLocator, SearchPathLocator};
use crate::logging::Logger;
use crate::resolver::ResolvedTask;

/// Run the `plan` command.
///
/// # Errors
///
/// Returns an error if resolution fails or the JSON plan cannot be written.
pub fn run(opts: &PlanOpts, log: &Logger) -> Result<String> {
    run_with(opts, &SearchPathLocator::from_env(), log)
}

/// Run the `plan` command with an explicit package locator.
///
/// # Errors
///
/// Returns an error if resolution fails or the JSON plan cannot be written.
pub fn run_with(opts: &PlanOpts, locator: &dyn PackageLocator, log: &Logger) -> Result<String> {
    let tasks = super::resolve_plan(&opts.select, locator, log)?;
    if opts.json {
        let json = to_json(&tasks)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}").context("writing plan to stdout")?;
    } else {
        log.stage("Plan");
        for line in render(&tasks).lines() {
            log.info(line);
        }
    }
    Ok(format!("{} task(s) planned", tasks.len()))
}

/// Pretty-printed JSON array of the plan.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(tasks: &[ResolvedTask]) -> Result<String> {
    serde_json::to_string_pretty(tasks).context("serializing plan")
}

/// Human-readable plan, one numbered entry per task in plan order.
#[must_use]
pub fn render(tasks: &[ResolvedTask]) -> String {
    let mut out = String::new();
    for (i, task) in tasks.iter().enumerate() {
        out.push_str(&format!("{}. {}: {}\n", i + 1, task.name, task.description));
        out.push_str(&format!("   command: {}\n", task.command));
        if !task.args.is_empty() {
            out.push_str(&format!("   args: {}\n", task.args.join(" ")));
        }
        if let Some(config) = &task.config_file {
            out.push_str(&format!("   config: {}\n", config.display()));
        }
        if !task.depends_on.is_empty() {
            out.push_str(&format!("   after: {}\n", task.depends_on.join(", ")));
        }
        if task.privileged {
            out.push_str("   privileged\n");
        }
    }
    out
}
