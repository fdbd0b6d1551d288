//! Subcommand orchestration.
pub mod check;
pub mod plan;
pub mod run;

use anyhow::Result;

use crate::cli::SelectOpts;
use crate::config::PackageLocator;
use crate::logging::Logger;
use crate::resolver::{self, ResolvedTask};

/// Release version, or the crate version for local builds.
pub const VERSION: &str = match option_env!("PROVISION_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Resolve the tasks selected by `select`.
///
/// # Errors
///
/// Returns an error for every fatal resolution problem.
pub fn resolve_plan(
    select: &SelectOpts,
    locator: &dyn PackageLocator,
    log: &Logger,
) -> Result<Vec<ResolvedTask>> {
    log.stage("Resolving tasks");
    let opts = select.resolve_options();
    log.debug(&format!("default config: {}", opts.default_config.display()));
    let tasks = resolver::resolve(&opts, log, locator)?;
    log.info(&format!("{} task(s) enabled", tasks.len()));
    Ok(tasks)
}
