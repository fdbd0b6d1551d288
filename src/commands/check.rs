//! Command: check task scripts for blocks that break task extraction.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;

use crate::cli::CheckOpts;
use crate::logging::Logger;
use crate::scripts::{HealthViolation, check_script, language};

/// Result of checking one script.
#[derive(Debug)]
pub struct ScriptReport {
    /// Checked script.
    pub path: PathBuf,
    /// Violations, or the reason the script could not be analyzed.
    pub result: Result<Vec<HealthViolation>, String>,
}

impl ScriptReport {
    /// Whether the script passed.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.result.as_ref().is_ok_and(Vec::is_empty)
    }
}

/// Run the `check` command.
///
/// # Errors
///
/// Returns an error if any script is unhealthy or unreadable.
pub fn run(opts: &CheckOpts, log: &Logger) -> Result<String> {
    log.stage("Checking scripts");
    let scripts = collect_scripts(&opts.paths, log);
    log.debug(&format!("{} script(s) found", scripts.len()));

    let reports = check_all(&scripts);
    let mut failed = 0usize;
    for report in &reports {
        match &report.result {
            Ok(violations) if violations.is_empty() => {
                log.debug(&format!("{}: ok", report.path.display()));
            }
            Ok(violations) => {
                failed += 1;
                for violation in violations {
                    log.error(&format!("{}: {violation}", report.path.display()));
                }
            }
            Err(err) => {
                failed += 1;
                log.error(&format!("{}: {err}", report.path.display()));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} script(s) failed the health check", reports.len());
    }
    Ok(format!("{} script(s) passed the health check", reports.len()))
}

/// Check every script in parallel. Reports keep the order of `scripts`.
#[must_use]
pub fn check_all(scripts: &[PathBuf]) -> Vec<ScriptReport> {
    scripts
        .par_iter()
        .map(|path| ScriptReport {
            path: path.clone(),
            result: check_script(path).map_err(|e| e.to_string()),
        })
        .collect()
}

/// Supported scripts named by `paths`, searching directories recursively.
///
/// Hidden directories are skipped. Explicit file arguments are kept even
/// without a supported extension so that they are reported.
#[must_use]
pub fn collect_scripts(paths: &[PathBuf], log: &Logger) -> Vec<PathBuf> {
    let mut scripts = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, &mut scripts, log);
        } else {
            scripts.push(path.clone());
        }
    }
    scripts.sort();
    scripts.dedup();
    scripts
}

fn walk(dir: &Path, scripts: &mut Vec<PathBuf>, log: &Logger) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log.warn(&format!("Cannot read {}: {e}", dir.display()));
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if path.is_dir() {
            if !hidden {
                walk(&path, scripts, log);
            }
        } else if language::for_path(&path).is_ok() {
            scripts.push(path);
        }
    }
}
