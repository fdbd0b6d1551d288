//! Log directory layout, timestamps and ANSI stripping.
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Name format of a run's log directory.
const RUN_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Timestamp in the `run.log` header.
pub(super) const HEADER_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";
/// Timestamp prefixed to each `run.log` line.
pub(super) const LINE_FORMAT: &str = "%H:%M:%S";

#[allow(clippy::expect_used)]
static ANSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").expect("ANSI pattern is valid"));

/// Remove CSI escape sequences (colors, cursor movement) from `s`.
pub(super) fn strip_ansi(s: &str) -> String {
    ANSI.replace_all(s, "").into_owned()
}

/// Local time in `format`.
pub(super) fn now(format: &str) -> String {
    chrono::Local::now().format(format).to_string()
}

fn non_empty_var(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Root directory holding one sub-directory per run.
///
/// `PROVISION_LOG_DIR` wins; otherwise `$XDG_CACHE_HOME/provision/logs`
/// (default `~/.cache/provision/logs`).
fn log_root() -> PathBuf {
    if let Some(dir) = non_empty_var("PROVISION_LOG_DIR") {
        return dir;
    }
    let cache = non_empty_var("XDG_CACHE_HOME").unwrap_or_else(|| {
        non_empty_var("HOME")
            .or_else(|| non_empty_var("USERPROFILE"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cache")
    });
    cache.join("provision").join("logs")
}

/// Directory for the current run: `<log root>/<YYYYmmdd_HHMMSS>`.
///
/// The directory is not created here.
#[must_use]
pub fn run_log_dir() -> PathBuf {
    log_root().join(now(RUN_DIR_FORMAT))
}
