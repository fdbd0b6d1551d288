//! Privilege elevation for tasks marked `privileged`.
//!
//! Elevation is acquired at most once per run, the first time a privileged
//! task starts. Later privileged tasks reuse the outcome, including a failure.
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::ExecError;
use crate::exec::{Executor, Invocation};
use crate::logging::Log;

/// Source of a `sudo` askpass helper.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialPrompt: Send + Sync {
    /// Program `sudo -A` should run to ask for the password.
    fn askpass(&self) -> Option<PathBuf>;
}

/// Reads the helper from `SUDO_ASKPASS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvAskpass;

impl CredentialPrompt for EnvAskpass {
    fn askpass(&self) -> Option<PathBuf> {
        std::env::var_os("SUDO_ASKPASS")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}

/// How privileged tasks are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Already running as root.
    Root,
    /// Through `sudo` with cached credentials.
    Sudo,
}

/// Acquires elevation once and shares it between task threads.
pub struct PrivilegeBroker<'a> {
    prompt: &'a dyn CredentialPrompt,
    state: OnceLock<Result<Elevation, String>>,
}

impl std::fmt::Debug for PrivilegeBroker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivilegeBroker")
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl<'a> PrivilegeBroker<'a> {
    /// Broker asking `prompt` for a password helper when needed.
    #[must_use]
    pub const fn new(prompt: &'a dyn CredentialPrompt) -> Self {
        Self {
            prompt,
            state: OnceLock::new(),
        }
    }

    /// Elevation for a privileged task.
    ///
    /// Concurrent callers wait for the first acquisition to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Elevation`] if neither root nor `sudo` access is
    /// available.
    pub fn elevate(&self, executor: &dyn Executor, log: &dyn Log) -> Result<Elevation, ExecError> {
        self.state
            .get_or_init(|| self.acquire(executor, log))
            .clone()
            .map_err(ExecError::Elevation)
    }

    fn acquire(&self, executor: &dyn Executor, log: &dyn Log) -> Result<Elevation, String> {
        let uid = executor
            .run_unchecked(&Invocation::new("id").args(["-u"]))
            .map_err(|e| e.to_string())?;
        if uid.success && uid.stdout.trim() == "0" {
            log.debug("Running as root, privileged tasks run directly");
            return Ok(Elevation::Root);
        }
        if executor.which("sudo").is_none() {
            return Err("not running as root and sudo is not installed".to_string());
        }
        let cached = executor
            .run_unchecked(&Invocation::new("sudo").args(["-n", "-v"]))
            .map_err(|e| e.to_string())?;
        if cached.success {
            log.debug("Using cached sudo credentials");
            return Ok(Elevation::Sudo);
        }
        let Some(askpass) = self.prompt.askpass() else {
            return Err("sudo needs a password and SUDO_ASKPASS is not set".to_string());
        };
        log.info("Privileged tasks need sudo, asking for the password");
        let prompted = executor
            .run_unchecked(
                &Invocation::new("sudo")
                    .args(["-A", "-v"])
                    .env("SUDO_ASKPASS", askpass),
            )
            .map_err(|e| e.to_string())?;
        if prompted.success {
            Ok(Elevation::Sudo)
        } else {
            Err(format!("sudo authentication failed: {}", prompted.stderr.trim()))
        }
    }
}

/// Run `invocation` with `elevation`.
#[must_use]
pub fn wrap(invocation: Invocation, elevation: Elevation) -> Invocation {
    match elevation {
        Elevation::Root => invocation,
        Elevation::Sudo => invocation.wrapped("sudo", ["-n", "-E", "--"]),
    }
}
