//! Process execution behind the [`Executor`] trait.
//!
//! The scheduler only talks to an [`Executor`]; production code uses
//! [`SystemExecutor`], tests use `MockExecutor`.
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStdout, Command, Output, Stdio};

use crate::error::ExecError;

/// A program with its arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run, looked up on `PATH` when not a path.
    pub program: OsString,
    /// Arguments.
    pub args: Vec<OsString>,
    /// Variables added to the inherited environment.
    pub env: Vec<(String, OsString)>,
}

impl Invocation {
    /// Invocation of `program` without arguments.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    /// Run this invocation through `program` with `prefix` arguments, e.g.
    /// `sudo -n -- <program> <args>`. The environment is kept.
    #[must_use]
    pub fn wrapped<I, S>(self, program: &str, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut args: Vec<OsString> = prefix.into_iter().map(Into::into).collect();
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: program.into(),
            args,
            env: self.env,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (OsStr::new(k), v)));
        cmd
    }

    fn label(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of a command execution with captured output.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Exit status of a process whose output went to a logfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

/// Runs external processes.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run `invocation` with stdout and stderr written to `logfile`.
    ///
    /// Every stdout line is also passed to `on_line`, without its line
    /// terminator.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::LogFile`] if the logfile cannot be created or
    /// written and [`ExecError::Spawn`] if the process cannot be started.
    /// A non-zero exit is not an error.
    fn run_logged(
        &self,
        invocation: &Invocation,
        logfile: &Path,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ExitInfo, ExecError>;

    /// Run `invocation` and capture its output.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] if the process cannot be started.
    fn run_unchecked(&self, invocation: &Invocation) -> Result<ExecResult, ExecError>;

    /// Full path of `program` on `PATH`.
    fn which(&self, program: &str) -> Option<PathBuf>;
}

/// [`Executor`] spawning real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_logged(
        &self,
        invocation: &Invocation,
        logfile: &Path,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ExitInfo, ExecError> {
        let log_err = |e| ExecError::LogFile {
            path: logfile.display().to_string(),
            source: e,
        };
        let mut file = File::create(logfile).map_err(log_err)?;
        let stderr = file.try_clone().map_err(log_err)?;
        let spawn_err = |e| ExecError::Spawn {
            program: invocation.label(),
            source: e,
        };

        let mut child = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(spawn_err)?;

        if let Some(stdout) = child.stdout.take()
            && let Err(e) = stream_lines(stdout, &mut file, on_line, &spawn_err, &log_err)
        {
            // The child must not outlive its task.
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let status = child.wait().map_err(spawn_err)?;
        Ok(ExitInfo {
            success: status.success(),
            code: status.code(),
        })
    }

    fn run_unchecked(&self, invocation: &Invocation) -> Result<ExecResult, ExecError> {
        let output = invocation
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExecError::Spawn {
                program: invocation.label(),
                source: e,
            })?;
        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Copy `stdout` to `file` line by line, handing each line to `on_line`.
fn stream_lines(
    stdout: ChildStdout,
    file: &mut File,
    on_line: &mut dyn FnMut(&str),
    read_err: &dyn Fn(std::io::Error) -> ExecError,
    write_err: &dyn Fn(std::io::Error) -> ExecError,
) -> Result<(), ExecError> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(read_err)? == 0 {
            return Ok(());
        }
        file.write_all(&buf).map_err(write_err)?;
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\n', '\r']));
    }
}

/// Scripted [`Executor`] for tests.
///
/// Programs are found on a fake `PATH`; every run is recorded and answered
/// with the configured output lines and exit code.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockExecutor {
    programs: std::collections::HashMap<String, PathBuf>,
    responses: std::collections::HashMap<String, (Vec<String>, i32)>,
    runs: std::sync::Mutex<Vec<Invocation>>,
}

#[cfg(test)]
impl MockExecutor {
    /// Create a mock with no programs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `program` resolvable at `/usr/bin/<program>`.
    #[must_use]
    pub fn with_program(mut self, program: &str) -> Self {
        self.programs
            .insert(program.to_string(), PathBuf::from(format!("/usr/bin/{program}")));
        self
    }

    /// Answer invocations whose arguments contain `needle` with `lines` on
    /// stdout and exit code `code`.
    #[must_use]
    pub fn with_response(mut self, needle: &str, lines: &[&str], code: i32) -> Self {
        self.responses.insert(
            needle.to_string(),
            (lines.iter().map(ToString::to_string).collect(), code),
        );
        self
    }

    /// Every invocation run so far, in order.
    #[must_use]
    pub fn runs(&self) -> Vec<Invocation> {
        self.runs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn respond(&self, invocation: &Invocation) -> (Vec<String>, i32) {
        self.runs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(invocation.clone());
        let text = invocation.to_string();
        self.responses
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map_or_else(|| (Vec::new(), 0), |(_, r)| r.clone())
    }
}

#[cfg(test)]
impl Executor for MockExecutor {
    fn run_logged(
        &self,
        invocation: &Invocation,
        logfile: &Path,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ExitInfo, ExecError> {
        let (lines, code) = self.respond(invocation);
        std::fs::write(logfile, lines.join("\n")).map_err(|e| ExecError::LogFile {
            path: logfile.display().to_string(),
            source: e,
        })?;
        for line in &lines {
            on_line(line);
        }
        Ok(ExitInfo {
            success: code == 0,
            code: Some(code),
        })
    }

    fn run_unchecked(&self, invocation: &Invocation) -> Result<ExecResult, ExecError> {
        let (lines, code) = self.respond(invocation);
        Ok(ExecResult {
            stdout: lines.join("\n"),
            stderr: String::new(),
            success: code == 0,
            code: Some(code),
        })
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        self.programs.get(program).cloned()
    }
}
