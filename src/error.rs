//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors (e.g. [`ConfigError`],
//! [`ResolveError`]) while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ProvisionError
//! ├── Config(ConfigError)    — YAML loading and normalization
//! ├── Script(ScriptError)    — script analysis and task command validation
//! ├── Resolve(ResolveError)  — fatal task graph resolution failures
//! └── Exec(ExecError)        — process spawning, logfiles, privilege elevation
//! ```
//!
//! Only fatal conditions are errors. Problems that merely disable a task are
//! reported through [`Log::warn`](crate::logging::Log::warn) and never surface
//! here.

use thiserror::Error;

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Configuration loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Script analysis error.
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Fatal task resolution error.
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Task execution error.
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),
}

/// Errors that arise while reading and normalizing YAML configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// The configuration file could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid YAML.
    #[error("Invalid YAML in {file}: {message}")]
    Syntax {
        /// File (or inline source label) being parsed.
        file: String,
        /// Parser message.
        message: String,
    },

    /// A `!join` tag was applied to something other than a sequence of scalars.
    #[error("Invalid !join in {file}: {message}")]
    InvalidJoin {
        /// File (or inline source label) being parsed.
        file: String,
        /// What was wrong with the tagged node.
        message: String,
    },

    /// The document is valid YAML but contains nothing.
    #[error("Config file is empty: {0}")]
    Empty(String),

    /// The document's top level is not a mapping.
    #[error("Config file {file} does not define a mapping, but a {found}")]
    NotAMapping {
        /// File being parsed.
        file: String,
        /// Kind of value found instead.
        found: &'static str,
    },
}

/// Errors that arise while analyzing scripts or validating a task command.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The script extension has no registered language.
    #[error("Unsupported script type for {script} (supported extensions: {supported})")]
    Unsupported {
        /// Offending script path.
        script: String,
        /// Comma-separated list of supported extensions.
        supported: String,
    },

    /// The script could not be read.
    #[error("IO error reading script {path}: {source}")]
    Io {
        /// Script path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The named function is not a top-level function of the script.
    #[error("'{function}' function not found in script {script} (available functions: {})", .available.join(", "))]
    FunctionNotFound {
        /// Requested function.
        function: String,
        /// Script path.
        script: String,
        /// Top-level functions that do exist.
        available: Vec<String>,
    },

    /// The function signature is not a single catch-all parameter.
    #[error("'{function}' function in script {script} must ONLY capture a single variadic parameter (e.g. '*args') to be used as a task, found '({params})'")]
    InvalidSignature {
        /// Function name.
        function: String,
        /// Script path.
        script: String,
        /// Parameter list as written.
        params: String,
    },

    /// A functionless task's script does not have exactly one entrypoint.
    #[error("Expected exactly one entrypoint in script {script}, found {found}")]
    EntrypointCount {
        /// Script path.
        script: String,
        /// Number of entrypoint blocks found.
        found: usize,
    },
}

/// Fatal errors of the task graph resolver.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The default or custom configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Default-config tasks violate the field schema.
    #[error("Some tasks have extra or missing fields, or use incorrect types: {}", .problems.join("; "))]
    Schema {
        /// One entry per violation, prefixed with the task name.
        problems: Vec<String>,
    },

    /// A default-config task has an empty description.
    #[error("Task '{task}': description is empty")]
    EmptyDescription {
        /// Task name.
        task: String,
    },

    /// A task's script is null, empty, or an unresolvable package path.
    #[error("Task '{task}': script is either null, empty or uses a package that can't be found")]
    UnresolvedScript {
        /// Task name.
        task: String,
    },

    /// A task's script does not exist on disk.
    #[error("Task '{task}': '{script}' script does not exist")]
    MissingScript {
        /// Task name.
        task: String,
        /// Script path.
        script: String,
    },

    /// The script or function of a task is invalid.
    #[error("Task '{task}': {source}")]
    Script {
        /// Task name.
        task: String,
        /// Underlying script error.
        source: ScriptError,
    },

    /// Two tasks share the same (script, function) pair.
    #[error("Task '{task}': duplicate (script, function) pair: {command} (already used by '{other}')")]
    DuplicateCommand {
        /// Task name.
        task: String,
        /// Task that first declared the command.
        other: String,
        /// Rendered command.
        command: String,
    },

    /// A dependency names a task that does not exist.
    #[error("Dependency '{dependency}' for '{task}' not found - needs to be defined in config")]
    UnknownDependency {
        /// Dependent task.
        task: String,
        /// Missing dependency.
        dependency: String,
    },

    /// A task's default args are rejected by its own whitelist.
    #[error("Task '{task}': some default args ({}) are not in allowed args ({})", .args.join(", "), .allowed.join(", "))]
    DisallowedDefaultArgs {
        /// Task name.
        task: String,
        /// Rejected arguments.
        args: Vec<String>,
        /// The task's whitelist.
        allowed: Vec<String>,
    },

    /// The dependency graph is not acyclic.
    #[error("Dependency graph has cycles between: {}", format_cycles(.0))]
    DependencyCycle(Vec<Vec<String>>),

    /// A task's per-task config file does not exist.
    #[error("Config file '{path}' for task '{task}' does not exist")]
    MissingConfigFile {
        /// Task name.
        task: String,
        /// Resolved path that was looked up.
        path: String,
    },

    /// Every task ended up disabled.
    #[error("There are no enabled tasks (anymore). Nothing to do")]
    NoEnabledTasks,
}

/// Errors that arise while executing resolved tasks.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The language interpreter is not on PATH.
    #[error("Interpreter '{program}' for {language} scripts not found on PATH")]
    InterpreterNotFound {
        /// Language name.
        language: &'static str,
        /// Program that was looked up.
        program: &'static str,
    },

    /// The task process could not be started or waited on.
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        /// Program being launched.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The task logfile could not be created or written.
    #[error("Cannot write logfile {path}: {source}")]
    LogFile {
        /// Logfile path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Elevated privileges could not be obtained.
    #[error("Cannot obtain elevated privileges: {0}")]
    Elevation(String),

    /// The task script cannot be run.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Render cycles as `a → b → a` groups separated by `; `.
fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut members = cycle.clone();
            if let Some(first) = cycle.first() {
                members.push(first.clone());
            }
            members.join(" → ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}
