//! Core logging types: per-task progress state and the [`Log`] trait.
use std::path::PathBuf;

/// Handle to a task registered with [`Logger::add_task`](super::Logger::add_task).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(super) usize);

/// Lifecycle state of a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Registered, still waiting on dependencies or running.
    Running,
    /// The task process exited successfully.
    Succeeded,
    /// The task could not be started or exited with a non-zero code.
    Failed,
}

impl TaskStatus {
    /// Whether the task has reached a terminal state.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Snapshot of one task's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProgress {
    /// Task name.
    pub name: String,
    /// Number of steps the task is expected to report.
    pub total: usize,
    /// Steps reported so far.
    pub completed: usize,
    /// Last step message, if any.
    pub step: Option<String>,
    /// File receiving the task's output.
    pub logfile: PathBuf,
    /// Current lifecycle state.
    pub status: TaskStatus,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::Logger) writes through the tracing pipeline;
/// [`MemoryLog`](super::MemoryLog) records entries so that resolver
/// diagnostics can be asserted on in tests.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
}
