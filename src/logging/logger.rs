//! Structured logger with per-task progress tracking and summary output.
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::types::{Log, TaskId, TaskProgress, TaskStatus};

/// Implement the methods of [`Log`] by delegating to inherent methods of the
/// same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger for a single run.
///
/// Every message goes through [`tracing`], so the console formatter and the
/// `run.log` file layer installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) both see it.
/// The logger also owns the progress table of the run's tasks; all progress
/// mutations happen under one mutex.
#[derive(Debug)]
pub struct Logger {
    log_dir: PathBuf,
    tasks: Mutex<Vec<TaskProgress>>,
}

impl Logger {
    /// Create a logger whose task logfiles live in `log_dir`.
    ///
    /// The directory is created lazily by whoever opens the first logfile.
    #[must_use]
    pub const fn new(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Directory holding this run's logfiles.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "provision::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a final success message and exit with code 0.
    pub fn done(&self, msg: &str) -> ! {
        tracing::info!(target: "provision::done", "{msg}");
        std::process::exit(0)
    }

    /// Log a fatal error and exit with code 1.
    pub fn fatal(&self, msg: &str) -> ! {
        tracing::error!("{msg}");
        std::process::exit(1)
    }

    /// Register a task expecting `total` steps.
    ///
    /// Its logfile is `<log_dir>/<name>.log`.
    pub fn add_task(&self, name: &str, total: usize) -> TaskId {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.push(TaskProgress {
            name: name.to_string(),
            total,
            completed: 0,
            step: None,
            logfile: self.log_dir.join(format!("{name}.log")),
            status: TaskStatus::Running,
        });
        TaskId(tasks.len() - 1)
    }

    /// Logfile of a registered task.
    #[must_use]
    pub fn logfile(&self, id: TaskId) -> Option<PathBuf> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0)
            .map(|t| t.logfile.clone())
    }

    /// Replace the expected number of steps of a task.
    pub fn set_total(&self, id: TaskId, total: usize) {
        if let Some(task) = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(id.0)
        {
            task.total = total;
        }
    }

    /// Record a step message for a task, advancing its progress by one when
    /// `advance` is set.
    ///
    /// Progress never reaches `total` before [`finish_task`](Self::finish_task):
    /// the final step is reserved for completion.
    pub fn update_task(&self, id: TaskId, msg: &str, advance: bool) {
        let line = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(task) = tasks.get_mut(id.0) else {
                return;
            };
            if task.status.is_finished() {
                return;
            }
            if advance && task.completed + 1 < task.total {
                task.completed += 1;
            }
            task.step = Some(msg.to_string());
            format!("[{}/{}] {}: {msg}", task.completed, task.total, task.name)
        };
        self.debug(&line);
    }

    /// Mark a task finished. Later calls for the same task are ignored.
    pub fn finish_task(&self, id: TaskId, success: bool) {
        let finished = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(task) = tasks.get_mut(id.0) else {
                return;
            };
            if task.status.is_finished() {
                return;
            }
            task.completed = task.total;
            task.status = if success {
                TaskStatus::Succeeded
            } else {
                TaskStatus::Failed
            };
            (task.name.clone(), task.logfile.clone())
        };
        let (name, logfile) = finished;
        if success {
            self.info(&format!("\x1b[32m✓\x1b[0m {name}"));
        } else {
            self.error(&format!("✗ {name} (see {})", logfile.display()));
        }
    }

    /// Snapshot of every registered task, in registration order.
    #[must_use]
    pub fn task_progress(&self) -> Vec<TaskProgress> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Count the number of failed tasks.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count()
    }

    /// Print the summary of all registered tasks.
    pub fn print_summary(&self) {
        let tasks = self.task_progress();
        if tasks.is_empty() {
            return;
        }

        self.stage("Summary");
        let mut ok = 0usize;
        let mut failed = 0usize;
        for task in &tasks {
            match task.status {
                TaskStatus::Succeeded => {
                    ok += 1;
                    self.info(&format!("\x1b[32m✓ {}\x1b[0m", task.name));
                }
                TaskStatus::Failed => {
                    failed += 1;
                    self.info(&format!(
                        "\x1b[31m✗ {} ({})\x1b[0m",
                        task.name,
                        task.logfile.display()
                    ));
                }
                TaskStatus::Running => {
                    self.info(&format!("\x1b[2m· {} (unfinished)\x1b[0m", task.name));
                }
            }
        }
        self.info(&format!(
            "{} tasks: \x1b[32m{ok} ok\x1b[0m, \x1b[31m{failed} failed\x1b[0m",
            tasks.len()
        ));
        self.info(&format!("\x1b[2mlogs: {}\x1b[0m", self.log_dir.display()));
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);
}
