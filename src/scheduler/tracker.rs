//! Completion tracking for dependency-ordered task threads.
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// Shared record of finished tasks.
///
/// Task threads call [`wait_for`](Self::wait_for) before starting and hold a
/// [`FinishGuard`] while running; dropping the guard, also on panic, marks
/// the task finished and wakes every waiting thread.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    finished: Mutex<HashSet<String>>,
    condvar: Condvar,
}

impl CompletionTracker {
    /// Create a tracker with nothing finished.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every task in `deps` has finished, successfully or not.
    pub fn wait_for(&self, deps: &[&str]) {
        if deps.is_empty() {
            return;
        }
        let mut finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        while !deps.iter().all(|d| finished.contains(*d)) {
            finished = self
                .condvar
                .wait(finished)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(finished);
    }

    /// Record `name` as finished and wake all waiting threads.
    pub fn mark_finished(&self, name: &str) {
        let mut finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        finished.insert(name.to_string());
        drop(finished);
        self.condvar.notify_all();
    }

    /// Whether `name` has finished.
    #[must_use]
    pub fn is_finished(&self, name: &str) -> bool {
        self.finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Guard that marks `name` finished when dropped.
    #[must_use]
    pub const fn finish_on_drop<'a>(&'a self, name: &'a str) -> FinishGuard<'a> {
        FinishGuard {
            tracker: self,
            name,
        }
    }
}

/// Marks a task finished when dropped. See [`CompletionTracker::finish_on_drop`].
#[derive(Debug)]
pub struct FinishGuard<'a> {
    tracker: &'a CompletionTracker,
    name: &'a str,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.tracker.mark_finished(self.name);
    }
}
