//! Blocking FIFO queue shared by a pool of worker threads.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use super::Task;

/// Returned by [`TaskQueue::append`] once the queue has been terminated.
///
/// Carries the rejected task so ownership goes back to the caller.
#[derive(Error)]
#[error("task queue has been terminated")]
pub struct QueueTerminated(pub Box<dyn Task>);

impl QueueTerminated {
    /// Take back the rejected task.
    #[must_use]
    pub fn into_task(self) -> Box<dyn Task> {
        self.0
    }
}

impl fmt::Debug for QueueTerminated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QueueTerminated").finish_non_exhaustive()
    }
}

struct QueueState {
    tasks: VecDeque<Box<dyn Task>>,
    terminated: bool,
}

/// A thread-safe FIFO of pending tasks plus a termination flag.
///
/// # Invariants
///
/// - Insertion order is execution order.
/// - Every appended task is returned by exactly one [`get_next`](Self::get_next).
/// - Tasks still queued at termination are handed out before the sentinel.
/// - Once terminated and empty, `get_next` never blocks.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    /// Create an empty, live queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                terminated: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Insert a task at the tail and wake at most one waiter.
    ///
    /// Never blocks on a waiter.
    ///
    /// # Errors
    ///
    /// Returns [`QueueTerminated`] holding the task if the queue has been
    /// terminated.
    pub fn append(&self, task: Box<dyn Task>) -> Result<(), QueueTerminated> {
        let mut state = self.state.lock();
        if state.terminated {
            return Err(QueueTerminated(task));
        }
        state.tasks.push_back(task);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Block until a task is available or the queue is terminated.
    ///
    /// Returns `None` (the sentinel) only when the queue is both terminated
    /// and empty.
    pub fn get_next(&self) -> Option<Box<dyn Task>> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.terminated {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Stop accepting tasks and release every waiter once drained.
    ///
    /// Idempotent.
    pub fn terminate(&self) {
        let mut state = self.state.lock();
        state.terminated = true;
        drop(state);
        self.available.notify_all();
    }

    /// Whether [`terminate`](Self::terminate) has been called.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Number of tasks waiting to be picked up.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Whether no task is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskQueue")
            .field("pending", &state.tasks.len())
            .field("terminated", &state.terminated)
            .finish()
    }
}
