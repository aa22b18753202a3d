//! A background thread draining a [`TaskQueue`].

use std::sync::Arc;

use super::TaskQueue;
use crate::metrics::global_metrics;
use crate::spawn::spawn_named;
use crate::sync::JoinHandle;

const WORKER_THREAD_NAME: &str = "rudo-worker";

/// A worker bound to one queue.
///
/// The thread starts in [`new`](Self::new) and runs until the queue hands it
/// the sentinel. Dropping the worker joins the thread, so no task outlives
/// the worker's owner.
#[derive(Debug)]
pub struct WorkerThread {
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawn a worker that drains `queue`.
    ///
    /// Aborts the process if the thread cannot be created.
    #[must_use]
    pub fn new(queue: Arc<TaskQueue>) -> Self {
        let handle = spawn_named(WORKER_THREAD_NAME, move || run(&queue));
        Self {
            handle: Some(handle),
        }
    }

    /// Whether the thread has already left its loop.
    #[cfg(not(loom))]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

fn run(queue: &TaskQueue) {
    while let Some(task) = queue.get_next() {
        task.run();
        global_metrics().record_task();
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            // A panicking task unwinds the worker; the pool does not recover it.
            if handle.join().is_err() {
                #[cfg(feature = "tracing")]
                crate::tracing::internal::log_worker_panicked(WORKER_THREAD_NAME);
            }
        }
    }
}
