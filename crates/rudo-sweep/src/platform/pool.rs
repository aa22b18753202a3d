//! A group of worker threads sharing one queue.

use std::sync::Arc;

use super::{TaskQueue, WorkerThread};

/// Zero or more [`WorkerThread`]s draining the same [`TaskQueue`].
///
/// Dropping the pool terminates the queue and joins every worker. Tasks
/// appended before that are all executed first: the queue hands out pending
/// work before the sentinel.
#[derive(Debug)]
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Vec<WorkerThread>,
}

impl WorkerPool {
    /// Start `threads` workers on `queue`.
    #[must_use]
    pub fn new(threads: usize, queue: Arc<TaskQueue>) -> Self {
        let workers = (0..threads)
            .map(|_| WorkerThread::new(Arc::clone(&queue)))
            .collect();
        Self { queue, workers }
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// The queue the workers drain.
    #[must_use]
    pub const fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.queue.terminate();
        self.workers.clear();
    }
}
