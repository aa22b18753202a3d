//! The platform object through which the runtime posts background and
//! per-context foreground work.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;

use super::{ExpectedRuntime, QueueTerminated, Task, TaskQueue, WorkerPool};
use crate::config::{available_parallelism, PlatformConfig};

/// Upper bound on background worker threads.
pub const MAX_THREAD_POOL_SIZE: usize = 4;

/// Identifies the runtime context that owns a foreground queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u32);

type ForegroundQueue = SegQueue<Box<dyn Task>>;

#[derive(Debug)]
struct PoolState {
    thread_pool_size: usize,
    pool: Option<WorkerPool>,
    shut_down: bool,
}

/// Owns the background worker pool and the foreground queues.
///
/// The pool is started lazily on the first background task (or on
/// [`ensure_initialized`](Self::ensure_initialized)); its size can only be
/// changed before that.
pub struct DefaultPlatform {
    queue: Arc<TaskQueue>,
    state: Mutex<PoolState>,
    foreground: Mutex<HashMap<ContextId, Arc<ForegroundQueue>>>,
}

impl DefaultPlatform {
    /// Create a platform; no threads are started yet.
    #[must_use]
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            queue: Arc::new(TaskQueue::new()),
            state: Mutex::new(PoolState {
                thread_pool_size: clamp_pool_size(config.thread_pool_size),
                pool: None,
                shut_down: false,
            }),
            foreground: Mutex::new(HashMap::new()),
        }
    }

    /// Set the number of background threads.
    ///
    /// `0` picks one less than the available parallelism. The result is
    /// clamped to `1..=MAX_THREAD_POOL_SIZE`. Ignored once the pool runs.
    pub fn set_thread_pool_size(&self, threads: usize) {
        let mut state = self.state.lock();
        if state.pool.is_none() {
            state.thread_pool_size = clamp_pool_size(threads);
        }
    }

    /// Number of background threads the pool has (or will have).
    #[must_use]
    pub fn thread_pool_size(&self) -> usize {
        self.state.lock().thread_pool_size
    }

    /// Start the worker pool if it is not running yet.
    pub fn ensure_initialized(&self) {
        let mut state = self.state.lock();
        if state.pool.is_none() && !state.shut_down {
            state.pool = Some(WorkerPool::new(
                state.thread_pool_size,
                Arc::clone(&self.queue),
            ));
        }
    }

    /// Post a task to the background pool.
    ///
    /// # Errors
    ///
    /// Returns the task inside [`QueueTerminated`] after
    /// [`shutdown`](Self::shutdown).
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn call_on_background_thread(
        &self,
        task: Box<dyn Task>,
        expected_runtime: ExpectedRuntime,
    ) -> Result<(), QueueTerminated> {
        #[cfg(feature = "tracing")]
        tracing::trace!(?expected_runtime, "background_task_posted");

        self.ensure_initialized();
        self.queue.append(task)
    }

    /// Queue a task to run on the thread that pumps `context`.
    pub fn call_on_foreground_thread(&self, context: ContextId, task: Box<dyn Task>) {
        let queue = {
            let mut foreground = self.foreground.lock();
            Arc::clone(foreground.entry(context).or_default())
        };
        queue.push(task);
    }

    /// Run at most one pending foreground task of `context` on this thread.
    ///
    /// Returns whether a task ran.
    pub fn pump_message_loop(&self, context: ContextId) -> bool {
        let queue = self.foreground.lock().get(&context).cloned();
        match queue.and_then(|queue| queue.pop()) {
            Some(task) => {
                task.run();
                true
            }
            None => false,
        }
    }

    /// Terminate the background queue and join the pool.
    ///
    /// Tasks already queued still run. Idempotent.
    pub fn shutdown(&self) {
        self.queue.terminate();
        let pool = {
            let mut state = self.state.lock();
            state.shut_down = true;
            state.pool.take()
        };
        drop(pool);
    }
}

impl Drop for DefaultPlatform {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn clamp_pool_size(requested: usize) -> usize {
    let threads = if requested == 0 {
        available_parallelism().saturating_sub(1)
    } else {
        requested
    };
    threads.clamp(1, MAX_THREAD_POOL_SIZE)
}
