//! Generic background work: task queue, worker threads and the platform
//! surface used to post work onto them.

mod default_platform;
mod pool;
mod task;
mod task_queue;
mod worker_thread;

pub use default_platform::{ContextId, DefaultPlatform, MAX_THREAD_POOL_SIZE};
pub use pool::WorkerPool;
pub use task::{ExpectedRuntime, Task};
pub use task_queue::{QueueTerminated, TaskQueue};
pub use worker_thread::WorkerThread;
