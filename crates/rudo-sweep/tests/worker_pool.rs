//! Integration tests for worker threads, pools and the default platform.
//!
//! Pool teardown drains: every task appended before the pool is dropped
//! runs before the last worker exits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rudo_sweep::{
    global_metrics, ContextId, DefaultPlatform, ExpectedRuntime, PlatformConfig, TaskQueue,
    WorkerPool, WorkerThread,
};

fn counting_task(counter: &Arc<AtomicUsize>) -> Box<dyn rudo_sweep::Task> {
    let counter = Arc::clone(counter);
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

/// Dropping the pool with work still queued runs all of it.
#[test]
fn test_drop_drains_pending_tasks() {
    let queue = Arc::new(TaskQueue::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(2, Arc::clone(&queue));

    // Slow first task so the rest are still queued at drop time.
    queue
        .append(Box::new(|| thread::sleep(Duration::from_millis(30))))
        .unwrap();
    for _ in 0..100 {
        queue.append(counting_task(&counter)).unwrap();
    }

    drop(pool);

    assert_eq!(counter.load(Ordering::SeqCst), 100);
    assert!(queue.is_empty());
    assert!(queue.is_terminated());
}

/// Appending after the pool is gone hands the task back.
#[test]
fn test_append_after_pool_drop_is_rejected() {
    let queue = Arc::new(TaskQueue::new());
    drop(WorkerPool::new(1, Arc::clone(&queue)));

    let counter = Arc::new(AtomicUsize::new(0));
    let rejected = queue.append(counting_task(&counter)).unwrap_err();
    assert_eq!(rejected.to_string(), "task queue has been terminated");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

/// A worker thread exits once its queue terminates and is joined on drop.
#[test]
fn test_worker_thread_joins_after_termination() {
    let queue = Arc::new(TaskQueue::new());
    let worker = WorkerThread::new(Arc::clone(&queue));
    assert!(!worker.is_finished());

    queue.terminate();
    drop(worker);
}

/// A panicking task takes down only its own worker; the pool keeps draining.
#[test]
fn test_panicking_task_is_not_caught() {
    let queue = Arc::new(TaskQueue::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(2, Arc::clone(&queue));

    queue
        .append(Box::new(|| panic!("task failure is the task's problem")))
        .unwrap();
    for _ in 0..20 {
        queue.append(counting_task(&counter)).unwrap();
    }

    drop(pool);
    assert_eq!(counter.load(Ordering::SeqCst), 20);
}

/// Tasks run on worker threads are counted globally.
#[test]
fn test_tasks_are_counted() {
    let before = global_metrics().total_tasks_run();
    let queue = Arc::new(TaskQueue::new());
    let pool = WorkerPool::new(1, Arc::clone(&queue));
    for _ in 0..5 {
        queue.append(Box::new(|| {})).unwrap();
    }
    drop(pool);
    assert!(global_metrics().total_tasks_run() >= before + 5);
}

#[test]
fn test_platform_background_tasks() {
    let platform = DefaultPlatform::new(PlatformConfig::new(2));
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        platform
            .call_on_background_thread(counting_task(&counter), ExpectedRuntime::Short)
            .unwrap();
    }
    platform.shutdown();

    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert!(platform
        .call_on_background_thread(counting_task(&counter), ExpectedRuntime::Long)
        .is_err());
}

#[test]
fn test_platform_foreground_pump() {
    let platform = DefaultPlatform::new(PlatformConfig::default());
    let counter = Arc::new(AtomicUsize::new(0));
    let context = ContextId(7);

    for _ in 0..3 {
        platform.call_on_foreground_thread(context, counting_task(&counter));
    }

    let mut pumped = 0;
    while platform.pump_message_loop(context) {
        pumped += 1;
    }
    assert_eq!(pumped, 3);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_platform_pool_size_configuration() {
    let platform = DefaultPlatform::new(PlatformConfig::default());
    platform.set_thread_pool_size(3);
    assert_eq!(platform.thread_pool_size(), 3);
    platform.set_thread_pool_size(100);
    assert_eq!(platform.thread_pool_size(), 4);
}
