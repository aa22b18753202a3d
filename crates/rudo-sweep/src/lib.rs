//! Background work for the rudo garbage collector.
//!
//! `rudo-sweep` provides the two groups of background threads the collector
//! runs next to the mutator:
//!
//! - **Worker pool**: [`WorkerThread`]s draining a blocking FIFO
//!   [`TaskQueue`], for fire-and-forget jobs. [`DefaultPlatform`] wraps a
//!   lazily started pool and per-context foreground queues.
//! - **Sweeper threads**: a [`SweepingCoordinator`] owning a fixed set of
//!   [`SweeperThread`]s that sweep heap pages in explicit rounds while the
//!   mutator keeps running.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use rudo_sweep::{Heap, HeapId, SpaceKind, SweepingCoordinator};
//!
//! let heap = Arc::new(Heap::new(HeapId(0)));
//! let mut page = heap.new_page(SpaceKind::OldData);
//! let live = page.allocate_raw(64).unwrap();
//! let _dead = page.allocate_raw(64).unwrap();
//! page.mark(live);
//! heap.add_page(page);
//!
//! let coordinator = SweepingCoordinator::new(Arc::clone(&heap), 2);
//! coordinator.start_sweeping();
//! // ... the mutator keeps running ...
//! let round = coordinator.ensure_sweeping_completed().unwrap();
//! assert_eq!(round.pages_swept, 1);
//! assert!(coordinator.sweeping_completed());
//! ```
//!
//! # Background tasks
//!
//! ```
//! use std::sync::Arc;
//! use rudo_sweep::{TaskQueue, WorkerPool};
//!
//! let queue = Arc::new(TaskQueue::new());
//! let pool = WorkerPool::new(2, Arc::clone(&queue));
//! queue.append(Box::new(|| println!("hello from a worker"))).unwrap();
//! drop(pool); // runs every queued task, then joins
//! ```
//!
//! # Thread Safety
//!
//! Pages are moved, never shared: between rounds the heap owns them, during
//! a round exactly one sweeper thread does. The mutator can only reach pages
//! that have been handed back.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod heap;
mod metrics;
pub mod platform;
mod semaphore;
mod spawn;
pub mod sweeper;
mod sync;
mod tracing;

pub use config::{ConfigError, PlatformConfig, SweeperConfig};
pub use heap::{Heap, HeapId, ObjectAddress, Page, PageId, SpaceKind};
pub use metrics::{global_metrics, GlobalMetrics, RoundMetrics};
pub use platform::{
    ContextId, DefaultPlatform, ExpectedRuntime, QueueTerminated, Task, TaskQueue, WorkerPool,
    WorkerThread,
};
pub use semaphore::Semaphore;
pub use sweeper::{
    partition_pages, SweepOutcome, SweepTarget, SweeperThread, SweepingCoordinator,
    MAX_SWEEPER_THREADS,
};
