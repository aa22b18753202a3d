//! Drives sweep rounds across the sweeper threads.

use std::sync::atomic::Ordering;
use std::time::Instant;

use super::{partition_pages, SweepOutcome, SweepTarget, SweeperThread};
use crate::config::{available_parallelism, SweeperConfig};
use crate::heap::Heap;
use crate::metrics::{global_metrics, RoundMetrics};
use crate::sync::{Arc, AtomicBool, Mutex};
use crate::tracing::internal::{next_round_id, RoundId};

#[derive(Debug, Default)]
struct RoundState {
    number: u64,
    /// Correlates the log events of the current round.
    id: RoundId,
    /// Set while a round has been started but not finalized.
    started: Option<Instant>,
    outcome: SweepOutcome,
    pages_per_thread: Vec<usize>,
    last: Option<RoundMetrics>,
}

/// Owns the sweeper threads and runs sweep rounds on them.
///
/// # Protocol
///
/// 1. [`start_sweeping`](Self::start_sweeping) takes every unswept page from
///    the target, splits them into one disjoint batch per thread and signals
///    each thread's `start` exactly once.
/// 2. [`sweeping_completed`](Self::sweeping_completed) polls without
///    blocking; [`wait_for_sweeper_thread`](Self::wait_for_sweeper_thread)
///    blocks on one thread.
/// 3. [`ensure_sweeping_completed`](Self::ensure_sweeping_completed) waits
///    for all threads and finalizes the round's metrics.
///
/// A new round must not start before every thread of the previous one has
/// been waited on. With zero threads, rounds run synchronously inside
/// `start_sweeping`.
///
/// Dropping the coordinator stops and joins every thread.
#[derive(Debug)]
pub struct SweepingCoordinator<T: SweepTarget = Heap> {
    target: Arc<T>,
    threads: Vec<SweeperThread>,
    stop: Arc<AtomicBool>,
    round: Mutex<RoundState>,
    stopped: bool,
}

impl<T: SweepTarget> SweepingCoordinator<T> {
    /// Start `threads` sweeper threads over `target`.
    ///
    /// Aborts the process if a thread cannot be created.
    #[must_use]
    pub fn new(target: Arc<T>, threads: usize) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let threads = (0..threads)
            .map(|index| SweeperThread::spawn(index, Arc::clone(&target), Arc::clone(&stop)))
            .collect();
        Self {
            target,
            threads,
            stop,
            round: Mutex::new(RoundState::default()),
            stopped: false,
        }
    }

    /// Start as many threads as `config` asks for on this machine.
    #[must_use]
    pub fn from_config(target: Arc<T>, config: &SweeperConfig) -> Self {
        Self::new(target, config.thread_count(available_parallelism()))
    }

    /// Number of sweeper threads.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    /// The swept collector.
    #[must_use]
    pub const fn target(&self) -> &Arc<T> {
        &self.target
    }

    /// Access one sweeper thread.
    ///
    /// # Panics
    ///
    /// Panics if `index >= num_threads()`.
    #[must_use]
    pub fn thread(&self, index: usize) -> &SweeperThread {
        &self.threads[index]
    }

    /// Begin a round; returns immediately unless there are no threads.
    pub fn start_sweeping(&self) {
        debug_assert!(!self.stopped, "start_sweeping called after stop");
        debug_assert!(
            !self.is_sweeping_in_progress(),
            "start_sweeping called while a round is in flight"
        );

        let mut round = self.round.lock();
        // Every thread of the previous round has been waited on.
        finalize(&mut round, self.threads.len());

        let pages = self.target.take_unswept_pages();
        round.number += 1;
        round.id = next_round_id();
        round.started = Some(Instant::now());
        round.outcome = SweepOutcome::default();
        round.pages_per_thread = vec![0; self.threads.len()];

        #[cfg(feature = "tracing")]
        let _span = crate::tracing::internal::trace_sweep_round(
            round.id,
            self.threads.len(),
            pages.len(),
        );
        #[cfg(feature = "tracing")]
        crate::tracing::internal::log_round_start(
            round.id,
            round.number,
            self.threads.len(),
            pages.len(),
        );

        if self.threads.is_empty() {
            round.outcome = self.target.sweep_pages(pages, None);
            finalize(&mut round, 0);
            return;
        }

        for (thread, batch) in self
            .threads
            .iter()
            .zip(partition_pages(pages, self.threads.len()))
        {
            thread.assign(batch, round.id);
            thread.start_sweeping();
        }
    }

    /// Whether every thread has finished the current round.
    ///
    /// Never waits for a sweeper and never consumes a completion signal:
    /// each in-flight thread's `end` is try-acquired and released again, and
    /// the check fails as soon as one thread has not ended. A thread's
    /// completion is latched once seen, so the answer never goes back to
    /// `false` before the next [`start_sweeping`](Self::start_sweeping),
    /// however many callers poll or wait concurrently. Trivially `true` with
    /// zero threads or when no round is in flight.
    #[must_use]
    pub fn sweeping_completed(&self) -> bool {
        self.threads.iter().all(SweeperThread::sweeping_completed)
    }

    /// Block until thread `index` has finished the current round.
    ///
    /// Returns immediately if that thread has no round in flight. Safe to
    /// call from several threads at once; all of them return once the
    /// thread has ended.
    ///
    /// # Panics
    ///
    /// Panics if `index >= num_threads()`.
    pub fn wait_for_sweeper_thread(&self, index: usize) {
        if let Some(outcome) = self.threads[index].wait_for_sweeper_thread() {
            let mut round = self.round.lock();
            round.outcome.merge(&outcome);
            if let Some(pages) = round.pages_per_thread.get_mut(index) {
                *pages += outcome.pages_swept;
            }
        }
    }

    /// Wait for every thread and finalize the round.
    ///
    /// Returns the round's metrics, or `None` if no round was pending.
    pub fn ensure_sweeping_completed(&self) -> Option<RoundMetrics> {
        for index in 0..self.threads.len() {
            self.wait_for_sweeper_thread(index);
        }
        finalize(&mut self.round.lock(), self.threads.len())
    }

    /// Whether any thread still has a round in flight.
    #[must_use]
    pub fn is_sweeping_in_progress(&self) -> bool {
        self.threads.iter().any(SweeperThread::is_sweeping)
    }

    /// Metrics of the most recently finalized round.
    #[must_use]
    pub fn last_round_metrics(&self) -> Option<RoundMetrics> {
        self.round.lock().last.clone()
    }

    /// Stop and join every sweeper thread.
    ///
    /// Sets the shared stop flag, wakes each thread once more, waits for its
    /// acknowledgement and joins it. A thread busy with a round finishes that
    /// round first. Pages assigned to a thread that never got to them go back
    /// to the target unswept, and a pending round is finalized with whatever
    /// was swept. Idempotent; also run on drop.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.stop.store(true, Ordering::Release);

        let mut round = self.round.lock();
        for thread in &mut self.threads {
            let (assigned, leftover) = thread.stop_and_join();
            if let Some(outcome) = thread.take_outcome() {
                round.outcome.merge(&outcome);
                if let Some(pages) = round.pages_per_thread.get_mut(thread.index()) {
                    *pages += outcome.pages_swept;
                }
            }
            if !leftover.is_empty() {
                #[cfg(feature = "tracing")]
                crate::tracing::internal::log_pages_restored(
                    assigned,
                    thread.index(),
                    leftover.len(),
                );
                self.target.restore_unswept_pages(leftover);
            }
        }
        finalize(&mut round, self.threads.len());
    }

    /// Whether [`stop`](Self::stop) has run.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl<T: SweepTarget> Drop for SweepingCoordinator<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn finalize(round: &mut RoundState, threads: usize) -> Option<RoundMetrics> {
    let started = round.started.take()?;
    let metrics = RoundMetrics {
        round: round.number,
        threads,
        pages_swept: round.outcome.pages_swept,
        bytes_freed: round.outcome.bytes_freed,
        pages_per_thread: std::mem::take(&mut round.pages_per_thread),
        duration: started.elapsed(),
    };
    global_metrics().record_round(&metrics);

    #[cfg(feature = "tracing")]
    crate::tracing::internal::log_round_complete(
        round.id,
        metrics.round,
        metrics.pages_swept,
        metrics.bytes_freed,
    );

    round.last = Some(metrics.clone());
    Some(metrics)
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::SweepingCoordinator;
    use crate::config::SweeperConfig;
    use crate::heap::{Heap, HeapId, SpaceKind};
    use std::sync::Arc;

    fn heap_with_pages(count: usize) -> Arc<Heap> {
        let heap = Arc::new(Heap::new(HeapId(0)));
        for _ in 0..count {
            heap.add_page(heap.new_page(SpaceKind::OldPointer));
        }
        heap
    }

    #[test]
    fn test_zero_threads_sweeps_synchronously() {
        let heap = heap_with_pages(3);
        let coordinator = SweepingCoordinator::new(Arc::clone(&heap), 0);

        coordinator.start_sweeping();

        assert!(coordinator.sweeping_completed());
        assert!(!coordinator.is_sweeping_in_progress());
        assert_eq!(heap.swept_page_count(), 3);
        let metrics = coordinator.last_round_metrics().unwrap();
        assert_eq!(metrics.threads, 0);
        assert_eq!(metrics.pages_swept, 3);
        assert!(coordinator.ensure_sweeping_completed().is_none());
    }

    #[test]
    fn test_synchronous_config() {
        let coordinator =
            SweepingCoordinator::from_config(heap_with_pages(0), &SweeperConfig::synchronous());
        assert_eq!(coordinator.num_threads(), 0);
    }

    #[test]
    fn test_round_metrics_are_numbered() {
        let heap = heap_with_pages(2);
        let coordinator = SweepingCoordinator::new(Arc::clone(&heap), 2);

        coordinator.start_sweeping();
        let first = coordinator.ensure_sweeping_completed().unwrap();
        heap.prepare_for_sweeping();
        coordinator.start_sweeping();
        let second = coordinator.ensure_sweeping_completed().unwrap();

        assert_eq!(first.round, 1);
        assert_eq!(second.round, 2);
        assert_eq!(second.pages_per_thread, vec![1, 1]);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut coordinator = SweepingCoordinator::new(heap_with_pages(0), 2);
        coordinator.stop();
        coordinator.stop();
        assert!(coordinator.is_stopped());
    }
}
