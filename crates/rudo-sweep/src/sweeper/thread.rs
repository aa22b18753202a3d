//! A dedicated sweeper thread and its start/end handshake.

use std::fmt;
use std::mem;
use std::sync::atomic::Ordering;

use crossbeam::utils::CachePadded;

use super::{SweepOutcome, SweepTarget};
use crate::heap::Page;
use crate::semaphore::Semaphore;
use crate::spawn::spawn_named;
use crate::sync::{Arc, AtomicBool, JoinHandle, Mutex};
use crate::tracing::internal::RoundId;

/// Upper bound on sweeper threads, whatever the core count.
pub const MAX_SWEEPER_THREADS: usize = 4;

const SWEEPER_THREAD_NAME: &str = "rudo-sweeper";

/// Pages queued for one round.
#[derive(Debug, Default)]
struct Assignment {
    round: RoundId,
    pages: Vec<Page>,
}

/// State shared between a [`SweeperThread`] handle and its OS thread.
#[derive(Debug, Default)]
struct Handshake {
    start: Semaphore,
    end: Semaphore,
    stopped: Semaphore,
    /// Taken by the thread on wake.
    assignment: Mutex<Assignment>,
    /// Written before `end` is signaled.
    outcome: Mutex<Option<SweepOutcome>>,
}

/// One background thread that sweeps its assigned pages once per round.
///
/// # States
///
/// - `Idle`: blocked on `start`.
/// - `Sweeping`: sweeping its batch; signals `end` when done and goes back
///   to `Idle`.
/// - `Stopped`: woke with the stop flag set; signaled `stopped` and exited.
///
/// `in_flight` is set when a round is started and cleared once that round's
/// `end` has been consumed. `completed` latches the first observation of
/// `end` so later polls never touch the semaphore again.
pub struct SweeperThread {
    index: usize,
    handshake: Arc<Handshake>,
    stop: Arc<AtomicBool>,
    in_flight: CachePadded<AtomicBool>,
    completed: CachePadded<AtomicBool>,
    /// Held by one waiter at a time, across the check, the wait and the
    /// clear of `in_flight`.
    wait_lock: Mutex<()>,
    /// Held by one poller at a time while it borrows the `end` permit.
    poll_lock: Mutex<()>,
    handle: Option<JoinHandle<()>>,
}

impl SweeperThread {
    /// Number of sweeper threads to run on a machine with `max_available`
    /// cores: never more than `max_available`, never more than
    /// [`MAX_SWEEPER_THREADS`].
    ///
    /// Rounds are split page by page, so there are always at least as many
    /// sweepable units as pages; a thread whose batch is empty signals `end`
    /// straight away. No further clamp by page count is needed.
    #[must_use]
    pub const fn number_of_threads(max_available: usize) -> usize {
        if max_available < MAX_SWEEPER_THREADS {
            max_available
        } else {
            MAX_SWEEPER_THREADS
        }
    }

    pub(crate) fn spawn<T: SweepTarget>(
        index: usize,
        target: Arc<T>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let handshake = Arc::new(Handshake::default());
        let handle = spawn_named(SWEEPER_THREAD_NAME, {
            let handshake = Arc::clone(&handshake);
            let stop = Arc::clone(&stop);
            move || run(index, &handshake, &stop, &*target)
        });
        Self {
            index,
            handshake,
            stop,
            in_flight: CachePadded::new(AtomicBool::new(false)),
            completed: CachePadded::new(AtomicBool::new(false)),
            wait_lock: Mutex::new(()),
            poll_lock: Mutex::new(()),
            handle: Some(handle),
        }
    }

    /// Position of this thread in its coordinator.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Whether a round has been started and its end not yet consumed.
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Queue pages for the next round.
    pub(crate) fn assign(&self, pages: Vec<Page>, round: RoundId) {
        let mut assignment = self.handshake.assignment.lock();
        debug_assert!(
            assignment.pages.is_empty(),
            "sweeper {} still holds a batch",
            self.index
        );
        assignment.round = round;
        // Append, never replace: queued pages must not be dropped.
        assignment.pages.extend(pages);
    }

    /// Signal `start` once for a new round.
    pub(crate) fn start_sweeping(&self) {
        self.completed.store(false, Ordering::Release);
        let was_in_flight = self.in_flight.swap(true, Ordering::AcqRel);
        debug_assert!(
            !was_in_flight,
            "sweeper {} started before its previous round ended",
            self.index
        );
        self.handshake.start.signal();
    }

    /// Block until this thread signals `end` for the current round and
    /// consume the signal.
    ///
    /// Returns what the round swept, or `None` if no round was in flight.
    /// Concurrent callers are served one at a time; only the first gets the
    /// outcome, the others return `None` once the round has ended.
    pub fn wait_for_sweeper_thread(&self) -> Option<SweepOutcome> {
        let _waiting = self.wait_lock.lock();
        if !self.is_sweeping() {
            return None;
        }
        self.handshake.end.wait();
        self.completed.store(true, Ordering::Release);
        self.in_flight.store(false, Ordering::Release);
        self.take_outcome()
    }

    /// Non-blocking: whether the current round has ended on this thread.
    ///
    /// Does not consume the `end` signal. A thread with no round in flight
    /// counts as completed. Once `true`, stays `true` until the next round
    /// is started.
    #[must_use]
    pub fn sweeping_completed(&self) -> bool {
        if self.is_finished_round() {
            return true;
        }
        let _polling = self.poll_lock.lock();
        if self.is_finished_round() {
            return true;
        }
        if self.handshake.end.try_wait() {
            self.completed.store(true, Ordering::Release);
            self.handshake.end.signal();
            return true;
        }
        // A waiter may have consumed `end` since the first check.
        self.is_finished_round()
    }

    fn is_finished_round(&self) -> bool {
        !self.is_sweeping() || self.completed.load(Ordering::Acquire)
    }

    /// Outcome of a round whose `end` was never consumed.
    pub(crate) fn take_outcome(&self) -> Option<SweepOutcome> {
        self.handshake.outcome.lock().take()
    }

    /// Wake the thread so it observes the (already set) stop flag, wait for
    /// it to acknowledge, and join it.
    ///
    /// Returns pages that were assigned but never swept, with the round
    /// they belonged to. Afterwards no round is in flight, so waiting on
    /// this thread returns at once.
    pub(crate) fn stop_and_join(&mut self) -> (RoundId, Vec<Page>) {
        if let Some(handle) = self.handle.take() {
            self.handshake.start.signal();
            self.handshake.stopped.wait();
            // The thread has left its loop; joining cannot race a sweep.
            let _ = handle.join();
        }
        self.in_flight.store(false, Ordering::Release);
        let Assignment { round, pages } = mem::take(&mut *self.handshake.assignment.lock());
        (round, pages)
    }
}

impl fmt::Debug for SweeperThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweeperThread")
            .field("index", &self.index)
            .field("sweeping", &self.is_sweeping())
            .field("running", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for SweeperThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop.store(true, Ordering::Release);
            drop(self.stop_and_join());
        }
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn run<T: SweepTarget>(index: usize, handshake: &Handshake, stop: &AtomicBool, target: &T) {
    #[cfg(feature = "tracing")]
    let _span = crate::tracing::internal::trace_sweeper_thread(index);

    loop {
        handshake.start.wait();
        if stop.load(Ordering::Acquire) {
            #[cfg(feature = "tracing")]
            crate::tracing::internal::log_sweeper_stopped(index);
            handshake.stopped.signal();
            return;
        }

        let Assignment { round, pages } = mem::take(&mut *handshake.assignment.lock());
        let outcome = {
            #[cfg(feature = "tracing")]
            let _batch = crate::tracing::internal::trace_sweep_batch(round, index, pages.len());
            target.sweep_pages(pages, Some(index))
        };
        *handshake.outcome.lock() = Some(outcome);
        handshake.end.signal();
    }
}
