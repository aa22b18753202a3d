//! Loom tests for the sweeper handshake.
//!
//! Built with `--cfg loom`, the crate's semaphores, stop flag and sweeper
//! threads run on `loom`'s models, so these tests explore every
//! interleaving of the real start/end/stopped protocol.
//!
//! Run with:
//! `RUSTFLAGS="--cfg loom" cargo test --release --test loom_handshake -- --ignored`

#![cfg(loom)]

use std::mem;

use loom::sync::{Arc, Mutex};

use rudo_sweep::heap::FreeList;
use rudo_sweep::{
    Page, PageId, Semaphore, SpaceKind, SweepOutcome, SweepTarget, SweepingCoordinator,
};

/// Pages on two plain lists; sweeping moves them from one to the other.
struct ListTarget {
    unswept: Mutex<Vec<Page>>,
    swept: Mutex<Vec<Page>>,
}

impl ListTarget {
    fn with_pages(count: u32) -> Arc<Self> {
        let pages = (0..count)
            .map(|id| Page::new(PageId(id), SpaceKind::OldData))
            .collect();
        Arc::new(Self {
            unswept: Mutex::new(pages),
            swept: Mutex::new(Vec::new()),
        })
    }

    fn swept(&self) -> usize {
        self.swept.lock().unwrap().len()
    }

    fn unswept(&self) -> usize {
        self.unswept.lock().unwrap().len()
    }
}

impl SweepTarget for ListTarget {
    fn take_unswept_pages(&self) -> Vec<Page> {
        mem::take(&mut *self.unswept.lock().unwrap())
    }

    fn sweep_pages(&self, mut pages: Vec<Page>, _sweeper: Option<usize>) -> SweepOutcome {
        let mut free_list = FreeList::new();
        let mut outcome = SweepOutcome::default();
        for page in &mut pages {
            outcome.record_page(&page.sweep(&mut free_list));
        }
        self.swept.lock().unwrap().extend(pages);
        outcome
    }

    fn restore_unswept_pages(&self, pages: Vec<Page>) {
        self.unswept.lock().unwrap().extend(pages);
    }
}

/// A signal issued before or after the wait is never lost.
#[test]
#[ignore = "loom test - run with --cfg loom and cargo test loom_handshake --release"]
fn test_semaphore_signal_reaches_waiter() {
    loom::model(|| {
        let sem = Arc::new(Semaphore::new(0));
        let signaler = loom::thread::spawn({
            let sem = Arc::clone(&sem);
            move || sem.signal()
        });

        sem.wait();
        signaler.join().unwrap();
        assert!(!sem.try_wait());
    });
}

/// A full round: every page is swept once and the outcome reaches the
/// coordinator through `end`.
#[test]
#[ignore = "loom test - run with --cfg loom and cargo test loom_handshake --release"]
fn test_round_handshake() {
    loom::model(|| {
        let target = ListTarget::with_pages(2);
        let coordinator = SweepingCoordinator::new(Arc::clone(&target), 1);

        coordinator.start_sweeping();
        let round = coordinator.ensure_sweeping_completed().unwrap();

        assert_eq!(round.pages_swept, 2);
        assert_eq!(target.swept(), 2);
        assert!(coordinator.sweeping_completed());
    });
}

/// Stopping right after a start either lets the sweeper finish or hands
/// its batch back; no page is lost either way.
#[test]
#[ignore = "loom test - run with --cfg loom and cargo test loom_handshake --release"]
fn test_stop_after_start_conserves_pages() {
    loom::model(|| {
        let target = ListTarget::with_pages(1);
        let mut coordinator = SweepingCoordinator::new(Arc::clone(&target), 1);

        coordinator.start_sweeping();
        coordinator.stop();

        assert_eq!(target.swept() + target.unswept(), 1);
        let swept = coordinator
            .last_round_metrics()
            .map_or(0, |round| round.pages_swept);
        assert_eq!(swept, target.swept());
    });
}

/// Two threads waiting on the same sweeper both return.
#[test]
#[ignore = "loom test - run with --cfg loom and cargo test loom_handshake --release"]
fn test_concurrent_waiters() {
    loom::model(|| {
        let target = ListTarget::with_pages(1);
        let coordinator = Arc::new(SweepingCoordinator::new(Arc::clone(&target), 1));
        coordinator.start_sweeping();

        let waiter = loom::thread::spawn({
            let coordinator = Arc::clone(&coordinator);
            move || coordinator.wait_for_sweeper_thread(0)
        });
        coordinator.wait_for_sweeper_thread(0);
        waiter.join().unwrap();

        assert!(!coordinator.is_sweeping_in_progress());
        assert_eq!(target.swept(), 1);
    });
}

/// A poller that saw the round complete keeps seeing it complete while
/// another thread consumes `end`.
#[test]
#[ignore = "loom test - run with --cfg loom and cargo test loom_handshake --release"]
fn test_completion_never_reverts() {
    loom::model(|| {
        let target = ListTarget::with_pages(1);
        let coordinator = Arc::new(SweepingCoordinator::new(target, 1));
        coordinator.start_sweeping();

        let poller = loom::thread::spawn({
            let coordinator = Arc::clone(&coordinator);
            move || {
                let first = coordinator.sweeping_completed();
                let second = coordinator.sweeping_completed();
                assert!(!first || second, "completion flipped back to false");
            }
        });
        coordinator.wait_for_sweeper_thread(0);
        assert!(coordinator.sweeping_completed());
        poller.join().unwrap();
    });
}
