//! Counting semaphore used for the sweeper round handshake.
//!
//! Built on `parking_lot`'s `Mutex` and `Condvar` (`loom`'s under
//! `--cfg loom`). Every `signal` happens-before the `wait`/`try_wait` that
//! consumes it, because both sides go through the same mutex.

#[cfg(not(loom))]
use std::time::{Duration, Instant};

use crate::sync::{self, Condvar, Mutex};

/// A counting semaphore with blocking, bounded and non-blocking acquire.
#[derive(Debug, Default)]
pub struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `initial` permits.
    #[must_use]
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            cond: Condvar::new(),
        }
    }

    /// Release one permit and wake a single waiter.
    pub fn signal(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cond.notify_one();
    }

    /// Block until a permit is available, then take it.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            count = sync::wait(&self.cond, count);
        }
        *count -= 1;
    }

    /// Block for at most `timeout` waiting for a permit.
    ///
    /// Returns `true` if a permit was taken. A zero timeout behaves like
    /// [`try_wait`](Self::try_wait).
    #[cfg(not(loom))]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count == 0 {
            if self.cond.wait_until(&mut count, deadline).timed_out() && *count == 0 {
                return false;
            }
        }
        *count -= 1;
        true
    }

    /// Take a permit if one is available without blocking.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Number of permits currently available.
    ///
    /// Only a snapshot; other threads may change it immediately.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.count.lock()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::Semaphore;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_try_wait_consumes_permits() {
        let sem = Semaphore::new(2);
        assert!(sem.try_wait());
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_wait_for_times_out_without_permit() {
        let sem = Semaphore::new(0);
        assert!(!sem.wait_for(Duration::from_millis(10)));
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_wait_for_zero_timeout_with_permit() {
        let sem = Semaphore::new(1);
        assert!(sem.wait_for(Duration::ZERO));
        assert!(!sem.wait_for(Duration::ZERO));
    }

    #[test]
    fn test_signal_wakes_blocked_waiter() {
        let sem = Arc::new(Semaphore::new(0));
        let waiter = thread::spawn({
            let sem = Arc::clone(&sem);
            move || sem.wait()
        });

        thread::sleep(Duration::from_millis(10));
        sem.signal();

        waiter.join().unwrap();
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_permits_are_counted() {
        let sem = Arc::new(Semaphore::new(0));
        for _ in 0..3 {
            sem.signal();
        }

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let sem = Arc::clone(&sem);
                thread::spawn(move || sem.wait())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(!sem.try_wait());
    }
}
