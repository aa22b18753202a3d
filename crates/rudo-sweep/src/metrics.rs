//! Sweeping metrics and statistics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Statistics from one completed sweep round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundMetrics {
    /// Round number on the owning coordinator, starting at 1.
    pub round: u64,
    /// Sweeper threads that took part. `0` means the round ran on the caller.
    pub threads: usize,
    /// Pages swept in the round.
    pub pages_swept: usize,
    /// Bytes handed to free lists in the round.
    pub bytes_freed: usize,
    /// Pages swept by each thread, indexed by thread.
    pub pages_per_thread: Vec<usize>,
    /// Time from `start_sweeping` until the round was finalized.
    pub duration: Duration,
}

/// Process-level cumulative statistics.
///
/// Atomic counters across every coordinator and worker pool since process
/// start.
///
/// # Example
///
/// ```
/// use rudo_sweep::global_metrics;
///
/// let metrics = global_metrics();
/// println!("Rounds: {}", metrics.total_rounds());
/// println!("Bytes freed: {}", metrics.total_bytes_freed());
/// ```
#[derive(Debug)]
pub struct GlobalMetrics {
    rounds: AtomicUsize,
    pages_swept: AtomicUsize,
    bytes_freed: AtomicUsize,
    tasks_run: AtomicUsize,
}

impl Default for GlobalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalMetrics {
    /// Create a new `GlobalMetrics` with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rounds: AtomicUsize::new(0),
            pages_swept: AtomicUsize::new(0),
            bytes_freed: AtomicUsize::new(0),
            tasks_run: AtomicUsize::new(0),
        }
    }

    /// Record a finished round.
    pub fn record_round(&self, metrics: &RoundMetrics) {
        self.rounds.fetch_add(1, Ordering::Relaxed);
        self.pages_swept
            .fetch_add(metrics.pages_swept, Ordering::Relaxed);
        self.bytes_freed
            .fetch_add(metrics.bytes_freed, Ordering::Relaxed);
    }

    /// Record one task executed by a worker thread.
    pub fn record_task(&self) {
        self.tasks_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Total sweep rounds finalized.
    #[must_use]
    pub fn total_rounds(&self) -> usize {
        self.rounds.load(Ordering::Relaxed)
    }

    /// Total pages swept by finalized rounds.
    #[must_use]
    pub fn total_pages_swept(&self) -> usize {
        self.pages_swept.load(Ordering::Relaxed)
    }

    /// Total bytes freed by finalized rounds.
    #[must_use]
    pub fn total_bytes_freed(&self) -> usize {
        self.bytes_freed.load(Ordering::Relaxed)
    }

    /// Total tasks run by worker threads.
    #[must_use]
    pub fn total_tasks_run(&self) -> usize {
        self.tasks_run.load(Ordering::Relaxed)
    }
}

static GLOBAL_METRICS: GlobalMetrics = GlobalMetrics::new();

/// Get the process-wide metrics.
#[must_use]
pub fn global_metrics() -> &'static GlobalMetrics {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::{GlobalMetrics, RoundMetrics};

    #[test]
    fn test_record_round_accumulates() {
        let metrics = GlobalMetrics::new();
        let round = RoundMetrics {
            round: 1,
            threads: 2,
            pages_swept: 4,
            bytes_freed: 1000,
            pages_per_thread: vec![2, 2],
            ..Default::default()
        };

        metrics.record_round(&round);
        metrics.record_round(&round);

        assert_eq!(metrics.total_rounds(), 2);
        assert_eq!(metrics.total_pages_swept(), 8);
        assert_eq!(metrics.total_bytes_freed(), 2000);
    }

    #[test]
    fn test_record_task() {
        let metrics = GlobalMetrics::new();
        metrics.record_task();
        assert_eq!(metrics.total_tasks_run(), 1);
    }
}
