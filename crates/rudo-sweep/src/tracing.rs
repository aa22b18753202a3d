//! Sweeping and worker tracing support.
//!
//! When the `tracing` feature is enabled, this module provides structured
//! tracing spans and events for sweep rounds, sweeper threads and worker
//! threads.

#[cfg(feature = "tracing")]
pub mod internal {
    use std::sync::atomic::{AtomicU64, Ordering};
    use tracing::{span, Level};

    /// Stable identifier for a sweep round.
    ///
    /// Used to correlate every event emitted while one round is in flight.
    /// Starts at 1 and increases monotonically per process. `RoundId(0)`
    /// marks pages that were never part of a round.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct RoundId(pub u64);

    static NEXT_ROUND_ID: AtomicU64 = AtomicU64::new(1);

    /// Generate the next unique round ID.
    pub fn next_round_id() -> RoundId {
        RoundId(NEXT_ROUND_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a span covering the start of a sweep round.
    pub fn trace_sweep_round(round: RoundId, threads: usize, pages: usize) -> span::EnteredSpan {
        span!(
            Level::DEBUG,
            "sweep_round",
            round = round.0,
            threads = threads,
            pages = pages
        )
        .entered()
    }

    /// Create the span of one thread's batch within a round.
    pub fn trace_sweep_batch(round: RoundId, index: usize, pages: usize) -> span::EnteredSpan {
        span!(
            Level::DEBUG,
            "sweep_batch",
            round = round.0,
            index = index,
            pages = pages
        )
        .entered()
    }

    /// Log the start of a sweep round.
    pub fn log_round_start(round: RoundId, number: u64, threads: usize, pages: usize) {
        tracing::debug!(round = round.0, number, threads, pages, "round_start");
    }

    /// Create the long-lived span of a sweeper thread.
    pub fn trace_sweeper_thread(index: usize) -> span::EnteredSpan {
        span!(Level::DEBUG, "sweeper_thread", index = index).entered()
    }

    /// Log a batch swept by one thread.
    pub fn log_batch_swept(sweeper: Option<usize>, pages: usize, bytes_freed: usize) {
        tracing::trace!(?sweeper, pages, bytes_freed, "batch_swept");
    }

    /// Log the end of a sweep round.
    pub fn log_round_complete(round: RoundId, number: u64, pages: usize, bytes_freed: usize) {
        tracing::debug!(round = round.0, number, pages, bytes_freed, "round_complete");
    }

    /// Log a sweeper thread leaving its loop.
    pub fn log_sweeper_stopped(index: usize) {
        tracing::debug!(index, "sweeper_stopped");
    }

    /// Log unswept pages handed back at shutdown.
    pub fn log_pages_restored(round: RoundId, index: usize, pages: usize) {
        tracing::debug!(round = round.0, index, pages, "pages_restored");
    }

    /// Log a worker thread that exited by panicking.
    pub fn log_worker_panicked(name: &str) {
        tracing::warn!(thread = name, "worker_panicked");
    }

    /// Log a failed thread spawn right before aborting.
    pub fn log_spawn_failed(name: &str, error: &std::io::Error) {
        tracing::error!(thread = name, %error, "spawn_failed");
    }
}

#[cfg(not(feature = "tracing"))]
pub mod internal {
    /// Stub type when tracing is disabled.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct RoundId(pub u64);

    /// Stub function when tracing is disabled.
    pub const fn next_round_id() -> RoundId {
        RoundId(0)
    }
}
