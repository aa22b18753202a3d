//! Round-based sweeping on dedicated background threads.
//!
//! The [`SweepingCoordinator`] owns a fixed set of [`SweeperThread`]s. Each
//! round it takes every unswept page from its [`SweepTarget`], splits them
//! into one disjoint batch per thread and signals every thread once. Threads
//! sweep their batch, hand the pages back and signal completion.
//!
//! ```text
//!  coordinator                     sweeper i
//!  -----------                     ---------
//!  assign batch i
//!  start[i].signal()  ───────────▶ start.wait()
//!                                  stop? ──▶ stopped.signal(), exit
//!                                  sweep batch, publish pages
//!  end[i].wait()      ◀─────────── end.signal()
//! ```

mod coordinator;
mod partition;
mod thread;

pub use coordinator::SweepingCoordinator;
pub use partition::partition_pages;
pub use thread::{SweeperThread, MAX_SWEEPER_THREADS};

use crate::heap::{Page, PageSweepResult};

/// Totals for one batch of pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Pages swept.
    pub pages_swept: usize,
    /// Bytes put on free lists.
    pub bytes_freed: usize,
    /// Bytes lost to fragments too small to track.
    pub wasted_bytes: usize,
    /// Largest free block produced.
    pub max_free_block: usize,
}

impl SweepOutcome {
    /// Fold one page's result into the totals.
    pub fn record_page(&mut self, result: &PageSweepResult) {
        self.pages_swept += 1;
        self.bytes_freed += result.freed_bytes;
        self.wasted_bytes += result.wasted_bytes;
        self.max_free_block = self.max_free_block.max(result.max_free_block);
    }

    /// Fold another batch into the totals.
    pub fn merge(&mut self, other: &Self) {
        self.pages_swept += other.pages_swept;
        self.bytes_freed += other.bytes_freed;
        self.wasted_bytes += other.wasted_bytes;
        self.max_free_block = self.max_free_block.max(other.max_free_block);
    }
}

/// The collector as seen by the sweeper threads.
///
/// Implementations own the pages between rounds. Pages move out through
/// [`take_unswept_pages`](Self::take_unswept_pages) and come back through
/// [`sweep_pages`](Self::sweep_pages) or
/// [`restore_unswept_pages`](Self::restore_unswept_pages), so a page is never
/// reachable from two threads at once.
pub trait SweepTarget: Send + Sync + 'static {
    /// Hand over every page waiting to be swept.
    fn take_unswept_pages(&self) -> Vec<Page>;

    /// Sweep `pages` and take them back, merging what was reclaimed into the
    /// collector's free lists and statistics.
    ///
    /// `sweeper` is the index of the calling sweeper thread, or `None` when
    /// sweeping runs on the caller.
    fn sweep_pages(&self, pages: Vec<Page>, sweeper: Option<usize>) -> SweepOutcome;

    /// Take back pages that were assigned to a thread but never swept.
    fn restore_unswept_pages(&self, pages: Vec<Page>);
}
