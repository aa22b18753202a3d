//! The collector side of sweeping.
//!
//! [`Heap`] owns the paged spaces and the collector-wide free-list
//! statistics. It hands unswept pages to the coordinator and takes swept
//! pages (plus the free blocks found in them) back through [`SweepTarget`].

mod free_list;
mod page;
mod space;

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

pub use free_list::{FreeBlock, FreeList, FreeListCategory, MIN_BLOCK_SIZE, WORD_SIZE};
pub use page::{
    Page, PageId, PageSweepResult, SpaceKind, OBJECT_AREA_SIZE, PAGE_HEADER_SIZE, PAGE_SIZE,
};
pub use space::{ObjectAddress, PagedSpace};

use crate::sweeper::{SweepOutcome, SweepTarget};

/// Identifies a heap in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(pub u32);

/// Collector-wide sweeping counters, updated once per swept page.
#[derive(Debug, Default)]
pub struct SweepStats {
    pages_swept: AtomicUsize,
    bytes_freed: AtomicUsize,
    wasted_bytes: AtomicUsize,
}

impl SweepStats {
    fn record_page(&self, result: &PageSweepResult) {
        self.pages_swept.fetch_add(1, Ordering::Relaxed);
        self.bytes_freed
            .fetch_add(result.freed_bytes, Ordering::Relaxed);
        self.wasted_bytes
            .fetch_add(result.wasted_bytes, Ordering::Relaxed);
    }

    /// Pages swept since the heap was created.
    #[must_use]
    pub fn pages_swept(&self) -> usize {
        self.pages_swept.load(Ordering::Relaxed)
    }

    /// Bytes put on free lists since the heap was created.
    #[must_use]
    pub fn bytes_freed(&self) -> usize {
        self.bytes_freed.load(Ordering::Relaxed)
    }

    /// Bytes lost to fragments too small to track.
    #[must_use]
    pub fn wasted_bytes(&self) -> usize {
        self.wasted_bytes.load(Ordering::Relaxed)
    }
}

/// A heap made of the two sweepable paged spaces.
#[derive(Debug)]
pub struct Heap {
    id: HeapId,
    spaces: [PagedSpace; 2],
    stats: SweepStats,
    next_page_id: AtomicU32,
}

impl Heap {
    /// Create an empty heap.
    #[must_use]
    pub fn new(id: HeapId) -> Self {
        Self {
            id,
            spaces: SpaceKind::ALL.map(PagedSpace::new),
            stats: SweepStats::default(),
            next_page_id: AtomicU32::new(0),
        }
    }

    /// The heap's identifier.
    #[must_use]
    pub const fn id(&self) -> HeapId {
        self.id
    }

    /// Access one space.
    #[must_use]
    pub const fn space(&self, kind: SpaceKind) -> &PagedSpace {
        &self.spaces[kind.index()]
    }

    /// Create a fresh page for `kind` with a heap-unique id.
    ///
    /// The page is not added to the heap; fill it and pass it to
    /// [`add_page`](Self::add_page).
    #[must_use]
    pub fn new_page(&self, kind: SpaceKind) -> Page {
        let id = self.next_page_id.fetch_add(1, Ordering::Relaxed);
        Page::new(PageId(id), kind)
    }

    /// Add a page to its space's unswept list.
    pub fn add_page(&self, page: Page) {
        self.space(page.space()).add_page(page);
    }

    /// Pages waiting to be swept across all spaces.
    #[must_use]
    pub fn unswept_page_count(&self) -> usize {
        self.spaces.iter().map(PagedSpace::unswept_page_count).sum()
    }

    /// Pages swept this cycle across all spaces.
    #[must_use]
    pub fn swept_page_count(&self) -> usize {
        self.spaces.iter().map(PagedSpace::swept_page_count).sum()
    }

    /// Bytes on every free list.
    #[must_use]
    pub fn available_bytes(&self) -> usize {
        self.spaces.iter().map(PagedSpace::available_bytes).sum()
    }

    /// Start a new GC cycle.
    ///
    /// Must not be called while a sweep round is in flight.
    pub fn prepare_for_sweeping(&self) {
        for space in &self.spaces {
            space.prepare_for_sweeping();
        }
    }

    /// Allocate from the free list of `kind`.
    pub fn allocate(&self, kind: SpaceKind, size: usize) -> Option<ObjectAddress> {
        self.space(kind).allocate(size)
    }

    /// Collector-wide sweeping counters.
    #[must_use]
    pub const fn stats(&self) -> &SweepStats {
        &self.stats
    }
}

impl SweepTarget for Heap {
    fn take_unswept_pages(&self) -> Vec<Page> {
        self.spaces
            .iter()
            .flat_map(PagedSpace::take_unswept)
            .collect()
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn sweep_pages(&self, pages: Vec<Page>, sweeper: Option<usize>) -> SweepOutcome {
        let mut private = [FreeList::new(), FreeList::new()];
        let mut swept: [Vec<Page>; 2] = [Vec::new(), Vec::new()];
        let mut outcome = SweepOutcome::default();

        for mut page in pages {
            let index = page.space().index();
            let result = page.sweep(&mut private[index]);
            self.stats.record_page(&result);
            outcome.record_page(&result);
            swept[index].push(page);
        }

        for (space, (pages, free_list)) in self
            .spaces
            .iter()
            .zip(swept.into_iter().zip(private.iter_mut()))
        {
            if !pages.is_empty() {
                space.publish_swept(pages, free_list);
            }
        }

        #[cfg(feature = "tracing")]
        crate::tracing::internal::log_batch_swept(
            sweeper,
            outcome.pages_swept,
            outcome.bytes_freed,
        );

        outcome
    }

    fn restore_unswept_pages(&self, pages: Vec<Page>) {
        let mut by_space: [Vec<Page>; 2] = [Vec::new(), Vec::new()];
        for page in pages {
            by_space[page.space().index()].push(page);
        }
        for (space, pages) in self.spaces.iter().zip(by_space) {
            if !pages.is_empty() {
                space.restore_unswept(pages);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_page(heap: &Heap, kind: SpaceKind, live: &[bool]) -> Page {
        let mut page = heap.new_page(kind);
        let size = OBJECT_AREA_SIZE / live.len();
        for &is_live in live {
            let offset = page.allocate_raw(size).unwrap();
            if is_live {
                page.mark(offset);
            }
        }
        page
    }

    #[test]
    fn test_page_ids_are_unique() {
        let heap = Heap::new(HeapId(0));
        let a = heap.new_page(SpaceKind::OldData);
        let b = heap.new_page(SpaceKind::OldPointer);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_sweep_pages_publishes_per_space() {
        let heap = Heap::new(HeapId(1));
        heap.add_page(filled_page(&heap, SpaceKind::OldData, &[true, false]));
        heap.add_page(filled_page(&heap, SpaceKind::OldPointer, &[false, false]));

        let pages = heap.take_unswept_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(heap.unswept_page_count(), 0);

        let outcome = heap.sweep_pages(pages, None);

        assert_eq!(outcome.pages_swept, 2);
        assert_eq!(outcome.bytes_freed, OBJECT_AREA_SIZE / 2 + OBJECT_AREA_SIZE);
        assert_eq!(heap.space(SpaceKind::OldData).swept_page_count(), 1);
        assert_eq!(heap.space(SpaceKind::OldPointer).swept_page_count(), 1);
        assert_eq!(heap.available_bytes(), outcome.bytes_freed);
        assert_eq!(heap.stats().pages_swept(), 2);
        assert_eq!(heap.stats().bytes_freed(), outcome.bytes_freed);
    }

    #[test]
    fn test_restore_unswept_pages() {
        let heap = Heap::new(HeapId(2));
        heap.add_page(heap.new_page(SpaceKind::OldData));
        heap.add_page(heap.new_page(SpaceKind::OldPointer));

        let pages = heap.take_unswept_pages();
        heap.restore_unswept_pages(pages);

        assert_eq!(heap.space(SpaceKind::OldData).unswept_page_count(), 1);
        assert_eq!(heap.space(SpaceKind::OldPointer).unswept_page_count(), 1);
    }

    #[test]
    fn test_allocate_after_sweep() {
        let heap = Heap::new(HeapId(3));
        heap.add_page(filled_page(&heap, SpaceKind::OldData, &[false, true]));
        let pages = heap.take_unswept_pages();
        heap.sweep_pages(pages, None);

        let address = heap.allocate(SpaceKind::OldData, 64).unwrap();
        assert_eq!(address.space, SpaceKind::OldData);
        assert_eq!(address.offset, PAGE_HEADER_SIZE);
        assert!(heap.allocate(SpaceKind::OldPointer, 64).is_none());
        assert!(heap.allocate(SpaceKind::OldData, usize::MAX).is_none());
    }

    #[test]
    fn test_restore_groups_pages_by_space() {
        let heap = Heap::new(HeapId(4));
        for kind in [SpaceKind::OldData, SpaceKind::OldPointer, SpaceKind::OldData] {
            heap.add_page(heap.new_page(kind));
        }

        let mut pages = heap.take_unswept_pages();
        pages.reverse();
        heap.restore_unswept_pages(pages);

        assert_eq!(heap.space(SpaceKind::OldData).unswept_page_count(), 2);
        assert_eq!(heap.space(SpaceKind::OldPointer).unswept_page_count(), 1);
        heap.space(SpaceKind::OldPointer).with_unswept_pages_mut(|pages| {
            assert!(pages.iter().all(|page| page.space() == SpaceKind::OldPointer));
        });
    }
}
