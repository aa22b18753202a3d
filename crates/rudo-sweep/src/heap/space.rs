//! Paged spaces: page lists plus the shared free list of one space.

use std::mem;

use parking_lot::Mutex;

use super::{FreeList, Page, PageId, SpaceKind};

/// Location of an object allocated from a free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectAddress {
    /// Space of the page.
    pub space: SpaceKind,
    /// Page holding the object.
    pub page: PageId,
    /// Byte offset within the page.
    pub offset: usize,
}

/// One space of the heap.
///
/// A page is always in exactly one place: the `unswept` list, a sweeper's
/// batch, or the `swept` list. The three locks are never held together;
/// sweepers publish pages before the free-list blocks that point into them.
#[derive(Debug)]
pub struct PagedSpace {
    kind: SpaceKind,
    unswept: Mutex<Vec<Page>>,
    swept: Mutex<Vec<Page>>,
    free_list: Mutex<FreeList>,
}

impl PagedSpace {
    /// Create an empty space.
    #[must_use]
    pub fn new(kind: SpaceKind) -> Self {
        Self {
            kind,
            unswept: Mutex::new(Vec::new()),
            swept: Mutex::new(Vec::new()),
            free_list: Mutex::new(FreeList::new()),
        }
    }

    /// Which space this is.
    #[must_use]
    pub const fn kind(&self) -> SpaceKind {
        self.kind
    }

    /// Add a page awaiting sweeping.
    pub fn add_page(&self, page: Page) {
        debug_assert_eq!(page.space(), self.kind);
        self.unswept.lock().push(page);
    }

    /// Hand over every unswept page.
    pub fn take_unswept(&self) -> Vec<Page> {
        mem::take(&mut *self.unswept.lock())
    }

    /// Put pages back onto the unswept list.
    pub fn restore_unswept(&self, pages: Vec<Page>) {
        self.unswept.lock().extend(pages);
    }

    /// Publish swept pages, then merge the free blocks found in them.
    pub fn publish_swept(&self, pages: Vec<Page>, private: &mut FreeList) {
        self.swept.lock().extend(pages);
        self.free_list.lock().concatenate(private);
    }

    /// Start a new cycle: clear the free list and move swept pages back to
    /// the unswept list.
    pub fn prepare_for_sweeping(&self) {
        self.free_list.lock().reset();
        let mut pages = mem::take(&mut *self.swept.lock());
        for page in &mut pages {
            page.mark_unswept();
        }
        self.unswept.lock().append(&mut pages);
    }

    /// Allocate `size` bytes from the free list.
    ///
    /// Only swept pages own free blocks, so this never touches a page that a
    /// sweeper is working on.
    pub fn allocate(&self, size: usize) -> Option<ObjectAddress> {
        let block = self.free_list.lock().allocate(size)?;
        let mut swept = self.swept.lock();
        let page = swept.iter_mut().find(|page| page.id() == block.page);
        debug_assert!(
            page.is_some(),
            "free block points at unpublished page {:?}",
            block.page
        );
        let page = page?;
        page.place_object(block.offset, block.size);
        Some(ObjectAddress {
            space: self.kind,
            page: block.page,
            offset: block.offset,
        })
    }

    /// Pages waiting to be swept.
    #[must_use]
    pub fn unswept_page_count(&self) -> usize {
        self.unswept.lock().len()
    }

    /// Pages already swept this cycle.
    #[must_use]
    pub fn swept_page_count(&self) -> usize {
        self.swept.lock().len()
    }

    /// Bytes available on the free list.
    #[must_use]
    pub fn available_bytes(&self) -> usize {
        self.free_list.lock().available()
    }

    /// Inspect the swept pages.
    pub fn with_swept_pages<R>(&self, f: impl FnOnce(&[Page]) -> R) -> R {
        f(&self.swept.lock())
    }

    /// Mutate the unswept pages, e.g. to set mark bits before a round.
    pub fn with_unswept_pages_mut<R>(&self, f: impl FnOnce(&mut [Page]) -> R) -> R {
        f(&mut self.unswept.lock())
    }
}
