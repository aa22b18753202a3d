//! Heap pages: the unit of sweeping work.
//!
//! A page is a fixed-size region holding a header followed by an object
//! area. Objects are recorded by offset and size; marking sets a bit on an
//! object, sweeping drops every unmarked object and turns the gaps between
//! survivors into free blocks.

use super::free_list::{FreeBlock, FreeList, WORD_SIZE};

/// Size of each memory page.
pub const PAGE_SIZE: usize = 4096;

/// Bytes reserved for the page header.
pub const PAGE_HEADER_SIZE: usize = 64;

/// Bytes usable for objects.
pub const OBJECT_AREA_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Identifier of a page, unique within its heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

/// The spaces whose pages are swept on sweeper threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceKind {
    /// Objects holding no heap references.
    OldData,
    /// Objects that may hold heap references.
    OldPointer,
}

impl SpaceKind {
    /// Every sweepable space, in sweep order.
    pub const ALL: [Self; 2] = [Self::OldData, Self::OldPointer];

    /// Dense index of the space.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::OldData => 0,
            Self::OldPointer => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapObject {
    offset: usize,
    size: usize,
    marked: bool,
}

impl HeapObject {
    const fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// What sweeping one page produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSweepResult {
    /// Bytes added to the free list.
    pub freed_bytes: usize,
    /// Bytes in gaps too small to track.
    pub wasted_bytes: usize,
    /// Largest free block produced.
    pub max_free_block: usize,
    /// Dead objects dropped.
    pub objects_freed: usize,
}

/// A heap page.
#[derive(Debug)]
pub struct Page {
    id: PageId,
    space: SpaceKind,
    /// Sorted by offset, non-overlapping.
    objects: Vec<HeapObject>,
    /// Bump pointer for fresh pages.
    top: usize,
    swept: bool,
    sweep_count: u32,
}

impl Page {
    /// Create an empty page.
    #[must_use]
    pub const fn new(id: PageId, space: SpaceKind) -> Self {
        Self {
            id,
            space,
            objects: Vec::new(),
            top: PAGE_HEADER_SIZE,
            swept: false,
            sweep_count: 0,
        }
    }

    /// The page's identifier.
    #[must_use]
    pub const fn id(&self) -> PageId {
        self.id
    }

    /// The space the page belongs to.
    #[must_use]
    pub const fn space(&self) -> SpaceKind {
        self.space
    }

    /// Bump-allocate an object of `size` bytes (rounded up to a word).
    ///
    /// Returns the object's offset, or `None` when the page is full or the
    /// page has already been swept (swept pages allocate through the free
    /// list).
    pub fn allocate_raw(&mut self, size: usize) -> Option<usize> {
        if size == 0 || self.swept {
            return None;
        }
        let size = size.checked_next_multiple_of(WORD_SIZE)?;
        if self.top.checked_add(size)? > PAGE_SIZE {
            return None;
        }
        let offset = self.top;
        self.objects.push(HeapObject {
            offset,
            size,
            marked: false,
        });
        self.top += size;
        Some(offset)
    }

    /// Record an object carved out of a free block of this page.
    pub(crate) fn place_object(&mut self, offset: usize, size: usize) {
        debug_assert!(offset >= PAGE_HEADER_SIZE && offset + size <= PAGE_SIZE);
        let pos = self.objects.partition_point(|object| object.offset < offset);
        debug_assert!(pos == 0 || self.objects[pos - 1].end() <= offset);
        debug_assert!(pos == self.objects.len() || offset + size <= self.objects[pos].offset);
        self.objects.insert(
            pos,
            HeapObject {
                offset,
                size,
                marked: false,
            },
        );
    }

    /// Set the mark bit of the object starting at `offset`.
    ///
    /// Returns `false` if no object starts there.
    pub fn mark(&mut self, offset: usize) -> bool {
        match self.find(offset) {
            Some(index) => {
                self.objects[index].marked = true;
                true
            }
            None => false,
        }
    }

    /// Whether the object at `offset` exists and is marked.
    #[must_use]
    pub fn is_marked(&self, offset: usize) -> bool {
        self.find(offset)
            .is_some_and(|index| self.objects[index].marked)
    }

    /// Whether an object starts at `offset`.
    #[must_use]
    pub fn contains_object(&self, offset: usize) -> bool {
        self.find(offset).is_some()
    }

    fn find(&self, offset: usize) -> Option<usize> {
        self.objects
            .binary_search_by_key(&offset, |object| object.offset)
            .ok()
    }

    /// Number of recorded objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Bytes held by marked objects.
    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.objects
            .iter()
            .filter(|object| object.marked)
            .map(|object| object.size)
            .sum()
    }

    /// Bytes held by recorded objects.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.objects.iter().map(|object| object.size).sum()
    }

    /// Bytes held by unmarked objects.
    #[must_use]
    pub fn dead_bytes(&self) -> usize {
        self.allocated_bytes() - self.live_bytes()
    }

    /// Bytes a sweep would hand back: the object area minus live objects.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> usize {
        OBJECT_AREA_SIZE - self.live_bytes()
    }

    /// Whether the page has been swept in the current GC cycle.
    #[must_use]
    pub const fn is_swept(&self) -> bool {
        self.swept
    }

    /// How many times the page has been swept over its lifetime.
    #[must_use]
    pub const fn sweep_count(&self) -> u32 {
        self.sweep_count
    }

    pub(crate) fn mark_unswept(&mut self) {
        self.swept = false;
    }

    /// Reclaim dead space into `free_list`.
    ///
    /// Unmarked objects are dropped, survivors have their marks cleared, and
    /// every gap between survivors (including the unused tail) becomes a
    /// free block.
    pub fn sweep(&mut self, free_list: &mut FreeList) -> PageSweepResult {
        debug_assert!(!self.swept, "page {:?} swept twice in one cycle", self.id);

        let before = self.objects.len();
        self.objects.retain(|object| object.marked);
        let mut result = PageSweepResult {
            objects_freed: before - self.objects.len(),
            ..PageSweepResult::default()
        };

        let mut cursor = PAGE_HEADER_SIZE;
        for object in &self.objects {
            if object.offset > cursor {
                self.release(free_list, cursor, object.offset - cursor, &mut result);
            }
            cursor = object.end();
        }
        if cursor < PAGE_SIZE {
            self.release(free_list, cursor, PAGE_SIZE - cursor, &mut result);
        }

        for object in &mut self.objects {
            object.marked = false;
        }
        self.top = PAGE_SIZE;
        self.swept = true;
        self.sweep_count += 1;
        result
    }

    fn release(
        &self,
        free_list: &mut FreeList,
        offset: usize,
        size: usize,
        result: &mut PageSweepResult,
    ) {
        let wasted = free_list.free(FreeBlock {
            page: self.id,
            offset,
            size,
        });
        if wasted == 0 {
            result.freed_bytes += size;
            result.max_free_block = result.max_free_block.max(size);
        } else {
            result.wasted_bytes += wasted;
        }
    }
}
