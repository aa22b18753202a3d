//! Segregated free lists filled by sweeping.
//!
//! Blocks are bucketed into four size categories. Allocation is first fit,
//! starting at the category of the requested size. Blocks smaller than
//! [`MIN_BLOCK_SIZE`] are not tracked and count as wasted.

use super::PageId;

/// Size of a heap word in bytes.
pub const WORD_SIZE: usize = 8;

/// Smallest block worth keeping on a free list.
pub const MIN_BLOCK_SIZE: usize = 2 * WORD_SIZE;

const SMALL_LIST_MAX: usize = 0xff * WORD_SIZE;
const MEDIUM_LIST_MAX: usize = 0x7ff * WORD_SIZE;
const LARGE_LIST_MAX: usize = 0x3fff * WORD_SIZE;

const CATEGORY_COUNT: usize = 4;

/// A contiguous free range inside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    /// Page holding the range.
    pub page: PageId,
    /// Byte offset from the start of the page.
    pub offset: usize,
    /// Length in bytes.
    pub size: usize,
}

/// Size bucket of a free block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FreeListCategory {
    /// Up to `0xff` words.
    Small,
    /// Up to `0x7ff` words.
    Medium,
    /// Up to `0x3fff` words.
    Large,
    /// Anything bigger.
    Huge,
}

impl FreeListCategory {
    /// Bucket for a block of `size` bytes.
    #[must_use]
    pub const fn for_size(size: usize) -> Self {
        if size <= SMALL_LIST_MAX {
            Self::Small
        } else if size <= MEDIUM_LIST_MAX {
            Self::Medium
        } else if size <= LARGE_LIST_MAX {
            Self::Large
        } else {
            Self::Huge
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// A free list: blocks per category plus byte accounting.
#[derive(Debug, Default)]
pub struct FreeList {
    categories: [Vec<FreeBlock>; CATEGORY_COUNT],
    available: usize,
    wasted: usize,
}

impl FreeList {
    /// Create an empty free list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block. Returns the bytes wasted (the whole block if it is too
    /// small to track, otherwise `0`).
    pub fn free(&mut self, block: FreeBlock) -> usize {
        if block.size < MIN_BLOCK_SIZE {
            self.wasted += block.size;
            return block.size;
        }
        self.categories[FreeListCategory::for_size(block.size).index()].push(block);
        self.available += block.size;
        0
    }

    /// Take `size` bytes from the first block that fits.
    ///
    /// The unused tail of the block goes back onto the list.
    pub fn allocate(&mut self, size: usize) -> Option<FreeBlock> {
        if size == 0 {
            return None;
        }
        let size = align_to_word(size)?;
        let first = FreeListCategory::for_size(size).index();

        for category in first..CATEGORY_COUNT {
            let blocks = &mut self.categories[category];
            let Some(pos) = blocks.iter().position(|block| block.size >= size) else {
                continue;
            };
            let block = blocks.swap_remove(pos);
            self.available -= block.size;

            let rest = block.size - size;
            if rest > 0 {
                self.free(FreeBlock {
                    page: block.page,
                    offset: block.offset + size,
                    size: rest,
                });
            }
            return Some(FreeBlock { size, ..block });
        }
        None
    }

    /// Move every block of `other` onto this list, leaving `other` empty.
    ///
    /// Returns the number of available bytes moved.
    pub fn concatenate(&mut self, other: &mut Self) -> usize {
        let moved = other.available;
        for (mine, theirs) in self.categories.iter_mut().zip(other.categories.iter_mut()) {
            mine.append(theirs);
        }
        self.available += moved;
        self.wasted += other.wasted;
        other.reset();
        moved
    }

    /// Drop every block and zero the accounting.
    pub fn reset(&mut self) {
        for blocks in &mut self.categories {
            blocks.clear();
        }
        self.available = 0;
        self.wasted = 0;
    }

    /// Bytes available for allocation.
    #[must_use]
    pub const fn available(&self) -> usize {
        self.available
    }

    /// Bytes in fragments too small to track.
    #[must_use]
    pub const fn wasted(&self) -> usize {
        self.wasted
    }

    /// Whether no block is available.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Number of blocks on the list.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Size of the largest block, or `0` if empty.
    #[must_use]
    pub fn max_block_size(&self) -> usize {
        self.categories
            .iter()
            .flatten()
            .map(|block| block.size)
            .max()
            .unwrap_or(0)
    }
}

fn align_to_word(size: usize) -> Option<usize> {
    size.checked_next_multiple_of(WORD_SIZE)
}
