//! Static page partitioning.

use crate::heap::Page;

/// Split `pages` into `parts` contiguous batches whose sizes differ by at
/// most one. The first `pages.len() % parts` batches get the extra page.
///
/// Every page ends up in exactly one batch.
///
/// # Panics
///
/// Panics if `parts` is zero.
#[must_use]
pub fn partition_pages(pages: Vec<Page>, parts: usize) -> Vec<Vec<Page>> {
    assert!(parts > 0, "cannot partition pages into zero batches");

    let base = pages.len() / parts;
    let extra = pages.len() % parts;
    let mut remaining = pages.into_iter();

    (0..parts)
        .map(|part| {
            let len = base + usize::from(part < extra);
            remaining.by_ref().take(len).collect()
        })
        .collect()
}
