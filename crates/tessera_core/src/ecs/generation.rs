//! # Generation Table
//!
//! Lazily-paged table mapping an entity index to its current generation.
//!
//! ```text
//! pages[index >> 16][index & 0xFFFF] -> generation (u8)
//! ```
//!
//! 256 pages of 65,536 generations each cover the whole 24-bit index space.
//! A page is materialised the first time an index inside it is handed out,
//! so a database that never grows past a few thousand entities only pays for
//! a single 64KB page. Pages are never released.
//!
//! Reads are lock-free: pages live in a `OnceLock` and every slot is an
//! `AtomicU8`. Writes (page creation, generation bumps) are serialised by the
//! allocator's free-list mutex.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use super::entity::RAW_INDEX_COUNT;

/// Number of index bits addressed within a single page.
pub(crate) const PAGE_SHIFT: u32 = 16;

/// Generations per page.
pub(crate) const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

const PAGE_MASK: u32 = (1 << PAGE_SHIFT) - 1;

/// Number of pages needed to cover every raw index.
pub(crate) const PAGE_COUNT: usize = RAW_INDEX_COUNT / PAGE_SIZE;

type Page = Box<[AtomicU8]>;

/// Sparse, paged liveness oracle.
pub(crate) struct GenerationTable {
    pages: Box<[OnceLock<Page>]>,
}

impl GenerationTable {
    /// Creates a table with the first `preallocated` pages materialised.
    ///
    /// Page 0 is always materialised (it holds the reserved null index).
    pub(crate) fn new(preallocated: usize) -> Self {
        let pages: Vec<OnceLock<Page>> = (0..PAGE_COUNT).map(|_| OnceLock::new()).collect();
        let table = Self {
            pages: pages.into_boxed_slice(),
        };
        for page in 0..preallocated.clamp(1, PAGE_COUNT) {
            table.materialize(page);
        }
        table
    }

    fn materialize(&self, page: usize) -> bool {
        let mut created = false;
        self.pages[page].get_or_init(|| {
            created = true;
            (0..PAGE_SIZE).map(|_| AtomicU8::new(0)).collect()
        });
        created
    }

    /// Ensures the page covering `index` exists.
    ///
    /// Returns `true` if the page had to be created.
    #[inline]
    pub(crate) fn ensure(&self, index: u32) -> bool {
        let page = (index >> PAGE_SHIFT) as usize;
        if self.pages[page].get().is_some() {
            return false;
        }
        let created = self.materialize(page);
        if created {
            tracing::trace!(page, "materialized generation page");
        }
        created
    }

    #[inline]
    fn slot(&self, index: u32) -> Option<&AtomicU8> {
        let page = self.pages.get((index >> PAGE_SHIFT) as usize)?.get()?;
        Some(&page[(index & PAGE_MASK) as usize])
    }

    /// Current generation of `index`, or `None` if its page was never touched.
    #[inline]
    pub(crate) fn get(&self, index: u32) -> Option<u8> {
        self.slot(index).map(|slot| slot.load(Ordering::Acquire))
    }

    /// Increments the generation of `index` (wrapping) and returns the new value.
    ///
    /// Returns `None` if the page covering `index` does not exist.
    #[inline]
    pub(crate) fn bump(&self, index: u32) -> Option<u8> {
        self.slot(index)
            .map(|slot| slot.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
    }

    /// Number of pages currently materialised.
    pub(crate) fn materialized_pages(&self) -> usize {
        self.pages.iter().filter(|page| page.get().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_is_materialized() {
        let table = GenerationTable::new(0);
        assert_eq!(table.materialized_pages(), 1);
        assert_eq!(table.get(0), Some(0));
        assert_eq!(table.get(PAGE_SIZE as u32), None);
    }

    #[test]
    fn test_lazy_page_creation() {
        let table = GenerationTable::new(1);
        let index = (3 * PAGE_SIZE + 17) as u32;

        assert!(table.ensure(index));
        assert!(!table.ensure(index));
        assert_eq!(table.materialized_pages(), 2);
        assert_eq!(table.get(index), Some(0));
    }

    #[test]
    fn test_bump_wraps() {
        let table = GenerationTable::new(1);
        for expected in 1..=255u8 {
            assert_eq!(table.bump(5), Some(expected));
        }
        assert_eq!(table.bump(5), Some(0));
        assert_eq!(table.get(5), Some(0));
        // neighbours are untouched
        assert_eq!(table.get(4), Some(0));
    }

    #[test]
    fn test_bump_missing_page() {
        let table = GenerationTable::new(1);
        assert_eq!(table.bump((PAGE_SIZE * 2) as u32), None);
    }

    #[test]
    fn test_preallocation_is_clamped() {
        let table = GenerationTable::new(usize::MAX);
        assert_eq!(table.materialized_pages(), PAGE_COUNT);
    }
}
