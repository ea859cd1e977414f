//! # Entity Handles
//!
//! Entities are lightweight, versioned identifiers consisting of:
//! - A 24-bit index into the allocator's generation table
//! - An 8-bit generation counter for detecting stale references
//!
//! The pair is packed into a single `u32` so that owner columns in the
//! component stores stay as dense as the attribute columns next to them.
//! 24 bits allow ~16.7M live entities; 8 bits mean an index has to be
//! recycled 256 times before a stale handle could alias a live one.

use std::cmp::Ordering;
use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Number of bits used by the index portion of a handle.
pub const INDEX_BITS: u32 = 24;

/// Number of bits used by the generation portion of a handle.
pub const GENERATION_BITS: u32 = 8;

/// Mask selecting the index bits of a packed handle.
pub const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Number of distinct raw index values, including the reserved index 0.
pub const RAW_INDEX_COUNT: usize = 1 << INDEX_BITS;

/// Maximum number of entities that can be alive at the same time.
///
/// Index 0 is reserved for [`Entity::NULL`], so one raw index is lost.
pub const MAX_ENTITY_COUNT: usize = RAW_INDEX_COUNT - 1;

/// Versioned handle to a logical object.
///
/// Layout (little end first):
/// - Bits 0..24: index
/// - Bits 24..32: generation
///
/// Handles are produced by [`Database`](super::Database) and are never
/// mutated afterwards. A handle is dead once the database's generation for
/// its index no longer matches.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// The null handle. Never alive.
    pub const NULL: Self = Self(0);

    /// Packs an index and a generation into a handle.
    #[inline]
    #[must_use]
    pub(crate) const fn new(index: u32, generation: u8) -> Self {
        debug_assert!(index <= INDEX_MASK);
        Self(((generation as u32) << INDEX_BITS) | (index & INDEX_MASK))
    }

    /// Returns the index portion of the handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Returns the generation portion of the handle.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u8 {
        (self.0 >> INDEX_BITS) as u8
    }

    /// Checks if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns the packed representation.
    ///
    /// Useful as a stable id for debugging and printing.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Rebuilds a handle from its packed representation.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl Ord for Entity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index()
            .cmp(&other.index())
            .then_with(|| self.generation().cmp(&other.generation()))
    }
}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}v{}", self.index(), self.generation())
        }
    }
}

/// Views a slice of handles as their packed `u32` values without copying.
#[inline]
#[must_use]
pub fn as_raw(entities: &[Entity]) -> &[u32] {
    bytemuck::cast_slice(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_roundtrip() {
        let e = Entity::new(12345, 67);
        assert_eq!(e.index(), 12345);
        assert_eq!(e.generation(), 67);
        assert!(!e.is_null());
        assert_eq!(Entity::from_bits(e.to_bits()), e);
    }

    #[test]
    fn test_null_entity() {
        assert!(Entity::NULL.is_null());
        assert!(Entity::default().is_null());
        assert_eq!(Entity::NULL.index(), 0);
        // index 0 with a non-zero generation is not the null handle
        assert!(!Entity::new(0, 1).is_null());
    }

    #[test]
    fn test_entity_limits() {
        let e = Entity::new(INDEX_MASK, u8::MAX);
        assert_eq!(e.index() as usize, MAX_ENTITY_COUNT);
        assert_eq!(e.generation(), u8::MAX);
        assert_eq!(e.to_bits(), u32::MAX);
    }

    #[test]
    fn test_entity_ordering_by_index() {
        let a = Entity::new(1, 200);
        let b = Entity::new(2, 0);
        let c = Entity::new(2, 1);
        assert!(a < b);
        assert!(b < c);

        let mut sorted = vec![c, a, b];
        sorted.sort();
        assert_eq!(sorted, vec![a, b, c]);
    }

    #[test]
    fn test_entity_display() {
        assert_eq!(Entity::new(3, 1).to_string(), "3v1");
        assert_eq!(format!("{:?}", Entity::NULL), "null");
    }

    #[test]
    fn test_raw_view() {
        let entities = [Entity::new(1, 0), Entity::new(2, 3)];
        let raw = as_raw(&entities);
        assert_eq!(raw, &[1, (3 << INDEX_BITS) | 2]);
    }
}
