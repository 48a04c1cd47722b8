//! # Entity Handles
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into per-type sparse maps
//! - A generation counter for safe reuse

use std::cmp::Ordering;
use std::fmt;

/// Handle pairing a slot index with the generation of its occupant.
///
/// Two handles are equal only if both fields match. Ordering compares the
/// index first, so sorting a list of handles sorts it by slot; the
/// generation only breaks ties, keeping `Ord` consistent with `Eq`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct GenerationalIndex {
    index: u32,
    generation: u32,
}

/// An entity is nothing more than its generational handle.
pub type Entity = GenerationalIndex;

impl GenerationalIndex {
    /// Creates a handle from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Slot index widened for array addressing.
    #[inline]
    #[must_use]
    pub(crate) const fn slot(self) -> usize {
        self.index as usize
    }
}

impl Ord for GenerationalIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then(self.generation.cmp(&other.generation))
    }
}

impl PartialOrd for GenerationalIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GenerationalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}#{})", self.index, self.generation)
    }
}
