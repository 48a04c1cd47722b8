//! # Handle Allocator
//!
//! Owns the liveness and generation bookkeeping for every slot ever issued.
//!
//! Freed indices are recycled in FIFO order: a retired index waits behind
//! every other free index before it is handed out again, which widens the
//! window between retirement and reuse.
//!
//! ## Generation overflow
//!
//! Generations are `u32`. A slot destroyed while at `u32::MAX` is retired
//! for good instead of being queued for reuse, so a generation never repeats
//! for an index. The cost is one permanently dead slot per 2^32 reuses.

use std::collections::VecDeque;

use super::entity::GenerationalIndex;

/// Bookkeeping for one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocatorEntry {
    /// Generation of the slot's current (or most recent) occupant.
    pub generation: u32,
    /// Whether the most recently issued handle for this slot is alive.
    pub is_live: bool,
}

/// Issues and retires generational handles.
///
/// # Example
///
/// ```rust
/// use tessera_core::GenerationalIndexAllocator;
///
/// let mut allocator = GenerationalIndexAllocator::new();
/// let first = allocator.allocate();
/// assert!(allocator.destroy(first));
///
/// let reused = allocator.allocate();
/// assert_eq!(reused.index(), first.index());
/// assert_ne!(reused.generation(), first.generation());
/// ```
#[derive(Debug, Default)]
pub struct GenerationalIndexAllocator {
    entries: Vec<AllocatorEntry>,
    free: VecDeque<u32>,
    retired: usize,
}

impl GenerationalIndexAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a handle, reusing the oldest freed slot if there is one.
    ///
    /// A reused slot comes back with its generation bumped by one.
    ///
    /// # Panics
    ///
    /// Panics if all 2^32 indices have been issued.
    pub fn allocate(&mut self) -> GenerationalIndex {
        if let Some(index) = self.free.pop_front() {
            let entry = &mut self.entries[index as usize];
            entry.generation += 1;
            entry.is_live = true;
            return GenerationalIndex::new(index, entry.generation);
        }

        let Ok(index) = u32::try_from(self.entries.len()) else {
            panic!("generational index allocator exhausted the u32 index space");
        };
        self.entries.push(AllocatorEntry {
            generation: 0,
            is_live: true,
        });
        GenerationalIndex::new(index, 0)
    }

    /// Retires a handle, queueing its index for reuse.
    ///
    /// Returns `false` without touching anything if the slot is not live or
    /// the handle is from an earlier generation than the slot's occupant.
    pub fn destroy(&mut self, handle: GenerationalIndex) -> bool {
        let Some(entry) = self.entries.get_mut(handle.slot()) else {
            return false;
        };
        if !entry.is_live || entry.generation != handle.generation() {
            return false;
        }

        entry.is_live = false;
        if entry.generation == u32::MAX {
            self.retired += 1;
            tracing::debug!(
                index = handle.index(),
                "slot generation exhausted, retiring index permanently"
            );
        } else {
            self.free.push_back(handle.index());
        }
        true
    }

    /// Whether the handle's slot exists and is marked live.
    ///
    /// Only the index is consulted. Use [`Self::is_current`] to also match
    /// the generation.
    #[must_use]
    pub fn is_live(&self, handle: GenerationalIndex) -> bool {
        self.entries
            .get(handle.slot())
            .is_some_and(|entry| entry.is_live)
    }

    /// Whether the handle is live and is the slot's current generation.
    #[must_use]
    pub fn is_current(&self, handle: GenerationalIndex) -> bool {
        self.entries
            .get(handle.slot())
            .is_some_and(|entry| entry.is_live && entry.generation == handle.generation())
    }

    /// Bookkeeping for an index, if that slot was ever issued.
    #[must_use]
    pub fn entry(&self, index: u32) -> Option<&AllocatorEntry> {
        self.entries.get(index as usize)
    }

    /// Number of slots ever created, live or not.
    #[inline]
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.entries.len()
    }

    /// Number of indices waiting for reuse.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of indices retired after exhausting their generations.
    #[inline]
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    /// Number of currently live handles.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.len() - self.free.len() - self.retired
    }

    #[cfg(test)]
    fn force_generation(&mut self, index: u32, generation: u32) {
        self.entries[index as usize].generation = generation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_allocation() {
        let mut alloc = GenerationalIndexAllocator::new();
        assert_eq!(alloc.allocated(), 0);

        let mut indices = HashSet::new();
        let mut last = GenerationalIndex::default();
        for _ in 0..5 {
            last = alloc.allocate();
            indices.insert(last.index());
            assert!(alloc.is_live(last));
        }
        assert_eq!(alloc.free_count(), 0);
        assert_eq!(alloc.allocated(), 5);
        assert_eq!(indices.len(), 5);

        assert!(alloc.destroy(last));
        assert_eq!(alloc.allocated(), 5);
        assert_eq!(alloc.free_count(), 1);

        let realloc = alloc.allocate();
        assert_eq!(realloc.index(), last.index());
        assert_ne!(realloc.generation(), last.generation());
    }

    #[test]
    fn test_fresh_handles_start_at_generation_zero() {
        let mut alloc = GenerationalIndexAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!(a, GenerationalIndex::new(0, 0));
        assert_eq!(b, GenerationalIndex::new(1, 0));
    }

    #[test]
    fn test_double_destroy_is_rejected() {
        let mut alloc = GenerationalIndexAllocator::new();
        let handle = alloc.allocate();
        assert!(alloc.destroy(handle));
        assert!(!alloc.destroy(handle));
        assert_eq!(alloc.free_count(), 1);
    }

    #[test]
    fn test_stale_destroy_spares_new_occupant() {
        let mut alloc = GenerationalIndexAllocator::new();
        let old = alloc.allocate();
        alloc.destroy(old);
        let new = alloc.allocate();

        assert!(!alloc.destroy(old));
        assert!(alloc.is_current(new));
    }

    #[test]
    fn test_is_live_ignores_generation() {
        let mut alloc = GenerationalIndexAllocator::new();
        let old = alloc.allocate();
        alloc.destroy(old);
        let new = alloc.allocate();

        assert!(alloc.is_live(old));
        assert!(!alloc.is_current(old));
        assert!(alloc.is_current(new));
    }

    #[test]
    fn test_unknown_index_is_not_live() {
        let mut alloc = GenerationalIndexAllocator::new();
        let bogus = GenerationalIndex::new(42, 0);
        assert!(!alloc.is_live(bogus));
        assert!(!alloc.destroy(bogus));
    }

    #[test]
    fn test_free_list_is_fifo() {
        let mut alloc = GenerationalIndexAllocator::new();
        let handles: Vec<_> = (0..4).map(|_| alloc.allocate()).collect();
        alloc.destroy(handles[2]);
        alloc.destroy(handles[0]);
        alloc.destroy(handles[3]);

        assert_eq!(alloc.allocate().index(), 2);
        assert_eq!(alloc.allocate().index(), 0);
        assert_eq!(alloc.allocate().index(), 3);
        // Free list drained: next allocation grows the table.
        assert_eq!(alloc.allocate().index(), 4);
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let mut alloc = GenerationalIndexAllocator::new();
        let first = alloc.allocate();
        alloc.destroy(first);
        alloc.force_generation(0, u32::MAX - 1);

        let last_gen = alloc.allocate();
        assert_eq!(last_gen.generation(), u32::MAX);
        assert!(alloc.destroy(last_gen));
        assert_eq!(alloc.free_count(), 0);
        assert_eq!(alloc.retired_count(), 1);

        let fresh = alloc.allocate();
        assert_eq!(fresh.index(), 1);
        assert_eq!(alloc.live_count(), 1);
    }

    #[test]
    fn test_counts() {
        let mut alloc = GenerationalIndexAllocator::new();
        let handles: Vec<_> = (0..10).map(|_| alloc.allocate()).collect();
        for handle in handles.iter().step_by(2) {
            alloc.destroy(*handle);
        }
        assert_eq!(alloc.allocated(), 10);
        assert_eq!(alloc.free_count(), 5);
        assert_eq!(alloc.live_count(), 5);
        assert_eq!(alloc.entry(1).map(|e| e.is_live), Some(true));
        assert_eq!(alloc.entry(0).map(|e| e.is_live), Some(false));
    }
}
