//! # Generational Packed Array
//!
//! Dense per-type component storage addressed by generational handles.
//!
//! ```text
//! sparse:  index -> dense slot      [_, 1, _, 0, 2, ...]   (fixed capacity)
//! live:    index -> present?        [0, 1, 0, 1, 1, ...]   (fixed capacity)
//! handles: dense slot -> handle     [h3, h1, h4]           (no gaps)
//! values:  dense slot -> value      [v3, v1, v4]           (no gaps)
//! ```
//!
//! Lookups validate twice: the index must be live in this store, then the
//! stored handle's generation must match the requested one. The second check
//! turns use of a destroyed-and-reused slot into [`StoreError::StaleHandle`]
//! instead of silently handing out another entity's data.
//!
//! Removal is swap-remove: the last dense element moves into the hole. It is
//! O(1) and leaves no gaps, but dense order is not preserved across removals.

use crate::config::MAX_ENTITIES;
use crate::error::{StoreError, StoreResult};

use super::entity::GenerationalIndex;

/// Fixed-capacity presence bitset. 64 indices per word.
#[derive(Debug, Clone)]
struct LivenessBits {
    words: Box<[u64]>,
}

impl LivenessBits {
    fn new(capacity: usize) -> Self {
        let word_count = capacity.div_ceil(64);
        Self {
            words: vec![0u64; word_count].into_boxed_slice(),
        }
    }

    #[inline]
    fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|word| (word >> (index % 64)) & 1 == 1)
    }

    #[inline]
    fn set(&mut self, index: usize) {
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    #[inline]
    fn clear(&mut self, index: usize) {
        self.words[index / 64] &= !(1u64 << (index % 64));
    }

    fn clear_all(&mut self) {
        for word in self.words.iter_mut() {
            *word = 0;
        }
    }
}

/// Packed storage for one component type.
///
/// # Example
///
/// ```rust
/// use tessera_core::{GenerationalIndexAllocator, GenerationalIndexArray};
///
/// let mut allocator = GenerationalIndexAllocator::new();
/// let mut healths: GenerationalIndexArray<u32> = GenerationalIndexArray::with_capacity(128);
///
/// let entity = allocator.allocate();
/// assert!(healths.emplace(entity, 100));
/// assert_eq!(healths.get(entity), Ok(&100));
/// ```
#[derive(Debug)]
pub struct GenerationalIndexArray<T> {
    /// Index -> dense slot. Only meaningful where `live` is set.
    sparse: Box<[u32]>,
    /// Index -> present in this store.
    live: LivenessBits,
    /// Handles in dense order, co-indexed with `values`.
    handles: Vec<GenerationalIndex>,
    /// Values in dense order.
    values: Vec<T>,
    capacity: usize,
}

impl<T> GenerationalIndexArray<T> {
    /// Creates a store addressing [`MAX_ENTITIES`] indices.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }

    /// Creates a store addressing indices `0..capacity`.
    ///
    /// The sparse map and bitset are allocated up front; the dense arrays
    /// grow on demand.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        Self {
            sparse: vec![0u32; capacity].into_boxed_slice(),
            live: LivenessBits::new(capacity),
            handles: Vec::new(),
            values: Vec::new(),
            capacity,
        }
    }

    /// Maximum index (exclusive) this store accepts.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the store holds nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stores a value for the handle's index.
    ///
    /// Returns `false` and leaves the store untouched if the index is
    /// already present (whatever its generation) or lies beyond capacity.
    pub fn emplace(&mut self, handle: GenerationalIndex, value: T) -> bool {
        let slot = handle.slot();
        if slot >= self.capacity {
            tracing::warn!(
                index = handle.index(),
                capacity = self.capacity,
                "emplace rejected: index beyond store capacity"
            );
            return false;
        }
        if self.live.contains(slot) {
            tracing::debug!(index = handle.index(), "emplace rejected: index already present");
            return false;
        }
        self.push(handle, value);
        true
    }

    /// Stores a value, replacing any value already held at that index.
    ///
    /// On replacement the stored handle is overwritten too, so the store
    /// follows the newer generation. Returns the replaced value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CapacityExceeded`] if the index lies beyond
    /// capacity.
    pub fn set(&mut self, handle: GenerationalIndex, value: T) -> StoreResult<Option<T>> {
        let slot = handle.slot();
        if slot >= self.capacity {
            return Err(StoreError::CapacityExceeded {
                index: handle.index(),
                capacity: self.capacity,
            });
        }
        if self.live.contains(slot) {
            let dense = self.sparse[slot] as usize;
            debug_assert_eq!(self.handles[dense].index(), handle.index());
            self.handles[dense] = handle;
            return Ok(Some(std::mem::replace(&mut self.values[dense], value)));
        }
        self.push(handle, value);
        Ok(None)
    }

    fn push(&mut self, handle: GenerationalIndex, value: T) {
        let slot = handle.slot();
        // len < capacity <= 2^32, so the dense slot fits in a u32.
        self.sparse[slot] = self.handles.len() as u32;
        self.handles.push(handle);
        self.values.push(value);
        self.live.set(slot);
    }

    /// Whether the handle's index is present. The generation is not checked.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: GenerationalIndex) -> bool {
        self.live.contains(handle.slot())
    }

    /// Whether exactly this handle (index and generation) is stored.
    #[must_use]
    pub fn holds(&self, handle: GenerationalIndex) -> bool {
        let slot = handle.slot();
        self.live.contains(slot) && self.handles[self.sparse[slot] as usize] == handle
    }

    /// Resolves a handle to its dense slot, validating index then generation.
    pub(crate) fn locate(&self, handle: GenerationalIndex) -> StoreResult<usize> {
        let slot = handle.slot();
        if !self.live.contains(slot) {
            tracing::trace!(index = handle.index(), "lookup of absent index");
            return Err(StoreError::NotFound {
                index: handle.index(),
            });
        }
        let dense = self.sparse[slot] as usize;
        let stored = self.handles[dense];
        debug_assert_eq!(stored.index(), handle.index(), "sparse map out of sync");
        if stored.generation() != handle.generation() {
            tracing::warn!(
                index = handle.index(),
                requested = handle.generation(),
                stored = stored.generation(),
                "stale handle access"
            );
            return Err(StoreError::StaleHandle {
                index: handle.index(),
                requested: handle.generation(),
                stored: stored.generation(),
            });
        }
        Ok(dense)
    }

    /// Returns the value for exactly this handle.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the index is absent,
    /// [`StoreError::StaleHandle`] if a different generation is stored.
    pub fn get(&self, handle: GenerationalIndex) -> StoreResult<&T> {
        let dense = self.locate(handle)?;
        Ok(&self.values[dense])
    }

    /// Mutable variant of [`Self::get`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub fn get_mut(&mut self, handle: GenerationalIndex) -> StoreResult<&mut T> {
        let dense = self.locate(handle)?;
        Ok(&mut self.values[dense])
    }

    /// Removes and returns the value for exactly this handle.
    ///
    /// The last dense element is swapped into the vacated slot.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`]; on error nothing is modified.
    pub fn remove(&mut self, handle: GenerationalIndex) -> StoreResult<T> {
        let dense = self.locate(handle)?;
        let last = self.handles.len() - 1;
        if dense != last {
            let moved = self.handles[last];
            self.sparse[moved.slot()] = dense as u32;
        }
        self.handles.swap_remove(dense);
        let value = self.values.swap_remove(dense);
        self.live.clear(handle.slot());
        Ok(value)
    }

    /// Handles in current dense order.
    ///
    /// The order is stable until the next emplace or remove.
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[GenerationalIndex] {
        &self.handles
    }

    /// Values in current dense order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Mutable values in current dense order.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Iterates over `(handle, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (GenerationalIndex, &T)> {
        self.handles.iter().copied().zip(self.values.iter())
    }

    /// Iterates mutably over `(handle, value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (GenerationalIndex, &mut T)> {
        self.handles.iter().copied().zip(self.values.iter_mut())
    }

    /// Drops every stored value. Capacity is kept.
    pub fn clear(&mut self) {
        self.handles.clear();
        self.values.clear();
        self.live.clear_all();
    }
}

impl<T> Default for GenerationalIndexArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::allocator::GenerationalIndexAllocator;
    use std::collections::HashMap;

    fn handles(count: u32) -> Vec<GenerationalIndex> {
        (0..count).map(|i| GenerationalIndex::new(i, 0)).collect()
    }

    #[test]
    fn test_insert_and_remove() {
        let mut alloc = GenerationalIndexAllocator::new();
        let mut ints: GenerationalIndexArray<i32> = GenerationalIndexArray::with_capacity(64);
        let mut values = HashMap::new();
        let mut gen_indices = Vec::new();

        for i in 0..5 {
            let index = alloc.allocate();
            let value = i * 100;
            assert!(ints.emplace(index, value));
            values.insert(index.index(), value);
            gen_indices.push(index);
        }
        for index in &gen_indices {
            assert_eq!(ints.get(*index), Ok(&values[&index.index()]));
        }

        // Remove one in the middle.
        let removed = gen_indices.remove(3);
        assert_eq!(ints.remove(removed), Ok(300));
        alloc.destroy(removed);
        for index in &gen_indices {
            assert_eq!(ints.get(*index), Ok(&values[&index.index()]));
        }

        // Add it back under a new generation.
        let new_index = alloc.allocate();
        assert_eq!(new_index.index(), removed.index());
        let new_val = new_index.index() as i32 * 100;
        assert!(ints.emplace(new_index, new_val));
        values.insert(new_index.index(), new_val);
        gen_indices.push(new_index);
        for index in &gen_indices {
            assert_eq!(ints.get(*index), Ok(&values[&index.index()]));
        }
        assert_eq!(
            ints.get(removed),
            Err(StoreError::StaleHandle {
                index: 3,
                requested: 0,
                stored: 1
            })
        );
    }

    #[test]
    fn test_duplicate_emplace_is_noop() {
        let mut store = GenerationalIndexArray::with_capacity(8);
        let h = GenerationalIndex::new(2, 0);
        assert!(store.emplace(h, "first"));
        assert!(!store.emplace(h, "second"));
        assert!(!store.emplace(GenerationalIndex::new(2, 5), "other gen"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(h), Ok(&"first"));
    }

    #[test]
    fn test_emplace_beyond_capacity() {
        let mut store = GenerationalIndexArray::with_capacity(4);
        assert!(!store.emplace(GenerationalIndex::new(4, 0), 1));
        assert!(store.is_empty());
        assert!(!store.contains(GenerationalIndex::new(4, 0)));
    }

    #[test]
    fn test_get_missing() {
        let store: GenerationalIndexArray<u8> = GenerationalIndexArray::with_capacity(4);
        assert_eq!(
            store.get(GenerationalIndex::new(1, 0)),
            Err(StoreError::NotFound { index: 1 })
        );
        assert_eq!(
            store.get(GenerationalIndex::new(100, 0)),
            Err(StoreError::NotFound { index: 100 })
        );
    }

    #[test]
    fn test_remove_compacts_and_fixes_sparse() {
        let mut store = GenerationalIndexArray::with_capacity(16);
        let hs = handles(4);
        for (i, h) in hs.iter().enumerate() {
            store.emplace(*h, i * 10);
        }

        assert_eq!(store.remove(hs[0]), Ok(0));
        assert_eq!(store.len(), 3);
        assert!(!store.contains(hs[0]));
        for h in &hs[1..] {
            assert!(store.contains(*h));
        }
        // The former last element took slot 0 and is still reachable.
        assert_eq!(store.indices()[0], hs[3]);
        assert_eq!(store.get(hs[3]), Ok(&30));
        assert_eq!(store.get(hs[1]), Ok(&10));
    }

    #[test]
    fn test_remove_last_truncates() {
        let mut store = GenerationalIndexArray::with_capacity(16);
        let hs = handles(3);
        for h in &hs {
            store.emplace(*h, h.index());
        }
        assert_eq!(store.remove(hs[2]), Ok(2));
        assert_eq!(store.indices(), &hs[..2]);
    }

    #[test]
    fn test_failed_remove_leaves_store_untouched() {
        let mut store = GenerationalIndexArray::with_capacity(16);
        let hs = handles(3);
        for h in &hs {
            store.emplace(*h, h.index());
        }
        let before: Vec<_> = store.indices().to_vec();

        assert_eq!(
            store.remove(GenerationalIndex::new(1, 7)),
            Err(StoreError::StaleHandle {
                index: 1,
                requested: 7,
                stored: 0
            })
        );
        assert_eq!(
            store.remove(GenerationalIndex::new(9, 0)),
            Err(StoreError::NotFound { index: 9 })
        );
        assert_eq!(store.indices(), before.as_slice());
        assert_eq!(store.values(), &[0, 1, 2]);
    }

    #[test]
    fn test_contains_ignores_generation() {
        let mut store = GenerationalIndexArray::with_capacity(8);
        store.emplace(GenerationalIndex::new(1, 0), ());
        assert!(store.contains(GenerationalIndex::new(1, 3)));
    }

    #[test]
    fn test_set_replaces_value_and_generation() {
        let mut store = GenerationalIndexArray::with_capacity(8);
        let old = GenerationalIndex::new(1, 0);
        let new = GenerationalIndex::new(1, 1);

        assert_eq!(store.set(old, 'a'), Ok(None));
        assert_eq!(store.set(new, 'b'), Ok(Some('a')));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(new), Ok(&'b'));
        assert!(matches!(store.get(old), Err(StoreError::StaleHandle { .. })));
        assert_eq!(
            store.set(GenerationalIndex::new(8, 0), 'c'),
            Err(StoreError::CapacityExceeded {
                index: 8,
                capacity: 8
            })
        );
    }

    #[test]
    fn test_get_mut_persists() {
        let mut store = GenerationalIndexArray::with_capacity(8);
        let h = GenerationalIndex::new(0, 0);
        store.emplace(h, 1);
        *store.get_mut(h).unwrap() += 41;
        assert_eq!(store.get(h), Ok(&42));
    }

    #[test]
    fn test_liveness_bits_word_boundaries() {
        let mut bits = LivenessBits::new(130);
        for index in [0, 63, 64, 127, 129] {
            bits.set(index);
            assert!(bits.contains(index));
        }
        assert!(!bits.contains(1));
        assert!(!bits.contains(128));
        assert!(!bits.contains(10_000));
        bits.clear(64);
        assert!(!bits.contains(64));
        assert!(bits.contains(63));
    }

    #[test]
    fn test_iter_and_clear() {
        let mut store = GenerationalIndexArray::with_capacity(8);
        for h in handles(3) {
            store.emplace(h, h.index() * 2);
        }
        for (_, value) in store.iter_mut() {
            *value += 1;
        }
        let collected: Vec<_> = store.iter().map(|(h, v)| (h.index(), *v)).collect();
        assert_eq!(collected, vec![(0, 1), (1, 3), (2, 5)]);

        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains(GenerationalIndex::new(0, 0)));
        assert!(store.emplace(GenerationalIndex::new(0, 0), 9));
    }
}
