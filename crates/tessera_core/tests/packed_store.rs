//! Packed array behaviour checked against a plain map model.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{GenerationalIndex, GenerationalIndexAllocator, GenerationalIndexArray, StoreError};

#[test]
fn random_emplace_remove_matches_model() {
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    let mut alloc = GenerationalIndexAllocator::new();
    let mut store: GenerationalIndexArray<u64> = GenerationalIndexArray::with_capacity(512);
    let mut model: HashMap<GenerationalIndex, u64> = HashMap::new();
    let mut pool: Vec<GenerationalIndex> = (0..64).map(|_| alloc.allocate()).collect();

    for step in 0..5_000u64 {
        let pick = pool[rng.gen_range(0..pool.len())];
        match rng.gen_range(0..3) {
            0 => {
                let inserted = store.emplace(pick, step);
                assert_eq!(inserted, !model.contains_key(&pick));
                model.entry(pick).or_insert(step);
            }
            1 => {
                let len_before = store.len();
                match model.remove(&pick) {
                    Some(expected) => {
                        assert_eq!(store.remove(pick), Ok(expected));
                        assert_eq!(store.len(), len_before - 1);
                        assert!(!store.contains(pick));
                    }
                    None => {
                        assert!(store.remove(pick).is_err());
                        assert_eq!(store.len(), len_before);
                    }
                }
            }
            _ => {
                // Recycle a handle that is not stored anywhere.
                if !model.contains_key(&pick) {
                    alloc.destroy(pick);
                    let replacement = alloc.allocate();
                    let slot = pool.iter().position(|h| *h == pick).unwrap();
                    pool[slot] = replacement;
                }
            }
        }

        assert_eq!(store.len(), model.len());
        for (handle, value) in &model {
            assert_eq!(store.get(*handle), Ok(value));
        }
    }

    let mut stored: Vec<_> = store.indices().to_vec();
    stored.sort();
    let mut expected: Vec<_> = model.keys().copied().collect();
    expected.sort();
    assert_eq!(stored, expected, "indices() must list each present handle exactly once");
}

#[test]
fn stale_handle_after_slot_reuse() {
    let mut alloc = GenerationalIndexAllocator::new();
    let mut store: GenerationalIndexArray<&str> = GenerationalIndexArray::with_capacity(16);

    let h = alloc.allocate();
    assert!(store.emplace(h, "first"));
    assert_eq!(store.remove(h), Ok("first"));
    assert!(alloc.destroy(h));

    let h2 = alloc.allocate();
    assert_eq!(h2.index(), h.index());
    assert!(store.emplace(h2, "second"));

    assert_eq!(
        store.get(h),
        Err(StoreError::StaleHandle {
            index: h.index(),
            requested: h.generation(),
            stored: h2.generation(),
        })
    );
    assert_eq!(store.get(h2), Ok(&"second"));
    assert!(store.contains(h), "contains checks the index only");
    assert!(!store.holds(h));
}

#[test]
fn failed_operations_do_not_mutate() {
    let mut store: GenerationalIndexArray<u8> = GenerationalIndexArray::with_capacity(8);
    for i in 0..4 {
        store.emplace(GenerationalIndex::new(i, 0), i as u8);
    }
    let handles = store.indices().to_vec();
    let values = store.values().to_vec();

    assert!(!store.emplace(GenerationalIndex::new(2, 0), 99));
    assert!(!store.emplace(GenerationalIndex::new(8, 0), 99));
    assert!(store.remove(GenerationalIndex::new(2, 1)).is_err());
    assert!(store.remove(GenerationalIndex::new(6, 0)).is_err());

    assert_eq!(store.indices(), handles.as_slice());
    assert_eq!(store.values(), values.as_slice());
}
