//! End-to-end workload scenarios: bulk population, lookup, ordered scans,
//! and heavy random deletion at a small fan-out so every structural path
//! (split, rotation, merge, root growth and collapse) is exercised.

use eyre::Result;
use flowindex::BTree;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Deterministic per-key payload so value integrity is checkable after any
/// amount of restructuring.
fn payload(key: u64) -> u64 {
    key.wrapping_mul(2654435761).rotate_left(17)
}

fn populated(order: usize, keys: impl Iterator<Item = u64>) -> Result<BTree<u64, u64>> {
    let mut tree = BTree::new(order)?;
    for key in keys {
        *tree.upsert(key)? = payload(key);
    }
    Ok(tree)
}

mod bulk_population {
    use super::*;

    #[test]
    fn thousand_sequential_inserts_stay_ordered() -> Result<()> {
        let tree = populated(5, 0..999)?;
        assert_eq!(tree.len(), 999);
        tree.validate()?;

        for key in 0u64..999 {
            assert_eq!(tree.get(&key), Some(&payload(key)), "key {key}");
        }
        assert!(tree.get(&999).is_none());

        let mut expected = 0u64;
        for (&key, &value) in tree.iter() {
            assert_eq!(key, expected);
            assert_eq!(value, payload(key));
            expected += 1;
        }
        assert_eq!(expected, 999);
        Ok(())
    }

    #[test]
    fn shuffled_inserts_match_sequential_shape_invariants() -> Result<()> {
        let mut keys: Vec<u64> = (0..999).collect();
        keys.shuffle(&mut StdRng::seed_from_u64(7));

        let tree = populated(5, keys.into_iter())?;
        assert_eq!(tree.len(), 999);
        tree.validate()?;

        let scanned: Vec<u64> = tree.iter().map(|(&k, _)| k).collect();
        assert_eq!(scanned, (0u64..999).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn get_mut_updates_in_place() -> Result<()> {
        let mut tree = populated(5, 0..100)?;
        *tree.get_mut(&42).unwrap() = 1;
        assert_eq!(tree.get(&42), Some(&1));
        assert_eq!(tree.len(), 100);
        Ok(())
    }
}

mod random_deletion {
    use super::*;

    #[test]
    fn deleting_half_preserves_the_rest() -> Result<()> {
        let mut tree = populated(5, 0..999)?;

        let mut keys: Vec<u64> = (0..999).collect();
        keys.shuffle(&mut StdRng::seed_from_u64(0xFEED));
        let (doomed, kept) = keys.split_at(keys.len() / 2);

        for key in doomed {
            assert!(tree.remove(key), "key {key} should be present");
        }
        tree.validate()?;
        assert_eq!(tree.len(), kept.len());

        for key in doomed {
            assert!(tree.get(key).is_none(), "key {key} should be gone");
            assert!(!tree.remove(key), "double delete of {key}");
        }
        for key in kept {
            assert_eq!(tree.get(key), Some(&payload(*key)), "key {key}");
        }

        let mut sorted_kept: Vec<u64> = kept.to_vec();
        sorted_kept.sort_unstable();
        let scanned: Vec<u64> = tree.iter().map(|(&k, _)| k).collect();
        assert_eq!(scanned, sorted_kept);
        Ok(())
    }

    #[test]
    fn delete_everything_then_reuse() -> Result<()> {
        let mut tree = populated(5, 0..500)?;
        for key in 0u64..500 {
            assert!(tree.remove(&key));
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        tree.validate()?;

        *tree.upsert(3)? = 33;
        assert_eq!(tree.get(&3), Some(&33));
        tree.validate()?;
        Ok(())
    }
}

mod insert_only {
    use super::*;

    #[test]
    fn second_insert_of_same_key_is_rejected() -> Result<()> {
        let mut tree: BTree<u64, u64> = BTree::new(5)?;

        let value = tree.insert(10)?;
        assert!(value.is_some());
        *value.unwrap() = 77;

        assert!(tree.insert(10)?.is_none());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&10), Some(&77), "stored value must survive");
        Ok(())
    }

    #[test]
    fn insert_and_upsert_share_one_slot() -> Result<()> {
        let mut tree: BTree<u64, u64> = BTree::new(5)?;
        *tree.insert(5)?.unwrap() = 1;
        *tree.upsert(5)? += 1;
        assert_eq!(tree.get(&5), Some(&2));
        assert_eq!(tree.len(), 1);
        Ok(())
    }
}
