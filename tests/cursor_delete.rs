//! Cursor behavior, in particular deletion while iterating: the expiry-sweep
//! pattern where a scan removes entries as it encounters them.

use eyre::Result;
use flowindex::BTree;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn populated(order: usize, keys: &[u64]) -> Result<BTree<u64, u64>> {
    let mut tree = BTree::new(order)?;
    for &key in keys {
        *tree.upsert(key)? = key;
    }
    Ok(tree)
}

#[test]
fn sweep_visits_every_entry_in_order() -> Result<()> {
    let mut keys: Vec<u64> = (0..256).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(11));
    let mut tree = populated(4, &keys)?;

    let mut seen = Vec::new();
    let mut cursor = tree.cursor_first().unwrap();
    loop {
        seen.push(*cursor.key());
        if !cursor.advance() {
            break;
        }
    }
    assert!(!cursor.valid());
    assert_eq!(seen, (0u64..256).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn value_mut_through_cursor_sticks() -> Result<()> {
    let mut tree = populated(4, &[1, 2, 3])?;
    let mut cursor = tree.cursor_first().unwrap();
    *cursor.value_mut().unwrap() = 99;
    drop(cursor);
    assert_eq!(tree.get(&1), Some(&99));
    Ok(())
}

#[test]
fn remove_current_deletes_and_lands_on_successor() -> Result<()> {
    let mut tree = populated(3, &[10, 20, 30, 40, 50])?;
    let mut cursor = tree.cursor_first().unwrap();

    assert_eq!(*cursor.key(), 10);
    assert!(cursor.remove_current());
    assert_eq!(*cursor.key(), 20);
    assert_eq!(cursor.value(), Some(&20));

    drop(cursor);
    tree.validate()?;
    assert_eq!(tree.len(), 4);
    assert!(tree.get(&10).is_none());
    Ok(())
}

#[test]
fn full_sweep_deletes_everything() -> Result<()> {
    // small fan-out so the sweep rides through merges and root collapses
    let mut keys: Vec<u64> = (0..512).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(23));
    let mut tree = populated(3, &keys)?;

    let mut deleted = 0usize;
    let mut cursor = tree.cursor_first().unwrap();
    while cursor.remove_current() {
        deleted += 1;
    }
    deleted += 1;

    drop(cursor);
    assert_eq!(deleted, 512);
    assert!(tree.is_empty());
    tree.validate()?;
    Ok(())
}

#[test]
fn deleting_every_other_entry_mid_scan() -> Result<()> {
    let keys: Vec<u64> = (0..300).collect();
    let mut tree = populated(4, &keys)?;

    let mut cursor = tree.cursor_first().unwrap();
    let mut drop_this = true;
    loop {
        let more = if drop_this {
            cursor.remove_current()
        } else {
            cursor.advance()
        };
        drop_this = !drop_this;
        if !more {
            break;
        }
    }

    drop(cursor);
    tree.validate()?;
    let remaining: Vec<u64> = tree.iter().map(|(&k, _)| k).collect();
    let expected: Vec<u64> = (0..300).filter(|k| k % 2 == 1).collect();
    assert_eq!(remaining, expected);
    Ok(())
}

#[test]
fn cursor_sweep_matches_direct_removal() -> Result<()> {
    // deleting the same subset through the cursor and through remove() must
    // leave identical trees
    let mut keys: Vec<u64> = (0..400).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(31));

    let mut via_cursor = populated(4, &keys)?;
    let mut via_remove = populated(4, &keys)?;

    let doomed = |k: u64| k % 3 == 0;

    let mut cursor = via_cursor.cursor_first().unwrap();
    loop {
        let more = if doomed(*cursor.key()) {
            cursor.remove_current()
        } else {
            cursor.advance()
        };
        if !more {
            break;
        }
    }
    drop(cursor);

    for k in 0u64..400 {
        if doomed(k) {
            assert!(via_remove.remove(&k));
        }
    }

    via_cursor.validate()?;
    via_remove.validate()?;
    let a: Vec<(u64, u64)> = via_cursor.iter().map(|(&k, &v)| (k, v)).collect();
    let b: Vec<(u64, u64)> = via_remove.iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn exhausted_cursor_refuses_further_work() -> Result<()> {
    let mut tree = populated(3, &[1])?;
    let mut cursor = tree.cursor_first().unwrap();

    assert!(!cursor.remove_current());
    assert!(!cursor.valid());
    assert!(cursor.value().is_none());
    assert!(!cursor.advance());
    assert!(!cursor.remove_current(), "no double delete after exhaustion");

    drop(cursor);
    assert!(tree.is_empty());
    Ok(())
}
