//! Fuzz testing for the B+tree index.
//!
//! Drives an arbitrary sequence of mutations against a tree, mirrors every
//! operation into a `std::collections::BTreeMap` as the reference model, and
//! audits the structural invariants after the run.

#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use flowindex::BTree;

#[derive(Debug, Arbitrary)]
struct TreeInput {
    // small fan-outs keep the structural paths hot
    order_selector: u8,
    operations: Vec<TreeOperation>,
}

#[derive(Debug, Arbitrary)]
enum TreeOperation {
    Upsert(u16, u32),
    InsertOnly(u16, u32),
    Remove(u16),
    Get(u16),
    CursorSweep { drop_multiples_of: u8 },
}

fuzz_target!(|input: TreeInput| {
    if input.operations.len() > 1000 {
        return;
    }

    let order = 3 + (input.order_selector % 8) as usize;
    let mut tree: BTree<u16, u32> = BTree::new(order).unwrap();
    let mut model: BTreeMap<u16, u32> = BTreeMap::new();

    for op in &input.operations {
        match op {
            TreeOperation::Upsert(key, value) => {
                *tree.upsert(*key).unwrap() = *value;
                model.insert(*key, *value);
            }
            TreeOperation::InsertOnly(key, value) => {
                let slot = tree.insert(*key).unwrap();
                assert_eq!(slot.is_some(), !model.contains_key(key));
                if let Some(slot) = slot {
                    *slot = *value;
                    model.insert(*key, *value);
                }
            }
            TreeOperation::Remove(key) => {
                assert_eq!(tree.remove(key), model.remove(key).is_some());
            }
            TreeOperation::Get(key) => {
                assert_eq!(tree.get(key), model.get(key));
            }
            TreeOperation::CursorSweep { drop_multiples_of } => {
                let step = (*drop_multiples_of).max(2) as u16;
                if let Some(mut cursor) = tree.cursor_first() {
                    loop {
                        let key = *cursor.key();
                        let more = if key % step == 0 {
                            model.remove(&key);
                            cursor.remove_current()
                        } else {
                            cursor.advance()
                        };
                        if !more {
                            break;
                        }
                    }
                }
            }
        }
    }

    tree.validate().unwrap();
    assert_eq!(tree.len(), model.len());
    assert!(tree
        .iter()
        .map(|(&k, &v)| (k, v))
        .eq(model.iter().map(|(&k, &v)| (k, v))));
});
