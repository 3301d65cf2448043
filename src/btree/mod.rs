//! # B+Tree Ordered Index
//!
//! An in-memory B+ tree mapping fixed-size keys to fixed-size values, built
//! for the hot path of a traffic-analysis pipeline: point lookups on flow
//! keys, upserts that hand back a value slot to mutate in place, and ordered
//! scans with safe deletion mid-iteration.
//!
//! ## Layout
//!
//! ```text
//! BTree ──> NodeArena ──> [ Node | Node | Node | .. ]   (slab, NodeId indices)
//!   │                        │
//!   │                        ├── Leaf:     keys + values + prev/next links
//!   │                        └── Interior: separator keys + child ids
//!   │
//!   └── Comparator           key ordering seam (defaults to K: Ord)
//! ```
//!
//! All entries live in leaves at a uniform depth; interior separators are
//! subtree maxima. The leaf level is a doubly linked chain, so a full scan
//! never re-descends from the root.
//!
//! ## Modules
//!
//! - [`tree`]: the tree handle, structural algorithms, iterator, and cursor
//! - [`node`]: the leaf/interior node model and intra-node search
//! - [`arena`]: the slab that owns nodes and recycles freed slots
//! - [`compare`]: the comparator trait and its `Ord`-based default
//!
//! ## Usage
//!
//! ```
//! use flowindex::BTree;
//!
//! # fn main() -> eyre::Result<()> {
//! let mut index: BTree<u64, u32> = BTree::with_default_order()?;
//! *index.upsert(0x2A)? += 1;
//! assert_eq!(index.get(&0x2A), Some(&1));
//! # Ok(())
//! # }
//! ```

mod arena;
mod compare;
mod node;
mod tree;

pub use compare::{Comparator, DefaultComparator};
pub use node::SearchResult;
pub use tree::{BTree, Cursor, Iter};
