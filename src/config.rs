//! # Configuration Constants
//!
//! This module centralizes the tuning constants for the index. Constants that
//! depend on each other are co-located to prevent mismatch bugs.
//!
//! ```text
//! MIN_ORDER (3)
//!       │
//!       └─> BTree::with_comparator rejects any order below this. An order
//!           of 2 cannot satisfy the occupancy bounds after a split.
//!
//! DEFAULT_ORDER (32)
//!       │
//!       └─> Fan-out used by BTree::with_default_order. Chosen so a node's
//!           key array stays within a couple of cache lines for 8-16 byte
//!           flow keys.
//!
//! MAX_TREE_DEPTH (16)
//!       │
//!       └─> Inline capacity for SmallVec traversal stacks. Not a hard
//!           limit: deeper trees spill to the heap. At MIN_ORDER a height
//!           of 16 already covers ~2^16 entries; at realistic fan-outs it
//!           covers far more than memory can hold.
//! ```

/// Minimum supported fan-out (maximum children per interior node).
pub const MIN_ORDER: usize = 3;

/// Fan-out used when the caller does not specify one.
pub const DEFAULT_ORDER: usize = 32;

/// Inline capacity hint for traversal stacks.
pub const MAX_TREE_DEPTH: usize = 16;
