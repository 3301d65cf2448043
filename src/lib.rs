//! # flowindex
//!
//! In-memory ordered index for traffic-analysis pipelines: a B+ tree over
//! fixed-size binary keys (flow tuples, masked addresses, hash digests) with
//! in-place value slots, ordered scans, and deletion during iteration.
//!
//! The typical consumer is a capture loop that upserts a per-flow record on
//! every packet and an expiry sweep that walks the index in key order,
//! deleting stale flows as it goes:
//!
//! ```
//! use flowindex::BTree;
//!
//! #[derive(Default)]
//! struct FlowStats {
//!     packets: u64,
//!     bytes: u64,
//! }
//!
//! # fn main() -> eyre::Result<()> {
//! let mut flows: BTree<[u8; 12], FlowStats> = BTree::with_default_order()?;
//!
//! // capture path: one upsert per packet
//! let stats = flows.upsert(*b"\x0a\x00\x00\x01\x0a\x00\x00\x02\x01\xbb\xc0\x04")?;
//! stats.packets += 1;
//! stats.bytes += 1500;
//!
//! // expiry sweep: delete while iterating
//! if let Some(mut cursor) = flows.cursor_first() {
//!     loop {
//!         let stale = cursor.value().is_some_and(|s| s.packets == 0);
//!         let more = if stale { cursor.remove_current() } else { cursor.advance() };
//!         if !more {
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Fallible operations return `eyre::Result`; the only failure source is
//! node allocation, reported before any structural mutation has begun.
//! Structural events are traced via `tracing` at debug/trace level.
//!
//! Not thread-safe: a tree is owned and mutated by one thread, which is how
//! per-core capture pipelines use it.

pub mod btree;
pub mod config;

pub use btree::{BTree, Comparator, Cursor, DefaultComparator, Iter, SearchResult};
