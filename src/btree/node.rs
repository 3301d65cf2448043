//! # Node Model
//!
//! A node is a tagged variant, leaf or interior, sharing a sorted key array
//! and a parent back-reference:
//!
//! ```text
//! Leaf:                               Interior:
//! +--------------------------+       +--------------------------+
//! | parent: Option<NodeId>   |       | parent: Option<NodeId>   |
//! | keys:   [k0 k1 .. ]      |       | keys:   [s0 s1 .. ]      |
//! | values: [v0 v1 .. ]      |       | children: [c0 c1 c2 .. ] |
//! | prev / next leaf links   |       +--------------------------+
//! +--------------------------+
//! ```
//!
//! A leaf holds up to `order` entries; `values[i]` belongs to `keys[i]`.
//! An interior node holds up to `order` children; `keys[i]` is the maximum
//! key anywhere in the subtree of `children[i]`, and the last child is the
//! catch-all branch with no separator (`children.len() == keys.len() + 1`).
//!
//! Key and value arrays are allocated with one slot of headroom so an
//! overflowing insert can land before the split runs, and so merges move
//! entries into existing capacity without reallocating.

use std::cmp::Ordering;

use super::arena::NodeId;
use super::compare::Comparator;

/// Outcome of an exact-match scan within one node's key array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// Key present at this index.
    Found(usize),
    /// Key absent; this is its sorted insertion point.
    NotFound(usize),
}

#[derive(Debug)]
pub(crate) enum NodeKind<V> {
    Leaf {
        values: Vec<V>,
        prev: Option<NodeId>,
        next: Option<NodeId>,
    },
    Interior {
        children: Vec<NodeId>,
    },
}

#[derive(Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) parent: Option<NodeId>,
    pub(crate) keys: Vec<K>,
    pub(crate) kind: NodeKind<V>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new_leaf(order: usize) -> Self {
        Self {
            parent: None,
            keys: Vec::with_capacity(order + 1),
            kind: NodeKind::Leaf {
                values: Vec::with_capacity(order + 1),
                prev: None,
                next: None,
            },
        }
    }

    pub(crate) fn new_interior(order: usize) -> Self {
        Self {
            parent: None,
            keys: Vec::with_capacity(order + 1),
            kind: NodeKind::Interior {
                children: Vec::with_capacity(order + 2),
            },
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    #[inline]
    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Interior { children } => children,
            NodeKind::Leaf { .. } => unreachable!("leaf node has no children"),
        }
    }

    #[inline]
    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        match &mut self.kind {
            NodeKind::Interior { children } => children,
            NodeKind::Leaf { .. } => unreachable!("leaf node has no children"),
        }
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> NodeId {
        self.children()[index]
    }

    #[inline]
    pub(crate) fn values(&self) -> &[V] {
        match &self.kind {
            NodeKind::Leaf { values, .. } => values,
            NodeKind::Interior { .. } => unreachable!("interior node has no values"),
        }
    }

    #[inline]
    pub(crate) fn values_mut(&mut self) -> &mut Vec<V> {
        match &mut self.kind {
            NodeKind::Leaf { values, .. } => values,
            NodeKind::Interior { .. } => unreachable!("interior node has no values"),
        }
    }

    #[inline]
    pub(crate) fn next_leaf(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Leaf { next, .. } => *next,
            NodeKind::Interior { .. } => unreachable!("interior node has no leaf links"),
        }
    }

    #[inline]
    pub(crate) fn set_next_leaf(&mut self, id: Option<NodeId>) {
        match &mut self.kind {
            NodeKind::Leaf { next, .. } => *next = id,
            NodeKind::Interior { .. } => unreachable!("interior node has no leaf links"),
        }
    }

    #[inline]
    pub(crate) fn prev_leaf(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Leaf { prev, .. } => *prev,
            NodeKind::Interior { .. } => unreachable!("interior node has no leaf links"),
        }
    }

    #[inline]
    pub(crate) fn set_prev_leaf(&mut self, id: Option<NodeId>) {
        match &mut self.kind {
            NodeKind::Leaf { prev, .. } => *prev = id,
            NodeKind::Interior { .. } => unreachable!("interior node has no leaf links"),
        }
    }

    /// Exact-match scan over this node's keys, from the end. The tail is the
    /// hot case for append-leaning workloads (monotonic flow timestamps).
    pub(crate) fn locate<C: Comparator<K>>(&self, key: &K, cmp: &C) -> SearchResult {
        let mut i = self.keys.len();
        while i > 0 {
            match cmp.compare(key, &self.keys[i - 1]) {
                Ordering::Less => i -= 1,
                Ordering::Equal => return SearchResult::Found(i - 1),
                Ordering::Greater => return SearchResult::NotFound(i),
            }
        }
        SearchResult::NotFound(0)
    }

    /// Child index the given key routes to: the first separator at or above
    /// the key, or the catch-all branch past every separator.
    pub(crate) fn route<C: Comparator<K>>(&self, key: &K, cmp: &C) -> usize {
        for (i, separator) in self.keys.iter().enumerate() {
            if cmp.compare(key, separator) != Ordering::Greater {
                return i;
            }
        }
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::compare::DefaultComparator;

    #[test]
    fn locate_scans_from_the_end() {
        let mut node: Node<u32, u64> = Node::new_leaf(8);
        node.keys.extend([10, 20, 30]);
        let cmp = DefaultComparator;

        assert_eq!(node.locate(&30, &cmp), SearchResult::Found(2));
        assert_eq!(node.locate(&20, &cmp), SearchResult::Found(1));
        assert_eq!(node.locate(&5, &cmp), SearchResult::NotFound(0));
        assert_eq!(node.locate(&25, &cmp), SearchResult::NotFound(2));
        assert_eq!(node.locate(&99, &cmp), SearchResult::NotFound(3));
    }

    #[test]
    fn route_prefers_first_covering_separator() {
        let mut node: Node<u32, u64> = Node::new_interior(8);
        node.keys.extend([10, 20]);
        let cmp = DefaultComparator;

        assert_eq!(node.route(&3, &cmp), 0);
        assert_eq!(node.route(&10, &cmp), 0);
        assert_eq!(node.route(&11, &cmp), 1);
        assert_eq!(node.route(&20, &cmp), 1);
        assert_eq!(node.route(&21, &cmp), 2);
    }
}
