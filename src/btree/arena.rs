//! # Node Arena
//!
//! This module implements the slab that owns every node of a tree. Nodes are
//! addressed by `NodeId` indices instead of pointers: parent back-references
//! and leaf sibling links are plain indices understood as non-owning, so the
//! merge and teardown paths cannot double-free or dangle.
//!
//! ## Free-Slot Recycling
//!
//! Removed nodes leave a vacant slot whose index is pushed onto a free list.
//! Allocation pops from the free list before growing the slot vector, so a
//! mixed insert/delete workload reuses slots instead of growing without
//! bound.
//!
//! ## Allocation Failure
//!
//! Slot-vector growth goes through `try_reserve` and surfaces failure as an
//! error result. Callers that are about to run a structural cascade reserve
//! the worst-case number of slots up front via [`NodeArena::reserve`], so a
//! failed allocation is reported before any key or link has been touched.
//! The free list is kept at least as large as the slot vector so that
//! removal never allocates.

use eyre::{ensure, eyre, Result};

use super::node::Node;

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub(crate) struct NodeArena<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<u32>,
    live: usize,
}

impl<K, V> NodeArena<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Ensures capacity for `nodes` further insertions without reallocation,
    /// reporting failure before any structural mutation has begun.
    pub(crate) fn reserve(&mut self, nodes: usize) -> Result<()> {
        // try_reserve is relative to the current length and no-ops when
        // spare capacity already covers the request; only free-list reuse
        // is subtracted here.
        let growth = nodes.saturating_sub(self.free.len());
        self.slots
            .try_reserve(growth)
            .map_err(|_| eyre!("arena allocation failed reserving {} node slots", growth))?;
        // An id for every slot, present or about to be created, must fit
        // in the free list so removal never allocates.
        let ids = (self.slots.len() + growth).saturating_sub(self.free.len());
        self.free
            .try_reserve(ids)
            .map_err(|_| eyre!("arena allocation failed reserving free-list capacity"))?;
        Ok(())
    }

    pub(crate) fn insert(&mut self, node: Node<K, V>) -> Result<NodeId> {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(node);
            self.live += 1;
            return Ok(NodeId(index));
        }

        ensure!(
            self.slots.len() < u32::MAX as usize,
            "arena slot index space exhausted"
        );
        self.slots
            .try_reserve(1)
            .map_err(|_| eyre!("arena allocation failed growing slot vector"))?;
        // Removal pushes onto the free list and must never allocate, so it
        // keeps room for an id per slot.
        let ids = (self.slots.len() + 1).saturating_sub(self.free.len());
        self.free
            .try_reserve(ids)
            .map_err(|_| eyre!("arena allocation failed growing free list"))?;

        let index = self.slots.len() as u32;
        self.slots.push(Some(node));
        self.live += 1;
        Ok(NodeId(index))
    }

    /// Removes a node, returning its contents and recycling the slot.
    pub(crate) fn remove(&mut self, id: NodeId) -> Node<K, V> {
        match self.slots[id.index()].take() {
            Some(node) => {
                self.free.push(id.0);
                self.live -= 1;
                node
            }
            None => unreachable!("remove of vacant arena slot {}", id.0),
        }
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        match &self.slots[id.index()] {
            Some(node) => node,
            None => unreachable!("access to vacant arena slot {}", id.0),
        }
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match &mut self.slots[id.index()] {
            Some(node) => node,
            None => unreachable!("access to vacant arena slot {}", id.0),
        }
    }

    /// Mutable access to two distinct nodes at once, for merges and
    /// rotations that move entries between siblings.
    pub(crate) fn pair_mut(&mut self, a: NodeId, b: NodeId) -> (&mut Node<K, V>, &mut Node<K, V>) {
        let (i, j) = (a.index(), b.index());
        debug_assert_ne!(i, j, "pair_mut on the same slot");
        if i < j {
            let (lo, hi) = self.slots.split_at_mut(j);
            match (&mut lo[i], &mut hi[0]) {
                (Some(x), Some(y)) => (x, y),
                _ => unreachable!("pair_mut on vacant arena slot"),
            }
        } else {
            let (lo, hi) = self.slots.split_at_mut(i);
            match (&mut hi[0], &mut lo[j]) {
                (Some(x), Some(y)) => (x, y),
                _ => unreachable!("pair_mut on vacant arena slot"),
            }
        }
    }

    /// Drops every node. Slot capacity is retained for reuse.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}
