//! # B+Tree Core
//!
//! This module implements the tree handle and the structural algorithms:
//! descent, insert/split cascade, delete/rotate/merge cascade, ancestor key
//! repair, and the iteration cursor.
//!
//! ## Shape
//!
//! All entries live in leaves; interior nodes hold separator keys and child
//! ids. Every leaf sits at the same depth, and leaves are chained in key
//! order for linear iteration:
//!
//! ```text
//!                   [Interior]
//!                  /     |     \
//!           [Leaf A]  [Leaf B]  [Leaf C]
//!              |--------->|--------->|   (doubly linked)
//! ```
//!
//! Separators are subtree *maxima*: an interior node's `keys[i]` equals the
//! largest key under `children[i]`, and the last child is the catch-all
//! branch past every separator. Any mutation that changes a node's maximum
//! therefore walks its ancestors to refresh the first non-rightmost
//! separator (`repair`).
//!
//! ## Insertion
//!
//! 1. Descend to the target leaf and place the entry at its sorted slot
//! 2. On overflow, split the leaf in half and link the new right sibling
//! 3. Push the left half's maximum into the parent as a separator
//! 4. If the parent overflows, split it and keep propagating; a split of
//!    the root grows the tree by one level
//!
//! Propagation is an iterative loop over parent ids, so stack usage is
//! independent of tree height.
//!
//! ## Deletion
//!
//! 1. Remove the entry from its leaf
//! 2. On underflow, borrow one entry from a sibling with surplus occupancy
//!    (rotation) or merge with a sibling when neither has any
//! 3. A merge removes one child slot from the parent, which may underflow
//!    in turn; the same policy is applied level by level, and a root left
//!    with a single child is discarded (the tree shrinks by one level)
//!
//! ## Cursor
//!
//! The cursor walks the leaf chain. Deleting through the cursor remembers
//! the *next* key before the structural deletion runs, then re-descends to
//! that key to re-anchor: merges can relocate the next entry to a different
//! leaf, so tracking a leaf/index pair across the mutation would be wrong.
//!
//! ## Allocation
//!
//! Nodes live in a [`NodeArena`]. An insert reserves its worst case (one
//! split per level plus a new root) before touching any key or link, so an
//! allocation failure is reported with the tree still intact. Deletion only
//! releases nodes: node arrays carry one slot of headroom and merges move
//! entries into existing capacity.
//!
//! ## Thread Safety
//!
//! Not thread-safe; callers serialize access externally. A cursor holds the
//! only mutable borrow of the tree while it lives, so the
//! mutation-under-iteration hazard is ruled out at compile time.

use std::cmp::Ordering;

use eyre::{bail, ensure, Result};
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::arena::{NodeArena, NodeId};
use super::compare::{Comparator, DefaultComparator};
use super::node::{Node, NodeKind, SearchResult};
use crate::config::{DEFAULT_ORDER, MAX_TREE_DEPTH, MIN_ORDER};

/// Ordered index mapping fixed-size keys to values.
///
/// `order` is the fan-out: the maximum number of children per interior node,
/// equivalently the maximum number of entries per leaf.
#[derive(Debug)]
pub struct BTree<K, V, C = DefaultComparator> {
    arena: NodeArena<K, V>,
    root: NodeId,
    order: usize,
    len: usize,
    height: usize,
    cmp: C,
}

impl<K, V, C> BTree<K, V, C>
where
    K: Copy,
    V: Default,
    C: Comparator<K>,
{
    pub fn new(order: usize) -> Result<Self>
    where
        C: Default,
    {
        Self::with_comparator(order, C::default())
    }

    pub fn with_default_order() -> Result<Self>
    where
        C: Default,
    {
        Self::with_comparator(DEFAULT_ORDER, C::default())
    }

    pub fn with_comparator(order: usize, cmp: C) -> Result<Self> {
        ensure!(
            order >= MIN_ORDER,
            "order {} below minimum {}",
            order,
            MIN_ORDER
        );
        let mut arena = NodeArena::new();
        let root = arena.insert(Node::new_leaf(order))?;
        debug!(order, "created b+tree index");
        Ok(Self {
            arena,
            root,
            order,
            len: 0,
            height: 1,
            cmp,
        })
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fan-out this tree was created with.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of levels, counting the root; an empty tree has height 1.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Minimum live entries per non-root leaf: `ceil((order - 1) / 2)`.
    fn leaf_min_keys(&self) -> usize {
        self.order / 2
    }

    /// Minimum separator keys per non-root interior node: `(order - 1) / 2`,
    /// one below the leaf bound at even orders. An interior split of
    /// `order + 1` children leaves the left half with exactly `order / 2`
    /// children, so the ceiling bound cannot hold for interior nodes.
    fn interior_min_keys(&self) -> usize {
        (self.order - 1) / 2
    }

    /// Inserts the key with a default-initialized value if absent and
    /// returns its value either way.
    pub fn upsert(&mut self, key: K) -> Result<&mut V> {
        let (leaf, index, _existed) = self.upsert_slot(key)?;
        Ok(&mut self.arena.node_mut(leaf).values_mut()[index])
    }

    /// Insert-only entry point: `Ok(None)` when the key is already present
    /// (the stored entry is left untouched).
    pub fn insert(&mut self, key: K) -> Result<Option<&mut V>> {
        let (leaf, index, existed) = self.upsert_slot(key)?;
        if existed {
            return Ok(None);
        }
        Ok(Some(&mut self.arena.node_mut(leaf).values_mut()[index]))
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let leaf = self.find_leaf(key);
        let node = self.arena.node(leaf);
        match node.locate(key, &self.cmp) {
            SearchResult::Found(index) => Some(&node.values()[index]),
            SearchResult::NotFound(_) => None,
        }
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let leaf = self.find_leaf(key);
        let index = match self.arena.node(leaf).locate(key, &self.cmp) {
            SearchResult::Found(index) => index,
            SearchResult::NotFound(_) => return None,
        };
        Some(&mut self.arena.node_mut(leaf).values_mut()[index])
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes the entry for `key`. Returns `false` (and changes nothing)
    /// when the key is absent. Never allocates.
    pub fn remove(&mut self, key: &K) -> bool {
        let leaf = self.find_leaf(key);
        let index = match self.arena.node(leaf).locate(key, &self.cmp) {
            SearchResult::Found(index) => index,
            SearchResult::NotFound(_) => return false,
        };
        {
            let node = self.arena.node_mut(leaf);
            node.keys.remove(index);
            node.values_mut().remove(index);
        }
        self.len -= 1;

        if leaf == self.root {
            // the root may underflow freely; nothing above to fix
            return true;
        }
        if self.arena.node(leaf).keys.len() >= self.leaf_min_keys() {
            // the removed entry may have been this leaf's maximum
            self.repair(leaf);
            return true;
        }
        self.rebalance_leaf(leaf);
        true
    }

    /// Drops every entry, resetting to an empty single-leaf tree. Arena
    /// capacity is retained.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = match self.arena.insert(Node::new_leaf(self.order)) {
            Ok(id) => id,
            Err(_) => unreachable!("cleared arena retains capacity for the root"),
        };
        self.len = 0;
        self.height = 1;
    }

    /// Read-only forward iteration in key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            arena: &self.arena,
            leaf: Some(self.leftmost_leaf()),
            index: 0,
        }
    }

    /// Positions a cursor on the smallest entry; `None` on an empty tree.
    pub fn cursor_first(&mut self) -> Option<Cursor<'_, K, V, C>> {
        let leaf = self.leftmost_leaf();
        let node = self.arena.node(leaf);
        if node.keys.is_empty() {
            return None;
        }
        let key = node.keys[0];
        Some(Cursor {
            tree: self,
            leaf,
            index: 0,
            key,
            exhausted: false,
        })
    }

    // ---- descent ----------------------------------------------------------

    /// Leaf that contains or should contain `key`. Keys beyond every stored
    /// key route to the rightmost leaf; callers check membership locally.
    fn find_leaf(&self, key: &K) -> NodeId {
        let mut current = self.root;
        loop {
            let node = self.arena.node(current);
            match &node.kind {
                NodeKind::Leaf { .. } => return current,
                NodeKind::Interior { children } => {
                    current = children[node.route(key, &self.cmp)];
                }
            }
        }
    }

    fn leftmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        while !self.arena.node(current).is_leaf() {
            current = self.arena.node(current).child(0);
        }
        current
    }

    /// Maximum key stored anywhere under `id`; `None` only for an empty
    /// leaf root.
    fn subtree_max(&self, mut id: NodeId) -> Option<K> {
        loop {
            let node = self.arena.node(id);
            match &node.kind {
                NodeKind::Leaf { .. } => return node.keys.last().copied(),
                NodeKind::Interior { children } => id = children[children.len() - 1],
            }
        }
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> usize {
        match self
            .arena
            .node(parent)
            .children()
            .iter()
            .position(|&c| c == child)
        {
            Some(index) => index,
            None => unreachable!("node missing from its parent's child list"),
        }
    }

    // ---- ancestor key repair ----------------------------------------------

    /// Refreshes separators after a node's maximum key may have changed.
    /// Walks up while the node is its parent's rightmost child (no separator
    /// slot there) and rewrites the first non-rightmost position reached.
    fn repair(&mut self, id: NodeId) {
        let Some(max) = self.subtree_max(id) else {
            return;
        };
        let mut child = id;
        while let Some(parent_id) = self.arena.node(child).parent {
            let index = self.child_index(parent_id, child);
            if index < self.arena.node(parent_id).keys.len() {
                self.arena.node_mut(parent_id).keys[index] = max;
                return;
            }
            child = parent_id;
        }
    }

    // ---- insertion engine -------------------------------------------------

    /// Locates or creates the slot for `key`, running the full split cascade
    /// when a leaf overflows. Returns the entry's final position and whether
    /// it already existed.
    fn upsert_slot(&mut self, key: K) -> Result<(NodeId, usize, bool)> {
        let leaf = self.find_leaf(&key);
        let position = match self.arena.node(leaf).locate(&key, &self.cmp) {
            SearchResult::Found(index) => return Ok((leaf, index, true)),
            SearchResult::NotFound(position) => position,
        };

        // Worst case this insert splits one node per level and grows a new
        // root; fail here, before any key or link is touched.
        self.arena.reserve(self.height + 1)?;

        {
            let node = self.arena.node_mut(leaf);
            node.keys.insert(position, key);
            node.values_mut().insert(position, V::default());
        }
        self.len += 1;

        if position + 1 == self.arena.node(leaf).keys.len() {
            // new maximum for this leaf; separators above may be stale
            self.repair(leaf);
        }

        if self.arena.node(leaf).keys.len() > self.order {
            self.split_leaf(leaf)?;
            // the entry may now live in the new right sibling
            let leaf = self.find_leaf(&key);
            return match self.arena.node(leaf).locate(&key, &self.cmp) {
                SearchResult::Found(index) => Ok((leaf, index, false)),
                SearchResult::NotFound(_) => unreachable!("entry vanished during split"),
            };
        }
        Ok((leaf, position, false))
    }

    fn split_leaf(&mut self, left: NodeId) -> Result<()> {
        let mut right = Node::new_leaf(self.order);
        let old_next;
        {
            let node = self.arena.node_mut(left);
            let split = node.keys.len() / 2;
            right.keys.extend(node.keys.drain(split..));
            right.values_mut().extend(node.values_mut().drain(split..));
            right.parent = node.parent;
            old_next = node.next_leaf();
        }
        right.set_prev_leaf(Some(left));
        right.set_next_leaf(old_next);

        let right_id = self.arena.insert(right)?;
        self.arena.node_mut(left).set_next_leaf(Some(right_id));
        if let Some(next) = old_next {
            self.arena.node_mut(next).set_prev_leaf(Some(right_id));
        }

        let node = self.arena.node(left);
        let separator = node.keys[node.keys.len() - 1];
        trace!("split overflowing leaf");
        self.insert_into_parent(left, separator, right_id)
    }

    /// Pushes the separator for a freshly split `(left, right)` pair into
    /// the parent, splitting upward as long as parents overflow. A split of
    /// the root grows the tree by one level.
    fn insert_into_parent(
        &mut self,
        mut left: NodeId,
        mut separator: K,
        mut right: NodeId,
    ) -> Result<()> {
        loop {
            let Some(parent_id) = self.arena.node(left).parent else {
                let mut root = Node::new_interior(self.order);
                root.keys.push(separator);
                root.children_mut().push(left);
                root.children_mut().push(right);
                let root_id = self.arena.insert(root)?;
                self.arena.node_mut(left).parent = Some(root_id);
                self.arena.node_mut(right).parent = Some(root_id);
                self.root = root_id;
                self.height += 1;
                trace!(height = self.height, "root grew by one level");
                return Ok(());
            };

            let index = self.child_index(parent_id, left);
            {
                let parent = self.arena.node_mut(parent_id);
                parent.keys.insert(index, separator);
                parent.children_mut().insert(index + 1, right);
            }
            self.arena.node_mut(right).parent = Some(parent_id);

            if self.arena.node(parent_id).children().len() <= self.order {
                return Ok(());
            }
            let (promoted, new_right) = self.split_interior(parent_id)?;
            left = parent_id;
            separator = promoted;
            right = new_right;
        }
    }

    fn split_interior(&mut self, left: NodeId) -> Result<(K, NodeId)> {
        let mut right = Node::new_interior(self.order);
        let promoted;
        {
            let node = self.arena.node_mut(left);
            let split = node.children().len() / 2;
            right.keys.extend(node.keys.drain(split..));
            // the trailing separator already equals the left half's subtree
            // maximum, so it is promoted directly
            promoted = match node.keys.pop() {
                Some(key) => key,
                None => unreachable!("interior split of a node without keys"),
            };
            right.children_mut().extend(node.children_mut().drain(split..));
            right.parent = node.parent;
        }
        let right_id = self.arena.insert(right)?;
        let moved = self.arena.node(right_id).children().len();
        for i in 0..moved {
            let child = self.arena.node(right_id).child(i);
            self.arena.node_mut(child).parent = Some(right_id);
        }
        trace!("split overflowing interior node");
        Ok((promoted, right_id))
    }

    // ---- deletion engine --------------------------------------------------

    fn rebalance_leaf(&mut self, leaf: NodeId) {
        let Some(parent_id) = self.arena.node(leaf).parent else {
            unreachable!("rebalance of the root leaf")
        };
        let index = self.child_index(parent_id, leaf);
        let parent = self.arena.node(parent_id);
        let left_sibling = (index > 0).then(|| parent.child(index - 1));
        let right_sibling = (index + 1 < parent.children().len()).then(|| parent.child(index + 1));
        let min = self.leaf_min_keys();

        if let Some(sibling) = left_sibling {
            if self.arena.node(sibling).keys.len() > min {
                // borrow the tail entry of the left sibling
                let (node, donor) = self.arena.pair_mut(leaf, sibling);
                let last = donor.keys.len() - 1;
                let key = donor.keys.remove(last);
                let value = donor.values_mut().remove(last);
                node.keys.insert(0, key);
                node.values_mut().insert(0, value);
                trace!("leaf rotation from left sibling");
                self.repair(sibling);
                self.repair(leaf);
                return;
            }
        }
        if let Some(sibling) = right_sibling {
            if self.arena.node(sibling).keys.len() > min {
                // borrow the head entry of the right sibling
                let (node, donor) = self.arena.pair_mut(leaf, sibling);
                let key = donor.keys.remove(0);
                let value = donor.values_mut().remove(0);
                node.keys.push(key);
                node.values_mut().push(value);
                trace!("leaf rotation from right sibling");
                self.repair(leaf);
                return;
            }
        }
        if let Some(sibling) = left_sibling {
            self.merge_leaves(sibling, leaf, index);
        } else if let Some(sibling) = right_sibling {
            self.merge_leaves(leaf, sibling, index + 1);
        } else {
            unreachable!("non-root leaf without siblings");
        }
    }

    /// Folds leaf `src` (the parent's child at `src_slot`) into its left
    /// neighbor `dst`, relinks the leaf chain, and drops `src`'s slot from
    /// the parent before checking the parent for underflow.
    fn merge_leaves(&mut self, dst: NodeId, src: NodeId, src_slot: usize) {
        let Some(parent_id) = self.arena.node(src).parent else {
            unreachable!("merged leaf has no parent")
        };
        let src_next = self.arena.node(src).next_leaf();
        {
            let (dst_node, src_node) = self.arena.pair_mut(dst, src);
            dst_node.keys.append(&mut src_node.keys);
            dst_node.values_mut().append(src_node.values_mut());
            dst_node.set_next_leaf(src_next);
        }
        if let Some(next) = src_next {
            self.arena.node_mut(next).set_prev_leaf(Some(dst));
        }
        {
            let parent = self.arena.node_mut(parent_id);
            parent.keys.remove(src_slot - 1);
            parent.children_mut().remove(src_slot);
        }
        self.arena.remove(src);
        trace!("merged underfull leaf into sibling");
        self.repair(dst);
        self.fix_interior(parent_id);
    }

    /// Applies the underflow policy to interior nodes, level by level. A
    /// root left with a single child is discarded and the tree shrinks.
    fn fix_interior(&mut self, mut id: NodeId) {
        loop {
            if id == self.root {
                let node = self.arena.node(id);
                if !node.is_leaf() && node.children().len() == 1 {
                    let child = node.child(0);
                    self.arena.node_mut(child).parent = None;
                    self.arena.remove(id);
                    self.root = child;
                    self.height -= 1;
                    trace!(height = self.height, "root collapsed by one level");
                }
                return;
            }
            let min = self.interior_min_keys();
            if self.arena.node(id).keys.len() >= min {
                return;
            }
            let Some(parent_id) = self.arena.node(id).parent else {
                unreachable!("non-root node without parent")
            };
            let index = self.child_index(parent_id, id);
            let parent = self.arena.node(parent_id);
            let left_sibling = (index > 0).then(|| parent.child(index - 1));
            let right_sibling =
                (index + 1 < parent.children().len()).then(|| parent.child(index + 1));

            if let Some(sibling) = left_sibling {
                if self.arena.node(sibling).keys.len() > min {
                    // take the last child of the left sibling
                    let moved = {
                        let donor = self.arena.node_mut(sibling);
                        let last_key = donor.keys.len() - 1;
                        donor.keys.remove(last_key);
                        let last_child = donor.children_mut().len() - 1;
                        donor.children_mut().remove(last_child)
                    };
                    let Some(separator) = self.subtree_max(moved) else {
                        unreachable!("rotated subtree is empty")
                    };
                    self.arena.node_mut(moved).parent = Some(id);
                    {
                        let node = self.arena.node_mut(id);
                        node.keys.insert(0, separator);
                        node.children_mut().insert(0, moved);
                    }
                    trace!("interior rotation from left sibling");
                    self.repair(sibling);
                    self.repair(id);
                    return;
                }
            }
            if let Some(sibling) = right_sibling {
                if self.arena.node(sibling).keys.len() > min {
                    // take the first child of the right sibling
                    let moved = {
                        let donor = self.arena.node_mut(sibling);
                        donor.keys.remove(0);
                        donor.children_mut().remove(0)
                    };
                    let tail = {
                        let node = self.arena.node(id);
                        node.child(node.children().len() - 1)
                    };
                    let Some(separator) = self.subtree_max(tail) else {
                        unreachable!("rotated-into subtree is empty")
                    };
                    self.arena.node_mut(moved).parent = Some(id);
                    {
                        let node = self.arena.node_mut(id);
                        node.keys.push(separator);
                        node.children_mut().push(moved);
                    }
                    trace!("interior rotation from right sibling");
                    self.repair(id);
                    return;
                }
            }

            if let Some(sibling) = left_sibling {
                self.merge_interior(sibling, id, index);
            } else if let Some(sibling) = right_sibling {
                self.merge_interior(id, sibling, index + 1);
            } else {
                unreachable!("non-root interior node without siblings");
            }
            id = parent_id;
        }
    }

    /// Folds interior node `src` (the parent's child at `src_slot`) into its
    /// left neighbor `dst`. The separator joining the two child ranges is
    /// the maximum under `dst`'s old last child, read from the leaf level so
    /// it cannot be stale after the surrounding deletions.
    fn merge_interior(&mut self, dst: NodeId, src: NodeId, src_slot: usize) {
        let Some(parent_id) = self.arena.node(src).parent else {
            unreachable!("merged interior node has no parent")
        };
        let tail = {
            let node = self.arena.node(dst);
            node.child(node.children().len() - 1)
        };
        let Some(join) = self.subtree_max(tail) else {
            unreachable!("merged subtree is empty")
        };
        {
            let (dst_node, src_node) = self.arena.pair_mut(dst, src);
            dst_node.keys.push(join);
            dst_node.keys.append(&mut src_node.keys);
            dst_node.children_mut().append(src_node.children_mut());
        }
        // absorbed children now answer to dst
        let count = self.arena.node(dst).children().len();
        for i in 0..count {
            let child = self.arena.node(dst).child(i);
            self.arena.node_mut(child).parent = Some(dst);
        }
        {
            let parent = self.arena.node_mut(parent_id);
            parent.keys.remove(src_slot - 1);
            parent.children_mut().remove(src_slot);
        }
        self.arena.remove(src);
        trace!("merged underfull interior node into sibling");
        self.repair(dst);
    }

    // ---- structural audit -------------------------------------------------

    /// Verifies every structural invariant: balance, occupancy bounds,
    /// per-node sortedness, separator/subtree-maximum agreement, parent
    /// back-references, leaf-chain consistency, and entry count. Intended
    /// for tests and debugging.
    pub fn validate(&self) -> Result<()> {
        let mut stack: SmallVec<[(NodeId, usize); MAX_TREE_DEPTH]> = SmallVec::new();
        stack.push((self.root, 0));
        let mut leaf_depth: Option<usize> = None;
        let mut reachable = 0usize;

        while let Some((id, depth)) = stack.pop() {
            reachable += 1;
            let node = self.arena.node(id);

            for pair in node.keys.windows(2) {
                ensure!(
                    self.cmp.compare(&pair[0], &pair[1]) == Ordering::Less,
                    "node keys not strictly increasing"
                );
            }
            ensure!(
                node.keys.len() <= self.order,
                "overfull node: {} keys with order {}",
                node.keys.len(),
                self.order
            );
            if id != self.root {
                let min = if node.is_leaf() {
                    self.leaf_min_keys()
                } else {
                    self.interior_min_keys()
                };
                ensure!(
                    node.keys.len() >= min,
                    "underfull node: {} keys, minimum {}",
                    node.keys.len(),
                    min
                );
            }

            match &node.kind {
                NodeKind::Leaf { .. } => {
                    ensure!(
                        node.values().len() == node.keys.len(),
                        "leaf key/value length mismatch"
                    );
                    match leaf_depth {
                        None => leaf_depth = Some(depth),
                        Some(expected) => {
                            ensure!(depth == expected, "leaves at differing depths")
                        }
                    }
                }
                NodeKind::Interior { children } => {
                    ensure!(
                        children.len() == node.keys.len() + 1,
                        "child/separator count mismatch"
                    );
                    for (i, &child) in children.iter().enumerate() {
                        ensure!(
                            self.arena.node(child).parent == Some(id),
                            "child parent back-reference is wrong"
                        );
                        if i < node.keys.len() {
                            let Some(max) = self.subtree_max(child) else {
                                bail!("empty subtree under interior node");
                            };
                            ensure!(
                                self.cmp.compare(&max, &node.keys[i]) == Ordering::Equal,
                                "separator disagrees with subtree maximum"
                            );
                        }
                        stack.push((child, depth + 1));
                    }
                }
            }
        }
        ensure!(
            reachable == self.arena.len(),
            "arena holds {} nodes but {} are reachable",
            self.arena.len(),
            reachable
        );

        // leaf chain: ascending, gap-free, consistent with the entry count
        let mut chained = 0usize;
        let mut previous: Option<K> = None;
        let mut prev_leaf: Option<NodeId> = None;
        let mut leaf = Some(self.leftmost_leaf());
        while let Some(id) = leaf {
            let node = self.arena.node(id);
            ensure!(node.is_leaf(), "leaf chain reached an interior node");
            ensure!(
                node.prev_leaf() == prev_leaf,
                "leaf chain prev link is wrong"
            );
            for key in &node.keys {
                if let Some(ref p) = previous {
                    ensure!(
                        self.cmp.compare(p, key) == Ordering::Less,
                        "leaf chain keys not strictly increasing"
                    );
                }
                previous = Some(*key);
                chained += 1;
            }
            prev_leaf = Some(id);
            leaf = node.next_leaf();
        }
        ensure!(
            chained == self.len,
            "entry count {} disagrees with leaf chain length {}",
            self.len,
            chained
        );
        Ok(())
    }
}

/// Read-only forward iterator over the leaf chain.
pub struct Iter<'a, K, V> {
    arena: &'a NodeArena<K, V>,
    leaf: Option<NodeId>,
    index: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.leaf?;
            let node = self.arena.node(id);
            if self.index < node.keys.len() {
                let item = (&node.keys[self.index], &node.values()[self.index]);
                self.index += 1;
                return Some(item);
            }
            self.leaf = node.next_leaf();
            self.index = 0;
        }
    }
}

/// Stateful cursor over the leaf chain supporting deletion of the entry it
/// is positioned on. Holds the tree's only mutable borrow while it lives.
pub struct Cursor<'a, K, V, C = DefaultComparator> {
    tree: &'a mut BTree<K, V, C>,
    leaf: NodeId,
    index: usize,
    key: K,
    exhausted: bool,
}

impl<K, V, C> Cursor<'_, K, V, C>
where
    K: Copy,
    V: Default,
    C: Comparator<K>,
{
    /// `false` once the cursor has stepped past the last entry.
    pub fn valid(&self) -> bool {
        !self.exhausted
    }

    /// Key of the current entry (the last visited key once exhausted).
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> Option<&V> {
        if self.exhausted {
            return None;
        }
        Some(&self.tree.arena.node(self.leaf).values()[self.index])
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        if self.exhausted {
            return None;
        }
        Some(&mut self.tree.arena.node_mut(self.leaf).values_mut()[self.index])
    }

    /// Steps to the next entry in key order, following the leaf chain at
    /// leaf boundaries. Returns `false` at the end of the sequence.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let node = self.tree.arena.node(self.leaf);
        if self.index + 1 < node.keys.len() {
            self.index += 1;
            self.key = node.keys[self.index];
            return true;
        }
        match node.next_leaf() {
            Some(next) => {
                self.leaf = next;
                self.index = 0;
                self.key = self.tree.arena.node(next).keys[0];
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    /// Deletes the current entry and steps to its successor. Returns whether
    /// a following entry exists.
    ///
    /// The successor's key is remembered *before* the structural deletion
    /// and re-located afterwards: merges triggered by the delete can move it
    /// to a different leaf, so a leaf/index pair would not survive.
    pub fn remove_current(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let doomed = self.key;
        let has_next = self.advance();
        let next_key = self.key;

        let removed = self.tree.remove(&doomed);
        debug_assert!(removed, "cursor was positioned on a missing key");

        if has_next {
            let leaf = self.tree.find_leaf(&next_key);
            match self.tree.arena.node(leaf).locate(&next_key, &self.tree.cmp) {
                SearchResult::Found(index) => {
                    self.leaf = leaf;
                    self.index = index;
                }
                SearchResult::NotFound(_) => {
                    unreachable!("cursor re-anchor key vanished")
                }
            }
        }
        has_next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(order: usize) -> BTree<u64, u64> {
        BTree::new(order).unwrap()
    }

    #[test]
    fn first_split_produces_two_level_tree() -> Result<()> {
        // order 3: the fourth insert overflows the root leaf
        let mut t = tree(3);
        for k in [1u64, 2, 3] {
            *t.upsert(k)? = k * 10;
            assert_eq!(t.height(), 1);
        }
        *t.upsert(4)? = 40;

        assert_eq!(t.height(), 2);
        assert_eq!(t.len(), 4);
        t.validate()?;

        // single separator equal to the left leaf's maximum
        let root = t.arena.node(t.root);
        assert!(!root.is_leaf());
        assert_eq!(root.keys.len(), 1);
        assert_eq!(root.keys[0], 2);
        Ok(())
    }

    #[test]
    fn upsert_returns_existing_value() -> Result<()> {
        let mut t = tree(4);
        *t.upsert(7)? = 700;
        assert_eq!(t.len(), 1);

        assert_eq!(*t.upsert(7)?, 700);
        assert_eq!(t.len(), 1, "upsert of an existing key must not insert");
        Ok(())
    }

    #[test]
    fn insert_only_rejects_duplicates() -> Result<()> {
        let mut t = tree(4);
        assert!(t.insert(9)?.is_some());
        assert!(t.insert(9)?.is_none());
        assert_eq!(t.len(), 1);
        Ok(())
    }

    #[test]
    fn new_value_is_default_initialized() -> Result<()> {
        let mut t = tree(4);
        assert_eq!(*t.upsert(1)?, 0);
        Ok(())
    }

    #[test]
    fn delete_collapses_back_to_single_leaf() -> Result<()> {
        let mut t = tree(3);
        for k in 0u64..10 {
            t.upsert(k)?;
        }
        assert!(t.height() > 1);
        t.validate()?;

        for k in 0u64..10 {
            assert!(t.remove(&k), "key {k} should be present");
            t.validate()?;
        }
        assert_eq!(t.len(), 0);
        assert_eq!(t.height(), 1, "empty tree should collapse to one leaf");
        assert!(!t.remove(&3));
        Ok(())
    }

    #[test]
    fn removing_maxima_repairs_separators() -> Result<()> {
        let mut t = tree(3);
        for k in 0u64..12 {
            t.upsert(k)?;
        }
        // deleting tail keys forces separator rewrites on the spine
        for k in (6u64..12).rev() {
            assert!(t.remove(&k));
            t.validate()?;
        }
        assert_eq!(t.len(), 6);
        Ok(())
    }

    #[test]
    fn even_order_leaf_deletion_keeps_half_occupancy() -> Result<()> {
        // order 4: splitting five entries yields leaves of 2 and 3, and no
        // deletion may leave a non-root leaf below 2
        let mut t = tree(4);
        for k in 0u64..5 {
            t.upsert(k)?;
        }
        assert_eq!(t.height(), 2);
        for k in 0u64..5 {
            assert!(t.remove(&k));
            t.validate()?;
        }
        assert!(t.is_empty());
        Ok(())
    }

    #[test]
    fn rejects_too_small_order() {
        assert!(BTree::<u64, u64>::new(2).is_err());
    }

    #[test]
    fn clear_resets_to_empty() -> Result<()> {
        let mut t = tree(4);
        for k in 0u64..50 {
            t.upsert(k)?;
        }
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.height(), 1);
        assert!(t.get(&7).is_none());
        t.validate()?;

        *t.upsert(7)? = 1;
        assert_eq!(t.len(), 1);
        Ok(())
    }

    #[test]
    fn reverse_insertion_exercises_front_splits() -> Result<()> {
        let mut t = tree(3);
        for k in (0u64..64).rev() {
            t.upsert(k)?;
            t.validate()?;
        }
        let keys: Vec<u64> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0u64..64).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn cursor_walks_in_key_order() -> Result<()> {
        let mut t = tree(3);
        for k in [5u64, 1, 9, 3, 7] {
            *t.upsert(k)? = k;
        }
        let mut seen = Vec::new();
        let mut cursor = t.cursor_first().expect("tree is non-empty");
        loop {
            seen.push(*cursor.key());
            if !cursor.advance() {
                break;
            }
        }
        assert_eq!(seen, vec![1, 3, 5, 7, 9]);
        Ok(())
    }

    #[test]
    fn cursor_on_empty_tree_is_none() {
        let mut t = tree(3);
        assert!(t.cursor_first().is_none());
    }
}
