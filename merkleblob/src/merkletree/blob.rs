//! The merkle blob: a binary merkle tree living in one byte buffer.
//!
//! [`MerkleBlob`] ties together the slot arena, the key index and the split
//! queue. Every mutation here keeps three things in agreement:
//!
//! - the tree stored in the arena (parent/child links, root at slot 0),
//! - `key_to_index`, which maps each key to the slot of its leaf,
//! - the split queue, which holds exactly the live leaf keys.
//!
//! Mutations only mark hashes dirty. Call
//! [`MerkleBlob::calculate_lazy_hashes`] before reading hashes.
//!
//! All preconditions are checked before the first write, so an `Err` leaves
//! the blob as it was.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::config::Config;
use crate::error::{MerkleBlobError, Result};
use crate::merkletree::arena::SlotArena;
use crate::merkletree::iter::{BreadthFirstIterator, LeftChildFirstIterator};
use crate::merkletree::node::{
    KvId, NodeMetadata, RawInternalNode, RawLeafNode, RawNode, Side, TreeIndex,
};
use crate::merkletree::splitqueue::SplitQueue;
use crate::utils::hasher::{Hash32, ZERO_HASH32};

/// Where [`MerkleBlob::insert_at`] places a new leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertLocation {
    /// Split the leaf chosen by the balancing policy; new leaf on the right.
    Auto,
    /// Become the root. Only valid on an empty tree.
    AsRoot,
    /// Split the leaf at `index`, placing the new leaf on `side`.
    Leaf { index: TreeIndex, side: Side },
}

#[derive(Debug, Clone)]
pub struct MerkleBlob {
    pub(crate) arena: SlotArena,
    pub(crate) key_to_index: HashMap<KvId, TreeIndex>,
    pub(crate) split_queue: SplitQueue,
    pub(crate) config: Config,
}

impl Default for MerkleBlob {
    fn default() -> Self {
        Self::empty(Config::default())
    }
}

impl MerkleBlob {
    /// An empty tree backed by a zero-length buffer.
    pub fn empty(config: Config) -> Self {
        Self {
            arena: SlotArena::with_capacity(config.initial_capacity),
            key_to_index: HashMap::new(),
            split_queue: SplitQueue::new(config.split_queue_compact_ratio),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.key_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_to_index.is_empty()
    }

    /// The persisted form of the tree.
    pub fn blob(&self) -> &[u8] {
        self.arena.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.arena.into_bytes()
    }

    /// Slots in the buffer, live and free.
    pub fn slot_count(&self) -> usize {
        self.arena.slot_count()
    }

    pub fn free_slot_count(&self) -> usize {
        self.arena.free_count()
    }

    pub fn contains_key(&self, key: KvId) -> bool {
        self.key_to_index.contains_key(&key)
    }

    pub fn get_key_index(&self, key: KvId) -> Result<TreeIndex> {
        self.key_to_index
            .get(&key)
            .copied()
            .ok_or(MerkleBlobError::KeyNotFound(key))
    }

    pub(crate) fn get_node(&self, index: TreeIndex) -> Result<(NodeMetadata, RawNode)> {
        self.arena.read(index)
    }

    /// Decodes the node in a live slot.
    ///
    /// The hash of an internal node is returned as stored; it is stale while
    /// the node is dirty.
    ///
    /// # Errors
    /// `InvalidIndex` for the sentinel, indexes past the buffer, and free slots
    pub fn get_raw_node(&self, index: TreeIndex) -> Result<RawNode> {
        self.arena.read(index).map(|(_, node)| node)
    }

    pub fn get_metadata(&self, index: TreeIndex) -> Result<NodeMetadata> {
        self.arena.read_metadata(index)
    }

    /// Hash of the node at `index`, refusing stale hashes.
    pub fn get_hash_at_index(&self, index: TreeIndex) -> Result<Hash32> {
        let (metadata, node) = self.get_node(index)?;
        if metadata.dirty {
            return Err(MerkleBlobError::DirtyNode(index));
        }
        Ok(node.hash())
    }

    /// Root hash, or `None` for an empty tree.
    pub fn get_root_hash(&self) -> Result<Option<Hash32>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.get_hash_at_index(TreeIndex(0)).map(Some)
    }

    /// Every key with its value.
    pub fn get_keys_values(&self) -> Result<HashMap<KvId, KvId>> {
        let mut keys_values = HashMap::with_capacity(self.key_to_index.len());
        for (&key, &index) in self.key_to_index.iter() {
            let leaf = self.get_raw_node(index)?.into_leaf()?;
            keys_values.insert(key, leaf.value);
        }
        Ok(keys_values)
    }

    /// Slots from `index` up to the root, `index` first.
    ///
    /// # Errors
    /// `InvalidIndex` when `index` is not a live slot, the sentinel included
    pub fn get_lineage_indexes(&self, index: TreeIndex) -> Result<Vec<TreeIndex>> {
        let mut lineage = vec![index];
        let mut current = self.get_raw_node(index)?.parent();
        while !current.is_null() {
            if lineage.len() > self.arena.slot_count() {
                return Err(MerkleBlobError::Integrity(format!(
                    "parent chain from {} does not reach the root",
                    index
                )));
            }
            let node = self.get_raw_node(current)?;
            lineage.push(current);
            current = node.parent();
        }
        Ok(lineage)
    }

    /// Nodes from `index` up to the root, `index` first.
    pub fn get_lineage(&self, index: TreeIndex) -> Result<Vec<RawNode>> {
        self.get_lineage_indexes(index)?
            .into_iter()
            .map(|i| self.get_raw_node(i))
            .collect()
    }

    pub(crate) fn depth_of(&self, index: TreeIndex) -> Result<u32> {
        Ok(self.get_lineage_indexes(index)?.len() as u32 - 1)
    }

    pub fn iter_breadth_first(&self) -> BreadthFirstIterator<'_> {
        BreadthFirstIterator::new(&self.arena, self.root_index())
    }

    pub fn iter_left_child_first(&self) -> LeftChildFirstIterator<'_> {
        LeftChildFirstIterator::new(&self.arena, self.root_index())
    }

    fn root_index(&self) -> Option<TreeIndex> {
        if self.is_empty() {
            None
        } else {
            Some(TreeIndex(0))
        }
    }

    pub fn insert(&mut self, key: KvId, value: KvId, hash: Hash32) -> Result<()> {
        self.insert_at(key, value, hash, InsertLocation::Auto)
    }

    /// Inserts a new leaf.
    ///
    /// # Arguments
    /// * `key` - Must not be present yet
    /// * `value` - Stored next to the key
    /// * `hash` - Leaf hash, kept as given
    /// * `location` - Where the leaf goes
    ///
    /// # Errors
    /// * `KeyAlreadyPresent` if `key` is in the tree
    /// * `UnableToInsertAsRootOfNonEmptyTree` for `AsRoot` on a non-empty tree
    /// * `InvalidIndex` / `NodeNotALeaf` for a bad `Leaf` location
    /// * `ArenaFull` if no slot index is left
    pub fn insert_at(
        &mut self,
        key: KvId,
        value: KvId,
        hash: Hash32,
        location: InsertLocation,
    ) -> Result<()> {
        if self.contains_key(key) {
            return Err(MerkleBlobError::KeyAlreadyPresent(key));
        }
        match location {
            InsertLocation::AsRoot if !self.is_empty() => {
                Err(MerkleBlobError::UnableToInsertAsRootOfNonEmptyTree)
            }
            InsertLocation::AsRoot => self.insert_root(key, value, hash),
            InsertLocation::Auto if self.is_empty() => self.insert_root(key, value, hash),
            InsertLocation::Auto => {
                let target = self.split_target()?;
                self.split_leaf(target, Side::Right, key, value, hash)
            }
            InsertLocation::Leaf { index, side } => self.split_leaf(index, side, key, value, hash),
        }
    }

    fn split_target(&mut self) -> Result<TreeIndex> {
        let key = self.split_queue.peek().ok_or_else(|| {
            MerkleBlobError::Integrity("split queue is empty for a non-empty tree".to_string())
        })?;
        self.get_key_index(key)
    }

    fn insert_root(&mut self, key: KvId, value: KvId, hash: Hash32) -> Result<()> {
        self.arena.clear();
        let index = self.arena.allocate()?;
        let leaf = RawNode::Leaf(RawLeafNode {
            parent: TreeIndex::NULL,
            key,
            value,
            hash,
            index,
        });
        self.arena.write(index, &NodeMetadata::leaf(), &leaf)?;
        self.key_to_index.insert(key, index);
        self.split_queue.push(key, 0);
        Ok(())
    }

    /// Turns the leaf at `target` into an internal node over the old leaf and
    /// a new one holding `key`, placed on `side`.
    fn split_leaf(
        &mut self,
        target: TreeIndex,
        side: Side,
        key: KvId,
        value: KvId,
        hash: Hash32,
    ) -> Result<()> {
        let old = self.get_raw_node(target)?.into_leaf()?;
        let depth = self.depth_of(target)?;
        if !self.arena.can_allocate(2) {
            return Err(MerkleBlobError::ArenaFull);
        }

        let old_index = self.arena.allocate()?;
        let new_index = self.arena.allocate()?;
        let (left, right) = match side {
            Side::Left => (new_index, old_index),
            Side::Right => (old_index, new_index),
        };

        let moved = RawNode::Leaf(RawLeafNode {
            parent: target,
            index: old_index,
            ..old.clone()
        });
        let added = RawNode::Leaf(RawLeafNode {
            parent: target,
            key,
            value,
            hash,
            index: new_index,
        });
        let internal = RawNode::Internal(RawInternalNode {
            parent: old.parent,
            left,
            right,
            hash: ZERO_HASH32,
            index: target,
        });
        self.arena.write(old_index, &NodeMetadata::leaf(), &moved)?;
        self.arena.write(new_index, &NodeMetadata::leaf(), &added)?;
        self.arena.write(target, &NodeMetadata::dirty_internal(), &internal)?;

        self.key_to_index.insert(old.key, old_index);
        self.key_to_index.insert(key, new_index);
        self.split_queue.push(old.key, depth + 1);
        self.split_queue.push(key, depth + 1);

        self.mark_lineage_dirty(old.parent)
    }

    /// Removes the leaf holding `key`; its sibling takes the parent's slot.
    ///
    /// # Errors
    /// `KeyNotFound` if `key` is not in the tree
    pub fn delete(&mut self, key: KvId) -> Result<()> {
        let leaf_index = self.get_key_index(key)?;
        let leaf = self.get_raw_node(leaf_index)?.into_leaf()?;

        if leaf.parent.is_null() {
            self.clear();
            return Ok(());
        }

        let parent = self.get_raw_node(leaf.parent)?.into_internal()?;
        let sibling_index = parent.sibling_of(leaf_index)?;
        let (sibling_metadata, mut sibling) = self.get_node(sibling_index)?;

        // read everything the relinking needs before the first write
        let promoted_depth = match sibling {
            RawNode::Leaf(_) => Some(self.depth_of(parent.index)?),
            RawNode::Internal(_) => None,
        };
        let mut children = Vec::new();
        if let RawNode::Internal(ref node) = sibling {
            for child in [node.left, node.right] {
                children.push(self.get_node(child)?);
            }
        }

        self.key_to_index.remove(&key);
        self.split_queue.remove(key);
        self.arena.free(leaf_index)?;

        sibling.set_parent(parent.parent);
        sibling.set_index(parent.index);
        self.arena.write(parent.index, &sibling_metadata, &sibling)?;
        self.arena.free(sibling_index)?;

        match sibling {
            RawNode::Leaf(ref moved) => {
                self.key_to_index.insert(moved.key, parent.index);
                if let Some(depth) = promoted_depth {
                    self.split_queue.push(moved.key, depth);
                }
            }
            RawNode::Internal(_) => {
                for (metadata, mut child) in children {
                    child.set_parent(parent.index);
                    self.arena.write(child.index(), &metadata, &child)?;
                }
            }
        }

        self.mark_lineage_dirty(parent.parent)
    }

    /// Replaces the value and hash of an existing key, or inserts it.
    pub fn upsert(&mut self, key: KvId, value: KvId, hash: Hash32) -> Result<()> {
        let Some(&index) = self.key_to_index.get(&key) else {
            return self.insert(key, value, hash);
        };
        let (metadata, node) = self.get_node(index)?;
        let mut leaf = node.into_leaf()?;
        leaf.value = value;
        leaf.hash = hash;
        let parent = leaf.parent;
        self.arena.write(index, &metadata, &RawNode::Leaf(leaf))?;
        self.mark_lineage_dirty(parent)
    }

    /// Inserts many new keys at once.
    ///
    /// On an empty tree the batch is laid out as a complete binary tree in
    /// level order. Otherwise each entry is inserted as by [`Self::insert`].
    ///
    /// # Errors
    /// * `BatchLengthMismatch` if `keys_values` and `hashes` differ in length
    /// * `KeyAlreadyPresent` if a key is in the tree or repeated in the batch
    /// * `ArenaFull` if the batch does not fit
    pub fn batch_insert(&mut self, keys_values: &[(KvId, KvId)], hashes: &[Hash32]) -> Result<()> {
        if keys_values.len() != hashes.len() {
            return Err(MerkleBlobError::BatchLengthMismatch {
                pairs: keys_values.len(),
                hashes: hashes.len(),
            });
        }
        let mut seen = HashSet::with_capacity(keys_values.len());
        for &(key, _) in keys_values {
            if self.contains_key(key) || !seen.insert(key) {
                return Err(MerkleBlobError::KeyAlreadyPresent(key));
            }
        }
        if keys_values.is_empty() {
            return Ok(());
        }
        let needed = if self.is_empty() {
            2 * keys_values.len() - 1
        } else {
            2 * keys_values.len()
        };
        if !self.arena.can_allocate(needed) {
            return Err(MerkleBlobError::ArenaFull);
        }

        if self.is_empty() {
            return self.build_complete_tree(keys_values, hashes);
        }
        for (&(key, value), hash) in keys_values.iter().zip(hashes) {
            self.insert(key, value, *hash)?;
        }
        Ok(())
    }

    /// Node `i` has children `2i + 1` and `2i + 2`; the last `n` positions
    /// are the leaves.
    fn build_complete_tree(
        &mut self,
        keys_values: &[(KvId, KvId)],
        hashes: &[Hash32],
    ) -> Result<()> {
        let leaf_count = keys_values.len();
        let total = 2 * leaf_count - 1;
        let first_leaf = leaf_count - 1;

        self.arena.clear();
        for position in 0..total {
            let index = self.arena.allocate()?;
            let parent = if position == 0 {
                TreeIndex::NULL
            } else {
                TreeIndex(((position - 1) / 2) as u32)
            };
            if position < first_leaf {
                let node = RawNode::Internal(RawInternalNode {
                    parent,
                    left: TreeIndex((2 * position + 1) as u32),
                    right: TreeIndex((2 * position + 2) as u32),
                    hash: ZERO_HASH32,
                    index,
                });
                self.arena.write(index, &NodeMetadata::dirty_internal(), &node)?;
            } else {
                let (key, value) = keys_values[position - first_leaf];
                let node = RawNode::Leaf(RawLeafNode {
                    parent,
                    key,
                    value,
                    hash: hashes[position - first_leaf],
                    index,
                });
                self.arena.write(index, &NodeMetadata::leaf(), &node)?;
                self.key_to_index.insert(key, index);
                self.split_queue.push(key, (position + 1).ilog2());
            }
        }
        debug!(
            "batch_insert built a complete tree of {} leaves in {} slots",
            leaf_count, total
        );
        Ok(())
    }

    /// Drops every node and truncates the buffer.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.key_to_index.clear();
        self.split_queue.clear();
    }
}

impl PartialEq for MerkleBlob {
    /// Same shape, same leaves and same clean hashes, wherever the nodes
    /// happen to be stored.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut ours = self.iter_left_child_first();
        let mut theirs = other.iter_left_child_first();
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return true,
                (Some(Ok((_, a_meta, a))), Some(Ok((_, b_meta, b)))) => {
                    if a_meta != b_meta {
                        return false;
                    }
                    let same = match (&a, &b) {
                        (RawNode::Leaf(a), RawNode::Leaf(b)) => {
                            a.key == b.key && a.value == b.value && a.hash == b.hash
                        }
                        (RawNode::Internal(a), RawNode::Internal(b)) => {
                            a_meta.dirty || a.hash == b.hash
                        }
                        _ => false,
                    };
                    if !same {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}
