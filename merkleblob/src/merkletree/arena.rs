//! Fixed-stride slot storage.
//!
//! A [`SlotArena`] owns the contiguous byte buffer and the set of slots that
//! are allocated but not part of the tree. It knows nothing about tree
//! structure: it reads, writes, hands out and takes back slots.
//!
//! Freed slots are recycled lowest index first. The buffer only grows while
//! the tree is non-empty; [`SlotArena::clear`] truncates it to zero.

use std::collections::BTreeSet;

use crate::def::{METADATA_SIZE, NULL_PARENT, SPACING};
use crate::error::{MerkleBlobError, Result};
use crate::merkletree::node::{pack_raw_node, unpack_raw_node, NodeMetadata, RawNode, TreeIndex};

#[derive(Debug, Clone, Default)]
pub struct SlotArena {
    bytes: Vec<u8>,
    free_indexes: BTreeSet<TreeIndex>,
}

impl SlotArena {
    pub fn with_capacity(slots: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(slots * SPACING),
            free_indexes: BTreeSet::new(),
        }
    }

    /// Wraps an existing buffer. The caller is responsible for the free set
    /// matching the tree stored in `bytes`.
    pub(crate) fn from_parts(bytes: Vec<u8>, free_indexes: BTreeSet<TreeIndex>) -> Self {
        Self {
            bytes,
            free_indexes,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.bytes.len() / SPACING
    }

    pub fn free_count(&self) -> usize {
        self.free_indexes.len()
    }

    pub fn live_count(&self) -> usize {
        self.slot_count() - self.free_count()
    }

    pub fn free_indexes(&self) -> &BTreeSet<TreeIndex> {
        &self.free_indexes
    }

    pub fn is_free(&self, index: TreeIndex) -> bool {
        self.free_indexes.contains(&index)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Whether `n` more slots can be handed out without reaching the sentinel.
    pub fn can_allocate(&self, n: usize) -> bool {
        let fresh = n.saturating_sub(self.free_count());
        self.slot_count() + fresh <= NULL_PARENT as usize
    }

    fn slot_range(&self, index: TreeIndex) -> Result<std::ops::Range<usize>> {
        if index.is_null() || index.as_usize() >= self.slot_count() {
            return Err(MerkleBlobError::invalid_index(index));
        }
        let start = index.as_usize() * SPACING;
        Ok(start..start + SPACING)
    }

    /// Raw metadata and payload bytes of a slot, free or not.
    pub fn read_slot(&self, index: TreeIndex) -> Result<(NodeMetadata, &[u8])> {
        let range = self.slot_range(index)?;
        let slot = &self.bytes[range];
        let metadata = NodeMetadata::unpack(&slot[..METADATA_SIZE])?;
        Ok((metadata, &slot[METADATA_SIZE..]))
    }

    /// Decodes the node stored in a live slot.
    pub fn read(&self, index: TreeIndex) -> Result<(NodeMetadata, RawNode)> {
        if self.is_free(index) {
            return Err(MerkleBlobError::invalid_index(index));
        }
        let (metadata, payload) = self.read_slot(index)?;
        let node = unpack_raw_node(index, &metadata, payload)?;
        Ok((metadata, node))
    }

    pub fn read_metadata(&self, index: TreeIndex) -> Result<NodeMetadata> {
        if self.is_free(index) {
            return Err(MerkleBlobError::invalid_index(index));
        }
        Ok(self.read_slot(index)?.0)
    }

    /// Overwrites a slot in place.
    pub fn write(
        &mut self,
        index: TreeIndex,
        metadata: &NodeMetadata,
        node: &RawNode,
    ) -> Result<()> {
        let range = self.slot_range(index)?;
        let slot = &mut self.bytes[range];
        slot[..METADATA_SIZE].copy_from_slice(&metadata.pack());
        slot[METADATA_SIZE..].copy_from_slice(&pack_raw_node(node));
        Ok(())
    }

    pub fn write_metadata(&mut self, index: TreeIndex, metadata: &NodeMetadata) -> Result<()> {
        let range = self.slot_range(index)?;
        self.bytes[range.start..range.start + METADATA_SIZE].copy_from_slice(&metadata.pack());
        Ok(())
    }

    /// Hands out the lowest free slot, or appends a zeroed one.
    pub fn allocate(&mut self) -> Result<TreeIndex> {
        if let Some(index) = self.free_indexes.pop_first() {
            return Ok(index);
        }
        let next = self.slot_count();
        if next >= NULL_PARENT as usize {
            return Err(MerkleBlobError::ArenaFull);
        }
        self.bytes.resize(self.bytes.len() + SPACING, 0);
        Ok(TreeIndex(next as u32))
    }

    /// Returns a slot to the free set. Its bytes are left as they were.
    pub fn free(&mut self, index: TreeIndex) -> Result<()> {
        self.slot_range(index)?;
        self.free_indexes.insert(index);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.free_indexes.clear();
    }
}
