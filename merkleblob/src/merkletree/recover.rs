//! Rebuilding a [`MerkleBlob`] from its persisted bytes.
//!
//! Only the buffer is persisted. Everything else is derived from it by one
//! breadth-first walk from the root:
//!
//! 1. Key index: every reachable leaf's key and slot
//! 2. Free set: every slot the walk does not reach
//! 3. Split queue: leaves in level order with their depth
//!
//! The walk rejects buffers whose links do not form a tree rooted at slot 0.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::config::Config;
use crate::def::SPACING;
use crate::error::{MerkleBlobError, Result};
use crate::merkletree::arena::SlotArena;
use crate::merkletree::blob::MerkleBlob;
use crate::merkletree::iter::BreadthFirstIterator;
use crate::merkletree::node::{RawNode, TreeIndex};

impl MerkleBlob {
    /// Loads a buffer with the default [`Config`].
    pub fn new(blob: Vec<u8>) -> Result<Self> {
        Self::with_config(blob, Config::default())
    }

    /// Loads a buffer produced by [`MerkleBlob::blob`].
    ///
    /// # Arguments
    /// * `blob` - Persisted bytes; empty for an empty tree
    /// * `config` - Runtime settings; `verify_on_load` adds a full check
    ///
    /// # Errors
    /// * `InvalidBlobLength` if the length is not a multiple of the slot size
    /// * `Integrity` if the links do not form a tree rooted at slot 0
    /// * Codec errors for undecodable slots
    pub fn with_config(blob: Vec<u8>, config: Config) -> Result<Self> {
        let remainder = blob.len() % SPACING;
        if remainder != 0 {
            return Err(MerkleBlobError::InvalidBlobLength(remainder));
        }
        let mut merkle_blob = Self::empty(config);
        if blob.is_empty() {
            return Ok(merkle_blob);
        }

        let arena = SlotArena::from_parts(blob, BTreeSet::new());
        let slot_count = arena.slot_count();
        let root = arena.read(TreeIndex(0))?.1;
        if !root.parent().is_null() {
            return Err(MerkleBlobError::Integrity(format!(
                "root has parent {}",
                root.parent()
            )));
        }

        let mut visited = vec![false; slot_count];
        let mut depths = vec![0u32; slot_count];
        for item in BreadthFirstIterator::new(&arena, Some(TreeIndex(0))) {
            let (index, _, node) = item?;
            if std::mem::replace(&mut visited[index.as_usize()], true) {
                return Err(MerkleBlobError::Integrity(format!(
                    "node {} reached twice",
                    index
                )));
            }
            let depth = depths[index.as_usize()];
            match node {
                RawNode::Leaf(leaf) => {
                    if merkle_blob.key_to_index.insert(leaf.key, index).is_some() {
                        return Err(MerkleBlobError::Integrity(format!(
                            "key {} stored twice",
                            leaf.key
                        )));
                    }
                    merkle_blob.split_queue.push(leaf.key, depth);
                }
                RawNode::Internal(internal) => {
                    for child in [internal.left, internal.right] {
                        if child.as_usize() >= slot_count {
                            return Err(MerkleBlobError::Integrity(format!(
                                "node {} has child {} outside the buffer",
                                index, child
                            )));
                        }
                        let child_node = arena.read(child)?.1;
                        if child_node.parent() != index {
                            return Err(MerkleBlobError::Integrity(format!(
                                "child {} of {} points to parent {}",
                                child,
                                index,
                                child_node.parent()
                            )));
                        }
                        depths[child.as_usize()] = depth + 1;
                    }
                }
            }
        }

        let free_indexes: BTreeSet<TreeIndex> = visited
            .iter()
            .enumerate()
            .filter(|(_, &reached)| !reached)
            .map(|(i, _)| TreeIndex(i as u32))
            .collect();
        debug!(
            "recovered {} keys from {} slots, {} free",
            merkle_blob.key_to_index.len(),
            slot_count,
            free_indexes.len()
        );
        merkle_blob.arena = SlotArena::from_parts(arena.into_bytes(), free_indexes);

        if merkle_blob.config().verify_on_load {
            if let Err(err) = merkle_blob.check_integrity() {
                warn!("loaded blob failed verification: {}", err);
                return Err(err);
            }
        }
        Ok(merkle_blob)
    }
}
