//! Consistency checks for a merkle blob.
//!
//! [`MerkleBlob::check_integrity`] walks the whole tree and verifies that the
//! buffer, the key index, the free set and the split queue describe the same
//! tree, that dirty flags are closed upward, and that every clean internal
//! hash matches its children.
//!
//! These checks are O(n) and meant for tests, tooling and verifying a buffer
//! on load, not for every operation.

use crate::error::{MerkleBlobError, Result};
use crate::merkletree::blob::MerkleBlob;
use crate::merkletree::node::{RawNode, TreeIndex};
use crate::utils::hasher::internal_hash;

fn violation(msg: String) -> MerkleBlobError {
    MerkleBlobError::Integrity(msg)
}

impl MerkleBlob {
    pub fn check_integrity(&self) -> Result<()> {
        if self.arena.slot_count() == 0 {
            if !self.key_to_index.is_empty() || !self.split_queue.is_empty() {
                return Err(violation("empty buffer with indexed keys".to_string()));
            }
            return Ok(());
        }

        let root = self.get_raw_node(TreeIndex(0))?;
        if !root.parent().is_null() {
            return Err(violation(format!("root has parent {}", root.parent())));
        }

        let mut seen = vec![false; self.arena.slot_count()];
        let mut live = 0usize;
        let mut leaves = 0usize;
        for item in self.iter_left_child_first() {
            let (index, metadata, node) = item?;
            if std::mem::replace(&mut seen[index.as_usize()], true) {
                return Err(violation(format!("node {} reached twice", index)));
            }
            live += 1;
            match node {
                RawNode::Leaf(leaf) => {
                    leaves += 1;
                    if metadata.dirty {
                        return Err(violation(format!("leaf {} is dirty", index)));
                    }
                    if self.key_to_index.get(&leaf.key) != Some(&index) {
                        return Err(violation(format!(
                            "key {} at {} is not indexed there",
                            leaf.key, index
                        )));
                    }
                    // promoted subtrees keep their old depth until split
                    match self.split_queue.depth(leaf.key) {
                        None => {
                            return Err(violation(format!("key {} is not queued", leaf.key)));
                        }
                        Some(queued) if queued < self.depth_of(index)? => {
                            return Err(violation(format!(
                                "key {} queued at depth {} above its leaf {}",
                                leaf.key, queued, index
                            )));
                        }
                        Some(_) => {}
                    }
                }
                RawNode::Internal(node) => {
                    let (left_meta, left) = self.get_node(node.left)?;
                    let (right_meta, right) = self.get_node(node.right)?;
                    for child in [&left, &right] {
                        if child.parent() != index {
                            return Err(violation(format!(
                                "child {} of {} points to parent {}",
                                child.index(),
                                index,
                                child.parent()
                            )));
                        }
                    }
                    if metadata.dirty {
                        continue;
                    }
                    if left_meta.dirty || right_meta.dirty {
                        return Err(violation(format!("clean node {} has a dirty child", index)));
                    }
                    let expected = internal_hash(&left.hash(), &right.hash());
                    if node.hash != expected {
                        return Err(violation(format!(
                            "hash mismatch at {}: stored {} expected {}",
                            index,
                            hex::encode(node.hash),
                            hex::encode(expected)
                        )));
                    }
                }
            }
        }

        if leaves != self.key_to_index.len() {
            return Err(violation(format!(
                "{} leaves in the tree but {} indexed keys",
                leaves,
                self.key_to_index.len()
            )));
        }
        if leaves != self.split_queue.len() {
            return Err(violation(format!(
                "{} leaves in the tree but {} queued keys",
                leaves,
                self.split_queue.len()
            )));
        }
        for index in self.arena.free_indexes() {
            if seen.get(index.as_usize()).copied().unwrap_or(true) {
                return Err(violation(format!("free slot {} is live or out of range", index)));
            }
        }
        if live != self.arena.live_count() {
            return Err(violation(format!(
                "{} live and {} free slots do not add up to {}",
                live,
                self.arena.free_count(),
                self.arena.slot_count()
            )));
        }
        Ok(())
    }
}
