//! Deferred hash maintenance.
//!
//! Structural changes only flip dirty bits on the affected ancestors. The
//! hashes themselves are repaired in one pass by
//! [`MerkleBlob::calculate_lazy_hashes`], children before parents.
//!
//! Dirty bits are closed upward: every ancestor of a dirty node is dirty.
//! This lets [`MerkleBlob::mark_lineage_dirty`] stop at the first dirty
//! ancestor and lets the repair pass skip any clean subtree.

use log::debug;

use crate::error::Result;
use crate::merkletree::blob::MerkleBlob;
use crate::merkletree::node::{NodeMetadata, NodeType, RawNode, TreeIndex};
use crate::utils::hasher::internal_hash;

impl MerkleBlob {
    /// Marks `index` and its ancestors dirty, stopping at the first node
    /// that already is.
    pub(crate) fn mark_lineage_dirty(&mut self, index: TreeIndex) -> Result<()> {
        let mut current = index;
        while !current.is_null() {
            let (mut metadata, node) = self.arena.read(current)?;
            if metadata.dirty {
                break;
            }
            metadata.dirty = true;
            self.arena.write_metadata(current, &metadata)?;
            current = node.parent();
        }
        Ok(())
    }

    /// Recomputes the hash of every dirty internal node and clears its bit.
    ///
    /// Leaf hashes are caller-supplied and never recomputed.
    pub fn calculate_lazy_hashes(&mut self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let root = TreeIndex(0);
        if !self.arena.read_metadata(root)?.dirty {
            return Ok(());
        }

        let mut recomputed = 0usize;
        let mut stack = vec![(root, false)];
        while let Some((index, children_done)) = stack.pop() {
            let mut node = self.arena.read(index)?.1.into_internal()?;
            if !children_done {
                stack.push((index, true));
                for child in [node.right, node.left] {
                    let metadata = self.arena.read_metadata(child)?;
                    if metadata.dirty && metadata.node_type == NodeType::Internal {
                        stack.push((child, false));
                    }
                }
                continue;
            }
            let left = self.arena.read(node.left)?.1.hash();
            let right = self.arena.read(node.right)?.1.hash();
            node.hash = internal_hash(&left, &right);
            let clean = NodeMetadata {
                node_type: NodeType::Internal,
                dirty: false,
            };
            self.arena.write(index, &clean, &RawNode::Internal(node))?;
            recomputed += 1;
        }
        debug!("calculate_lazy_hashes recomputed {} hashes", recomputed);
        Ok(())
    }
}
