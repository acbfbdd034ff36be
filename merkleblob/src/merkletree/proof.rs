//! Proofs of inclusion.
//!
//! A [`ProofOfInclusion`] carries, for each ancestor of a leaf, the hash of
//! the sibling on the way up and the hash the ancestor had when the proof was
//! made. Verification folds the leaf hash upward with the same rule the tree
//! uses and compares every step.
//!
//! Proofs are only produced from clean hashes: if any ancestor is dirty,
//! generation fails with `DirtyNode`.

use serde::{Deserialize, Serialize};

use crate::error::{MerkleBlobError, Result};
use crate::merkletree::blob::MerkleBlob;
use crate::merkletree::node::{KvId, Side};
use crate::utils::hasher::{calculate_internal_hash, Hash32};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofLayer {
    /// Side of the parent the path node occupies.
    pub side: Side,
    pub sibling_hash: Hash32,
    /// Hash of the parent at generation time.
    pub combined_hash: Hash32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfInclusion {
    pub node_hash: Hash32,
    /// Leaf's parent first, root last.
    pub layers: Vec<ProofLayer>,
    pub root_hash: Hash32,
}

impl ProofOfInclusion {
    /// Whether every layer folds to its recorded hash and the last one to
    /// the recorded root.
    pub fn valid(&self) -> bool {
        let mut existing = self.node_hash;
        for layer in &self.layers {
            existing =
                calculate_internal_hash(&existing, layer.side == Side::Left, &layer.sibling_hash);
            if existing != layer.combined_hash {
                return false;
            }
        }
        existing == self.root_hash
    }

    /// Like [`Self::valid`], additionally requiring the given root.
    pub fn valid_for_root(&self, root_hash: &Hash32) -> bool {
        self.root_hash == *root_hash && self.valid()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| MerkleBlobError::ProofEncoding(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| MerkleBlobError::ProofEncoding(e.to_string()))
    }
}

impl MerkleBlob {
    /// Builds the proof that `key` is in the tree.
    ///
    /// # Errors
    /// * `KeyNotFound` if `key` is not in the tree
    /// * `DirtyNode` if an ancestor's hash is stale
    pub fn get_proof_of_inclusion(&self, key: KvId) -> Result<ProofOfInclusion> {
        let mut index = self.get_key_index(key)?;
        let leaf = self.get_raw_node(index)?.into_leaf()?;
        let node_hash = leaf.hash;

        let mut layers = Vec::new();
        let mut parent_index = leaf.parent;
        while !parent_index.is_null() {
            let (metadata, parent) = self.get_node(parent_index)?;
            if metadata.dirty {
                return Err(MerkleBlobError::DirtyNode(parent_index));
            }
            let parent = parent.into_internal()?;
            let side = parent.side_of(index)?;
            let sibling_hash = self.get_raw_node(parent.child(side.other()))?.hash();
            layers.push(ProofLayer {
                side,
                sibling_hash,
                combined_hash: parent.hash,
            });
            index = parent_index;
            parent_index = parent.parent;
        }

        let root_hash = layers.last().map_or(node_hash, |layer| layer.combined_hash);
        Ok(ProofOfInclusion {
            node_hash,
            layers,
            root_hash,
        })
    }
}
