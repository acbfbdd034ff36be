//! Errors surfaced by the merkle blob.
//!
//! Every fallible operation returns [`MerkleBlobError`]. Engine operations
//! validate their preconditions before touching the buffer, so receiving an
//! error means the blob is unchanged.

use thiserror::Error;

use crate::merkletree::node::{KvId, TreeIndex};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleBlobError {
    #[error("invalid index: {0}")]
    InvalidIndex(i64),

    #[error("Key {0} not present in the store")]
    KeyNotFound(KvId),

    #[error("Key {0} already present in the store")]
    KeyAlreadyPresent(KvId),

    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("unknown node type: {0}")]
    UnknownNodeType(u8),

    #[error("unknown dirty value: {0}")]
    UnknownDirtyValue(u8),

    #[error("blob length must be a multiple of the slot size, {0} bytes left over")]
    InvalidBlobLength(usize),

    #[error("batch has {pairs} key/value pairs but {hashes} hashes")]
    BatchLengthMismatch { pairs: usize, hashes: usize },

    #[error("requested insertion as root of a non-empty tree")]
    UnableToInsertAsRootOfNonEmptyTree,

    #[error("node at {0} is not a leaf")]
    NodeNotALeaf(TreeIndex),

    #[error("node at {0} is not an internal node")]
    NodeNotInternal(TreeIndex),

    #[error("node at {child} is not a child of {parent}")]
    IndexIsNotAChild { parent: TreeIndex, child: TreeIndex },

    #[error("hash at {0} is dirty, calculate lazy hashes first")]
    DirtyNode(TreeIndex),

    #[error("no slot index left to allocate")]
    ArenaFull,

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("proof encoding error: {0}")]
    ProofEncoding(String),
}

impl MerkleBlobError {
    pub(crate) fn invalid_index(index: TreeIndex) -> Self {
        MerkleBlobError::InvalidIndex(index.0 as i64)
    }
}

pub type Result<T> = std::result::Result<T, MerkleBlobError>;
