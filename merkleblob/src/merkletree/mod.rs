//! Binary merkle tree stored in a fixed-stride byte buffer.
//!
//! - [`node`]: Node records and their 54-byte slot encoding
//! - [`arena`]: Slot allocation and raw slot access
//! - [`splitqueue`]: Choice of the leaf the next insert splits
//! - [`blob`]: [`MerkleBlob`], the tree engine (insert, delete, upsert, batch insert, queries)
//! - [`lazyhash`]: Dirty marking and the deferred hash pass
//! - [`proof`]: Proofs of inclusion
//! - [`iter`]: Breadth-first and left-child-first walks
//! - [`check`]: Tree consistency validation
//! - [`recover`]: Rebuilding a blob from its persisted bytes
//! - [`helpers`]: Deterministic data for tests and benchmarks

pub mod arena;
pub mod blob;
pub mod check;
pub mod helpers;
pub mod iter;
pub mod lazyhash;
pub mod node;
pub mod proof;
pub mod recover;
pub mod splitqueue;

pub use blob::{InsertLocation, MerkleBlob};
pub use node::{
    KvId, NodeMetadata, NodeType, RawInternalNode, RawLeafNode, RawNode, Side, TreeIndex,
};
pub use proof::{ProofLayer, ProofOfInclusion};
