//! An embedded binary merkle tree kept in one contiguous byte buffer.
//!
//! Each node lives in a 54-byte slot addressed by a 32-bit index. Leaves map
//! opaque key ids to value ids and carry a caller-supplied hash; internal
//! node hashes are recomputed lazily. The buffer itself is the persisted
//! form: [`MerkleBlob::blob`] hands it out and [`MerkleBlob::new`] loads it
//! back.
//!
//! ```
//! use merkleblob::{KvId, MerkleBlob};
//! use merkleblob::utils::hasher::leaf_hash;
//!
//! let mut blob = MerkleBlob::default();
//! blob.insert(KvId(1), KvId(10), leaf_hash(b"a", b"apple")).unwrap();
//! blob.insert(KvId(2), KvId(20), leaf_hash(b"b", b"banana")).unwrap();
//! blob.calculate_lazy_hashes().unwrap();
//!
//! let proof = blob.get_proof_of_inclusion(KvId(2)).unwrap();
//! assert!(proof.valid());
//!
//! let reloaded = MerkleBlob::new(blob.blob().to_vec()).unwrap();
//! assert_eq!(reloaded.get_root_hash().unwrap(), blob.get_root_hash().unwrap());
//! ```

pub mod config;
pub mod def;
pub mod error;
pub mod merkletree;
pub mod utils;

pub use config::Config;
pub use error::MerkleBlobError;
pub use merkletree::{
    InsertLocation, KvId, MerkleBlob, NodeMetadata, NodeType, ProofOfInclusion, RawNode, Side,
    TreeIndex,
};
