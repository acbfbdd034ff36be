//! Hashing utilities for the merkle blob.
//!
//! All hashes are SHA-256. Node hashes carry a one-byte tag so that a leaf
//! digest can never be confused with an internal digest:
//! - Internal nodes: `sha256(0x02 || left || right)`
//! - Leaves (caller helper): `sha256(0x01 || sha256(key) || sha256(value))`

use sha2::{Digest, Sha256};

use crate::def::{INTERNAL_HASH_TAG, LEAF_HASH_TAG};

/// Type alias for a 32-byte hash value.
pub type Hash32 = [u8; 32];

/// Hash stored in freshly converted internal nodes until the lazy pass runs.
pub const ZERO_HASH32: Hash32 = [0u8; 32];

/// Computes the SHA-256 hash of a single value.
///
/// # Arguments
/// * `a` - Value to hash
///
/// # Returns
/// The 32-byte hash of the input
pub fn hash<T: AsRef<[u8]>>(a: T) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.finalize().into()
}

/// Computes the SHA-256 hash of two values with a tag prefix.
///
/// # Arguments
/// * `tag` - Domain-separation byte
/// * `a` - First value to hash
/// * `b` - Second value to hash
///
/// # Returns
/// The 32-byte hash of the tag and both values
pub fn hash2<T: AsRef<[u8]>>(tag: u8, a: T, b: T) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update([tag]);
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// Combines two child hashes into the hash of their parent.
pub fn internal_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    hash2(INTERNAL_HASH_TAG, left, right)
}

/// Hash for a leaf holding the given key and value bytes.
///
/// The tree never calls this itself: leaf hashes are supplied by the caller
/// on insert. It is provided so callers share one leaf convention.
pub fn leaf_hash(key: &[u8], value: &[u8]) -> Hash32 {
    hash2(LEAF_HASH_TAG, hash(key), hash(value))
}

/// Folds `hash` with the hash of its sibling.
///
/// # Arguments
/// * `hash` - Hash of the node on the path
/// * `hash_is_left` - Whether that node is its parent's left child
/// * `sibling` - Hash of the other child
///
/// # Returns
/// The hash the common parent must carry
pub fn calculate_internal_hash(hash: &Hash32, hash_is_left: bool, sibling: &Hash32) -> Hash32 {
    if hash_is_left {
        internal_hash(hash, sibling)
    } else {
        internal_hash(sibling, hash)
    }
}
