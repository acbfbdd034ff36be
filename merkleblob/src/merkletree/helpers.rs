//! Deterministic data for tests and benchmarks.

use crate::error::Result;
use crate::merkletree::blob::MerkleBlob;
use crate::merkletree::node::KvId;
use crate::utils::codec::decode_be_u64;
use crate::utils::hasher::{hash, Hash32};

/// Key and value ids derived from `seed`.
///
/// Each id is the first 8 bytes of `sha256(2 * seed + offset)`, with the
/// argument encoded as 8 big-endian bytes and `offset` 0 for the key and 1
/// for the value.
pub fn generate_kvid(seed: u64) -> (KvId, KvId) {
    let id = |offset: u64| {
        let digest = hash((2 * seed + offset).to_be_bytes());
        KvId(decode_be_u64(&digest[..8]))
    };
    (id(0), id(1))
}

/// `sha256` of `seed` as 8 big-endian bytes.
pub fn generate_hash(seed: u64) -> Hash32 {
    hash(seed.to_be_bytes())
}

/// Pseudo-random stream seeded by a number, for reproducible workloads.
pub struct SeededStream {
    seed: u64,
    counter: u64,
}

impl SeededStream {
    pub fn new(seed: u64) -> Self {
        Self { seed, counter: 0 }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut input = [0u8; 16];
        input[..8].copy_from_slice(&self.seed.to_be_bytes());
        input[8..].copy_from_slice(&self.counter.to_be_bytes());
        self.counter += 1;
        decode_be_u64(&hash(input)[..8])
    }

    /// A number in `0..bound`. `bound` must be non-zero.
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }

    /// `true` with probability `percent / 100`.
    pub fn chance(&mut self, percent: u64) -> bool {
        self.below(100) < percent
    }
}

/// A blob holding the keys of seeds `0..count`, hashes calculated.
pub fn build_test_blob(count: u64) -> Result<MerkleBlob> {
    let mut blob = MerkleBlob::default();
    for seed in 0..count {
        let (key, value) = generate_kvid(seed);
        blob.insert(key, value, generate_hash(seed))?;
    }
    blob.calculate_lazy_hashes()?;
    Ok(blob)
}
