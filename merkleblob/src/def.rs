//! Core definitions and constants for the merkle blob.
//!
//! This module fixes the on-buffer layout shared by every other module:
//! - Slot geometry (metadata size, payload size, stride)
//! - Field offsets inside a payload
//! - The "no parent" sentinel
//! - Hash domain-separation tags
//!
//! # Slot Layout
//! Each slot is `METADATA_SIZE + DATA_SIZE` bytes, all integers big-endian:
//!
//! ```text
//! metadata: | node_type: u8 | dirty: u8 |
//! leaf:     | parent: u32 | key: u64  | value: u64 | hash: [u8; 32] |
//! internal: | parent: u32 | left: u32 | right: u32 | hash: [u8; 32] | reserved: [u8; 8] |
//! ```
//!
//! Changing any of these constants changes the persisted format.

/// Size in bytes of the per-slot metadata (node type and dirty flag).
pub const METADATA_SIZE: usize = 2;

/// Size in bytes of the per-slot payload, identical for leaves and internal nodes.
pub const DATA_SIZE: usize = 52;

/// Distance in bytes between the starts of two consecutive slots.
pub const SPACING: usize = METADATA_SIZE + DATA_SIZE;

/// Size of a stored hash.
pub const HASH_SIZE: usize = 32;

/// Parent index written into the root slot.
pub const NULL_PARENT: u32 = u32::MAX;

// Offsets inside a payload
pub const PARENT_RANGE: std::ops::Range<usize> = 0..4;
pub const LEFT_RANGE: std::ops::Range<usize> = 4..8;
pub const RIGHT_RANGE: std::ops::Range<usize> = 8..12;
pub const KEY_RANGE: std::ops::Range<usize> = 4..12;
pub const VALUE_RANGE: std::ops::Range<usize> = 12..20;
pub const INTERNAL_HASH_RANGE: std::ops::Range<usize> = 12..44;
pub const LEAF_HASH_RANGE: std::ops::Range<usize> = 20..52;

/// Tag byte prepended when hashing a leaf's key and value digests.
pub const LEAF_HASH_TAG: u8 = 1;

/// Tag byte prepended when hashing two child hashes into their parent.
pub const INTERNAL_HASH_TAG: u8 = 2;

/// Lineage length bound the insertion policy is expected to keep for
/// pseudo-random workloads of a few hundred thousand operations.
pub const EXPECTED_MAX_LINEAGE: usize = 25;

/// Slots reserved up front by [`crate::config::Config::default`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Stale split-queue entries may outnumber live ones by this factor
/// before the queue is rebuilt.
pub const DEFAULT_SPLIT_QUEUE_COMPACT_RATIO: usize = 2;

/// Minimum queue length below which the split queue is never compacted.
pub const SPLIT_QUEUE_COMPACT_FLOOR: usize = 64;
