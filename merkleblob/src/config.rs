//! Configuration for a [`MerkleBlob`](crate::MerkleBlob).
//!
//! None of these settings change the persisted format; two blobs built with
//! different configurations produce byte-compatible buffers.
//!
//! - `initial_capacity`: slots reserved in the buffer up front
//!   - Avoids reallocation while a freshly created tree grows
//! - `verify_on_load`: run the full integrity check after rebuilding a
//!   blob from bytes
//!   - Loading becomes O(n) hash work instead of O(n) pointer work
//! - `split_queue_compact_ratio`: how many stale split-queue entries per
//!   live leaf are tolerated before the queue is rebuilt
//!
//! # Usage Examples
//! ```
//! use merkleblob::config::Config;
//!
//! let config = Config::default();
//! assert!(!config.verify_on_load);
//!
//! let checked = Config::verified();
//! assert!(checked.verify_on_load);
//! ```

use crate::def::{DEFAULT_INITIAL_CAPACITY, DEFAULT_SPLIT_QUEUE_COMPACT_RATIO};

#[derive(Debug, Clone)]
pub struct Config {
    /// Number of slots to reserve when the buffer is created.
    pub initial_capacity: usize,

    /// Whether [`MerkleBlob::with_config`](crate::MerkleBlob::with_config)
    /// verifies parent links, hashes and dirty flags of a loaded buffer.
    pub verify_on_load: bool,

    /// Stale entries allowed per live entry in the split queue before it
    /// is compacted. Values below 1 are treated as 1.
    pub split_queue_compact_ratio: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            verify_on_load: false,
            split_queue_compact_ratio: DEFAULT_SPLIT_QUEUE_COMPACT_RATIO,
        }
    }
}

impl Config {
    pub fn new(
        initial_capacity: usize,
        verify_on_load: bool,
        split_queue_compact_ratio: usize,
    ) -> Self {
        Self {
            initial_capacity,
            verify_on_load,
            split_queue_compact_ratio: split_queue_compact_ratio.max(1),
        }
    }

    /// Default configuration with integrity verification on load.
    pub fn verified() -> Self {
        Self {
            verify_on_load: true,
            ..Self::default()
        }
    }

    /// Default configuration reserving room for `leaf_count` leaves.
    pub fn with_capacity_for(leaf_count: usize) -> Self {
        Self {
            initial_capacity: (2 * leaf_count).saturating_sub(1),
            ..Self::default()
        }
    }
}
