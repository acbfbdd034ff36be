//! Utility functions for the merkle blob.
//!
//! - Big-endian field encoding
//! - SHA-256 hashing with domain separation

pub mod codec;
pub mod hasher;
