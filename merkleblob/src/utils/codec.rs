//! Big-endian field helpers for slot payloads.
//!
//! Slot integers are stored big-endian so that a hex dump of the buffer reads
//! in the same order as the field listing in [`crate::def`].

use byteorder::{BigEndian, ByteOrder};

use crate::utils::hasher::Hash32;

/// Decodes a `u32` from the first 4 bytes of `v`.
///
/// # Panics
/// If the input slice is less than 4 bytes long
pub fn decode_be_u32(v: &[u8]) -> u32 {
    BigEndian::read_u32(&v[0..4])
}

/// Decodes a `u64` from the first 8 bytes of `v`.
///
/// # Panics
/// If the input slice is less than 8 bytes long
pub fn decode_be_u64(v: &[u8]) -> u64 {
    BigEndian::read_u64(&v[0..8])
}

pub fn encode_be_u32(v: &mut [u8], n: u32) {
    BigEndian::write_u32(&mut v[0..4], n);
}

pub fn encode_be_u64(v: &mut [u8], n: u64) {
    BigEndian::write_u64(&mut v[0..8], n);
}

/// Copies a 32-byte hash out of `v`.
///
/// # Panics
/// If the input slice is less than 32 bytes long
pub fn decode_hash(v: &[u8]) -> Hash32 {
    let mut h = [0u8; 32];
    h.copy_from_slice(&v[0..32]);
    h
}
