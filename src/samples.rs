//! Flux sample input.
//!
//! Samples are stored as a flat sequence of little-endian 16-bit timer values,
//! one per flux transition.

use alloc::vec::Vec;

use zerocopy::{FromBytes, byteorder::little_endian::U16};

/// Decode little-endian samples from bytes. A trailing odd byte is ignored.
pub fn from_le_bytes(r: &[u8]) -> Vec<u16> {
    let even = &r[..r.len() & !1];

    <[U16]>::ref_from_bytes(even)
        .map(|samples| samples.iter().map(|s| s.get()).collect())
        .unwrap_or_default()
}

/// Encode samples as little-endian bytes.
pub fn to_le_bytes(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
