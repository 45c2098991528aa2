//! Single-track HFE images.
//!
//! An HFE file is laid out in 512-byte blocks. Block 0 holds the [`FileHeader`],
//! block 1 the track list, and track data starts at block 2. Track data is
//! interleaved by side: each block carries 256 bytes for side 0 followed by 256
//! bytes for side 1. Only side 0 is written here; the side 1 halves are left
//! zero. Bits are stored least significant first within each byte.

use alloc::{vec, vec::Vec};

use thiserror::Error;
use zerocopy::{Immutable, IntoBytes, KnownLayout, byteorder::little_endian::U16};

use crate::pack::Track;

/// Size of an image block.
pub const BLOCK_SIZE: usize = 512;

/// Bytes of one side's track data per block.
pub const SIDE_CHUNK: usize = BLOCK_SIZE / 2;

/// File signature.
pub const SIGNATURE: [u8; 8] = *b"HXCPICFE";

/// Block holding the track list.
pub const TRACK_LIST_BLOCK: u16 = 1;

/// Block where track data starts.
pub const TRACK_DATA_BLOCK: u16 = 2;

/// Track encoding left unspecified.
pub const ENCODING_UNKNOWN: u8 = 0xff;

/// Generic Shugart double-density floppy interface.
pub const INTERFACE_GENERIC_SHUGART_DD: u8 = 0x07;

/// An error laying out an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Track data ({0} bytes) too long for a single track.")]
    TrackTooLong(usize),
    #[error("Track claims {bit_count} bits but its buffer holds {capacity_bits}.")]
    BitCount { bit_count: u32, capacity_bits: u64 },
}

#[repr(C)]
#[derive(Debug, Clone, IntoBytes, Immutable, KnownLayout)]
pub struct FileHeader {
    pub signature: [u8; 8],
    pub format_revision: u8,
    pub track_count: u8,
    pub side_count: u8,
    pub track_encoding: u8,
    pub bitrate_kbps: U16,
    pub rpm: U16,
    pub interface_mode: u8,
    pub reserved: u8,
    /// In blocks.
    pub track_list_offset: U16,
}

impl FileHeader {
    /// Header of a one-track, one-sided image.
    pub fn new(bitrate_kbps: u16) -> Self {
        Self {
            signature: SIGNATURE,
            format_revision: 0,
            track_count: 1,
            side_count: 1,
            track_encoding: ENCODING_UNKNOWN,
            bitrate_kbps: U16::new(bitrate_kbps),
            rpm: U16::ZERO,
            interface_mode: INTERFACE_GENERIC_SHUGART_DD,
            reserved: 0,
            track_list_offset: U16::new(TRACK_LIST_BLOCK),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, IntoBytes, Immutable, KnownLayout)]
pub struct TrackEntry {
    /// In blocks.
    pub offset: U16,
    /// In bytes, counting both sides.
    pub length: U16,
}

/// File offset of byte `index` of side 0's track data.
pub fn track_offset(index: usize) -> usize {
    usize::from(TRACK_DATA_BLOCK) * BLOCK_SIZE
        + index / SIDE_CHUNK * BLOCK_SIZE
        + index % SIDE_CHUNK
}

/// Lay out `track` as a complete image file.
///
/// Track data covers every word holding a valid bit, and the file ends after
/// the last track byte.
pub fn serialize(track: &Track, bitrate_kbps: u16) -> Result<Vec<u8>, ImageError> {
    let data = track
        .words
        .as_bytes()
        .get(..track.word_count() * 4)
        .ok_or(ImageError::BitCount {
            bit_count: track.bit_count,
            capacity_bits: track.words.capacity_bits(),
        })?;

    let length = data
        .len()
        .checked_mul(2)
        .and_then(|length| u16::try_from(length).ok())
        .ok_or(ImageError::TrackTooLong(data.len()))?;

    let entry = TrackEntry {
        offset: U16::new(TRACK_DATA_BLOCK),
        length: U16::new(length),
    };

    let list = usize::from(TRACK_LIST_BLOCK) * BLOCK_SIZE;
    let end = match data.len() {
        0 => list + size_of::<TrackEntry>(),
        len => track_offset(len - 1) + 1,
    };

    let mut image = vec![0; end];
    image[..size_of::<FileHeader>()].copy_from_slice(FileHeader::new(bitrate_kbps).as_bytes());
    image[list..list + size_of::<TrackEntry>()].copy_from_slice(entry.as_bytes());

    for (index, byte) in data.iter().enumerate() {
        image[track_offset(index)] = byte.reverse_bits();
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_twenty_bytes() {
        assert_eq!(size_of::<FileHeader>(), 20);
        assert_eq!(size_of::<TrackEntry>(), 4);
    }

    #[test]
    fn offsets_skip_side_one() {
        assert_eq!(track_offset(0), 0x400);
        assert_eq!(track_offset(255), 0x4ff);
        assert_eq!(track_offset(256), 0x600);
        assert_eq!(track_offset(512), 0x800);
    }
}
