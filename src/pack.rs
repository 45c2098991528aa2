//! Packing of bit decisions into a ring of big-endian words.
//!
//! Bits fill a 32-bit accumulator from the least significant end, so the first
//! bit of each word ends up as its most significant bit. A word is stored the
//! moment its 32nd bit arrives; a partial final word is stored by
//! [`BitPacker::finish`] with its valid bits moved to the top.

use alloc::{vec, vec::Vec};

use thiserror::Error;
use zerocopy::{IntoBytes, byteorder::big_endian::U32};

/// Default ring capacity in words (2 MiB of bitcells).
pub const DEFAULT_CAPACITY_WORDS: usize = 1 << 19;

/// Largest ring capacity whose bit count fits the 32-bit bit counter.
pub const MAX_CAPACITY_WORDS: usize = 1 << 26;

/// An error packing bit decisions.
#[derive(Debug, Error)]
pub enum PackError {
    /// More bits were decoded than the buffer holds.
    #[error("Decoded more bitcells than buffer space ({capacity_bits} bits).")]
    Overflow { capacity_bits: u64 },
    /// Ring capacity must be a non-zero power of two, at most
    /// [`MAX_CAPACITY_WORDS`].
    #[error("Unsupported word buffer capacity ({0}).")]
    Capacity(usize),
}

/// Fixed-capacity ring of big-endian words, addressed by index mask.
#[derive(Debug, Clone)]
pub struct WordBuffer {
    words: Vec<U32>,
    mask: u32,
}

impl WordBuffer {
    /// Allocate a zeroed buffer of `capacity` words.
    pub fn with_capacity(capacity: usize) -> Result<Self, PackError> {
        if !capacity.is_power_of_two() || capacity > MAX_CAPACITY_WORDS {
            Err(PackError::Capacity(capacity))?;
        }

        Ok(Self {
            words: vec![U32::ZERO; capacity],
            mask: (capacity - 1) as u32,
        })
    }

    /// Number of words the ring holds.
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Number of bits the ring holds.
    pub fn capacity_bits(&self) -> u64 {
        self.words.len() as u64 * 32
    }

    fn store(&mut self, index: u32, word: u32) {
        self.words[(index & self.mask) as usize] = U32::new(word);
    }

    /// The word at a (masked) index.
    pub fn word(&self, index: u32) -> u32 {
        self.words[(index & self.mask) as usize].get()
    }

    /// The stored words.
    pub fn words(&self) -> &[U32] {
        &self.words
    }

    /// The stored words, as big-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.words.as_bytes()
    }
}

impl Default for WordBuffer {
    fn default() -> Self {
        Self {
            words: vec![U32::ZERO; DEFAULT_CAPACITY_WORDS],
            mask: DEFAULT_CAPACITY_WORDS as u32 - 1,
        }
    }
}

/// Accumulates bit decisions into a [`WordBuffer`].
#[derive(Debug)]
pub struct BitPacker {
    buffer: WordBuffer,
    data: u32,
    produced: u32,
}

impl BitPacker {
    /// Start packing into an empty buffer.
    pub fn new(buffer: WordBuffer) -> Self {
        Self {
            buffer,
            data: !0,
            produced: 0,
        }
    }

    /// Number of bits pushed so far.
    pub fn bit_count(&self) -> u32 {
        self.produced
    }

    /// Append one bit, storing the current word if it is now full.
    ///
    /// Fails without changing state once the buffer is full.
    pub fn push(&mut self, bit: bool) -> Result<(), PackError> {
        let capacity_bits = self.buffer.capacity_bits();
        if u64::from(self.produced) >= capacity_bits {
            Err(PackError::Overflow { capacity_bits })?;
        }

        self.data = (self.data << 1) | u32::from(bit);
        self.produced += 1;

        if self.produced % 32 == 0 {
            self.buffer.store((self.produced - 1) / 32, self.data);
        }

        Ok(())
    }

    /// Append every bit of an iterator, stopping at the first overflow.
    pub fn extend(&mut self, bits: impl IntoIterator<Item = bool>) -> Result<(), PackError> {
        bits.into_iter().try_for_each(|bit| self.push(bit))
    }

    /// Store any partial final word and release the buffer.
    ///
    /// The valid bits of a partial word occupy its high-order positions, and
    /// the remainder is zero.
    pub fn finish(mut self) -> Track {
        let partial = self.produced % 32;
        if partial != 0 {
            self.buffer
                .store(self.produced / 32, self.data << (32 - partial));
        }

        Track {
            words: self.buffer,
            bit_count: self.produced,
        }
    }
}

/// The packed output of a decode run.
#[derive(Debug, Clone)]
pub struct Track {
    /// Packed bitcells.
    pub words: WordBuffer,
    /// Number of valid bits in `words`.
    pub bit_count: u32,
}

impl Track {
    /// Number of words holding valid bits.
    pub fn word_count(&self) -> usize {
        self.bit_count.div_ceil(32) as usize
    }

    /// Iterate over the valid bits, in decode order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_count).map(|i| self.words.word(i / 32) & (1 << (31 - i % 32)) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packer() -> BitPacker {
        BitPacker::new(WordBuffer::with_capacity(4).unwrap())
    }

    #[test]
    fn partial_word_is_left_aligned() {
        let mut p = packer();
        p.extend([true, true, true]).unwrap();
        let track = p.finish();

        assert_eq!(track.bit_count, 3);
        assert_eq!(track.words.word(0), 0xE000_0000);
    }

    #[test]
    fn full_word_is_stored_big_endian() {
        let mut p = packer();
        for i in 0..32 {
            p.push(i % 4 == 0).unwrap();
        }
        let track = p.finish();

        assert_eq!(track.words.word(0), 0x8888_8888);
        assert_eq!(&track.words.as_bytes()[..4], &[0x88, 0x88, 0x88, 0x88]);
        assert_eq!(track.words.word(1), 0);
    }

    #[test]
    fn zeros_shift_out_initial_ones() {
        let mut p = packer();
        p.extend([false, true]).unwrap();
        assert_eq!(p.finish().words.word(0), 0x4000_0000);
    }

    #[test]
    fn overflow_is_reported() {
        let mut p = BitPacker::new(WordBuffer::with_capacity(1).unwrap());
        p.extend(core::iter::repeat_n(true, 32)).unwrap();

        assert!(matches!(
            p.push(false),
            Err(PackError::Overflow { capacity_bits: 32 })
        ));
        assert_eq!(p.bit_count(), 32);
    }

    #[test]
    fn capacity_must_be_power_of_two() {
        assert!(matches!(
            WordBuffer::with_capacity(3),
            Err(PackError::Capacity(3))
        ));
        assert!(WordBuffer::with_capacity(0).is_err());
    }

    #[test]
    fn bits_round_trip_through_track() {
        let bits = [true, false, false, true, true, false, true];
        let mut p = packer();
        p.extend(bits).unwrap();

        assert!(p.finish().bits().eq(bits));
    }
}
