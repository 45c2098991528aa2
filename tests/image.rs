#![cfg(feature = "std")]

use fluxcell::{
    hfe::{self, ImageError, track_offset},
    pack::{BitPacker, Track, WordBuffer},
};

fn pack(bits: impl IntoIterator<Item = bool>) -> Track {
    let mut packer = BitPacker::new(WordBuffer::with_capacity(1 << 10).unwrap());
    packer.extend(bits).unwrap();
    packer.finish()
}

/// Bits of each byte, most significant first.
fn bytes_to_bits(bytes: impl IntoIterator<Item = u8>) -> impl Iterator<Item = bool> {
    bytes
        .into_iter()
        .flat_map(|byte| (0..8).rev().map(move |i| byte & (1 << i) != 0))
}

#[test]
fn header_fields() {
    let image = hfe::serialize(&pack([true, true, true]), 250).unwrap();

    assert_eq!(&image[0..8], b"HXCPICFE");
    assert_eq!(
        &image[8..20],
        &[0x00, 0x01, 0x01, 0xff, 0xfa, 0x00, 0x00, 0x00, 0x07, 0x00, 0x01, 0x00]
    );
    assert!(image[20..0x200].iter().all(|&b| b == 0));
}

#[test]
fn track_list_counts_both_sides() {
    let image = hfe::serialize(&pack([true, true, true]), 500).unwrap();

    // One word of track data, doubled.
    assert_eq!(&image[0x200..0x204], &[0x02, 0x00, 0x08, 0x00]);
    assert!(image[0x204..0x400].iter().all(|&b| b == 0));
}

#[test]
fn partial_word_is_written_whole() {
    let image = hfe::serialize(&pack([true, true, true]), 500).unwrap();

    assert_eq!(image.len(), 0x404);
    assert_eq!(&image[0x400..], &[0x07, 0x00, 0x00, 0x00]);
}

#[test]
fn bytes_are_bit_reversed() {
    let track = pack((0..32).map(|i| i % 4 == 0));
    let image = hfe::serialize(&track, 500).unwrap();

    assert_eq!(&image[0x202..0x204], &[0x08, 0x00]);
    assert_eq!(&image[0x400..], &[0x11; 4]);
}

#[test]
fn side_one_halves_are_skipped() {
    let bytes = (0..320u32).map(|i| i as u8).collect::<Vec<_>>();
    let image = hfe::serialize(&pack(bytes_to_bits(bytes.iter().copied())), 500).unwrap();

    // 80 words, doubled.
    assert_eq!(&image[0x202..0x204], &[0x80, 0x02]);
    assert_eq!(image.len(), 0x640);

    for (i, byte) in bytes.iter().enumerate() {
        assert_eq!(image[track_offset(i)], byte.reverse_bits());
    }

    assert!(image[0x500..0x600].iter().all(|&b| b == 0));
    assert_eq!(image[0x600], 0);
    assert_eq!(image[0x601], 1u8.reverse_bits());
}

#[test]
fn empty_track_has_no_data() {
    let image = hfe::serialize(&pack([]), 500).unwrap();

    assert_eq!(image.len(), 0x204);
    assert_eq!(&image[0x200..0x204], &[0x02, 0x00, 0x00, 0x00]);
}

#[test]
fn track_length_must_fit_list_entry() {
    let fits = Track {
        words: WordBuffer::with_capacity(1 << 13).unwrap(),
        bit_count: 8191 * 32,
    };
    let image = hfe::serialize(&fits, 500).unwrap();
    assert_eq!(&image[0x202..0x204], &65528u16.to_le_bytes());

    let too_long = Track {
        words: WordBuffer::with_capacity(1 << 13).unwrap(),
        bit_count: 8192 * 32,
    };
    assert!(matches!(
        hfe::serialize(&too_long, 500),
        Err(ImageError::TrackTooLong(32768))
    ));
}

#[test]
fn bit_count_must_fit_buffer() {
    let overfull = Track {
        words: WordBuffer::with_capacity(1).unwrap(),
        bit_count: 64,
    };

    assert!(matches!(
        hfe::serialize(&overfull, 500),
        Err(ImageError::BitCount {
            bit_count: 64,
            capacity_bits: 32,
        })
    ));
}
