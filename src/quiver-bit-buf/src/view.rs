//! A little-endian 32-bit word view over byte slices.
//!
//! All multi-bit accesses in this crate go through these helpers so
//! that endianness conversion happens in exactly one place and bounds
//! are checked against the slice instead of raw pointers.

use byteorder::{ByteOrder, LittleEndian};

/// Loads the 32-bit little-endian word at word index `index`.
///
/// A partial trailing word reads as if it were zero-padded to full
/// width, which lets readers span buffers whose length is not a
/// multiple of the word size.
#[inline]
pub(crate) fn load(data: &[u8], index: usize) -> u32 {
    let offset = index << 2;
    match data.get(offset..offset + 4) {
        Some(word) => LittleEndian::read_u32(word),
        None => {
            let mut word = [0; 4];
            let tail = &data[offset.min(data.len())..];
            word[..tail.len()].copy_from_slice(tail);
            LittleEndian::read_u32(&word)
        }
    }
}

/// Stores a 32-bit word in little-endian order at word index `index`.
///
/// Writer buffers are truncated to a multiple of the word size when
/// bound, so a full word is always addressable here.
#[inline]
pub(crate) fn store(data: &mut [u8], index: usize, value: u32) {
    let offset = index << 2;
    LittleEndian::write_u32(&mut data[offset..offset + 4], value);
}

/// Shifts `value` left by `shift`, yielding 0 once the shift reaches
/// the full word width.
#[inline]
pub(crate) fn shl_capped(value: u32, shift: u32) -> u32 {
    if shift >= u32::BITS {
        0
    } else {
        value << shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tail_reads_zero_padded() {
        let data = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
        assert_eq!(load(&data, 0), 0xDDCC_BBAA);
        assert_eq!(load(&data, 1), 0x0000_FFEE);
    }

    #[test]
    fn capped_shift_saturates() {
        assert_eq!(shl_capped(0xDEAD_BEEF, 0), 0xDEAD_BEEF);
        assert_eq!(shl_capped(1, 31), 0x8000_0000);
        assert_eq!(shl_capped(u32::MAX, 32), 0);
    }
}
