//! Precomputed mask tables shared by the writer and the reader.
//!
//! All tables are built in const evaluation, making them immutable
//! process-wide state with no initialization ordering to worry about.
//! Indices are bounded by construction: start bits span `0..32` and
//! bit counts span `0..=32`.

/// Masks of the bits to *preserve* when overwriting `len` bits of a
/// 32-bit word starting at bit `start`.
///
/// Bits below `start` and bits at or above `start + len` survive the
/// store; everything in between belongs to the incoming value.
pub(crate) static BIT_WRITE_MASKS: [[u32; 33]; 32] = bit_write_masks();

/// Masks isolating the low `len` bits of a word, for `len` in `0..=32`.
pub(crate) static EXTRA_MASKS: [u32; 33] = extra_masks();

/// One-hot words in the bit order of the little-endian word view.
pub(crate) static SINGLE_BITS: [u32; 32] = single_bits();

const fn bit_write_masks() -> [[u32; 33]; 32] {
    let mut table = [[0u32; 33]; 32];

    let mut start = 0;
    while start < 32 {
        let mut len = 0;
        while len <= 32 {
            let end = start + len;
            let mut mask = (1u32 << start) - 1;
            if end < 32 {
                mask |= !((1u32 << end) - 1);
            }

            table[start][len] = mask;
            len += 1;
        }

        start += 1;
    }

    table
}

const fn extra_masks() -> [u32; 33] {
    let mut table = [0u32; 33];

    let mut len = 0;
    while len < 32 {
        table[len] = (1u32 << len) - 1;
        len += 1;
    }
    table[32] = !0;

    table
}

const fn single_bits() -> [u32; 32] {
    let mut table = [0u32; 32];

    let mut bit = 0;
    while bit < 32 {
        table[bit] = 1 << bit;
        bit += 1;
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_masks_preserve_surrounding_bits() {
        // Overwriting 4 bits at offset 2 keeps bits 0-1 and 6-31.
        assert_eq!(BIT_WRITE_MASKS[2][4], !(0b1111 << 2));
        // A span reaching bit 32 only preserves the low bits.
        assert_eq!(BIT_WRITE_MASKS[8][24], 0xFF);
        assert_eq!(BIT_WRITE_MASKS[0][32], 0);
        // Zero-length writes preserve the entire word.
        assert_eq!(BIT_WRITE_MASKS[7][0], !0);
    }

    #[test]
    fn extra_masks_isolate_low_bits() {
        assert_eq!(EXTRA_MASKS[0], 0);
        assert_eq!(EXTRA_MASKS[1], 1);
        assert_eq!(EXTRA_MASKS[7], 0x7F);
        assert_eq!(EXTRA_MASKS[32], u32::MAX);
    }
}
