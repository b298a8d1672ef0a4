//! Miscellaneous utilities for working with bits.

/// The most bytes a varint-encoded `u32` can occupy.
pub const MAX_VARINT32_BYTES: usize = 5;

/// The most bytes a varint-encoded `u64` can occupy.
pub const MAX_VARINT64_BYTES: usize = 10;

/// Sign-extends an `nbits` wide value to [`i32`].
///
/// `nbits` must be in `1..=32`.
#[inline]
pub fn sign_extend(value: u32, nbits: u32) -> i32 {
    debug_assert!((1..=u32::BITS).contains(&nbits));

    let shift = u32::BITS - nbits;
    ((value << shift) as i32) >> shift
}

/// Maps a signed integer into the unsigned domain such that small
/// magnitudes of either sign encode as small values.
///
/// The result is even exactly when the input is non-negative.
#[inline]
pub fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// The inverse of [`zigzag_encode32`].
#[inline]
pub fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Maps a signed 64-bit integer into the unsigned domain; see
/// [`zigzag_encode32`].
#[inline]
pub fn zigzag_encode64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// The inverse of [`zigzag_encode64`].
#[inline]
pub fn zigzag_decode64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Computes the number of bytes the varint encoding of `value` occupies.
#[inline]
pub fn varint32_size(mut value: u32) -> usize {
    let mut size = 1;
    while value > 0x7F {
        size += 1;
        value >>= 7;
    }
    size
}

/// Computes the number of bytes the varint encoding of `value` occupies.
#[inline]
pub fn varint64_size(mut value: u64) -> usize {
    let mut size = 1;
    while value > 0x7F {
        size += 1;
        value >>= 7;
    }
    size
}
