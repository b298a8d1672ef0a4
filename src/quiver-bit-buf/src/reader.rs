//! The reading half of the bit-level codec.

use byteorder::{ByteOrder, LittleEndian};
use quiver_utils::hints::cold_path;

use crate::{
    coord::*,
    masks::{EXTRA_MASKS, SINGLE_BITS},
    utils, view, Error,
};

/// A sequential bit-level reader over a borrowed byte buffer, the dual
/// of [`crate::BitWriter`].
///
/// Reads must be issued with the same widths and in the same order as
/// the writes that produced the buffer. Reading past the declared
/// capacity returns zero-valued bits, clamps the cursor and sets a
/// sticky overflow flag; subsequent reads keep returning zeroes rather
/// than aborting, so a corrupt stream degrades gracefully and the
/// caller decides when to give up by inspecting
/// [`Self::is_overflowed`].
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],

    capacity_bits: usize,

    // Next bit offset to read. Always `<= capacity_bits`.
    cursor: usize,

    overflowed: bool,
    assert_on_overflow: bool,
    debug_name: Option<&'static str>,
}

impl<'a> BitReader<'a> {
    /// Creates a new [`BitReader`] over the given bytes with the full
    /// byte length readable.
    pub fn new(data: &'a [u8]) -> Self {
        let bits = data.len() << 3;
        Self::with_capacity_bits(data, bits)
    }

    /// Creates a new [`BitReader`] with an explicit bit capacity for
    /// buffers whose final byte is only partially valid.
    pub fn with_capacity_bits(data: &'a [u8], capacity_bits: usize) -> Self {
        debug_assert!(capacity_bits <= data.len() << 3);

        Self {
            data,
            capacity_bits,
            cursor: 0,
            overflowed: false,
            assert_on_overflow: false,
            debug_name: None,
        }
    }

    /// Creates a new [`BitReader`] carrying a debug label for
    /// diagnostics. The label has no effect on decoding.
    pub fn named(debug_name: &'static str, data: &'a [u8]) -> Self {
        let mut reader = Self::new(data);
        reader.debug_name = Some(debug_name);
        reader
    }

    /// Gets the declared capacity of this reader in bits.
    #[inline]
    pub fn capacity_bits(&self) -> usize {
        self.capacity_bits
    }

    /// Gets the length of the bound buffer in bytes.
    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.data.len()
    }

    /// Gets the number of bits consumed so far.
    #[inline]
    pub fn bits_read(&self) -> usize {
        self.cursor
    }

    /// Gets the number of bits still available for reading.
    #[inline]
    pub fn bits_left(&self) -> usize {
        self.capacity_bits - self.cursor
    }

    /// Whether a read has attempted to move past the bit capacity
    /// since the last [`Self::reset`].
    #[inline]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Rewinds the cursor to the start and clears the overflow flag.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.overflowed = false;
    }

    /// Moves the cursor to an absolute bit position, reporting whether
    /// the position was within capacity.
    pub fn seek_to(&mut self, bit: usize) -> bool {
        if bit > self.capacity_bits {
            self.overflow();
            return false;
        }

        self.cursor = bit;
        true
    }

    /// Moves the cursor relative to its current position.
    pub fn seek_relative(&mut self, bits: i64) -> bool {
        let target = self.cursor as i64 + bits;
        if target < 0 {
            self.overflow();
            return false;
        }

        self.seek_to(target as usize)
    }

    /// Attaches a debug label for diagnostics.
    pub fn set_debug_name(&mut self, debug_name: &'static str) {
        self.debug_name = Some(debug_name);
    }

    /// Gets the debug label, if one was set.
    pub fn debug_name(&self) -> Option<&'static str> {
        self.debug_name
    }

    /// When set, overflows additionally trip a debug assertion. The
    /// production behavior is always flag-and-continue.
    pub fn set_assert_on_overflow(&mut self, assert: bool) {
        self.assert_on_overflow = assert;
    }

    #[cold]
    fn overflow(&mut self) {
        if !self.overflowed {
            self.overflowed = true;
            log::warn!(
                "bit reader '{}' overran its capacity of {} bits",
                self.debug_name.unwrap_or("<unnamed>"),
                self.capacity_bits
            );
        }

        self.cursor = self.capacity_bits;
        crate::raise_fault(Error::Overflow, self.debug_name);
        debug_assert!(!self.assert_on_overflow, "bit reader overflow");
    }

    fn fault(&mut self, error: Error) {
        self.overflowed = true;
        crate::raise_fault(error, self.debug_name);
    }

    /// Reads `nbits` bits (0 to 32) as an unsigned value, advancing the
    /// cursor. Returns 0 and flags overflow when the run would pass the
    /// end of the buffer.
    #[inline]
    pub fn read_unsigned_bits(&mut self, nbits: u32) -> u32 {
        debug_assert!(nbits <= u32::BITS);

        if self.bits_left() < nbits as usize {
            cold_path();
            self.overflow();
            return 0;
        }
        if nbits == 0 {
            return 0;
        }

        let start = (self.cursor & 31) as u32;
        let word = self.cursor >> 5;
        let last_word = (self.cursor + nbits as usize - 1) >> 5;
        self.cursor += nbits as usize;

        let low = view::load(self.data, word) >> start;
        let high = if last_word != word {
            // Straddling runs pull the rest from the following word;
            // `start` is nonzero here, keeping the shift in range.
            view::load(self.data, last_word) << (u32::BITS - start)
        } else {
            0
        };

        (low | high) & EXTRA_MASKS[nbits as usize]
    }

    /// Reads `nbits` bits (1 to 32) as a signed value, extending the
    /// top bit of the field.
    #[inline]
    pub fn read_signed_bits(&mut self, nbits: u32) -> i32 {
        utils::sign_extend(self.read_unsigned_bits(nbits), nbits)
    }

    /// Reads a single bit.
    #[inline]
    pub fn read_one_bit(&mut self) -> bool {
        if self.bits_left() < 1 {
            cold_path();
            self.overflow();
            return false;
        }

        let bit = view::load(self.data, self.cursor >> 5) & SINGLE_BITS[self.cursor & 31] != 0;
        self.cursor += 1;

        bit
    }

    /// Reads `nbits` bits without moving the cursor or disturbing the
    /// overflow flag.
    pub fn peek_unsigned_bits(&mut self, nbits: u32) -> u32 {
        let cursor = self.cursor;
        let overflowed = self.overflowed;

        let value = self.read_unsigned_bits(nbits);
        self.cursor = cursor;
        self.overflowed = overflowed;

        value
    }

    /// Bulk-copies `nbits` bits into `dst`, the mirror of
    /// [`crate::BitWriter::write_bits`]. A run past capacity
    /// zero-fills the remainder and flags overflow.
    pub fn read_bits(&mut self, dst: &mut [u8], nbits: usize) {
        debug_assert!(nbits <= dst.len() << 3);

        let mut remaining = nbits;
        let mut offset = 0;

        // Whole bytes collapse to a memcpy while the cursor is
        // byte-aligned and the run stays in range.
        if self.cursor & 7 == 0 && remaining >= 8 && self.bits_left() >= remaining {
            let nbytes = remaining >> 3;
            let start = self.cursor >> 3;

            dst[..nbytes].copy_from_slice(&self.data[start..start + nbytes]);
            offset = nbytes;
            remaining &= 7;
            self.cursor += nbytes << 3;
        }

        while remaining >= 32 {
            let word = self.read_unsigned_bits(u32::BITS);
            LittleEndian::write_u32(&mut dst[offset..offset + 4], word);

            offset += 4;
            remaining -= 32;
        }
        while remaining >= 8 {
            dst[offset] = self.read_unsigned_bits(u8::BITS) as u8;

            offset += 1;
            remaining -= 8;
        }

        if remaining > 0 {
            dst[offset] = self.read_unsigned_bits(remaining as u32) as u8;
        }
    }

    /// Bulk-reads up to `nbits` bits, clamping oversized runs to the
    /// destination and skipping the excess so the stream stays in
    /// sync. Returns the number of bits actually copied.
    pub fn read_bits_clamped(&mut self, dst: &mut [u8], nbits: usize) -> usize {
        let available = dst.len() << 3;
        let mut copied = nbits;
        if copied > available {
            log::warn!(
                "oversized bit run of {nbits} bits clamped to a {available} bit destination"
            );
            copied = available;
        }

        self.read_bits(dst, copied);
        self.seek_relative((nbits - copied) as i64);

        copied
    }

    /// Reads whole bytes into `dst`.
    #[inline]
    pub fn read_bytes(&mut self, dst: &mut [u8]) {
        self.read_bits(dst, dst.len() << 3);
    }

    /// Reads a NUL-terminated string into `dst`, stopping early at a
    /// newline when `line_mode` is set.
    ///
    /// Characters beyond `dst.len() - 1` are consumed off the stream
    /// but dropped; that case reports [`Error::Truncated`] through the
    /// fault hook and the return value. `dst` always ends up
    /// NUL-terminated. On success, returns the string length in bytes.
    pub fn read_str(&mut self, dst: &mut [u8], line_mode: bool) -> Result<usize, Error> {
        debug_assert!(!dst.is_empty());

        let mut truncated = false;
        let mut len = 0;
        loop {
            // Overflow reads as 0 and terminates the loop.
            let value = self.read_unsigned_bits(u8::BITS) as u8;
            if value == 0 || (line_mode && value == b'\n') {
                break;
            }

            if len < dst.len() - 1 {
                dst[len] = value;
                len += 1;
            } else {
                truncated = true;
            }
        }
        dst[len] = 0;

        if truncated {
            self.fault(Error::Truncated);
            return Err(Error::Truncated);
        }
        if self.overflowed {
            return Err(Error::Overflow);
        }

        Ok(len)
    }

    /// Reads a NUL-terminated string into an owned buffer, replacing
    /// invalid UTF-8 sequences.
    pub fn read_string(&mut self, line_mode: bool) -> String {
        let mut bytes = Vec::new();
        loop {
            let value = self.read_unsigned_bits(u8::BITS) as u8;
            if value == 0 || (line_mode && value == b'\n') {
                break;
            }

            bytes.push(value);
        }

        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Reads a varint-encoded unsigned 32-bit integer.
    ///
    /// Decoding stops after [`utils::MAX_VARINT32_BYTES`] bytes even if
    /// the continuation bit is still set, returning the partial
    /// accumulation and reporting [`Error::MalformedVarint`]; corrupt
    /// input can never loop unboundedly.
    pub fn read_var_u32(&mut self) -> u32 {
        let mut result = 0;
        for count in 0..utils::MAX_VARINT32_BYTES {
            let byte = self.read_unsigned_bits(u8::BITS);
            result |= (byte & 0x7F) << (7 * count);

            if byte & 0x80 == 0 {
                return result;
            }
        }

        cold_path();
        log::warn!("varint overran {} bytes; truncating", utils::MAX_VARINT32_BYTES);
        self.fault(Error::MalformedVarint);

        result
    }

    /// Reads a varint-encoded unsigned 64-bit integer; see
    /// [`Self::read_var_u32`].
    pub fn read_var_u64(&mut self) -> u64 {
        let mut result = 0;
        for count in 0..utils::MAX_VARINT64_BYTES {
            let byte = self.read_unsigned_bits(u8::BITS) as u64;
            result |= (byte & 0x7F) << (7 * count);

            if byte & 0x80 == 0 {
                return result;
            }
        }

        cold_path();
        log::warn!("varint overran {} bytes; truncating", utils::MAX_VARINT64_BYTES);
        self.fault(Error::MalformedVarint);

        result
    }

    /// Reads a zig-zag coded signed 32-bit varint.
    #[inline]
    pub fn read_var_i32(&mut self) -> i32 {
        utils::zigzag_decode32(self.read_var_u32())
    }

    /// Reads a zig-zag coded signed 64-bit varint.
    #[inline]
    pub fn read_var_i64(&mut self) -> i64 {
        utils::zigzag_decode64(self.read_var_u64())
    }

    /// Reads an integer written by [`crate::BitWriter::write_ubitvar`].
    pub fn read_ubitvar(&mut self) -> u32 {
        let nbits = match self.read_unsigned_bits(2) {
            0 => 4,
            1 => 8,
            2 => 12,
            _ => 32,
        };

        self.read_unsigned_bits(nbits)
    }

    /// Reads a fixed-point world coordinate written by
    /// [`crate::BitWriter::write_coord`].
    pub fn read_coord(&mut self) -> f32 {
        let has_int = self.read_one_bit();
        let has_fract = self.read_one_bit();
        if !has_int && !has_fract {
            return 0.0;
        }

        let sign = self.read_one_bit();
        let int_val = if has_int {
            self.read_unsigned_bits(COORD_INTEGER_BITS) + 1
        } else {
            0
        };
        let fract_val = if has_fract {
            self.read_unsigned_bits(COORD_FRACTIONAL_BITS)
        } else {
            0
        };

        let value = int_val as f32 + fract_val as f32 * COORD_RESOLUTION;
        if sign {
            -value
        } else {
            value
        }
    }

    /// Reads a compact multiplayer coordinate. The
    /// `integral`/`low_precision` modes must match the writer's.
    pub fn read_coord_mp(&mut self, integral: bool, low_precision: bool) -> f32 {
        let flags = self.read_unsigned_bits(if integral { 2 } else { 3 });

        if integral {
            if flags & COORD_MP_HAS_INT == 0 {
                return 0.0;
            }

            // Sign travels as the lowest payload bit in this mode.
            let nbits = coord_mp_integer_bits(flags & COORD_MP_IN_BOUNDS != 0) + 1;
            let bits = self.read_unsigned_bits(nbits);
            let int_val = (bits >> 1) as i32 + 1;

            return if bits & 1 != 0 {
                -(int_val as f32)
            } else {
                int_val as f32
            };
        }

        let fract_bits = coord_mp_fractional_bits(low_precision);
        let resolution = if low_precision {
            COORD_RESOLUTION_LOWPRECISION
        } else {
            COORD_RESOLUTION
        };

        let mut int_val = 0;
        let fract_val;
        if flags & COORD_MP_HAS_INT != 0 {
            let int_bits = coord_mp_integer_bits(flags & COORD_MP_IN_BOUNDS != 0);
            let bits = self.read_unsigned_bits(int_bits + fract_bits);

            int_val = (bits & ((1 << int_bits) - 1)) + 1;
            fract_val = bits >> int_bits;
        } else {
            fract_val = self.read_unsigned_bits(fract_bits);
        }

        let value = int_val as f32 + fract_val as f32 * resolution;
        if flags & COORD_MP_SIGN != 0 {
            -value
        } else {
            value
        }
    }

    /// Reads an `nbits` wide angle back into degrees.
    pub fn read_angle(&mut self, nbits: u32) -> f32 {
        debug_assert!((1..u32::BITS).contains(&nbits));

        let turns = 1u32 << nbits;
        self.read_unsigned_bits(nbits) as f32 * (360.0 / turns as f32)
    }

    /// Reads one component of a unit normal.
    pub fn read_normal(&mut self) -> f32 {
        let sign = self.read_one_bit();
        let fract_val = self.read_unsigned_bits(NORMAL_FRACTIONAL_BITS);

        let value = fract_val as f32 * NORMAL_RESOLUTION;
        if sign {
            -value
        } else {
            value
        }
    }

    /// Reads a position vector written by
    /// [`crate::BitWriter::write_vec3_coord`].
    pub fn read_vec3_coord(&mut self) -> Vec3 {
        let has_x = self.read_one_bit();
        let has_y = self.read_one_bit();
        let has_z = self.read_one_bit();

        let mut value = Vec3::default();
        if has_x {
            value.x = self.read_coord();
        }
        if has_y {
            value.y = self.read_coord();
        }
        if has_z {
            value.z = self.read_coord();
        }

        value
    }

    /// Reads a unit normal, reconstructing the Z magnitude from the
    /// unit length constraint. Only valid for vectors that were unit
    /// length on the writing side.
    pub fn read_vec3_normal(&mut self) -> Vec3 {
        let has_x = self.read_one_bit();
        let has_y = self.read_one_bit();

        let x = if has_x { self.read_normal() } else { 0.0 };
        let y = if has_y { self.read_normal() } else { 0.0 };
        let z_negative = self.read_one_bit();

        let sum = x * x + y * y;
        let z = if sum < 1.0 { (1.0 - sum).sqrt() } else { 0.0 };

        Vec3::new(x, y, if z_negative { -z } else { z })
    }

    /// Reads an Euler angle triple written by
    /// [`crate::BitWriter::write_angles`].
    #[inline]
    pub fn read_angles(&mut self) -> Vec3 {
        self.read_vec3_coord()
    }

    /// Reads an unsigned byte.
    #[inline]
    pub fn read_u8(&mut self) -> u8 {
        self.read_unsigned_bits(u8::BITS) as u8
    }

    /// Reads a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> i8 {
        self.read_signed_bits(u8::BITS) as i8
    }

    /// Reads an unsigned 16-bit integer.
    #[inline]
    pub fn read_u16(&mut self) -> u16 {
        self.read_unsigned_bits(u16::BITS) as u16
    }

    /// Reads a signed 16-bit integer.
    #[inline]
    pub fn read_i16(&mut self) -> i16 {
        self.read_signed_bits(u16::BITS) as i16
    }

    /// Reads an unsigned 32-bit integer.
    #[inline]
    pub fn read_u32(&mut self) -> u32 {
        self.read_unsigned_bits(u32::BITS)
    }

    /// Reads a signed 32-bit integer.
    #[inline]
    pub fn read_i32(&mut self) -> i32 {
        self.read_signed_bits(u32::BITS)
    }

    /// Reads a signed 64-bit integer from its low and high halves.
    pub fn read_i64(&mut self) -> i64 {
        let low = self.read_unsigned_bits(u32::BITS) as u64;
        let high = self.read_unsigned_bits(u32::BITS) as u64;

        (low | (high << 32)) as i64
    }

    /// Reads a float from its raw bit pattern.
    #[inline]
    pub fn read_f32(&mut self) -> f32 {
        f32::from_bits(self.read_unsigned_bits(u32::BITS))
    }

    /// Compares `nbits` bits starting at `offset` in this buffer with
    /// `nbits` bits starting at `other_offset` in `other`, without
    /// touching either cursor.
    ///
    /// Returns 0 when the ranges are bit-identical. Ranges that would
    /// pass either buffer's capacity count as differing. Offsets need
    /// not be aligned to anything.
    pub fn compare_bits_at(
        &self,
        offset: usize,
        other: &BitReader<'_>,
        other_offset: usize,
        nbits: usize,
    ) -> u32 {
        if nbits == 0 {
            return 0;
        }
        if offset + nbits > self.capacity_bits || other_offset + nbits > other.capacity_bits {
            return 1;
        }

        let start1 = (offset & 31) as u32;
        let start2 = (other_offset & 31) as u32;
        let mut word1 = offset >> 5;
        let mut word2 = other_offset >> 5;
        let end1 = (offset + nbits - 1) >> 5;
        let end2 = (other_offset + nbits - 1) >> 5;

        // Shift both sides into alignment a word at a time and XOR
        // them together; any surviving bit is a difference.
        let mut remaining = nbits;
        while remaining > 32 {
            let mut x = view::load(self.data, word1) >> start1;
            x ^= view::shl_capped(view::load(self.data, word1 + 1), u32::BITS - start1);
            x ^= view::load(other.data, word2) >> start2;
            x ^= view::shl_capped(view::load(other.data, word2 + 1), u32::BITS - start2);
            if x != 0 {
                return x;
            }

            word1 += 1;
            word2 += 1;
            remaining -= 32;
        }

        let mut x = view::load(self.data, word1) >> start1;
        x ^= view::shl_capped(view::load(self.data, end1), u32::BITS - start1);
        x ^= view::load(other.data, word2) >> start2;
        x ^= view::shl_capped(view::load(other.data, end2), u32::BITS - start2);

        x & EXTRA_MASKS[remaining]
    }
}
