//! The writing half of the bit-level codec.

use byteorder::{ByteOrder, LittleEndian};
use quiver_utils::hints::cold_path;

use crate::{
    coord::*,
    masks::{BIT_WRITE_MASKS, EXTRA_MASKS, SINGLE_BITS},
    reader::BitReader,
    utils, view, Error,
};

/// A sequential bit-level writer over a caller-owned buffer.
///
/// Individual bit writing starts at the LSB of the byte, working
/// towards the MSB. The writer borrows its buffer and never allocates;
/// the buffer length is truncated to a multiple of the word size when
/// bound, and must be at least word-aligned in length for the full
/// capacity to be usable.
///
/// Writes that would exceed the declared bit capacity set a sticky
/// overflow flag and leave the buffer untouched. Once the flag is set,
/// further writes are no-ops until [`Self::reset`] is called.
#[derive(Debug)]
pub struct BitWriter<'a> {
    data: &'a mut [u8],

    // Capacity may be below `data.len() * 8` to allow a partially
    // usable trailing byte.
    capacity_bits: usize,

    // Next bit offset to write. Always `<= capacity_bits`.
    cursor: usize,

    overflowed: bool,
    assert_on_overflow: bool,
    debug_name: Option<&'static str>,
}

impl<'a> BitWriter<'a> {
    /// Creates a new [`BitWriter`] over the given buffer, with the full
    /// (word-truncated) byte length available for writing.
    pub fn new(data: &'a mut [u8]) -> Self {
        let bits = (data.len() & !3) << 3;
        Self::with_capacity_bits(data, bits)
    }

    /// Creates a new [`BitWriter`] with an explicit bit capacity, which
    /// must not exceed the buffer's word-truncated bit length.
    pub fn with_capacity_bits(data: &'a mut [u8], capacity_bits: usize) -> Self {
        debug_assert_eq!(data.len() & 3, 0, "writer buffers must be a multiple of 4 bytes");

        let len = data.len() & !3;
        let (data, _) = data.split_at_mut(len);
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

    /// Creates a new [`BitWriter`] carrying a debug label for
    /// diagnostics. The label has no effect on the wire format.
    pub fn named(debug_name: &'static str, data: &'a mut [u8]) -> Self {
        let mut writer = Self::new(data);
        writer.debug_name = Some(debug_name);
        writer
    }

    /// Gets the declared capacity of this writer in bits.
    #[inline]
    pub fn capacity_bits(&self) -> usize {
        self.capacity_bits
    }

    /// Gets the capacity of the bound buffer in bytes.
    #[inline]
    pub fn capacity_bytes(&self) -> usize {
        self.data.len()
    }

    /// Gets the number of bits written so far.
    #[inline]
    pub fn bits_written(&self) -> usize {
        self.cursor
    }

    /// Gets the number of whole bytes the written bits span.
    #[inline]
    pub fn bytes_written(&self) -> usize {
        (self.cursor + 7) >> 3
    }

    /// Gets the number of bits still available for writing.
    #[inline]
    pub fn bits_left(&self) -> usize {
        self.capacity_bits - self.cursor
    }

    /// Whether a write has attempted to move past the bit capacity
    /// since the last [`Self::reset`].
    #[inline]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Views the byte range covered by the written bits, for handing
    /// to a transport.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.bytes_written()]
    }

    /// Rewinds the cursor to the start and clears the overflow flag.
    /// The buffer contents are left as they are.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.overflowed = false;
    }

    /// Moves the cursor to an absolute bit position.
    pub fn seek_to(&mut self, bit: usize) {
        debug_assert!(bit <= self.capacity_bits);
        self.cursor = bit.min(self.capacity_bits);
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
    fn overflow(&mut self) -> Error {
        if !self.overflowed {
            self.overflowed = true;
            log::warn!(
                "bit writer '{}' overflowed its capacity of {} bits",
                self.debug_name.unwrap_or("<unnamed>"),
                self.capacity_bits
            );
        }

        self.cursor = self.capacity_bits;
        crate::raise_fault(Error::Overflow, self.debug_name);
        debug_assert!(!self.assert_on_overflow, "bit writer overflow");

        Error::Overflow
    }

    /// Writes the low `nbits` bits of `value`, advancing the cursor.
    ///
    /// `nbits` may be 0 to 32. On overflow, nothing is written and the
    /// sticky flag is set.
    #[inline]
    pub fn write_unsigned_bits(&mut self, value: u32, nbits: u32) -> Result<(), Error> {
        debug_assert!(nbits <= u32::BITS);

        if self.overflowed || self.bits_left() < nbits as usize {
            cold_path();
            return Err(self.overflow());
        }
        // With the cursor at a word-aligned capacity, a zero-width
        // write would otherwise touch the word past the buffer.
        if nbits == 0 {
            return Ok(());
        }

        let start = (self.cursor & 31) as u32;
        let word = self.cursor >> 5;
        self.cursor += nbits as usize;

        let value = value & EXTRA_MASKS[nbits as usize];

        let current = view::load(self.data, word);
        let merged = (current & BIT_WRITE_MASKS[start as usize][nbits as usize]) | (value << start);
        view::store(self.data, word, merged);

        // The span straddles into the following word.
        if start + nbits > u32::BITS {
            let spilled = nbits - (u32::BITS - start);

            let current = view::load(self.data, word + 1);
            let merged =
                (current & BIT_WRITE_MASKS[0][spilled as usize]) | (value >> (u32::BITS - start));
            view::store(self.data, word + 1, merged);
        }

        Ok(())
    }

    /// Sign-extends/truncates `value` into `nbits` bits using
    /// two's-complement masking and writes it.
    ///
    /// `nbits` must be in `1..=32` and the value must round-trip
    /// through the truncation (checked in debug builds).
    #[inline]
    pub fn write_signed_bits(&mut self, value: i32, nbits: u32) -> Result<(), Error> {
        debug_assert!((1..=u32::BITS).contains(&nbits));

        let preserved = (0x7FFF_FFFFu32 >> (u32::BITS - nbits)) as i32;
        let extension = (value >> 31) & !preserved;
        let truncated = (value & preserved) | extension;
        debug_assert!(
            truncated == value,
            "{value:#010x} does not fit in {nbits} bits"
        );

        self.write_unsigned_bits(truncated as u32, nbits)
    }

    /// Writes a single bit.
    #[inline]
    pub fn write_one_bit(&mut self, bit: bool) -> Result<(), Error> {
        if self.overflowed || self.bits_left() < 1 {
            cold_path();
            return Err(self.overflow());
        }

        let word = self.cursor >> 5;
        let mask = SINGLE_BITS[self.cursor & 31];

        let current = view::load(self.data, word);
        view::store(
            self.data,
            word,
            if bit { current | mask } else { current & !mask },
        );
        self.cursor += 1;

        Ok(())
    }

    /// Bulk-copies the first `nbits` bits out of `src`.
    ///
    /// The write fails as a whole if it would exceed capacity; no
    /// partial data is committed. The output is bit-identical to
    /// writing the run one bit at a time.
    pub fn write_bits(&mut self, src: &[u8], nbits: usize) -> Result<(), Error> {
        debug_assert!(nbits <= src.len() << 3);

        if self.overflowed || self.bits_left() < nbits {
            cold_path();
            return Err(self.overflow());
        }

        let mut remaining = nbits;
        let mut offset = 0;

        // Whole bytes collapse to a memcpy while the cursor is
        // byte-aligned.
        if self.cursor & 7 == 0 && remaining >= 8 {
            let nbytes = remaining >> 3;
            let start = self.cursor >> 3;

            self.data[start..start + nbytes].copy_from_slice(&src[..nbytes]);
            offset = nbytes;
            remaining &= 7;
            self.cursor += nbytes << 3;
        }

        // Unaligned cursor: merge a word at a time, letting the
        // primitive writer handle the straddling stores.
        while remaining >= 32 {
            let word = LittleEndian::read_u32(&src[offset..offset + 4]);
            self.write_unsigned_bits(word, u32::BITS)?;

            offset += 4;
            remaining -= 32;
        }
        while remaining >= 8 {
            self.write_unsigned_bits(src[offset] as u32, u8::BITS)?;

            offset += 1;
            remaining -= 8;
        }

        // Tail bits of a partial final byte.
        if remaining > 0 {
            self.write_unsigned_bits(src[offset] as u32, remaining as u32)?;
        }

        Ok(())
    }

    /// Writes whole bytes from `src`.
    #[inline]
    pub fn write_bytes(&mut self, src: &[u8]) -> Result<(), Error> {
        self.write_bits(src, src.len() << 3)
    }

    /// Transfers `nbits` bits out of a reader into this writer.
    pub fn write_bits_from_reader(
        &mut self,
        src: &mut BitReader<'_>,
        mut nbits: u32,
    ) -> Result<(), Error> {
        while nbits > u32::BITS {
            self.write_unsigned_bits(src.read_unsigned_bits(u32::BITS), u32::BITS)?;
            nbits -= u32::BITS;
        }
        self.write_unsigned_bits(src.read_unsigned_bits(nbits), nbits)?;

        if src.is_overflowed() {
            Err(Error::Overflow)
        } else {
            Ok(())
        }
    }

    /// Writes a NUL-terminated string, one byte per character.
    pub fn write_str(&mut self, value: &str) -> Result<(), Error> {
        for &byte in value.as_bytes() {
            self.write_unsigned_bits(byte as u32, u8::BITS)?;
        }
        self.write_unsigned_bits(0, u8::BITS)
    }

    /// Writes an unsigned 32-bit integer as a 7-bit continuation-coded
    /// varint, least significant group first.
    pub fn write_var_u32(&mut self, mut value: u32) -> Result<(), Error> {
        // With a byte-aligned cursor and worst-case headroom, the whole
        // encode happens as plain byte stores.
        if !self.overflowed
            && self.cursor & 7 == 0
            && self.bits_left() >= utils::MAX_VARINT32_BYTES << 3
        {
            let mut offset = self.cursor >> 3;
            while value > 0x7F {
                self.data[offset] = (value as u8 & 0x7F) | 0x80;
                value >>= 7;
                offset += 1;
            }
            self.data[offset] = value as u8;
            self.cursor = (offset + 1) << 3;

            return Ok(());
        }

        while value > 0x7F {
            self.write_unsigned_bits((value & 0x7F) | 0x80, u8::BITS)?;
            value >>= 7;
        }
        self.write_unsigned_bits(value, u8::BITS)
    }

    /// Writes an unsigned 64-bit integer as a varint; see
    /// [`Self::write_var_u32`].
    pub fn write_var_u64(&mut self, mut value: u64) -> Result<(), Error> {
        if !self.overflowed
            && self.cursor & 7 == 0
            && self.bits_left() >= utils::MAX_VARINT64_BYTES << 3
        {
            let mut offset = self.cursor >> 3;
            while value > 0x7F {
                self.data[offset] = (value as u8 & 0x7F) | 0x80;
                value >>= 7;
                offset += 1;
            }
            self.data[offset] = value as u8;
            self.cursor = (offset + 1) << 3;

            return Ok(());
        }

        while value > 0x7F {
            self.write_unsigned_bits((value as u32 & 0x7F) | 0x80, u8::BITS)?;
            value >>= 7;
        }
        self.write_unsigned_bits(value as u32, u8::BITS)
    }

    /// Zig-zag maps a signed integer and writes it as a varint, keeping
    /// small-magnitude negatives short on the wire.
    #[inline]
    pub fn write_var_i32(&mut self, value: i32) -> Result<(), Error> {
        self.write_var_u32(utils::zigzag_encode32(value))
    }

    /// Zig-zag maps a signed 64-bit integer and writes it as a varint.
    #[inline]
    pub fn write_var_i64(&mut self, value: i64) -> Result<(), Error> {
        self.write_var_u64(utils::zigzag_encode64(value))
    }

    /// Writes an unsigned integer with a 2-bit prefix selecting a
    /// 4, 8, 12 or 32 bit payload.
    pub fn write_ubitvar(&mut self, value: u32) -> Result<(), Error> {
        let (tag, nbits) = match value {
            0..=0xF => (0, 4),
            0x10..=0xFF => (1, 8),
            0x100..=0xFFF => (2, 12),
            _ => (3, 32),
        };

        self.write_unsigned_bits(tag, 2)?;
        self.write_unsigned_bits(value, nbits)
    }

    /// Writes a world coordinate as a fixed-point value with
    /// [`COORD_INTEGER_BITS`] integer and [`COORD_FRACTIONAL_BITS`]
    /// fractional bits, spending bits only on the parts that are
    /// actually present.
    pub fn write_coord(&mut self, value: f32) -> Result<(), Error> {
        let sign = value <= -COORD_RESOLUTION;
        let int_val = value.abs() as u32;
        let fract_val = ((value * COORD_DENOMINATOR as f32) as i32).unsigned_abs()
            & (COORD_DENOMINATOR as u32 - 1);

        self.write_one_bit(int_val != 0)?;
        self.write_one_bit(fract_val != 0)?;

        if int_val != 0 || fract_val != 0 {
            self.write_one_bit(sign)?;
            if int_val != 0 {
                // Magnitudes start at 1 once the presence bit is set.
                self.write_unsigned_bits(int_val - 1, COORD_INTEGER_BITS)?;
            }
            if fract_val != 0 {
                self.write_unsigned_bits(fract_val, COORD_FRACTIONAL_BITS)?;
            }
        }

        Ok(())
    }

    /// Writes a coordinate in the compact multiplayer encoding.
    ///
    /// A 2-3 bit selector (in-bounds, has-integer and, for
    /// non-integral values, the sign) determines the layout of the
    /// payload that follows. The reader derives the same layout from
    /// the same flags, so the two must be called with identical
    /// `integral`/`low_precision` modes.
    pub fn write_coord_mp(
        &mut self,
        value: f32,
        integral: bool,
        low_precision: bool,
    ) -> Result<(), Error> {
        let resolution = if low_precision {
            COORD_RESOLUTION_LOWPRECISION
        } else {
            COORD_RESOLUTION
        };
        let denominator = if low_precision {
            COORD_DENOMINATOR_LOWPRECISION
        } else {
            COORD_DENOMINATOR
        };

        let sign = value <= -resolution;
        let int_val = value.abs() as u32;
        let fract_val =
            ((value * denominator as f32) as i32).unsigned_abs() & (denominator as u32 - 1);
        let in_bounds = int_val < (1 << COORD_INTEGER_BITS_MP);

        let int_bits = coord_mp_integer_bits(in_bounds);
        let fract_bits = coord_mp_fractional_bits(low_precision);

        // The primitive writer masks to the field width anyway; doing
        // it here keeps the packing arithmetic in range.
        let int_field = int_val.wrapping_sub(1) & ((1 << int_bits) - 1);

        let (bits, nbits) = if integral {
            if int_val != 0 {
                let packed = (int_field << 3)
                    | (sign as u32) * COORD_MP_SIGN
                    | COORD_MP_HAS_INT
                    | in_bounds as u32;
                (packed, 3 + int_bits)
            } else {
                // Nothing to send beyond the selector itself.
                (in_bounds as u32, 2)
            }
        } else if int_val != 0 {
            let packed = (fract_val << (3 + int_bits))
                | (int_field << 3)
                | (sign as u32) * COORD_MP_SIGN
                | COORD_MP_HAS_INT
                | in_bounds as u32;
            (packed, 3 + int_bits + fract_bits)
        } else {
            let packed = (fract_val << 3) | (sign as u32) * COORD_MP_SIGN | in_bounds as u32;
            (packed, 3 + fract_bits)
        };

        self.write_unsigned_bits(bits, nbits)
    }

    /// Writes an angle in degrees as an `nbits` wide fraction of a
    /// full circle. `nbits` must be in `1..32`.
    pub fn write_angle(&mut self, angle: f32, nbits: u32) -> Result<(), Error> {
        debug_assert!((1..u32::BITS).contains(&nbits));

        let turns = 1u32 << nbits;
        let packed = ((angle / 360.0) * turns as f32).round() as i32 as u32;

        self.write_unsigned_bits(packed & (turns - 1), nbits)
    }

    /// Writes one component of a unit normal as a sign bit plus an
    /// 11-bit magnitude clamped to the largest representable value.
    pub fn write_normal(&mut self, value: f32) -> Result<(), Error> {
        let sign = value <= -NORMAL_RESOLUTION;
        let fract_val = ((value * NORMAL_DENOMINATOR as f32) as i32)
            .unsigned_abs()
            .min(NORMAL_DENOMINATOR as u32);

        self.write_one_bit(sign)?;
        self.write_unsigned_bits(fract_val, NORMAL_FRACTIONAL_BITS)
    }

    /// Writes a position vector with per-axis presence flags, skipping
    /// axes that quantize to zero.
    pub fn write_vec3_coord(&mut self, value: Vec3) -> Result<(), Error> {
        let has_x = value.x.abs() >= COORD_RESOLUTION;
        let has_y = value.y.abs() >= COORD_RESOLUTION;
        let has_z = value.z.abs() >= COORD_RESOLUTION;

        self.write_one_bit(has_x)?;
        self.write_one_bit(has_y)?;
        self.write_one_bit(has_z)?;

        if has_x {
            self.write_coord(value.x)?;
        }
        if has_y {
            self.write_coord(value.y)?;
        }
        if has_z {
            self.write_coord(value.z)?;
        }

        Ok(())
    }

    /// Writes a unit normal as its X and Y components plus a sign bit
    /// for Z. The reader reconstructs Z's magnitude from the unit
    /// length constraint, so this is only valid for unit vectors.
    pub fn write_vec3_normal(&mut self, value: Vec3) -> Result<(), Error> {
        let has_x = value.x.abs() >= NORMAL_RESOLUTION;
        let has_y = value.y.abs() >= NORMAL_RESOLUTION;

        self.write_one_bit(has_x)?;
        self.write_one_bit(has_y)?;

        if has_x {
            self.write_normal(value.x)?;
        }
        if has_y {
            self.write_normal(value.y)?;
        }

        self.write_one_bit(value.z <= -NORMAL_RESOLUTION)
    }

    /// Writes an Euler angle triple through the coordinate vector
    /// encoding.
    #[inline]
    pub fn write_angles(&mut self, value: Vec3) -> Result<(), Error> {
        self.write_vec3_coord(value)
    }

    /// Writes an unsigned byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.write_unsigned_bits(value as u32, u8::BITS)
    }

    /// Writes a signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> Result<(), Error> {
        self.write_signed_bits(value as i32, u8::BITS)
    }

    /// Writes an unsigned 16-bit integer.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> Result<(), Error> {
        self.write_unsigned_bits(value as u32, u16::BITS)
    }

    /// Writes a signed 16-bit integer.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> Result<(), Error> {
        self.write_signed_bits(value as i32, u16::BITS)
    }

    /// Writes an unsigned 32-bit integer.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        self.write_unsigned_bits(value, u32::BITS)
    }

    /// Writes a signed 32-bit integer.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> Result<(), Error> {
        self.write_signed_bits(value, u32::BITS)
    }

    /// Writes a signed 64-bit integer as its low and high halves.
    pub fn write_i64(&mut self, value: i64) -> Result<(), Error> {
        let value = value as u64;
        self.write_unsigned_bits(value as u32, u32::BITS)?;
        self.write_unsigned_bits((value >> 32) as u32, u32::BITS)
    }

    /// Writes a float through its raw bit pattern.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> Result<(), Error> {
        self.write_unsigned_bits(value.to_bits(), u32::BITS)
    }
}
