//! Quantization parameters for the lossy float encodings.
//!
//! The bit budgets here are protocol constants. Changing any of them
//! changes the wire format, so both sides of a connection must agree
//! on this exact table.

/// Bits spent on the integer magnitude of a full-range coordinate.
pub const COORD_INTEGER_BITS: u32 = 14;

/// Bits spent on the fractional part of a coordinate.
pub const COORD_FRACTIONAL_BITS: u32 = 5;

/// Number of fractional steps per world unit.
pub const COORD_DENOMINATOR: i32 = 1 << COORD_FRACTIONAL_BITS;

/// The smallest representable coordinate step.
pub const COORD_RESOLUTION: f32 = 1.0 / COORD_DENOMINATOR as f32;

/// Bits spent on the integer magnitude of an in-bounds multiplayer
/// coordinate. Most deltas fit this bounded range, saving three bits
/// over [`COORD_INTEGER_BITS`].
pub const COORD_INTEGER_BITS_MP: u32 = 11;

/// Fractional bits for the low-precision multiplayer encoding.
pub const COORD_FRACTIONAL_BITS_MP_LOWPRECISION: u32 = 3;

/// Fractional steps per unit in the low-precision encoding.
pub const COORD_DENOMINATOR_LOWPRECISION: i32 = 1 << COORD_FRACTIONAL_BITS_MP_LOWPRECISION;

/// The smallest representable low-precision coordinate step.
pub const COORD_RESOLUTION_LOWPRECISION: f32 = 1.0 / COORD_DENOMINATOR_LOWPRECISION as f32;

/// Bits spent on the magnitude of a unit-normal component.
pub const NORMAL_FRACTIONAL_BITS: u32 = 11;

/// The largest transmissible normal magnitude; magnitudes quantize
/// against this rather than a power of two so that 1.0 is exact.
pub const NORMAL_DENOMINATOR: i32 = (1 << NORMAL_FRACTIONAL_BITS) - 1;

/// The smallest representable normal step.
pub const NORMAL_RESOLUTION: f32 = 1.0 / NORMAL_DENOMINATOR as f32;

// Selector bits shared by the compact multiplayer coordinate encoding.
// The wire layout is LSB-first: in-bounds, has-integer, then (for the
// non-integral modes) the sign.
pub(crate) const COORD_MP_IN_BOUNDS: u32 = 1;
pub(crate) const COORD_MP_HAS_INT: u32 = 2;
pub(crate) const COORD_MP_SIGN: u32 = 4;

/// A triple of float lanes moved through the vector encodings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Creates a new [`Vec3`] from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Integer bits implied by the in-bounds selector bit.
///
/// Encoder and decoder both derive their layouts from this single
/// policy so the two sides can never disagree on a field width.
#[inline]
pub(crate) fn coord_mp_integer_bits(in_bounds: bool) -> u32 {
    if in_bounds {
        COORD_INTEGER_BITS_MP
    } else {
        COORD_INTEGER_BITS
    }
}

/// Fractional bits implied by the low-precision mode flag.
#[inline]
pub(crate) fn coord_mp_fractional_bits(low_precision: bool) -> u32 {
    if low_precision {
        COORD_FRACTIONAL_BITS_MP_LOWPRECISION
    } else {
        COORD_FRACTIONAL_BITS
    }
}
