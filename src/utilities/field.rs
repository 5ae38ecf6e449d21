//! Arithmetic in the prime field used for all authenticated values.
//!
//! The modulus is the largest practical 40-bit prime `p = 2^40 - 87`, so
//! that every element fits in 5 bytes on the wire. All secret values,
//! authentication keys and MAC tags in this crate are elements of this
//! field.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// The field modulus. It is strictly below `2^40`, so sums of two
/// elements never overflow a `u64` and products fit in a `u128`.
pub const P: u64 = (1 << 40) - 87;

/// Number of bytes of one field element on the wire.
pub const WIRE_SIZE: usize = 5;

/// One element of the prime field `Z_p`.
///
/// Invariant: the inner value is always strictly below [`P`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct Zp(u64);

impl Zp {
    pub const ZERO: Zp = Zp(0);

    /// Raw inner value, guaranteed to be below [`P`].
    #[must_use]
    pub fn data(self) -> u64 {
        self.0
    }

    /// Serializes the element into its 5-byte little-endian wire form.
    #[must_use]
    pub fn to_wire(self) -> [u8; WIRE_SIZE] {
        let bytes = self.0.to_le_bytes();
        [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]
    }

    /// Reads an element from its 5-byte wire form, reducing modulo `p`.
    #[must_use]
    pub fn from_wire(wire: [u8; WIRE_SIZE]) -> Zp {
        let mut bytes = [0u8; 8];
        bytes[..WIRE_SIZE].copy_from_slice(&wire);
        Zp::from(u64::from_le_bytes(bytes))
    }

    /// Interprets 5 bytes as a candidate element *without* reduction.
    ///
    /// Returns `None` when the candidate lies outside the field. The
    /// rejection-sampling extractors in `prg` rely on this to decide
    /// whether a batch must be redrawn.
    #[must_use]
    pub fn from_wire_exact(wire: [u8; WIRE_SIZE]) -> Option<Zp> {
        let mut bytes = [0u8; 8];
        bytes[..WIRE_SIZE].copy_from_slice(&wire);
        let candidate = u64::from_le_bytes(bytes);
        if candidate < P {
            Some(Zp(candidate))
        } else {
            None
        }
    }
}

impl From<u64> for Zp {
    fn from(value: u64) -> Zp {
        Zp(value % P)
    }
}

impl From<Zp> for u64 {
    fn from(value: Zp) -> u64 {
        value.0
    }
}

impl From<bool> for Zp {
    fn from(value: bool) -> Zp {
        Zp(u64::from(value))
    }
}

impl Add for Zp {
    type Output = Zp;

    fn add(self, other: Zp) -> Zp {
        // Both summands are below 2^40, so this cannot overflow.
        Zp((self.0 + other.0) % P)
    }
}

impl AddAssign for Zp {
    fn add_assign(&mut self, other: Zp) {
        *self = *self + other;
    }
}

impl Sub for Zp {
    type Output = Zp;

    fn sub(self, other: Zp) -> Zp {
        Zp((self.0 + P - other.0) % P)
    }
}

impl SubAssign for Zp {
    fn sub_assign(&mut self, other: Zp) {
        *self = *self - other;
    }
}

impl Neg for Zp {
    type Output = Zp;

    fn neg(self) -> Zp {
        Zp::ZERO - self
    }
}

impl Mul for Zp {
    type Output = Zp;

    fn mul(self, other: Zp) -> Zp {
        let wide = u128::from(self.0) * u128::from(other.0);
        Zp(u64::try_from(wide % u128::from(P)).expect("reduced value fits in a u64"))
    }
}

impl fmt::Display for Zp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
