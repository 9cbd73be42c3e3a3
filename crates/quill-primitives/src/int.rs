//! Signed 256-bit integer
//!
//! ABI integers span both `int256` (`-2^255 ..= 2^255 - 1`) and `uint256`
//! (`0 ..= 2^256 - 1`), so the value is kept as a sign and a 256-bit
//! magnitude rather than as a two's-complement word. Zero is never negative.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use primitive_types::U256;
use thiserror::Error;

/// Integer conversion error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntError {
    /// Literal could not be parsed
    #[error("invalid integer literal: {0}")]
    InvalidLiteral(String),
    /// Value does not fit the requested width
    #[error("integer out of range: {0}")]
    OutOfRange(String),
}

/// Sign-magnitude 256-bit integer
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct I256 {
    abs: U256,
    negative: bool,
}

impl I256 {
    /// Zero
    pub const ZERO: I256 = I256 {
        abs: U256([0; 4]),
        negative: false,
    };

    /// Create from a magnitude and a sign
    pub fn new(abs: U256, negative: bool) -> Self {
        Self {
            abs,
            negative: negative && !abs.is_zero(),
        }
    }

    /// Create from i128
    pub fn from_i128(value: i128) -> Self {
        Self::new(U256::from(value.unsigned_abs()), value < 0)
    }

    /// Absolute value
    pub fn abs(&self) -> U256 {
        self.abs
    }

    /// Check if negative
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.abs.is_zero()
    }

    /// Minimal two's-complement bit length, excluding the sign bit.
    ///
    /// For non-negative values this is the position of the highest set bit;
    /// for negative values it is the bit length of `|x| - 1`, so `-128` needs
    /// 7 bits and fits `int8` while `128` needs 8 bits and does not.
    pub fn bit_length(&self) -> usize {
        if self.negative {
            (self.abs - U256::one()).bits()
        } else {
            self.abs.bits()
        }
    }

    /// 32-byte big-endian two's-complement word.
    ///
    /// Non-negative values are written as their magnitude, which keeps the
    /// whole `uint256` range representable. Negative values are sign-extended
    /// with `0xff`.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let word = if self.negative {
            (!self.abs).overflowing_add(U256::one()).0
        } else {
            self.abs
        };
        let mut bytes = [0u8; 32];
        word.to_big_endian(&mut bytes);
        bytes
    }

    /// Interpret a big-endian word as an unsigned integer
    pub fn from_be_bytes_unsigned(bytes: &[u8]) -> Self {
        Self::new(U256::from_big_endian(bytes), false)
    }

    /// Interpret a big-endian word of at most 32 bytes as two's complement.
    ///
    /// The sign is taken from the top bit of the first byte, so a 5-byte
    /// slice `ff ff ff ff ff` is `-1`.
    pub fn from_be_bytes_signed(bytes: &[u8]) -> Self {
        let negative = bytes.first().is_some_and(|b| b & 0x80 != 0);
        if !negative {
            return Self::from_be_bytes_unsigned(bytes);
        }
        let mut word = [0xffu8; 32];
        let start = 32usize.saturating_sub(bytes.len());
        word[start..].copy_from_slice(&bytes[bytes.len() - (32 - start)..]);
        let raw = U256::from_big_endian(&word);
        Self::new((!raw).overflowing_add(U256::one()).0, true)
    }

    /// Convert to i128 if in range
    pub fn to_i128(&self) -> Option<i128> {
        if self.abs.bits() > 127 {
            if self.negative && self.abs == U256::one() << 127u32 {
                return Some(i128::MIN);
            }
            return None;
        }
        let magnitude = self.abs.low_u128() as i128;
        Some(if self.negative { -magnitude } else { magnitude })
    }

    /// Convert to U256 if non-negative
    pub fn to_u256(&self) -> Option<U256> {
        if self.negative {
            None
        } else {
            Some(self.abs)
        }
    }
}

impl fmt::Debug for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I256({})", self)
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.abs)
        } else {
            write!(f, "{}", self.abs)
        }
    }
}

impl FromStr for I256 {
    type Err = IntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IntError::InvalidLiteral(s.to_string()));
        }
        let abs = U256::from_dec_str(digits).map_err(|_| IntError::OutOfRange(s.to_string()))?;
        Ok(Self::new(abs, negative))
    }
}

impl Ord for I256 {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, false) => self.abs.cmp(&other.abs),
            (true, true) => other.abs.cmp(&self.abs),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    }
}

impl PartialOrd for I256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Neg for I256 {
    type Output = I256;

    fn neg(self) -> Self::Output {
        Self::new(self.abs, !self.negative)
    }
}

impl From<U256> for I256 {
    fn from(value: U256) -> Self {
        Self::new(value, false)
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for I256 {
            fn from(value: $t) -> Self {
                Self::new(U256::from(value), false)
            }
        })*
    };
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for I256 {
            fn from(value: $t) -> Self {
                Self::from_i128(value as i128)
            }
        })*
    };
}

impl_from_unsigned!(u8, u16, u32, u64, u128);
impl_from_signed!(i8, i16, i32, i64, i128);
