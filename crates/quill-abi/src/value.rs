//! Runtime ABI values
//!
//! A [`Value`] has no type of its own beyond its variant. It is always read
//! against a [`ParamType`](crate::ParamType): `Value::Int` serves every
//! `intN`/`uintN`, `Value::FixedBytes` serves both `bytesN` and `function`.

use std::fmt;

use quill_primitives::{Address, H256, I256, U256};

/// Fixed-point number: an unscaled integer and a count of decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: I256,
    scale: u8,
}

impl Decimal {
    /// `unscaled * 10^-scale`
    pub fn new(unscaled: I256, scale: u8) -> Self {
        Self { unscaled, scale }
    }

    /// Integer holding all the digits
    pub fn unscaled(&self) -> I256 {
        self.unscaled
    }

    /// Digits after the decimal point
    pub fn scale(&self) -> u8 {
        self.scale
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.abs().to_string();
        let sign = if self.unscaled.is_negative() { "-" } else { "" };
        let scale = usize::from(self.scale);
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (whole, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, whole, frac)
    }
}

/// Solidity ABI value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Signed or unsigned integer
    Int(I256),
    /// Fixed-point decimal
    Decimal(Decimal),
    /// Address (20 bytes)
    Address(Address),
    /// Fixed-size bytes, including 24-byte `function` values
    FixedBytes(Vec<u8>),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Array elements
    Array(Vec<Value>),
    /// Tuple members
    Tuple(Vec<Value>),
}

impl Value {
    /// Create an unsigned integer value
    pub fn uint(value: impl Into<U256>) -> Self {
        Value::Int(I256::from(value.into()))
    }

    /// Create a signed integer value from i128
    pub fn int(value: i128) -> Self {
        Value::Int(I256::from_i128(value))
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Create a bytes value
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(data.into())
    }

    /// Create a bytes32 value
    pub fn bytes32(data: H256) -> Self {
        Value::FixedBytes(data.as_bytes().to_vec())
    }

    /// Variant name, used in class mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Address(_) => "address",
            Value::FixedBytes(_) => "fixed bytes",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<I256> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as address
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the bytes of a `Bytes` or `FixedBytes` value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) | Value::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the elements of an array or the members of a tuple
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<I256> for Value {
    fn from(i: I256) -> Self {
        Value::Int(i)
    }
}

impl From<U256> for Value {
    fn from(u: U256) -> Self {
        Value::Int(I256::from(u))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Address(a)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
