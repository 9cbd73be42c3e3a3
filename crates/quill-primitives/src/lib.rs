//! # quill-primitives
//!
//! Primitive types for the Quill ABI codec.
//!
//! This crate provides the fixed-width values the codec reads and writes:
//! 256-bit unsigned and signed integers, 32-byte hashes and 20-byte addresses.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;
mod int;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};
pub use int::{IntError, I256};

// Re-export primitive-types for U256
pub use primitive_types::U256;
