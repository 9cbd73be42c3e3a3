//! # quill-crypto
//!
//! Keccak-256 hashing for the Quill ABI codec.
//!
//! - Function, error and event selectors
//! - EIP-55 address checksums

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::{keccak256, selector};
