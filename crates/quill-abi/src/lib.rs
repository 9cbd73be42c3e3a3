//! # quill-abi
//!
//! Ethereum contract ABI codec.
//!
//! ## Features
//!
//! - **Parser**: signatures and type strings into [`ParamType`] trees, with
//!   `int`/`uint`/`fixed`/`ufixed` aliases canonicalized
//! - **Standard codec**: head/tail encoding; strict decoding by default
//! - **Packed codec**: `abi.encodePacked` layout and its limited inverse
//! - **Function / Event / ContractError**: selectors, call data, logs, reverts
//! - **JSON ABI**: Solidity's JSON descriptors
//! - **EIP-55**: checksummed address text
//!
//! ## Quick Start
//!
//! ```rust
//! use quill_abi::{decode, parse_tuple_type, Function, Value};
//!
//! let baz = Function::parse("baz(uint32,bool)")?;
//! let call = baz.encode_call(&[Value::uint(69u64), Value::Bool(true)])?;
//! assert_eq!(hex::encode(&call[..4]), "cdcd77c0");
//!
//! let tuple = parse_tuple_type("(uint32,bool)")?;
//! let args = decode(&tuple, &call[4..])?;
//! assert_eq!(args, vec![Value::uint(69u64), Value::Bool(true)]);
//! # Ok::<(), quill_abi::AbiError>(())
//! ```
//!
//! ## Packed Encoding
//!
//! ```rust
//! use quill_abi::{encode_packed, parse_tuple_type, Value};
//!
//! let tuple = parse_tuple_type("(int8,bytes1,uint16,string)")?;
//! let packed = encode_packed(
//!     &tuple,
//!     &[
//!         Value::int(-1),
//!         Value::FixedBytes(vec![0x42]),
//!         Value::uint(0x2424u64),
//!         Value::string("Hello, world!"),
//!     ],
//! )?;
//! assert_eq!(hex::encode(&packed), "ff42242448656c6c6f2c20776f726c6421");
//! # Ok::<(), quill_abi::AbiError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
mod cache;
mod config;
mod custom_error;
mod decode;
mod encode;
mod error;
mod event;
mod function;
mod json;
mod packed;
mod parser;
mod types;
mod validate;
mod value;

pub use cache::TypeCache;
pub use config::{AbiCodec, CodecConfig};
pub use custom_error::ContractError;
pub use decode::{decode, decode_lenient, decode_with_mode, DecodeMode, MAX_ZERO_WIDTH_ELEMENTS};
pub use encode::{encode, encode_with_prefix, measure};
pub use error::{AbiError, ChecksumError, DecodeError, EncodeError, ParseError, ValidationError, ValidationKind};
pub use event::Event;
pub use function::{format_call, Function, FunctionKind, StateMutability, SELECTOR_LEN};
pub use json::{parse_abi, parse_abi_item, parse_events, parse_functions, AbiItem};
pub use packed::{decode_packed, encode_packed, packed_width};
pub use parser::{
    build_type, canonicalize, parse_signature, parse_signature_with_limit, parse_tuple_type, parse_type,
    parse_type_with_limit, Signature, DEFAULT_MAX_TYPE_LENGTH,
};
pub use types::{ArrayLength, ArrayType, ParamType, TupleType, WORD_LEN};
pub use validate::{validate, validate_tuple};
pub use value::{Decimal, Value};

// Re-export primitives for convenience
pub use quill_primitives::{Address, H256, I256, U256};
