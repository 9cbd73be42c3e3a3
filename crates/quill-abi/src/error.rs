//! ABI error types
//!
//! Each stage has its own error: parsing a type string, validating a value
//! against a type, encoding and decoding. `AbiError` wraps all of them for
//! callers that chain stages together.

use std::fmt;

use quill_primitives::U256;
use thiserror::Error;

/// Render a character as a `\uXXXX` escape
fn escape_char(ch: &char) -> String {
    format!("\\u{:04x}", u32::from(*ch))
}

fn format_path(path: &[usize]) -> String {
    if path.is_empty() {
        return String::new();
    }
    let indices: Vec<String> = path.iter().map(|i| i.to_string()).collect();
    format!(" at path [{}]", indices.join(", "))
}

/// Type or signature string could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Non-ASCII character in a function name
    #[error("non-ascii character at index {offset}: '{ch}', {}", escape_char(.ch))]
    NonAsciiChar {
        /// Byte offset of the character
        offset: usize,
        /// Offending character
        ch: char,
    },

    /// Character outside `[a-z0-9\[\](),]` in a parameter list
    #[error("non-type character at index {offset}: '{ch}', {}", escape_char(.ch))]
    NonTypeChar {
        /// Byte offset of the character
        offset: usize,
        /// Offending character
        ch: char,
    },

    /// A parameter slot with no type in it
    #[error("empty parameter @ {index} (index {offset})")]
    EmptyParameter {
        /// Element index within its tuple
        index: usize,
        /// Byte offset of the separator
        offset: usize,
    },

    /// Missing closing `)` or `]`
    #[error("non-terminating tuple or array at index {offset}")]
    NonTerminating {
        /// Byte offset where input ran out
        offset: usize,
    },

    /// Array length is not a canonical non-negative integer
    #[error("invalid array length at index {offset}")]
    InvalidArrayLength {
        /// Byte offset of the length digits
        offset: usize,
    },

    /// Base type not in the type table
    #[error("unrecognized type \"{type_string}\" at index {offset}")]
    UnknownType {
        /// Byte offset of the element
        offset: usize,
        /// The unresolved type text
        type_string: String,
    },

    /// Signature has no `(`
    #[error("params start not found")]
    ParamsStartNotFound,

    /// Unexpected characters after a complete element or tuple
    #[error("illegal termination at index {offset}")]
    IllegalTermination {
        /// Byte offset of the first unexpected character
        offset: usize,
    },

    /// Input exceeds the configured maximum length
    #[error("type string too long: {length} > {max}")]
    TooLong {
        /// Input length in bytes
        length: usize,
        /// Configured limit
        max: usize,
    },

    /// Element names do not line up with element types
    #[error("expected {expected} element names, got {got}")]
    ElementNameCount {
        /// Number of elements
        expected: usize,
        /// Number of names supplied
        got: usize,
    },

    /// A `tuple` type given without its components
    #[error("type \"{type_string}\" requires components")]
    MissingComponents {
        /// The `tuple...` type text
        type_string: String,
    },
}

/// What a value violated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationKind {
    /// Integer needs more bits than the type allows
    #[error("bit limit exceeded: {actual} > {limit}")]
    BitLimitExceeded {
        /// Bits available for the magnitude
        limit: usize,
        /// Bits the value needs
        actual: usize,
    },

    /// Negative value for an unsigned type
    #[error("signed value given for unsigned type")]
    SignMismatch,

    /// Decimal scale differs from the declared scale
    #[error("big decimal scale mismatch: actual != expected: {actual} != {expected}")]
    ScaleMismatch {
        /// Declared scale
        expected: u8,
        /// Scale of the value
        actual: u8,
    },

    /// Wrong number of bytes or array elements
    #[error("array length mismatch: actual != expected: {actual} != {expected}")]
    LengthMismatch {
        /// Declared length
        expected: usize,
        /// Length of the value
        actual: usize,
    },

    /// Wrong number of tuple members
    #[error("tuple length mismatch: actual != expected: {actual} != {expected}")]
    ArityMismatch {
        /// Member count of the type
        expected: usize,
        /// Member count of the value
        actual: usize,
    },

    /// Value variant does not belong to the type
    #[error("class mismatch: expected {expected}, found {found}")]
    ClassMismatch {
        /// Canonical type string
        expected: String,
        /// Value variant name
        found: &'static str,
    },
}

/// First violation found while checking a value against a type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}", format_path(.path))]
pub struct ValidationError {
    /// What was violated
    pub kind: ValidationKind,
    /// Element indices from the outermost tuple down to the violation
    pub path: Vec<usize>,
}

impl ValidationError {
    /// Create an error at the current level
    pub fn new(kind: ValidationKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
        }
    }

    /// Prefix the path with the index of the enclosing element
    pub(crate) fn at(mut self, index: usize) -> Self {
        self.path.insert(0, index);
        self
    }
}

/// Encoding failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Arguments rejected by validation; nothing was written
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A value reached the writer with the wrong shape
    #[error("type mismatch while encoding {expected}")]
    TypeMismatch {
        /// Canonical type string
        expected: String,
    },

    /// Encoded length does not fit in `usize`
    #[error("encoded length overflows")]
    LengthOverflow,

    /// Written length differs from the measured length
    #[error("encoded length mismatch: measured {measured}, wrote {written}")]
    LengthMismatch {
        /// Length computed before writing
        measured: usize,
        /// Bytes actually written
        written: usize,
    },
}

/// Decoding failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ends before the data it describes
    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Offset word points outside the input
    #[error("offset {offset} at index {position} is out of range")]
    OffsetOutOfRange {
        /// Raw offset word
        offset: U256,
        /// Byte position of the offset word
        position: usize,
    },

    /// Tail does not start where the previous one ended
    #[error("illegal backwards jump: expected offset {expected}, found {found}")]
    StrictOffsetMismatch {
        /// Offset the strict layout requires
        expected: usize,
        /// Offset present in the input
        found: usize,
    },

    /// Boolean word is not 0 or 1
    #[error("illegal boolean value at index {position}")]
    InvalidBooleanByte {
        /// Byte position of the boolean
        position: usize,
    },

    /// Too many array elements that occupy no input bytes
    #[error("more than {limit} zero-width array elements")]
    ZeroWidthLimit {
        /// Elements allowed per decode call
        limit: usize,
    },

    /// Packed input with more than one dynamic member
    #[error("packed decoding supports at most one dynamic member, found {dynamic_members}")]
    AmbiguousPacked {
        /// Number of dynamic top-level members
        dynamic_members: usize,
    },

    /// Packed decoding cannot recover this member shape
    #[error("unsupported packed type: {0}")]
    UnsupportedPacked(String),

    /// Packed gap is not a whole number of elements
    #[error("packed gap of {gap} bytes is not a multiple of element width {element_width}")]
    RaggedPacked {
        /// Bytes left for the dynamic member
        gap: usize,
        /// Packed width of one element
        element_width: usize,
    },

    /// String payload is not UTF-8
    #[error("invalid utf-8 string at index {position}")]
    InvalidUtf8 {
        /// Byte position of the payload
        position: usize,
    },

    /// Decoded word is outside the range of its type
    #[error("invalid value at index {position}: {source}")]
    InvalidValue {
        /// Byte position of the word
        position: usize,
        /// Range violation
        source: ValidationError,
    },

    /// Call data or topic 0 belongs to a different signature
    #[error("selector mismatch: expected {expected}, found {found}")]
    SelectorMismatch {
        /// Hex of the expected selector or hash
        expected: String,
        /// Hex of the bytes found
        found: String,
    },

    /// Wrong number of event topics
    #[error("expected {expected} topics, got {got}")]
    TopicCountMismatch {
        /// Topics implied by the event definition
        expected: usize,
        /// Topics supplied
        got: usize,
    },

    /// Call length is not a selector plus whole words
    #[error("call length {len} is not 4 plus a multiple of 32")]
    MisalignedCall {
        /// Length of the call data
        len: usize,
    },
}

/// Address text could not be accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChecksumError {
    /// Missing `0x`
    #[error("missing 0x prefix")]
    MissingPrefix,

    /// Not exactly 40 hex digits
    #[error("expected 40 hex digits, got {0}")]
    InvalidLength(usize),

    /// Character that is not a hex digit
    #[error("illegal hex digit at index {offset}: '{ch}'")]
    InvalidHexDigit {
        /// Byte offset in the input
        offset: usize,
        /// Offending character
        ch: char,
    },

    /// Letter case does not match the EIP-55 checksum
    #[error("invalid checksum: expected {expected}")]
    Mismatch {
        /// Correctly checksummed form
        expected: String,
    },
}

/// Any error raised by this crate
#[derive(Debug, Error)]
pub enum AbiError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Encode error
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Decode error
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Address text error
    #[error("address error: {0}")]
    Checksum(#[from] ChecksumError),

    /// Function, event or error definition breaks a shape rule
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// JSON descriptor error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AbiError {
    pub(crate) fn definition(message: impl fmt::Display) -> Self {
        AbiError::InvalidDefinition(message.to_string())
    }
}
