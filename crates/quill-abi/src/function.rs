//! Contract functions: selectors, call data and return values

use std::fmt;
use std::fmt::Write as _;

use bytes::Bytes;
use quill_crypto::selector;
use serde::{Deserialize, Serialize};

use crate::decode::decode;
use crate::encode::{encode_with_prefix, measure};
use crate::error::{AbiError, DecodeError, EncodeError};
use crate::parser::{parse_signature, parse_tuple_type};
use crate::types::{TupleType, WORD_LEN};
use crate::value::Value;

/// Selector length in bytes
pub const SELECTOR_LEN: usize = 4;

const MAX_NAME_CHARS: usize = 2048;
const LABEL_WIDTH: usize = 9;

/// Kind of function entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    /// Regular named function
    #[default]
    Function,
    /// Plain ether receiver
    Receive,
    /// Fallback function
    Fallback,
    /// Constructor
    Constructor,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FunctionKind::Function => "function",
            FunctionKind::Receive => "receive",
            FunctionKind::Fallback => "fallback",
            FunctionKind::Constructor => "constructor",
        };
        f.write_str(s)
    }
}

/// Declared state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    /// Reads no state
    Pure,
    /// Reads but does not modify state
    View,
    /// Modifies state, rejects ether
    NonPayable,
    /// Modifies state, accepts ether
    Payable,
}

/// A contract function with its selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    kind: FunctionKind,
    name: Option<String>,
    inputs: TupleType,
    outputs: TupleType,
    state_mutability: Option<StateMutability>,
    selector: [u8; SELECTOR_LEN],
}

impl Function {
    /// Build a function, checking the rules for its kind.
    ///
    /// Named functions need a name. `receive` must be payable and take no
    /// inputs, `fallback` takes no inputs, and `receive`, `fallback` and
    /// `constructor` have no outputs and no name.
    pub fn new(
        kind: FunctionKind,
        name: Option<String>,
        inputs: TupleType,
        outputs: TupleType,
        state_mutability: Option<StateMutability>,
    ) -> Result<Self, AbiError> {
        if let Some(name) = &name {
            validate_name(name)?;
        }
        let rule = |rule: &str| AbiError::definition(format!("type is \"{}\"; functions of this type must {}", kind, rule));
        match kind {
            FunctionKind::Function => {
                if name.is_none() {
                    return Err(rule("define name"));
                }
            }
            FunctionKind::Receive | FunctionKind::Fallback | FunctionKind::Constructor => {
                if kind == FunctionKind::Receive && state_mutability != Some(StateMutability::Payable) {
                    return Err(rule("define stateMutability as \"payable\""));
                }
                if kind != FunctionKind::Constructor && !inputs.is_empty() {
                    return Err(rule("define no inputs"));
                }
                if !outputs.is_empty() {
                    return Err(rule("define no outputs"));
                }
                if name.is_some() {
                    return Err(rule("not define name"));
                }
            }
        }

        let canonical = match &name {
            Some(name) => format!("{}{}", name, inputs.canonical_type()),
            None => inputs.canonical_type().to_owned(),
        };
        Ok(Self {
            kind,
            name,
            inputs,
            outputs,
            state_mutability,
            selector: selector(&canonical),
        })
    }

    /// Parse a signature such as `transfer(address,uint256)`
    pub fn parse(signature: &str) -> Result<Self, AbiError> {
        let sig = parse_signature(signature)?;
        let name = sig.name().to_owned();
        Self::new(FunctionKind::Function, Some(name), sig.into_inputs(), TupleType::empty(), None)
    }

    /// Parse a signature and an output tuple such as `(bool)`
    pub fn parse_with_outputs(signature: &str, outputs: &str) -> Result<Self, AbiError> {
        let sig = parse_signature(signature)?;
        let name = sig.name().to_owned();
        let outputs = parse_tuple_type(outputs)?;
        Self::new(FunctionKind::Function, Some(name), sig.into_inputs(), outputs, None)
    }

    /// Function kind
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// Name, absent for receive, fallback and constructor
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parameter types
    pub fn inputs(&self) -> &TupleType {
        &self.inputs
    }

    /// Return types
    pub fn outputs(&self) -> &TupleType {
        &self.outputs
    }

    /// Declared state mutability, if any
    pub fn state_mutability(&self) -> Option<StateMutability> {
        self.state_mutability
    }

    /// Name followed by the canonical input tuple
    pub fn canonical_signature(&self) -> String {
        format!("{}{}", self.name.as_deref().unwrap_or(""), self.inputs.canonical_type())
    }

    /// First four bytes of the Keccak-256 of the canonical signature
    pub fn selector(&self) -> [u8; SELECTOR_LEN] {
        self.selector
    }

    /// Selector as lowercase hex without prefix
    pub fn selector_hex(&self) -> String {
        hex::encode(self.selector)
    }

    /// Validate `args` and return the length of the call data they produce
    pub fn measure_call_length(&self, args: &[Value]) -> Result<usize, EncodeError> {
        SELECTOR_LEN
            .checked_add(measure(&self.inputs, args)?)
            .ok_or(EncodeError::LengthOverflow)
    }

    /// Selector followed by the encoded arguments
    pub fn encode_call(&self, args: &[Value]) -> Result<Bytes, EncodeError> {
        encode_with_prefix(&self.selector, &self.inputs, args)
    }

    /// Check the selector and decode the arguments of `call`
    pub fn decode_call(&self, call: &[u8]) -> Result<Vec<Value>, DecodeError> {
        let found = call.get(..SELECTOR_LEN).ok_or(DecodeError::Truncated {
            needed: SELECTOR_LEN,
            available: call.len(),
        })?;
        if found != self.selector.as_slice() {
            return Err(DecodeError::SelectorMismatch {
                expected: self.selector_hex(),
                found: hex::encode(found),
            });
        }
        decode(&self.inputs, &call[SELECTOR_LEN..])
    }

    /// Decode return data as the output tuple
    pub fn decode_return(&self, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
        decode(&self.outputs, data)
    }

    /// Decode return data of a function with exactly one output
    pub fn decode_single_return(&self, data: &[u8]) -> Result<Value, AbiError> {
        if self.outputs.len() != 1 {
            return Err(AbiError::definition(format!(
                "return type not a singleton: {}",
                self.outputs.canonical_type()
            )));
        }
        let mut values = decode(&self.outputs, data)?;
        values
            .pop()
            .ok_or_else(|| AbiError::definition("empty return tuple"))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_signature())?;
        if !self.outputs.is_empty() {
            write!(f, " returns {}", self.outputs)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), AbiError> {
    let len = name.chars().count();
    if len > MAX_NAME_CHARS {
        return Err(AbiError::definition(format!(
            "function name is too long: {} > {}",
            len, MAX_NAME_CHARS
        )));
    }
    if let Some((i, c)) = name.char_indices().find(|(_, c)| !c.is_ascii() || *c == '(') {
        return Err(AbiError::definition(format!(
            "illegal char 0x{:x} '{}' @ index {}",
            u32::from(c),
            c,
            i
        )));
    }
    Ok(())
}

/// Render call data as a selector row and one labelled row per word
///
/// ```text
/// ID       a9059cbb
/// 0        000000000000000000000000...
/// ```
pub fn format_call(call: &[u8]) -> Result<String, DecodeError> {
    if call.len() < SELECTOR_LEN || (call.len() - SELECTOR_LEN) % WORD_LEN != 0 {
        return Err(DecodeError::MisalignedCall { len: call.len() });
    }
    let mut out = format!("{:<width$}{}", "ID", hex::encode(&call[..SELECTOR_LEN]), width = LABEL_WIDTH);
    for (row, word) in call[SELECTOR_LEN..].chunks(WORD_LEN).enumerate() {
        // writing to a String cannot fail
        let _ = write!(out, "\n{:<width$}{}", row, hex::encode(word), width = LABEL_WIDTH);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_primitives::Address;

    // ==================== Construction ====================

    #[test]
    fn test_parse_selector() {
        let f = Function::parse("baz(uint32,bool)").unwrap();
        assert_eq!(f.selector_hex(), "cdcd77c0");
        assert_eq!(f.canonical_signature(), "baz(uint32,bool)");

        let f = Function::parse("transfer(address,uint)").unwrap();
        assert_eq!(f.canonical_signature(), "transfer(address,uint256)");
        assert_eq!(f.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_kind_rules() {
        let empty = TupleType::empty;
        assert!(Function::new(FunctionKind::Function, None, empty(), empty(), None).is_err());
        assert!(Function::new(FunctionKind::Receive, None, empty(), empty(), Some(StateMutability::View)).is_err());
        assert!(Function::new(FunctionKind::Receive, None, empty(), empty(), Some(StateMutability::Payable)).is_ok());

        let inputs = parse_tuple_type("(uint8)").unwrap();
        assert!(Function::new(FunctionKind::Fallback, None, inputs.clone(), empty(), None).is_err());
        assert!(Function::new(FunctionKind::Constructor, None, inputs.clone(), empty(), None).is_ok());
        assert!(Function::new(FunctionKind::Constructor, None, empty(), inputs, None).is_err());
        assert!(Function::new(FunctionKind::Fallback, Some("f".into()), empty(), empty(), None).is_err());
    }

    #[test]
    fn test_name_rules() {
        let err = Function::new(
            FunctionKind::Function,
            Some("café".into()),
            TupleType::empty(),
            TupleType::empty(),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("@ index 3"));
        assert!(Function::new(
            FunctionKind::Function,
            Some("a".repeat(2049)),
            TupleType::empty(),
            TupleType::empty(),
            None
        )
        .is_err());
    }

    #[test]
    fn test_nameless_signature() {
        let f = Function::new(FunctionKind::Constructor, None, TupleType::empty(), TupleType::empty(), None).unwrap();
        assert_eq!(f.canonical_signature(), "()");
        assert_eq!(f.name(), None);
    }

    // ==================== Calls ====================

    #[test]
    fn test_call_round_trip() {
        let f = Function::parse("transfer(address,uint256)").unwrap();
        let to = Address::from_bytes([0x22; 20]);
        let args = vec![Value::Address(to), Value::uint(1000u64)];
        let call = f.encode_call(&args).unwrap();
        assert_eq!(call.len(), f.measure_call_length(&args).unwrap());
        assert_eq!(call.len(), 68);
        assert_eq!(f.decode_call(&call).unwrap(), args);
    }

    #[test]
    fn test_decode_call_errors() {
        let f = Function::parse("baz(uint32,bool)").unwrap();
        assert_eq!(
            f.decode_call(&[0xcd, 0xcd]).unwrap_err(),
            DecodeError::Truncated {
                needed: 4,
                available: 2
            }
        );
        assert_eq!(
            f.decode_call(&[0, 0, 0, 0]).unwrap_err(),
            DecodeError::SelectorMismatch {
                expected: "cdcd77c0".into(),
                found: "00000000".into()
            }
        );
    }

    #[test]
    fn test_decode_return() {
        let f = Function::parse_with_outputs("name()", "(string)").unwrap();
        let outputs = f.outputs().clone();
        let data = crate::encode::encode(&outputs, &[Value::string("Quill")]).unwrap();
        assert_eq!(f.decode_return(&data).unwrap(), vec![Value::string("Quill")]);
        assert_eq!(f.decode_single_return(&data).unwrap(), Value::string("Quill"));

        let g = Function::parse_with_outputs("balanceOf(address)", "(uint256)").unwrap();
        let mut word = [0u8; 32];
        word[31] = 7;
        assert_eq!(g.decode_single_return(&word).unwrap(), Value::uint(7u64));

        let h = Function::parse_with_outputs("pair()", "(uint8,uint8)").unwrap();
        assert!(matches!(
            h.decode_single_return(&[0u8; 64]),
            Err(AbiError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_display() {
        let f = Function::parse_with_outputs("balanceOf(address)", "(uint)").unwrap();
        assert_eq!(f.to_string(), "balanceOf(address) returns (uint256)");
    }

    // ==================== Formatting ====================

    #[test]
    fn test_format_call() {
        let f = Function::parse("baz(uint32,bool)").unwrap();
        let call = f.encode_call(&[Value::uint(69u64), Value::Bool(true)]).unwrap();
        let formatted = format_call(&call).unwrap();
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ID       cdcd77c0");
        assert_eq!(lines[1], format!("0        {:0>64}", "45"));
        assert_eq!(lines[2], format!("1        {:0>64}", "1"));
    }

    #[test]
    fn test_format_call_misaligned() {
        assert_eq!(
            format_call(&[0u8; 5]).unwrap_err(),
            DecodeError::MisalignedCall { len: 5 }
        );
        assert_eq!(format_call(&[0u8; 4]).unwrap(), "ID       00000000");
    }
}
