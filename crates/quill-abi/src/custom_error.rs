//! Custom Solidity errors carried in revert data

use bytes::Bytes;
use quill_crypto::selector;

use crate::decode::decode;
use crate::encode::encode_with_prefix;
use crate::error::{AbiError, DecodeError, EncodeError};
use crate::function::SELECTOR_LEN;
use crate::parser::parse_signature;
use crate::types::TupleType;
use crate::value::Value;

/// A custom error such as `InsufficientBalance(uint256,uint256)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    name: String,
    inputs: TupleType,
    selector: [u8; SELECTOR_LEN],
}

impl ContractError {
    /// Create an error definition
    pub fn new(name: impl Into<String>, inputs: TupleType) -> Self {
        let name = name.into();
        let selector = selector(&format!("{}{}", name, inputs.canonical_type()));
        Self { name, inputs, selector }
    }

    /// Parse an error signature
    pub fn parse(signature: &str) -> Result<Self, AbiError> {
        let sig = parse_signature(signature)?;
        let name = sig.name().to_owned();
        Ok(Self::new(name, sig.into_inputs()))
    }

    /// Error name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Error parameters
    pub fn inputs(&self) -> &TupleType {
        &self.inputs
    }

    /// Name followed by the canonical input tuple
    pub fn canonical_signature(&self) -> String {
        format!("{}{}", self.name, self.inputs.canonical_type())
    }

    /// Selector prefixing the revert data
    pub fn selector(&self) -> [u8; SELECTOR_LEN] {
        self.selector
    }

    /// Selector as lowercase hex without prefix
    pub fn selector_hex(&self) -> String {
        hex::encode(self.selector)
    }

    /// Revert data for `args`
    pub fn encode_revert(&self, args: &[Value]) -> Result<Bytes, EncodeError> {
        encode_with_prefix(&self.selector, &self.inputs, args)
    }

    /// Check the selector and decode the arguments of revert data
    pub fn decode_revert(&self, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
        let found = data.get(..SELECTOR_LEN).ok_or(DecodeError::Truncated {
            needed: SELECTOR_LEN,
            available: data.len(),
        })?;
        if found != self.selector.as_slice() {
            return Err(DecodeError::SelectorMismatch {
                expected: self.selector_hex(),
                found: hex::encode(found),
            });
        }
        decode(&self.inputs, &data[SELECTOR_LEN..])
    }
}
