//! Contract events and log decoding

use quill_crypto::keccak256;
use quill_primitives::H256;

use crate::decode::{decode, decode_static};
use crate::error::{AbiError, DecodeError};
use crate::parser::parse_signature;
use crate::types::{ParamType, TupleType};
use crate::value::Value;

/// A contract event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    name: String,
    inputs: TupleType,
    indexed: Vec<bool>,
    anonymous: bool,
    indexed_params: TupleType,
    non_indexed_params: TupleType,
    signature_hash: H256,
}

impl Event {
    /// Create an event; `indexed` flags each input
    pub fn new(name: impl Into<String>, inputs: TupleType, indexed: Vec<bool>, anonymous: bool) -> Result<Self, AbiError> {
        let name = name.into();
        if indexed.len() != inputs.len() {
            return Err(AbiError::definition(format!(
                "indexed manifest has {} entries for {} inputs",
                indexed.len(),
                inputs.len()
            )));
        }
        let indexed_params = inputs.select(&indexed);
        let non_indexed_params = inputs.exclude(&indexed);
        let signature_hash = keccak256(format!("{}{}", name, inputs.canonical_type()).as_bytes());
        Ok(Self {
            name,
            inputs,
            indexed,
            anonymous,
            indexed_params,
            non_indexed_params,
            signature_hash,
        })
    }

    /// Parse `Transfer(address,address,uint256)` with the given indexed flags
    pub fn parse(signature: &str, indexed: &[bool]) -> Result<Self, AbiError> {
        let sig = parse_signature(signature)?;
        let name = sig.name().to_owned();
        Self::new(name, sig.into_inputs(), indexed.to_vec(), false)
    }

    /// Event name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All parameters in declaration order
    pub fn inputs(&self) -> &TupleType {
        &self.inputs
    }

    /// Indexed flag per input
    pub fn indexed(&self) -> &[bool] {
        &self.indexed
    }

    /// Whether topic 0 is omitted from logs
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Parameters carried in topics
    pub fn indexed_params(&self) -> &TupleType {
        &self.indexed_params
    }

    /// Parameters carried in log data
    pub fn non_indexed_params(&self) -> &TupleType {
        &self.non_indexed_params
    }

    /// Name followed by the canonical input tuple
    pub fn canonical_signature(&self) -> String {
        format!("{}{}", self.name, self.inputs.canonical_type())
    }

    /// Keccak-256 of the canonical signature, topic 0 of non-anonymous logs
    pub fn signature_hash(&self) -> H256 {
        self.signature_hash
    }

    /// Decode a log into values in declaration order.
    ///
    /// Indexed parameters that are dynamic, arrays or tuples are stored as a
    /// hash in their topic and come back as raw `bytes32`.
    pub fn decode_args(&self, topics: &[H256], data: &[u8]) -> Result<Vec<Value>, DecodeError> {
        let skip = usize::from(!self.anonymous);
        let expected = self.indexed_params.len() + skip;
        if topics.len() != expected {
            return Err(DecodeError::TopicCountMismatch {
                expected,
                got: topics.len(),
            });
        }
        if !self.anonymous && topics[0] != self.signature_hash {
            return Err(DecodeError::SelectorMismatch {
                expected: hex::encode(self.signature_hash.as_bytes()),
                found: hex::encode(topics[0].as_bytes()),
            });
        }

        let mut from_topics = Vec::with_capacity(self.indexed_params.len());
        for (ty, topic) in self.indexed_params.members().iter().zip(&topics[skip..]) {
            let value = match ty {
                ParamType::Array(_) | ParamType::Tuple(_) | ParamType::Bytes | ParamType::String => Value::bytes32(*topic),
                _ => decode_static(ty, topic.as_bytes())?,
            };
            from_topics.push(value);
        }
        let from_data = decode(&self.non_indexed_params, data)?;

        let mut from_topics = from_topics.into_iter();
        let mut from_data = from_data.into_iter();
        let merged = self
            .indexed
            .iter()
            .filter_map(|indexed| {
                if *indexed {
                    from_topics.next()
                } else {
                    from_data.next()
                }
            })
            .collect();
        Ok(merged)
    }
}
