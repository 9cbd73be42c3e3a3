//! Codec configuration and the configured facade

use std::sync::Arc;

use bytes::Bytes;
use quill_crypto::selector;
use serde::{Deserialize, Serialize};

use crate::cache::TypeCache;
use crate::decode::{decode_with_mode, DecodeMode};
use crate::encode::{encode, encode_with_prefix};
use crate::error::{AbiError, DecodeError, EncodeError, ParseError};
use crate::packed::{decode_packed, encode_packed};
use crate::parser::{parse_signature_with_limit, parse_type_with_limit, Signature, DEFAULT_MAX_TYPE_LENGTH};
use crate::types::{ParamType, TupleType};
use crate::value::Value;

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Offset checking policy for standard decoding
    pub decode_mode: DecodeMode,
    /// Longest accepted type or signature string
    pub max_type_length: usize,
    /// Memoize parsed type strings
    pub cache_types: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            decode_mode: DecodeMode::Strict,
            max_type_length: DEFAULT_MAX_TYPE_LENGTH,
            cache_types: true,
        }
    }
}

/// Parser, cache and codecs behind one [`CodecConfig`]
pub struct AbiCodec {
    config: CodecConfig,
    cache: TypeCache,
}

impl AbiCodec {
    /// Create a codec with `config`
    pub fn new(config: CodecConfig) -> Self {
        let cache = TypeCache::with_max_length(config.max_type_length);
        Self { config, cache }
    }

    /// Active configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Type cache backing this codec
    pub fn cache(&self) -> &TypeCache {
        &self.cache
    }

    /// Parse a signature such as `transfer(address,uint256)`
    pub fn parse_signature(&self, signature: &str) -> Result<Arc<Signature>, ParseError> {
        if self.config.cache_types {
            self.cache.get_or_parse_signature(signature)
        } else {
            parse_signature_with_limit(signature, self.config.max_type_length).map(Arc::new)
        }
    }

    /// Parse a single type string
    pub fn parse_type(&self, type_string: &str) -> Result<Arc<ParamType>, ParseError> {
        if self.config.cache_types {
            self.cache.get_or_parse(type_string)
        } else {
            parse_type_with_limit(type_string, self.config.max_type_length).map(Arc::new)
        }
    }

    /// Standard-encode `values`
    pub fn encode(&self, tuple: &TupleType, values: &[Value]) -> Result<Bytes, EncodeError> {
        encode(tuple, values)
    }

    /// Standard-decode `data` with the configured mode
    pub fn decode(&self, tuple: &TupleType, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
        decode_with_mode(tuple, data, self.config.decode_mode)
    }

    /// Packed-encode `values`
    pub fn encode_packed(&self, tuple: &TupleType, values: &[Value]) -> Result<Bytes, EncodeError> {
        encode_packed(tuple, values)
    }

    /// Decode packed `data`
    pub fn decode_packed(&self, tuple: &TupleType, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
        decode_packed(tuple, data)
    }

    /// Selector of `signature` followed by its encoded arguments
    pub fn encode_call(&self, signature: &str, values: &[Value]) -> Result<Bytes, AbiError> {
        let sig = self.parse_signature(signature)?;
        Ok(encode_with_prefix(&selector(sig.canonical()), sig.inputs(), values)?)
    }

    /// Arguments of call data for `signature`, after checking its selector
    pub fn decode_call(&self, signature: &str, call: &[u8]) -> Result<Vec<Value>, AbiError> {
        let sig = self.parse_signature(signature)?;
        let expected = selector(sig.canonical());
        let found = call.get(..4).ok_or(DecodeError::Truncated {
            needed: 4,
            available: call.len(),
        })?;
        if found != expected.as_slice() {
            return Err(DecodeError::SelectorMismatch {
                expected: hex::encode(expected),
                found: hex::encode(found),
            }
            .into());
        }
        Ok(self.decode(sig.inputs(), &call[4..])?)
    }
}

impl Default for AbiCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}
