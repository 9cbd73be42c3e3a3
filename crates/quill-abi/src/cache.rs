//! Type cache - memoizes parsed type and signature strings

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::ParseError;
use crate::parser::{parse_signature_with_limit, parse_type_with_limit, Signature, DEFAULT_MAX_TYPE_LENGTH};
use crate::types::ParamType;

/// Concurrent `string -> descriptor` cache
///
/// Lookups take a shard read lock; parsing always happens with no lock held,
/// so two threads missing on the same key may both parse it. The first
/// insert wins and both get the same `Arc`.
pub struct TypeCache {
    /// Parsed single types, keyed by the input string
    types: DashMap<String, Arc<ParamType>>,
    /// Parsed signatures, keyed by the input string
    signatures: DashMap<String, Arc<Signature>>,
    max_len: usize,
}

impl TypeCache {
    /// Create an empty cache with the default length limit
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_TYPE_LENGTH)
    }

    /// Create an empty cache rejecting strings longer than `max_len`
    pub fn with_max_length(max_len: usize) -> Self {
        Self {
            types: DashMap::new(),
            signatures: DashMap::new(),
            max_len,
        }
    }

    /// Cached descriptor for `type_string`, parsing it on a miss
    pub fn get_or_parse(&self, type_string: &str) -> Result<Arc<ParamType>, ParseError> {
        if let Some(entry) = self.types.get(type_string) {
            return Ok(Arc::clone(entry.value()));
        }

        let parsed = Arc::new(parse_type_with_limit(type_string, self.max_len)?);
        tracing::debug!("Type cache miss: {}", type_string);
        let entry = self.types.entry(type_string.to_owned()).or_insert(parsed);
        Ok(Arc::clone(entry.value()))
    }

    /// Cached signature for `signature`, parsing it on a miss
    pub fn get_or_parse_signature(&self, signature: &str) -> Result<Arc<Signature>, ParseError> {
        if let Some(entry) = self.signatures.get(signature) {
            return Ok(Arc::clone(entry.value()));
        }

        let parsed = Arc::new(parse_signature_with_limit(signature, self.max_len)?);
        tracing::debug!("Signature cache miss: {}", signature);
        let entry = self.signatures.entry(signature.to_owned()).or_insert(parsed);
        Ok(Arc::clone(entry.value()))
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.types.len() + self.signatures.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.types.clear();
        self.signatures.clear();
    }
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new()
    }
}
