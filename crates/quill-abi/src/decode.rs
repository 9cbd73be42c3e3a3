//! ABI decoding
//!
//! Heads are read first; dynamic members record their offset and are decoded
//! once the head region is done. In [`DecodeMode::Strict`] each tail must
//! start exactly where the previous one ended, so every input byte is read at
//! most once. [`DecodeMode::Lenient`] follows any in-range offset, including
//! ones shared between members, and accepts missing tail padding; it is meant
//! for trusted input only.

use std::cell::Cell;

use quill_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, ValidationError, ValidationKind};
use crate::types::{ArrayLength, ParamType, TupleType, WORD_LEN};
use crate::validate::check_int;
use crate::value::{Decimal, Value};

/// Offset checking policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Tails must be contiguous and in member order
    #[default]
    Strict,
    /// Any in-range offset is followed
    Lenient,
}

/// Decode `data` as the members of `tuple`, strictly
pub fn decode(tuple: &TupleType, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
    decode_with_mode(tuple, data, DecodeMode::Strict)
}

/// Decode `data` following offsets anywhere in range
pub fn decode_lenient(tuple: &TupleType, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
    decode_with_mode(tuple, data, DecodeMode::Lenient)
}

/// Decode `data` as the members of `tuple`.
///
/// Bytes after the encoded tuple are ignored.
pub fn decode_with_mode(tuple: &TupleType, data: &[u8], mode: DecodeMode) -> Result<Vec<Value>, DecodeError> {
    let decoder = Decoder::new(data, mode);
    let (values, end) = decoder.members(tuple.members().iter(), 0)?;
    tracing::trace!("Decoded {} from {} of {} bytes", tuple, end, data.len());
    Ok(values)
}

/// Decode one static value stored at the start of `data`, e.g. an event topic
pub(crate) fn decode_static(ty: &ParamType, data: &[u8]) -> Result<Value, DecodeError> {
    let decoder = Decoder::new(data, DecodeMode::Strict);
    decoder.value(ty, 0).map(|(value, _)| value)
}

/// Array elements with no encoded width allowed per decode call
pub const MAX_ZERO_WIDTH_ELEMENTS: usize = 1 << 16;

/// Remaining allowance of zero-width array elements.
///
/// Elements of `()` or `T[0]` consume no input, so the input length alone
/// cannot bound how many of them a type declares.
pub(crate) struct ZeroWidthBudget(Cell<usize>);

impl ZeroWidthBudget {
    pub(crate) fn new() -> Self {
        Self(Cell::new(MAX_ZERO_WIDTH_ELEMENTS))
    }

    pub(crate) fn charge(&self, count: usize) -> Result<(), DecodeError> {
        let left = self.0.get().checked_sub(count).ok_or(DecodeError::ZeroWidthLimit {
            limit: MAX_ZERO_WIDTH_ELEMENTS,
        })?;
        self.0.set(left);
        Ok(())
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    mode: DecodeMode,
    budget: ZeroWidthBudget,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8], mode: DecodeMode) -> Self {
        Self {
            data,
            mode,
            budget: ZeroWidthBudget::new(),
        }
    }

    /// Decode a tuple-like run of members starting at `start`.
    ///
    /// Returns the values and the position just past the last tail.
    fn members<'t, I>(&self, members: I, start: usize) -> Result<(Vec<Value>, usize), DecodeError>
    where
        I: Iterator<Item = &'t ParamType>,
    {
        let mut slots: Vec<Option<Value>> = Vec::new();
        let mut pending: Vec<(usize, &'t ParamType, usize)> = Vec::new();

        let mut head = start;
        for ty in members {
            if ty.is_dynamic() {
                pending.push((slots.len(), ty, self.offset(head)?));
                slots.push(None);
                head = advance(head, WORD_LEN)?;
            } else {
                let (value, end) = self.value(ty, head)?;
                slots.push(Some(value));
                head = end;
            }
        }

        let mut tail = head;
        for (i, ty, offset) in pending {
            let target = start
                .checked_add(offset)
                .filter(|t| *t <= self.data.len())
                .ok_or(DecodeError::OffsetOutOfRange {
                    offset: U256::from(offset),
                    position: start,
                })?;
            if target != tail {
                match self.mode {
                    DecodeMode::Strict => {
                        return Err(DecodeError::StrictOffsetMismatch {
                            expected: tail - start,
                            found: offset,
                        })
                    }
                    DecodeMode::Lenient => {
                        tracing::debug!("Lenient decode: tail at {} instead of {}", target, tail);
                    }
                }
            }

            let (value, end) = self.value(ty, target)?;
            slots[i] = Some(value);
            tail = end;
        }

        let values = slots.into_iter().flatten().collect();
        Ok((values, tail))
    }

    /// Decode one value at `pos`; returns it and the position after it
    fn value(&self, ty: &ParamType, pos: usize) -> Result<(Value, usize), DecodeError> {
        match ty {
            ParamType::Bool => {
                let word = self.word(pos)?;
                if word[..WORD_LEN - 1].iter().any(|b| *b != 0) || word[WORD_LEN - 1] > 1 {
                    return Err(DecodeError::InvalidBooleanByte { position: pos });
                }
                Ok((Value::Bool(word[WORD_LEN - 1] == 1), pos + WORD_LEN))
            }
            ParamType::Int { bits, signed } => {
                let value = self.int(pos, *bits, *signed)?;
                Ok((Value::Int(value), pos + WORD_LEN))
            }
            ParamType::Fixed {
                bits,
                scale,
                signed,
            } => {
                let unscaled = self.int(pos, *bits, *signed)?;
                Ok((Value::Decimal(Decimal::new(unscaled, *scale)), pos + WORD_LEN))
            }
            ParamType::Address => {
                let word = self.word(pos)?;
                let raw = U256::from_big_endian(word);
                let address = Address::from_u256(raw).map_err(|_| DecodeError::InvalidValue {
                    position: pos,
                    source: ValidationError::new(ValidationKind::BitLimitExceeded {
                        limit: Address::BITS,
                        actual: raw.bits(),
                    }),
                })?;
                Ok((Value::Address(address), pos + WORD_LEN))
            }
            ParamType::FixedBytes(len) => {
                let word = self.word(pos)?;
                Ok((Value::FixedBytes(word[..*len].to_vec()), pos + WORD_LEN))
            }
            ParamType::Function => {
                let word = self.word(pos)?;
                Ok((
                    Value::FixedBytes(word[..ParamType::FUNCTION_LEN].to_vec()),
                    pos + WORD_LEN,
                ))
            }
            ParamType::Bytes => {
                let (data, end) = self.dynamic_bytes(pos)?;
                Ok((Value::Bytes(data.to_vec()), end))
            }
            ParamType::String => {
                let (data, end) = self.dynamic_bytes(pos)?;
                let s = std::str::from_utf8(data)
                    .map_err(|_| DecodeError::InvalidUtf8 { position: pos })?;
                Ok((Value::String(s.to_owned()), end))
            }
            ParamType::Array(array) => {
                let (count, body) = match array.length() {
                    ArrayLength::Fixed(n) => (n as usize, pos),
                    ArrayLength::Dynamic => (self.length(pos)?, advance(pos, WORD_LEN)?),
                };
                // every element needs at least its head slot
                let width = array.element().head_width();
                let needed = count
                    .checked_mul(width)
                    .and_then(|n| n.checked_add(body))
                    .unwrap_or(usize::MAX);
                if needed > self.data.len() {
                    return Err(DecodeError::Truncated {
                        needed,
                        available: self.data.len(),
                    });
                }
                if width == 0 {
                    self.budget.charge(count)?;
                }
                let (items, end) = self.members(std::iter::repeat(array.element()).take(count), body)?;
                Ok((Value::Array(items), end))
            }
            ParamType::Tuple(tuple) => {
                let (items, end) = self.members(tuple.members().iter(), pos)?;
                Ok((Value::Tuple(items), end))
            }
        }
    }

    fn word(&self, pos: usize) -> Result<&'a [u8; WORD_LEN], DecodeError> {
        let end = advance(pos, WORD_LEN)?;
        self.data
            .get(pos..end)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(DecodeError::Truncated {
                needed: end,
                available: self.data.len(),
            })
    }

    fn int(&self, pos: usize, bits: u16, signed: bool) -> Result<I256, DecodeError> {
        let word = self.word(pos)?;
        let value = if signed {
            I256::from_be_bytes_signed(word)
        } else {
            I256::from_be_bytes_unsigned(word)
        };
        check_int(&value, bits, signed).map_err(|source| DecodeError::InvalidValue {
            position: pos,
            source,
        })?;
        Ok(value)
    }

    /// Offset word at `pos`, which must fit in the input
    fn offset(&self, pos: usize) -> Result<usize, DecodeError> {
        let raw = U256::from_big_endian(self.word(pos)?);
        if raw > U256::from(self.data.len()) {
            return Err(DecodeError::OffsetOutOfRange {
                offset: raw,
                position: pos,
            });
        }
        Ok(raw.as_usize())
    }

    /// Length or count word at `pos`
    fn length(&self, pos: usize) -> Result<usize, DecodeError> {
        let raw = U256::from_big_endian(self.word(pos)?);
        if raw > U256::from(self.data.len()) {
            return Err(DecodeError::Truncated {
                needed: usize::MAX,
                available: self.data.len(),
            });
        }
        Ok(raw.as_usize())
    }

    /// Length-prefixed payload at `pos` and the position after its padding
    fn dynamic_bytes(&self, pos: usize) -> Result<(&'a [u8], usize), DecodeError> {
        let len = self.length(pos)?;
        let start = advance(pos, WORD_LEN)?;
        let end = advance(start, len)?;
        let padded_end = advance(start, len.div_ceil(WORD_LEN) * WORD_LEN)?;
        let required = match self.mode {
            DecodeMode::Strict => padded_end,
            DecodeMode::Lenient => end,
        };
        if required > self.data.len() {
            return Err(DecodeError::Truncated {
                needed: required,
                available: self.data.len(),
            });
        }
        Ok((&self.data[start..end], padded_end.min(self.data.len())))
    }
}

fn advance(pos: usize, by: usize) -> Result<usize, DecodeError> {
    pos.checked_add(by).ok_or(DecodeError::Truncated {
        needed: usize::MAX,
        available: pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::parser::parse_tuple_type;

    fn hex_words(words: &[&str]) -> Vec<u8> {
        words
            .iter()
            .flat_map(|w| hex::decode(format!("{:0>64}", w)).unwrap())
            .collect()
    }

    // ==================== Scalars ====================

    #[test]
    fn test_decode_uint_and_int() {
        let tuple = parse_tuple_type("(uint256,int16)").unwrap();
        let data = hex_words(&["64", &"ff".repeat(32)]);
        let values = decode(&tuple, &data).unwrap();
        assert_eq!(values, vec![Value::uint(100u64), Value::int(-1)]);
    }

    #[test]
    fn test_decode_rejects_out_of_range_int() {
        let tuple = parse_tuple_type("(uint8)").unwrap();
        let data = hex_words(&["100"]);
        match decode(&tuple, &data) {
            Err(DecodeError::InvalidValue { position: 0, source }) => {
                assert_eq!(source.kind, ValidationKind::BitLimitExceeded { limit: 8, actual: 9 });
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
        // int8 word that is not a sign extension of one byte
        let tuple = parse_tuple_type("(int8)").unwrap();
        assert!(decode(&tuple, &hex_words(&["80"])).is_err());
    }

    #[test]
    fn test_decode_bool_strict_values() {
        let tuple = parse_tuple_type("(bool)").unwrap();
        assert_eq!(decode(&tuple, &hex_words(&["1"])).unwrap(), vec![Value::Bool(true)]);
        assert_eq!(
            decode(&tuple, &hex_words(&["2"])).unwrap_err(),
            DecodeError::InvalidBooleanByte { position: 0 }
        );
        assert_eq!(
            decode(&tuple, &hex_words(&["100"])).unwrap_err(),
            DecodeError::InvalidBooleanByte { position: 0 }
        );
    }

    #[test]
    fn test_decode_address_high_bytes_must_be_zero() {
        let tuple = parse_tuple_type("(address)").unwrap();
        let ok = hex_words(&["dead"]);
        assert!(decode(&tuple, &ok).is_ok());
        let dirty = hex_words(&[&format!("01{}", "00".repeat(20))]);
        assert!(matches!(
            decode(&tuple, &dirty),
            Err(DecodeError::InvalidValue { position: 0, .. })
        ));
    }

    // ==================== Truncation and offsets ====================

    #[test]
    fn test_decode_truncated() {
        let tuple = parse_tuple_type("(uint256,uint256)").unwrap();
        let data = hex_words(&["1"]);
        assert_eq!(
            decode(&tuple, &data).unwrap_err(),
            DecodeError::Truncated {
                needed: 64,
                available: 32
            }
        );
    }

    #[test]
    fn test_decode_offset_out_of_range() {
        let tuple = parse_tuple_type("(bytes)").unwrap();
        let data = hex_words(&["1000", "0"]);
        assert!(matches!(
            decode(&tuple, &data),
            Err(DecodeError::OffsetOutOfRange { position: 0, .. })
        ));
    }

    #[test]
    fn test_decode_huge_array_count() {
        let tuple = parse_tuple_type("(uint256[])").unwrap();
        let data = hex_words(&["20", "40"]);
        assert!(matches!(decode(&tuple, &data), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_strict_rejects_gap_lenient_follows() {
        // offset 0x40 leaves an unused word between head and tail
        let tuple = parse_tuple_type("(string)").unwrap();
        let data = hex_words(&["40", "0", "2", "6869"]);
        let mut data = data;
        data[96..98].copy_from_slice(b"hi");
        data[98..128].fill(0);

        assert_eq!(
            decode(&tuple, &data).unwrap_err(),
            DecodeError::StrictOffsetMismatch {
                expected: 32,
                found: 64
            }
        );
        assert_eq!(decode_lenient(&tuple, &data).unwrap(), vec![Value::string("hi")]);
    }

    #[test]
    fn test_strict_rejects_shared_offset() {
        let tuple = parse_tuple_type("(bytes,bytes)").unwrap();
        let mut data = hex_words(&["40", "40", "1", "0"]);
        data[96] = 0xaa;
        assert_eq!(
            decode(&tuple, &data).unwrap_err(),
            DecodeError::StrictOffsetMismatch {
                expected: 0x80,
                found: 0x40
            }
        );
        assert_eq!(
            decode_lenient(&tuple, &data).unwrap(),
            vec![Value::bytes(vec![0xaa]), Value::bytes(vec![0xaa])]
        );
    }

    // ==================== Nested offset tables ====================

    fn string_array() -> (TupleType, Vec<u8>) {
        // 0x20 | count 2 | 0x40 0x80 | "ab" | "cd", element offsets from byte 64
        let tuple = parse_tuple_type("(string[])").unwrap();
        let values = vec![Value::Array(vec![Value::string("ab"), Value::string("cd")])];
        let data = encode(&tuple, &values).unwrap().to_vec();
        assert_eq!(data[95], 0x40);
        assert_eq!(data[127], 0x80);
        (tuple, data)
    }

    #[test]
    fn test_array_element_offsets_shared() {
        let (tuple, mut data) = string_array();
        data[127] = 0x40;
        assert_eq!(
            decode(&tuple, &data).unwrap_err(),
            DecodeError::StrictOffsetMismatch {
                expected: 0x80,
                found: 0x40
            }
        );
        assert_eq!(
            decode_lenient(&tuple, &data).unwrap(),
            vec![Value::Array(vec![Value::string("ab"), Value::string("ab")])]
        );
    }

    #[test]
    fn test_array_element_offsets_backwards() {
        let (tuple, mut data) = string_array();
        data[95] = 0x80;
        data[127] = 0x40;
        assert_eq!(
            decode(&tuple, &data).unwrap_err(),
            DecodeError::StrictOffsetMismatch {
                expected: 0x40,
                found: 0x80
            }
        );
        assert_eq!(
            decode_lenient(&tuple, &data).unwrap(),
            vec![Value::Array(vec![Value::string("cd"), Value::string("ab")])]
        );
    }

    #[test]
    fn test_array_of_dynamic_tuples_offsets() {
        // 0x20 | 2 | 0x40 0xc0 | (1, 0x40, "a") | (2, 0x40, "b")
        let tuple = parse_tuple_type("((uint8,string)[])").unwrap();
        let values = vec![Value::Array(vec![
            Value::Tuple(vec![Value::uint(1u64), Value::string("a")]),
            Value::Tuple(vec![Value::uint(2u64), Value::string("b")]),
        ])];
        let data = encode(&tuple, &values).unwrap().to_vec();
        assert_eq!(data[127], 0xc0);
        assert_eq!(data[319], 0x40);

        // second element reuses the first element's tuple
        let mut shared = data.clone();
        shared[127] = 0x40;
        assert_eq!(
            decode(&tuple, &shared).unwrap_err(),
            DecodeError::StrictOffsetMismatch {
                expected: 0xc0,
                found: 0x40
            }
        );
        assert_eq!(
            decode_lenient(&tuple, &shared).unwrap(),
            vec![Value::Array(vec![
                Value::Tuple(vec![Value::uint(1u64), Value::string("a")]),
                Value::Tuple(vec![Value::uint(1u64), Value::string("a")]),
            ])]
        );

        // string offset inside the second tuple points back into its own head
        let mut backwards = data.clone();
        backwards[319] = 0x20;
        assert_eq!(
            decode(&tuple, &backwards).unwrap_err(),
            DecodeError::StrictOffsetMismatch {
                expected: 0x40,
                found: 0x20
            }
        );
    }

    #[test]
    fn test_nested_tuple_offsets() {
        // 0x40 0xc0 | (true, 0x40, "x") | "y"
        let tuple = parse_tuple_type("((bool,string),string)").unwrap();
        let values = vec![Value::Tuple(vec![Value::Bool(true), Value::string("x")]), Value::string("y")];
        let data = encode(&tuple, &values).unwrap().to_vec();
        assert_eq!(data[127], 0x40);
        assert_eq!(decode(&tuple, &data).unwrap(), values);

        let mut gap = data.clone();
        gap[127] = 0x60;
        assert_eq!(
            decode(&tuple, &gap).unwrap_err(),
            DecodeError::StrictOffsetMismatch {
                expected: 0x40,
                found: 0x60
            }
        );

        let mut outside = data;
        outside[126] = 0xff;
        assert!(matches!(
            decode(&tuple, &outside),
            Err(DecodeError::OffsetOutOfRange { position: 96, .. })
        ));
    }

    /// Every element of every level points at one shared child
    fn fan_out(k: usize, depth: usize) -> Vec<u8> {
        let count = format!("{:x}", k);
        let mut body = hex_words(&[count.as_str()]);
        body.extend(std::iter::repeat(0u8).take(k * WORD_LEN));
        for _ in 1..depth {
            let mut level = hex_words(&[count.as_str()]);
            for _ in 0..k {
                level.extend(hex_words(&[format!("{:x}", k * WORD_LEN).as_str()]));
            }
            level.extend(body);
            body = level;
        }
        let mut data = hex_words(&["20"]);
        data.extend(body);
        data
    }

    #[test]
    fn test_shared_children_do_not_multiply_in_strict_mode() {
        let tuple = parse_tuple_type("(uint8[][][])").unwrap();
        let data = fan_out(4, 3);
        assert!(matches!(
            decode(&tuple, &data),
            Err(DecodeError::StrictOffsetMismatch { .. })
        ));

        let values = decode_lenient(&tuple, &data).unwrap();
        let leaf = Value::Array(vec![Value::uint(0u64); 4]);
        let middle = Value::Array(vec![leaf; 4]);
        assert_eq!(values, vec![Value::Array(vec![middle; 4])]);
    }

    // ==================== Zero-width elements ====================

    #[test]
    fn test_zero_width_elements_decode_from_nothing() {
        let tuple = parse_tuple_type("(()[3],uint8[0][2])").unwrap();
        assert_eq!(
            decode(&tuple, &[]).unwrap(),
            vec![
                Value::Array(vec![Value::Tuple(vec![]); 3]),
                Value::Array(vec![Value::Array(vec![]); 2]),
            ]
        );
    }

    #[test]
    fn test_zero_width_element_limit() {
        let limit = DecodeError::ZeroWidthLimit {
            limit: MAX_ZERO_WIDTH_ELEMENTS,
        };
        let tuple = parse_tuple_type("(()[4294967295])").unwrap();
        assert_eq!(decode(&tuple, &[]).unwrap_err(), limit);

        // the allowance is shared by every array in one call
        let tuple = parse_tuple_type("(()[256][256])").unwrap();
        assert_eq!(decode(&tuple, &[]).unwrap_err(), limit);
        let tuple = parse_tuple_type("(()[255][256])").unwrap();
        assert!(decode(&tuple, &[]).is_ok());
    }

    #[test]
    fn test_missing_padding_only_lenient() {
        let tuple = parse_tuple_type("(bytes)").unwrap();
        let mut data = hex_words(&["20", "2"]);
        data.extend_from_slice(&[0xbe, 0xef]);
        assert!(matches!(decode(&tuple, &data), Err(DecodeError::Truncated { .. })));
        assert_eq!(
            decode_lenient(&tuple, &data).unwrap(),
            vec![Value::bytes(vec![0xbe, 0xef])]
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let tuple = parse_tuple_type("(string)").unwrap();
        let mut data = hex_words(&["20", "1", "0"]);
        data[64] = 0xff;
        assert_eq!(
            decode(&tuple, &data).unwrap_err(),
            DecodeError::InvalidUtf8 { position: 32 }
        );
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let tuple = parse_tuple_type("(uint8)").unwrap();
        let data = hex_words(&["7", "ffff"]);
        assert_eq!(decode(&tuple, &data).unwrap(), vec![Value::uint(7u64)]);
    }

    // ==================== Round trips ====================

    #[test]
    fn test_nested_dynamic_roundtrip() {
        let tuple = parse_tuple_type("((uint8,string)[],bytes3[2],(bool[],(string)[2]))").unwrap();
        let values = vec![
            Value::Array(vec![
                Value::Tuple(vec![Value::uint(1u64), Value::string("one")]),
                Value::Tuple(vec![Value::uint(2u64), Value::string("")]),
            ]),
            Value::Array(vec![
                Value::FixedBytes(b"abc".to_vec()),
                Value::FixedBytes(b"xyz".to_vec()),
            ]),
            Value::Tuple(vec![
                Value::Array(vec![Value::Bool(true), Value::Bool(false)]),
                Value::Array(vec![
                    Value::Tuple(vec![Value::string("a".repeat(40))]),
                    Value::Tuple(vec![Value::string("b")]),
                ]),
            ]),
        ];
        let encoded = encode(&tuple, &values).unwrap();
        assert_eq!(decode(&tuple, &encoded).unwrap(), values);
    }

    #[test]
    fn test_decode_mode_serde_names() {
        assert_eq!(serde_json::to_string(&DecodeMode::Lenient).unwrap(), "\"lenient\"");
        let mode: DecodeMode = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(mode, DecodeMode::Strict);
    }
}
