//! Non-standard packed encoding
//!
//! Every value takes its minimal declared width with no padding and no
//! offsets. Dynamic `bytes`/`string` are written raw and arrays are plain
//! concatenations, so the encoding is not self-describing: decoding works only
//! when at most one top-level member is dynamic.

use bytes::{BufMut, Bytes, BytesMut};
use quill_primitives::{Address, I256};

use crate::decode::ZeroWidthBudget;
use crate::error::{DecodeError, EncodeError};
use crate::types::{ArrayLength, ParamType, TupleType, WORD_LEN};
use crate::validate::{check_int, validate_tuple};
use crate::value::{Decimal, Value};

/// Packed width of a type, or `None` if it depends on the value
pub fn packed_width(ty: &ParamType) -> Option<usize> {
    match ty {
        ParamType::Bool => Some(1),
        ParamType::Int { bits, .. } | ParamType::Fixed { bits, .. } => Some(usize::from(*bits) / 8),
        ParamType::Address => Some(Address::LEN),
        ParamType::FixedBytes(len) => Some(*len),
        ParamType::Function => Some(ParamType::FUNCTION_LEN),
        ParamType::Bytes | ParamType::String => None,
        ParamType::Array(array) => match array.length() {
            ArrayLength::Fixed(n) => packed_width(array.element())?.checked_mul(n as usize),
            ArrayLength::Dynamic => None,
        },
        ParamType::Tuple(tuple) => tuple
            .members()
            .iter()
            .try_fold(0usize, |acc, ty| acc.checked_add(packed_width(ty)?)),
    }
}

/// Packed-encode `values` as the members of `tuple`
pub fn encode_packed(tuple: &TupleType, values: &[Value]) -> Result<Bytes, EncodeError> {
    validate_tuple(tuple, values)?;
    let measured: usize = tuple
        .members()
        .iter()
        .zip(values)
        .map(|(ty, value)| packed_len(ty, value))
        .sum();

    let mut buf = BytesMut::with_capacity(measured);
    for (ty, value) in tuple.members().iter().zip(values) {
        write_packed(&mut buf, ty, value)?;
    }
    if buf.len() != measured {
        return Err(EncodeError::LengthMismatch {
            measured,
            written: buf.len(),
        });
    }
    tracing::trace!("Packed {} into {} bytes", tuple, measured);
    Ok(buf.freeze())
}

fn packed_len(ty: &ParamType, value: &Value) -> usize {
    match (ty, value) {
        (ParamType::Bytes, Value::Bytes(data)) => data.len(),
        (ParamType::String, Value::String(s)) => s.len(),
        (ParamType::Array(array), Value::Array(items)) => {
            items.iter().map(|item| packed_len(array.element(), item)).sum()
        }
        (ParamType::Tuple(tuple), Value::Tuple(items)) => tuple
            .members()
            .iter()
            .zip(items)
            .map(|(ty, item)| packed_len(ty, item))
            .sum(),
        (ty, _) => packed_width(ty).unwrap_or(0),
    }
}

fn write_packed(buf: &mut BytesMut, ty: &ParamType, value: &Value) -> Result<(), EncodeError> {
    match (ty, value) {
        (ParamType::Bool, Value::Bool(b)) => buf.put_u8(u8::from(*b)),
        (ParamType::Int { bits, .. }, Value::Int(i)) => put_int(buf, i, *bits),
        (ParamType::Fixed { bits, .. }, Value::Decimal(d)) => put_int(buf, &d.unscaled(), *bits),
        (ParamType::Address, Value::Address(addr)) => buf.put_slice(addr.as_bytes()),
        (ParamType::FixedBytes(_), Value::FixedBytes(data))
        | (ParamType::Function, Value::FixedBytes(data))
        | (ParamType::Bytes, Value::Bytes(data)) => buf.put_slice(data),
        (ParamType::String, Value::String(s)) => buf.put_slice(s.as_bytes()),
        (ParamType::Array(array), Value::Array(items)) => {
            for item in items {
                write_packed(buf, array.element(), item)?;
            }
        }
        (ParamType::Tuple(tuple), Value::Tuple(items)) => {
            for (ty, item) in tuple.members().iter().zip(items) {
                write_packed(buf, ty, item)?;
            }
        }
        (ty, _) => {
            return Err(EncodeError::TypeMismatch {
                expected: ty.canonical_type().into_owned(),
            })
        }
    }
    Ok(())
}

/// Low `bits / 8` bytes of the two's-complement word; valid after range checks
fn put_int(buf: &mut BytesMut, value: &I256, bits: u16) {
    let word = value.to_be_bytes();
    buf.put_slice(&word[WORD_LEN - usize::from(bits) / 8..]);
}

/// Decode packed `data` as the members of `tuple`.
///
/// Static members before the dynamic one are read from the front and those
/// after it from the back; the dynamic member receives whatever lies between.
/// With no dynamic member, bytes after the last member are ignored.
pub fn decode_packed(tuple: &TupleType, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
    let members = tuple.members();
    let dynamic: Vec<usize> = members
        .iter()
        .enumerate()
        .filter(|(_, ty)| packed_width(ty).is_none())
        .map(|(i, _)| i)
        .collect();

    let budget = ZeroWidthBudget::new();
    let values = match dynamic.as_slice() {
        [] => {
            let (values, _) = decode_run(members.iter(), data, 0, &budget)?;
            values
        }
        [mark] => {
            let mark = *mark;
            let tail_width = static_width(&members[mark + 1..])?;
            let back = data.len().checked_sub(tail_width).ok_or(DecodeError::Truncated {
                needed: tail_width,
                available: data.len(),
            })?;
            let (mut values, front) = decode_run(members[..mark].iter(), &data[..back], 0, &budget)?;
            let (tail, _) = decode_run(members[mark + 1..].iter(), data, back, &budget)?;
            values.push(decode_gap(&members[mark], &data[front..back], front, &budget)?);
            values.extend(tail);
            values
        }
        more => {
            return Err(DecodeError::AmbiguousPacked {
                dynamic_members: more.len(),
            })
        }
    };
    tracing::trace!("Unpacked {} from {} bytes", tuple, data.len());
    Ok(values)
}

fn static_width(members: &[ParamType]) -> Result<usize, DecodeError> {
    members.iter().try_fold(0usize, |acc, ty| {
        packed_width(ty)
            .and_then(|w| acc.checked_add(w))
            .ok_or_else(|| DecodeError::UnsupportedPacked(ty.canonical_type().into_owned()))
    })
}

/// Decode consecutive static members starting at `pos`
fn decode_run<'t, I>(
    members: I,
    data: &[u8],
    mut pos: usize,
    budget: &ZeroWidthBudget,
) -> Result<(Vec<Value>, usize), DecodeError>
where
    I: Iterator<Item = &'t ParamType>,
{
    let mut values = Vec::new();
    for ty in members {
        let (value, end) = decode_static_packed(ty, data, pos, budget)?;
        values.push(value);
        pos = end;
    }
    Ok((values, pos))
}

fn decode_static_packed(
    ty: &ParamType,
    data: &[u8],
    pos: usize,
    budget: &ZeroWidthBudget,
) -> Result<(Value, usize), DecodeError> {
    let width = packed_width(ty).ok_or_else(|| DecodeError::UnsupportedPacked(ty.canonical_type().into_owned()))?;
    let end = pos.checked_add(width).unwrap_or(usize::MAX);
    let bytes = data.get(pos..end).ok_or(DecodeError::Truncated {
        needed: end,
        available: data.len(),
    })?;

    let value = match ty {
        ParamType::Bool => match bytes[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            _ => return Err(DecodeError::InvalidBooleanByte { position: pos }),
        },
        ParamType::Int { bits, signed } => Value::Int(packed_int(bytes, *bits, *signed, pos)?),
        ParamType::Fixed {
            bits,
            scale,
            signed,
        } => Value::Decimal(Decimal::new(packed_int(bytes, *bits, *signed, pos)?, *scale)),
        ParamType::Address => {
            let address = Address::from_slice(bytes).map_err(|_| DecodeError::Truncated {
                needed: end,
                available: data.len(),
            })?;
            Value::Address(address)
        }
        ParamType::FixedBytes(_) | ParamType::Function => Value::FixedBytes(bytes.to_vec()),
        ParamType::Array(array) => {
            let count = match array.length() {
                ArrayLength::Fixed(n) => n as usize,
                ArrayLength::Dynamic => 0,
            };
            // the slice above already bounds nonzero-width elements
            if width == 0 {
                budget.charge(count)?;
            }
            let (items, _) = decode_run(std::iter::repeat(array.element()).take(count), data, pos, budget)?;
            Value::Array(items)
        }
        ParamType::Tuple(tuple) => {
            let (items, _) = decode_run(tuple.members().iter(), data, pos, budget)?;
            Value::Tuple(items)
        }
        ParamType::Bytes | ParamType::String => {
            return Err(DecodeError::UnsupportedPacked(ty.canonical_type().into_owned()))
        }
    };
    Ok((value, end))
}

fn packed_int(bytes: &[u8], bits: u16, signed: bool, pos: usize) -> Result<I256, DecodeError> {
    let value = if signed {
        I256::from_be_bytes_signed(bytes)
    } else {
        I256::from_be_bytes_unsigned(bytes)
    };
    check_int(&value, bits, signed).map_err(|source| DecodeError::InvalidValue { position: pos, source })?;
    Ok(value)
}

/// The dynamic member, given exactly the bytes between the static runs
fn decode_gap(ty: &ParamType, gap: &[u8], pos: usize, budget: &ZeroWidthBudget) -> Result<Value, DecodeError> {
    match ty {
        ParamType::Bytes => Ok(Value::Bytes(gap.to_vec())),
        ParamType::String => std::str::from_utf8(gap)
            .map(|s| Value::String(s.to_owned()))
            .map_err(|_| DecodeError::InvalidUtf8 { position: pos }),
        ParamType::Array(array) if array.length() == ArrayLength::Dynamic => {
            let element_width = packed_width(array.element())
                .filter(|w| *w > 0)
                .ok_or_else(|| DecodeError::UnsupportedPacked(ty.canonical_type().into_owned()))?;
            if gap.len() % element_width != 0 {
                return Err(DecodeError::RaggedPacked {
                    gap: gap.len(),
                    element_width,
                });
            }
            let count = gap.len() / element_width;
            let (items, _) = decode_run(std::iter::repeat(array.element()).take(count), gap, 0, budget)?;
            Ok(Value::Array(items))
        }
        _ => Err(DecodeError::UnsupportedPacked(ty.canonical_type().into_owned())),
    }
}
