//! ABI encoding
//!
//! Head/tail layout: every tuple (and every array, treated as a tuple of
//! identical members) writes one head slot per member, then the tails of its
//! dynamic members in order. A dynamic member's head slot holds the offset of
//! its tail from the start of the enclosing tuple.
//!
//! Arguments are validated and the exact output length is computed before
//! anything is written into a buffer of that size.

use bytes::{BufMut, Bytes, BytesMut};
use quill_primitives::U256;

use crate::error::EncodeError;
use crate::types::{ArrayLength, ParamType, TupleType, WORD_LEN};
use crate::validate::validate_tuple;
use crate::value::Value;

/// Encode `values` as the members of `tuple`
pub fn encode(tuple: &TupleType, values: &[Value]) -> Result<Bytes, EncodeError> {
    encode_with_prefix(&[], tuple, values)
}

/// Encode `values` after a fixed prefix such as a function selector
pub fn encode_with_prefix(prefix: &[u8], tuple: &TupleType, values: &[Value]) -> Result<Bytes, EncodeError> {
    let measured = add_len(prefix.len(), measure(tuple, values)?)?;
    let mut buf = BytesMut::with_capacity(measured);
    buf.put_slice(prefix);
    write_members(&mut buf, tuple.members().iter().zip(values))?;

    if buf.len() != measured {
        return Err(EncodeError::LengthMismatch {
            measured,
            written: buf.len(),
        });
    }
    tracing::trace!("Encoded {} as {} bytes", tuple, measured);
    Ok(buf.freeze())
}

/// Validate `values` and return their encoded length
pub fn measure(tuple: &TupleType, values: &[Value]) -> Result<usize, EncodeError> {
    validate_tuple(tuple, values)?;
    members_len(tuple.members().iter().zip(values))
}

/// Full encoded length of one value: head width if static, tail length if dynamic
fn encoded_len(ty: &ParamType, value: &Value) -> Result<usize, EncodeError> {
    match (ty, value) {
        (ParamType::Bytes, Value::Bytes(data)) => dynamic_len(data.len()),
        (ParamType::String, Value::String(s)) => dynamic_len(s.len()),
        (ParamType::Array(array), Value::Array(items)) => {
            let body = members_len(std::iter::repeat(array.element()).zip(items))?;
            match array.length() {
                ArrayLength::Dynamic => add_len(WORD_LEN, body),
                ArrayLength::Fixed(_) => Ok(body),
            }
        }
        (ParamType::Tuple(tuple), Value::Tuple(items)) => members_len(tuple.members().iter().zip(items)),
        (ty, _) => Ok(ty.head_width()),
    }
}

fn members_len<'a, I>(mut members: I) -> Result<usize, EncodeError>
where
    I: Iterator<Item = (&'a ParamType, &'a Value)>,
{
    members.try_fold(0, |total, (ty, value)| {
        let len = encoded_len(ty, value)?;
        let len = if ty.is_dynamic() { add_len(WORD_LEN, len)? } else { len };
        add_len(total, len)
    })
}

fn add_len(a: usize, b: usize) -> Result<usize, EncodeError> {
    a.checked_add(b).ok_or(EncodeError::LengthOverflow)
}

/// Length word plus the payload padded to whole words
fn dynamic_len(len: usize) -> Result<usize, EncodeError> {
    add_len(WORD_LEN, padded_len(len)?)
}

fn padded_len(len: usize) -> Result<usize, EncodeError> {
    len.div_ceil(WORD_LEN)
        .checked_mul(WORD_LEN)
        .ok_or(EncodeError::LengthOverflow)
}

/// Write heads, then tails, of a sequence of members
fn write_members<'a, I>(buf: &mut BytesMut, members: I) -> Result<(), EncodeError>
where
    I: Iterator<Item = (&'a ParamType, &'a Value)> + Clone,
{
    let head_len = members
        .clone()
        .try_fold(0, |total, (ty, _)| add_len(total, ty.head_width()))?;
    let mut next_tail = head_len;

    for (ty, value) in members.clone() {
        if ty.is_dynamic() {
            write_usize(buf, next_tail);
            next_tail = add_len(next_tail, encoded_len(ty, value)?)?;
        } else {
            write_value(buf, ty, value)?;
        }
    }
    for (ty, value) in members {
        if ty.is_dynamic() {
            write_value(buf, ty, value)?;
        }
    }
    Ok(())
}

fn write_value(buf: &mut BytesMut, ty: &ParamType, value: &Value) -> Result<(), EncodeError> {
    match (ty, value) {
        (ParamType::Bool, Value::Bool(b)) => write_usize(buf, usize::from(*b)),
        (ParamType::Int { .. }, Value::Int(i)) => buf.put_slice(&i.to_be_bytes()),
        (ParamType::Fixed { .. }, Value::Decimal(d)) => buf.put_slice(&d.unscaled().to_be_bytes()),
        (ParamType::Address, Value::Address(addr)) => {
            buf.put_bytes(0, WORD_LEN - addr.as_bytes().len());
            buf.put_slice(addr.as_bytes());
        }
        (ParamType::FixedBytes(_), Value::FixedBytes(data)) | (ParamType::Function, Value::FixedBytes(data)) => {
            buf.put_slice(data);
            buf.put_bytes(0, WORD_LEN - data.len());
        }
        (ParamType::Bytes, Value::Bytes(data)) => write_dynamic_bytes(buf, data),
        (ParamType::String, Value::String(s)) => write_dynamic_bytes(buf, s.as_bytes()),
        (ParamType::Array(array), Value::Array(items)) => {
            if array.length() == ArrayLength::Dynamic {
                write_usize(buf, items.len());
            }
            write_members(buf, std::iter::repeat(array.element()).zip(items))?;
        }
        (ParamType::Tuple(tuple), Value::Tuple(items)) => {
            write_members(buf, tuple.members().iter().zip(items))?;
        }
        (ty, _) => {
            return Err(EncodeError::TypeMismatch {
                expected: ty.canonical_type().into_owned(),
            })
        }
    }
    Ok(())
}

fn write_dynamic_bytes(buf: &mut BytesMut, data: &[u8]) {
    write_usize(buf, data.len());
    buf.put_slice(data);
    buf.put_bytes(0, (WORD_LEN - data.len() % WORD_LEN) % WORD_LEN);
}

fn write_usize(buf: &mut BytesMut, value: usize) {
    let mut word = [0u8; WORD_LEN];
    U256::from(value).to_big_endian(&mut word);
    buf.put_slice(&word);
}
