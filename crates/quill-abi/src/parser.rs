//! Signature and type string parser
//!
//! Grammar, over ASCII:
//!
//! ```text
//! signature := name tuple
//! tuple     := '(' [ element { ',' element } ] ')'
//! element   := ( tuple | base ) { '[' [ digits ] ']' }
//! base      := [a-z0-9]+
//! ```
//!
//! The rightmost array suffix is the outermost array, so `uint8[2][]` is a
//! dynamic array of `uint8[2]`. The aliases `int`, `uint`, `fixed` and
//! `ufixed` are rewritten to their full names; nothing else is.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::ParseError;
use crate::types::{ArrayLength, ArrayType, ParamType, TupleType};

/// Longest type or signature string accepted by default
pub const DEFAULT_MAX_TYPE_LENGTH: usize = 2000;

/// A parsed `name(types...)` signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    name: String,
    canonical: String,
    inputs: TupleType,
    canonicalized: bool,
}

impl Signature {
    /// Text before the parameter list, possibly empty
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical signature, e.g. `foo(int256)`
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Parameter types
    pub fn inputs(&self) -> &TupleType {
        &self.inputs
    }

    /// Take the parameter types
    pub fn into_inputs(self) -> TupleType {
        self.inputs
    }

    /// Whether an alias such as `uint` was rewritten
    pub fn was_canonicalized(&self) -> bool {
        self.canonicalized
    }
}

/// Parse a function signature such as `transfer(address,uint)`
pub fn parse_signature(signature: &str) -> Result<Signature, ParseError> {
    parse_signature_with_limit(signature, DEFAULT_MAX_TYPE_LENGTH)
}

/// Parse a function signature no longer than `max_len` bytes
pub fn parse_signature_with_limit(signature: &str, max_len: usize) -> Result<Signature, ParseError> {
    check_length(signature, max_len)?;
    let open = signature.find('(').ok_or(ParseError::ParamsStartNotFound)?;
    let name = &signature[..open];
    if let Some((offset, ch)) = name.char_indices().find(|(_, c)| !c.is_ascii()) {
        return Err(ParseError::NonAsciiChar { offset, ch });
    }

    let (end, inputs) = parse_tuple(signature, open)?;
    if end != signature.len() {
        return Err(unexpected(signature, end));
    }

    let canonical = format!("{}{}", name, inputs.canonical_type());
    // Any accepted input differs from its canonical form only by alias rewrites.
    let canonicalized = canonical != signature;
    Ok(Signature {
        name: name.to_owned(),
        canonical,
        inputs,
        canonicalized,
    })
}

/// Parse a single type such as `uint256[]` or `(bool,string)[2]`
pub fn parse_type(type_string: &str) -> Result<ParamType, ParseError> {
    parse_type_with_limit(type_string, DEFAULT_MAX_TYPE_LENGTH)
}

/// Parse a single type no longer than `max_len` bytes
pub fn parse_type_with_limit(type_string: &str, max_len: usize) -> Result<ParamType, ParseError> {
    check_length(type_string, max_len)?;
    if type_string.is_empty() {
        return Err(ParseError::EmptyParameter {
            index: 0,
            offset: 0,
        });
    }
    let (end, ty) = parse_element(type_string, 0)?;
    if end != type_string.len() {
        return Err(unexpected(type_string, end));
    }
    Ok(ty)
}

/// Parse a bare tuple such as `(uint256,bytes)`
pub fn parse_tuple_type(tuple_string: &str) -> Result<TupleType, ParseError> {
    check_length(tuple_string, DEFAULT_MAX_TYPE_LENGTH)?;
    if !tuple_string.starts_with('(') {
        return Err(ParseError::ParamsStartNotFound);
    }
    let (end, tuple) = parse_tuple(tuple_string, 0)?;
    if end != tuple_string.len() {
        return Err(unexpected(tuple_string, end));
    }
    Ok(tuple)
}

/// Canonical form of a signature
pub fn canonicalize(signature: &str) -> Result<String, ParseError> {
    parse_signature(signature).map(|sig| sig.canonical)
}

/// Build one type from a JSON ABI `type` field.
///
/// Strings starting with `tuple` take their members from `components` and
/// may carry array suffixes (`tuple[2][]`); every other string is parsed as a
/// plain type and `components` is ignored.
pub fn build_type(type_string: &str, components: Option<&TupleType>) -> Result<ParamType, ParseError> {
    let Some(suffix) = type_string.strip_prefix("tuple") else {
        return parse_type(type_string);
    };
    let tuple = components
        .cloned()
        .ok_or_else(|| ParseError::MissingComponents {
            type_string: type_string.to_owned(),
        })?;
    let start = type_string.len() - suffix.len();
    let (end, ty) = wrap_suffixes(type_string, start, ParamType::Tuple(tuple))?;
    if end != type_string.len() {
        return Err(unexpected(type_string, end));
    }
    Ok(ty)
}

fn check_length(input: &str, max_len: usize) -> Result<(), ParseError> {
    if input.len() > max_len {
        return Err(ParseError::TooLong {
            length: input.len(),
            max: max_len,
        });
    }
    Ok(())
}

/// Parse the tuple opening at `open`; returns the offset after its `)`
fn parse_tuple(input: &str, open: usize) -> Result<(usize, TupleType), ParseError> {
    let bytes = input.as_bytes();
    let mut pos = open + 1;
    if bytes.get(pos) == Some(&b')') {
        return Ok((pos + 1, TupleType::empty()));
    }

    let mut elements = Vec::new();
    loop {
        match bytes.get(pos) {
            None => return Err(ParseError::NonTerminating { offset: input.len() }),
            Some(b',') | Some(b')') => {
                return Err(ParseError::EmptyParameter {
                    index: elements.len(),
                    offset: pos,
                })
            }
            Some(_) => {}
        }

        let (end, element) = parse_element(input, pos)?;
        elements.push(element);

        match bytes.get(end) {
            None => return Err(ParseError::NonTerminating { offset: input.len() }),
            Some(b',') => pos = end + 1,
            Some(b')') => return Ok((end + 1, TupleType::new(elements))),
            Some(_) => return Err(unexpected(input, end)),
        }
    }
}

/// Parse one element starting at `start`; returns the offset after it
fn parse_element(input: &str, start: usize) -> Result<(usize, ParamType), ParseError> {
    let bytes = input.as_bytes();
    if bytes.get(start) == Some(&b'(') {
        let (end, tuple) = parse_tuple(input, start)?;
        return wrap_suffixes(input, end, ParamType::Tuple(tuple));
    }

    let end = start
        + bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            .count();
    match bytes.get(end) {
        None | Some(b',') | Some(b')') | Some(b'[') => {}
        Some(_) => return Err(unexpected(input, end)),
    }
    if end == start {
        return Err(unexpected(input, start));
    }

    let word = &input[start..end];
    let base = resolve_base(canonical_alias(word)).ok_or_else(|| ParseError::UnknownType {
        offset: start,
        type_string: word.to_owned(),
    })?;
    wrap_suffixes(input, end, base)
}

/// Apply the array suffixes found at `pos`, innermost first.
///
/// A static array whose head width does not fit in `usize` is rejected at its
/// length digits.
fn wrap_suffixes(input: &str, mut pos: usize, mut ty: ParamType) -> Result<(usize, ParamType), ParseError> {
    while input.as_bytes().get(pos) == Some(&b'[') {
        let (end, length) = parse_array_length(input, pos)?;
        if let ArrayLength::Fixed(n) = length {
            if !ty.is_dynamic() && ty.head_width().checked_mul(n as usize).is_none() {
                return Err(ParseError::InvalidArrayLength { offset: pos + 1 });
            }
        }
        ty = ParamType::Array(ArrayType::new(ty, length));
        pos = end;
    }
    Ok((pos, ty))
}

/// Parse `[]` or `[N]` opening at `open`
fn parse_array_length(input: &str, open: usize) -> Result<(usize, ArrayLength), ParseError> {
    let bytes = input.as_bytes();
    let digits_start = open + 1;
    let close = digits_start
        + bytes[digits_start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();

    match bytes.get(close) {
        Some(b']') => {}
        None => return Err(ParseError::NonTerminating { offset: input.len() }),
        Some(_) => {
            return match char_at(input, close) {
                Some(ch) if ch == '-' || is_type_char(ch) => Err(ParseError::InvalidArrayLength {
                    offset: digits_start,
                }),
                _ => Err(unexpected(input, close)),
            }
        }
    }

    let digits = &input[digits_start..close];
    if digits.is_empty() {
        return Ok((close + 1, ArrayLength::Dynamic));
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(ParseError::InvalidArrayLength {
            offset: digits_start,
        });
    }
    let len = digits
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidArrayLength {
            offset: digits_start,
        })?;
    Ok((close + 1, ArrayLength::Fixed(len)))
}

fn canonical_alias(word: &str) -> &str {
    match word {
        "int" => "int256",
        "uint" => "uint256",
        "fixed" => "fixed128x18",
        "ufixed" => "ufixed128x18",
        other => other,
    }
}

fn is_type_char(ch: char) -> bool {
    matches!(ch, 'a'..='z' | '0'..='9' | '[' | ']' | '(' | ')' | ',')
}

fn char_at(input: &str, offset: usize) -> Option<char> {
    input.get(offset..).and_then(|rest| rest.chars().next())
}

/// Error for an unexpected character at `offset`
fn unexpected(input: &str, offset: usize) -> ParseError {
    match char_at(input, offset) {
        Some(ch) if !is_type_char(ch) => ParseError::NonTypeChar { offset, ch },
        _ => ParseError::IllegalTermination { offset },
    }
}

fn base_types() -> &'static HashMap<String, ParamType> {
    static BASE_TYPES: OnceLock<HashMap<String, ParamType>> = OnceLock::new();
    BASE_TYPES.get_or_init(|| {
        let mut table = HashMap::with_capacity(100);
        table.insert("bool".to_owned(), ParamType::Bool);
        table.insert("address".to_owned(), ParamType::Address);
        table.insert("bytes".to_owned(), ParamType::Bytes);
        table.insert("string".to_owned(), ParamType::String);
        table.insert("function".to_owned(), ParamType::Function);
        for len in 1..=32 {
            table.insert(format!("bytes{}", len), ParamType::FixedBytes(len));
        }
        for bits in (8..=256u16).step_by(8) {
            table.insert(format!("int{}", bits), ParamType::int(bits));
            table.insert(format!("uint{}", bits), ParamType::uint(bits));
        }
        table
    })
}

fn resolve_base(word: &str) -> Option<ParamType> {
    base_types().get(word).cloned().or_else(|| parse_fixed(word))
}

/// Match `fixedMxN` / `ufixedMxN` with M in 8..=256 step 8 and N in 1..=80
fn parse_fixed(word: &str) -> Option<ParamType> {
    let (rest, signed) = match word.strip_prefix("ufixed") {
        Some(rest) => (rest, false),
        None => (word.strip_prefix("fixed")?, true),
    };
    let (m, n) = rest.split_once('x')?;
    let bits: u16 = canonical_number(m)?;
    let scale: u8 = canonical_number(n)?;
    if bits % 8 != 0 || !(8..=256).contains(&bits) || !(1..=80).contains(&scale) {
        return None;
    }
    Some(ParamType::Fixed { bits, scale, signed })
}

fn canonical_number<T: std::str::FromStr>(digits: &str) -> Option<T> {
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
