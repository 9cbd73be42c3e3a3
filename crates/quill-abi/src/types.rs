//! ABI type descriptors
//!
//! A [`ParamType`] tree is immutable once built. Composite nodes compute their
//! dynamic flag, head width and canonical type string in their constructors,
//! so those projections never disagree with the children they were built from.

use std::borrow::Cow;
use std::fmt;

use crate::error::ParseError;

/// Width of one ABI word in bytes
pub const WORD_LEN: usize = 32;

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Boolean
    Bool,
    /// Integer with bit size (8, 16, ..., 256)
    Int {
        /// Declared width
        bits: u16,
        /// `intN` when true, `uintN` otherwise
        signed: bool,
    },
    /// Address (unsigned 160-bit integer)
    Address,
    /// Fixed-point decimal `fixedMxN` / `ufixedMxN`
    Fixed {
        /// Declared width `M`
        bits: u16,
        /// Decimal places `N`
        scale: u8,
        /// `fixed` when true, `ufixed` otherwise
        signed: bool,
    },
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// 20-byte address followed by a 4-byte selector
    Function,
    /// Dynamic bytes
    Bytes,
    /// UTF-8 string
    String,
    /// Array of one element type
    Array(ArrayType),
    /// Tuple
    Tuple(TupleType),
}

impl ParamType {
    /// Byte length of the `function` type
    pub const FUNCTION_LEN: usize = 24;

    /// `uintN`
    pub const fn uint(bits: u16) -> Self {
        ParamType::Int {
            bits,
            signed: false,
        }
    }

    /// `intN`
    pub const fn int(bits: u16) -> Self {
        ParamType::Int { bits, signed: true }
    }

    /// Check if this type is dynamic (variable length)
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String => true,
            ParamType::Array(array) => array.dynamic,
            ParamType::Tuple(tuple) => tuple.dynamic,
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of its enclosing tuple.
    ///
    /// Dynamic types hold a single offset word. Static arrays and tuples are
    /// stored in place.
    pub fn head_width(&self) -> usize {
        match self {
            ParamType::Array(array) => array.head_width,
            ParamType::Tuple(tuple) if !tuple.dynamic => tuple.head_width,
            _ => WORD_LEN,
        }
    }

    /// In-place width of a static type, `None` for dynamic types
    pub fn static_head_width(&self) -> Option<usize> {
        if self.is_dynamic() {
            None
        } else {
            Some(self.head_width())
        }
    }

    /// Element type of an array
    pub fn element_type(&self) -> Option<&ParamType> {
        match self {
            ParamType::Array(array) => Some(array.element()),
            _ => None,
        }
    }

    /// Members of a tuple
    pub fn members(&self) -> Option<&[ParamType]> {
        match self {
            ParamType::Tuple(tuple) => Some(tuple.members()),
            _ => None,
        }
    }

    /// Canonical type string, e.g. `uint256[]` or `(bool,string)`
    pub fn canonical_type(&self) -> Cow<'_, str> {
        match self {
            ParamType::Bool => Cow::Borrowed("bool"),
            ParamType::Int { bits, signed } => {
                Cow::Owned(format!("{}int{}", if *signed { "" } else { "u" }, bits))
            }
            ParamType::Address => Cow::Borrowed("address"),
            ParamType::Fixed {
                bits,
                scale,
                signed,
            } => Cow::Owned(format!(
                "{}fixed{}x{}",
                if *signed { "" } else { "u" },
                bits,
                scale
            )),
            ParamType::FixedBytes(len) => Cow::Owned(format!("bytes{}", len)),
            ParamType::Function => Cow::Borrowed("function"),
            ParamType::Bytes => Cow::Borrowed("bytes"),
            ParamType::String => Cow::Borrowed("string"),
            ParamType::Array(array) => Cow::Borrowed(&array.canonical),
            ParamType::Tuple(tuple) => Cow::Borrowed(&tuple.canonical),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_type())
    }
}

impl From<ArrayType> for ParamType {
    fn from(array: ArrayType) -> Self {
        ParamType::Array(array)
    }
}

impl From<TupleType> for ParamType {
    fn from(tuple: TupleType) -> Self {
        ParamType::Tuple(tuple)
    }
}

/// Array length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    /// `T[N]`
    Fixed(u32),
    /// `T[]`
    Dynamic,
}

/// Array of one element type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayType {
    element: Box<ParamType>,
    length: ArrayLength,
    dynamic: bool,
    head_width: usize,
    canonical: String,
}

impl ArrayType {
    /// Wrap `element` in one array layer
    pub fn new(element: ParamType, length: ArrayLength) -> Self {
        let (dynamic, suffix) = match length {
            ArrayLength::Dynamic => (true, String::from("[]")),
            ArrayLength::Fixed(n) => (element.is_dynamic(), format!("[{}]", n)),
        };
        let head_width = match length {
            ArrayLength::Fixed(n) if !dynamic => element.head_width().saturating_mul(n as usize),
            _ => WORD_LEN,
        };
        let canonical = format!("{}{}", element.canonical_type(), suffix);
        Self {
            element: Box::new(element),
            length,
            dynamic,
            head_width,
            canonical,
        }
    }

    /// `T[]`
    pub fn dynamic(element: ParamType) -> Self {
        Self::new(element, ArrayLength::Dynamic)
    }

    /// `T[N]`
    pub fn fixed(element: ParamType, len: u32) -> Self {
        Self::new(element, ArrayLength::Fixed(len))
    }

    /// Element type
    pub fn element(&self) -> &ParamType {
        &self.element
    }

    /// Declared length
    pub fn length(&self) -> ArrayLength {
        self.length
    }

    /// Check if dynamic
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Canonical type string
    pub fn canonical_type(&self) -> &str {
        &self.canonical
    }
}

/// Ordered list of member types with optional member names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleType {
    elements: Vec<ParamType>,
    names: Option<Vec<String>>,
    dynamic: bool,
    head_width: usize,
    canonical: String,
}

impl TupleType {
    /// Create an unnamed tuple
    pub fn new(elements: Vec<ParamType>) -> Self {
        let dynamic = elements.iter().any(ParamType::is_dynamic);
        // saturates; no input is long enough to reach usize::MAX
        let head_width = elements
            .iter()
            .map(ParamType::head_width)
            .fold(0, usize::saturating_add);
        let members: Vec<Cow<'_, str>> = elements.iter().map(ParamType::canonical_type).collect();
        let canonical = format!("({})", members.join(","));
        Self {
            elements,
            names: None,
            dynamic,
            head_width,
            canonical,
        }
    }

    /// Create a tuple whose members carry names
    pub fn with_names(elements: Vec<ParamType>, names: Vec<String>) -> Result<Self, ParseError> {
        if names.len() != elements.len() {
            return Err(ParseError::ElementNameCount {
                expected: elements.len(),
                got: names.len(),
            });
        }
        let mut tuple = Self::new(elements);
        tuple.names = Some(names);
        Ok(tuple)
    }

    /// The empty tuple `()`
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Member types
    pub fn members(&self) -> &[ParamType] {
        &self.elements
    }

    /// Member type at `index`
    pub fn get(&self, index: usize) -> Option<&ParamType> {
        self.elements.get(index)
    }

    /// Member names, if any were given
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if there are no members
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Check if any member is dynamic
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Sum of member head widths, the size of this tuple's own head region
    pub fn head_width(&self) -> usize {
        self.head_width
    }

    /// Canonical type string, e.g. `(uint256,bytes)`
    pub fn canonical_type(&self) -> &str {
        &self.canonical
    }

    /// Members whose manifest flag is set
    pub fn select(&self, manifest: &[bool]) -> TupleType {
        self.filter(manifest, true)
    }

    /// Members whose manifest flag is clear
    pub fn exclude(&self, manifest: &[bool]) -> TupleType {
        self.filter(manifest, false)
    }

    fn filter(&self, manifest: &[bool], keep: bool) -> TupleType {
        let picked: Vec<usize> = manifest
            .iter()
            .enumerate()
            .filter(|(i, flag)| **flag == keep && *i < self.elements.len())
            .map(|(i, _)| i)
            .collect();
        let elements = picked.iter().map(|&i| self.elements[i].clone()).collect();
        let mut tuple = TupleType::new(elements);
        tuple.names = self
            .names
            .as_ref()
            .map(|names| picked.iter().map(|&i| names[i].clone()).collect());
        tuple
    }
}

impl Default for TupleType {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for TupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
