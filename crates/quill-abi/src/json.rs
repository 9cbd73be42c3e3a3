//! JSON ABI descriptors
//!
//! Reads the `[{"type": "function", "name": ..., "inputs": [...]}, ...]`
//! format emitted by Solidity. Every parameter type goes through
//! [`build_type`](crate::parser::build_type), with `tuple…` types taking their
//! members from `components`.

use serde::Deserialize;

use crate::custom_error::ContractError;
use crate::error::AbiError;
use crate::event::Event;
use crate::function::{Function, FunctionKind, StateMutability};
use crate::parser::build_type;
use crate::types::TupleType;

/// One entry of a contract ABI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiItem {
    /// Function, receive, fallback or constructor
    Function(Function),
    /// Event
    Event(Event),
    /// Custom error
    Error(ContractError),
}

impl AbiItem {
    /// Name of the entry, if it has one
    pub fn name(&self) -> Option<&str> {
        match self {
            AbiItem::Function(f) => f.name(),
            AbiItem::Event(e) => Some(e.name()),
            AbiItem::Error(e) => Some(e.name()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    components: Option<Vec<RawParam>>,
    #[serde(default)]
    indexed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(rename = "type", default = "default_item_type")]
    item_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Option<Vec<RawParam>>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(default)]
    state_mutability: Option<StateMutability>,
    #[serde(default)]
    anonymous: bool,
}

fn default_item_type() -> String {
    "function".to_string()
}

/// Parse a JSON ABI array
pub fn parse_abi(json: &str) -> Result<Vec<AbiItem>, AbiError> {
    let raw: Vec<RawItem> = serde_json::from_str(json)?;
    let items = raw.into_iter().map(build_item).collect::<Result<Vec<_>, _>>()?;
    tracing::debug!("Parsed JSON ABI with {} items", items.len());
    Ok(items)
}

/// Parse a single JSON ABI object
pub fn parse_abi_item(json: &str) -> Result<AbiItem, AbiError> {
    let raw: RawItem = serde_json::from_str(json)?;
    build_item(raw)
}

/// Functions of a JSON ABI, skipping events and errors
pub fn parse_functions(json: &str) -> Result<Vec<Function>, AbiError> {
    Ok(parse_abi(json)?
        .into_iter()
        .filter_map(|item| match item {
            AbiItem::Function(f) => Some(f),
            _ => None,
        })
        .collect())
}

/// Events of a JSON ABI
pub fn parse_events(json: &str) -> Result<Vec<Event>, AbiError> {
    Ok(parse_abi(json)?
        .into_iter()
        .filter_map(|item| match item {
            AbiItem::Event(e) => Some(e),
            _ => None,
        })
        .collect())
}

fn build_item(raw: RawItem) -> Result<AbiItem, AbiError> {
    let kind = match raw.item_type.as_str() {
        "function" => FunctionKind::Function,
        "receive" => FunctionKind::Receive,
        "fallback" => FunctionKind::Fallback,
        "constructor" => FunctionKind::Constructor,
        "event" => {
            let inputs = raw.inputs.ok_or_else(|| AbiError::definition("array \"inputs\" null or not found"))?;
            let name = raw.name.ok_or_else(|| AbiError::definition("event without name"))?;
            let indexed = inputs.iter().map(|p| p.indexed).collect();
            return Ok(AbiItem::Event(Event::new(name, build_tuple(&inputs)?, indexed, raw.anonymous)?));
        }
        "error" => {
            let name = raw.name.ok_or_else(|| AbiError::definition("error without name"))?;
            let inputs = build_tuple(raw.inputs.as_deref().unwrap_or_default())?;
            return Ok(AbiItem::Error(ContractError::new(name, inputs)));
        }
        other => return Err(AbiError::definition(format!("unexpected type: \"{}\"", other))),
    };

    let inputs = build_tuple(raw.inputs.as_deref().unwrap_or_default())?;
    let outputs = build_tuple(&raw.outputs)?;
    let function = Function::new(kind, raw.name, inputs, outputs, raw.state_mutability)?;
    Ok(AbiItem::Function(function))
}

fn build_tuple(params: &[RawParam]) -> Result<TupleType, AbiError> {
    let mut elements = Vec::with_capacity(params.len());
    let mut names = Vec::with_capacity(params.len());
    for param in params {
        let components = param.components.as_deref().map(build_tuple).transpose()?;
        elements.push(build_type(&param.ty, components.as_ref())?);
        names.push(param.name.clone());
    }
    Ok(TupleType::with_names(elements, names)?)
}
