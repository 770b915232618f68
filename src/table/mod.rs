//! Feature and batch table decoding
//!
//! Both tables are a JSON object plus a companion binary block. Values are
//! either literals or [`BindingDescriptor`]s, and both tables resolve bindings
//! through the same reader; they differ only in how many elements a binding
//! covers.

mod batch;
mod binding;
mod feature;

pub use batch::{BatchProperty, BatchTable};
pub use binding::{BindingDescriptor, ComponentType, ElementType, TypedColumn};
pub use feature::FeatureTable;

use serde_json::{Map, Value};

use crate::error::{B3dmError, B3dmResult};

/// Keys that never carry bindings or per-feature data
pub(crate) const RESERVED_KEYS: [&str; 2] = ["extensions", "extras"];

/// A resolved table entry
#[derive(Debug, Clone, PartialEq)]
pub enum TableValue {
    /// Inline JSON value
    Literal(Value),
    /// Value read from the binary block
    Binary {
        binding: BindingDescriptor,
        values: TypedColumn,
    },
}

impl TableValue {
    /// Numeric view of the entry: one number, or every number of an array.
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            TableValue::Binary { values, .. } => Some(values.to_f64_vec()),
            TableValue::Literal(Value::Number(n)) => n.as_f64().map(|x| vec![x]),
            TableValue::Literal(Value::Array(items)) => {
                items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>()
            }
            TableValue::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            TableValue::Literal(value) => Some(value),
            TableValue::Binary { .. } => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, TableValue::Binary { .. })
    }
}

/// Parse a table's JSON block into an object.
///
/// Writers pad JSON blocks to 8-byte boundaries with spaces (sometimes NULs);
/// an empty block is an empty table.
pub(crate) fn parse_json_block(table: &'static str, bytes: &[u8]) -> B3dmResult<Map<String, Value>> {
    let end = bytes
        .iter()
        .rposition(|&b| !matches!(b, b' ' | b'\0' | b'\t' | b'\r' | b'\n'))
        .map_or(0, |i| i + 1);
    if end == 0 {
        return Ok(Map::new());
    }

    let text = std::str::from_utf8(&bytes[..end])
        .map_err(|e| B3dmError::invalid_table(table, format!("invalid UTF-8: {e}")))?;
    match serde_json::from_str(text)? {
        Value::Object(map) => Ok(map),
        other => Err(B3dmError::invalid_table(
            table,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
