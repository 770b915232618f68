//! Batch table: per-feature properties

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::binding::{BindingDescriptor, TypedColumn};
use super::{json_kind, parse_json_block};
use crate::error::{B3dmError, B3dmResult};

const TABLE: &str = "batch table";

/// One batch table property, `feature_count` elements long
#[derive(Debug, Clone, PartialEq)]
pub enum BatchProperty {
    /// Inline JSON array, one entry per feature
    Values(Vec<Value>),
    /// Binary column with `arity` components per feature
    Column {
        binding: BindingDescriptor,
        values: TypedColumn,
        arity: usize,
    },
}

impl BatchProperty {
    /// Value for one feature; vectors come back as JSON arrays.
    pub fn get(&self, feature: usize) -> Option<Value> {
        match self {
            BatchProperty::Values(values) => values.get(feature).cloned(),
            BatchProperty::Column { values, arity, .. } => values.json_element(feature, *arity),
        }
    }

    /// Number of features covered
    pub fn len(&self) -> usize {
        match self {
            BatchProperty::Values(values) => values.len(),
            BatchProperty::Column { values, arity, .. } => values.len() / (*arity).max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded batch table, attached to the scene as per-feature metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchTable {
    feature_count: usize,
    properties: BTreeMap<String, BatchProperty>,
    extensions: Option<Value>,
    extras: Option<Value>,
}

impl BatchTable {
    /// Parse the JSON block; binary columns hold `feature_count` elements.
    pub fn parse(json: &[u8], binary: &[u8], feature_count: usize) -> B3dmResult<Self> {
        let object = parse_json_block(TABLE, json)?;
        let mut table = Self {
            feature_count,
            ..Default::default()
        };

        for (name, value) in object {
            match name.as_str() {
                "extensions" => {
                    table.extensions = Some(value);
                    continue;
                }
                "extras" => {
                    table.extras = Some(value);
                    continue;
                }
                _ => {}
            }

            let property = match BindingDescriptor::from_json(&value, None)? {
                Some(binding) => BatchProperty::Column {
                    values: binding.resolve(&name, binary, feature_count)?,
                    arity: binding.element_type.component_count(),
                    binding,
                },
                None => match value {
                    Value::Array(values) if values.len() == feature_count => {
                        BatchProperty::Values(values)
                    }
                    Value::Array(values) => {
                        return Err(B3dmError::invalid_table(
                            TABLE,
                            format!(
                                "property '{name}' has {} values for {feature_count} features",
                                values.len()
                            ),
                        ))
                    }
                    other => {
                        return Err(B3dmError::invalid_table(
                            TABLE,
                            format!(
                                "property '{name}' must be an array or a binary binding, found {}",
                                json_kind(&other)
                            ),
                        ))
                    }
                },
            };
            table.properties.insert(name, property);
        }

        log::debug!(
            "batch table: {} properties over {} features",
            table.properties.len(),
            feature_count
        );
        Ok(table)
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn property(&self, name: &str) -> Option<&BatchProperty> {
        self.properties.get(name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Value of `name` for one feature
    pub fn get(&self, name: &str, feature: usize) -> Option<Value> {
        self.properties.get(name)?.get(feature)
    }

    /// Every property of one feature, keyed by property name.
    pub fn feature(&self, feature: usize) -> Option<Map<String, Value>> {
        if feature >= self.feature_count {
            return None;
        }
        self.properties
            .iter()
            .map(|(name, property)| Some((name.clone(), property.get(feature)?)))
            .collect()
    }

    pub fn extensions(&self) -> Option<&Value> {
        self.extensions.as_ref()
    }

    pub fn extras(&self) -> Option<&Value> {
        self.extras.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
