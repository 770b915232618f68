//! Feature table: global per-container semantics

use std::collections::BTreeMap;

use glam::DVec3;

use super::binding::{BindingDescriptor, ComponentType, ElementType};
use super::{parse_json_block, TableValue, RESERVED_KEYS};
use crate::error::{B3dmError, B3dmResult};

const TABLE: &str = "feature table";

/// Number of features (batches) in the container
pub const BATCH_LENGTH: &str = "BATCH_LENGTH";
/// Center that positions are relative to
pub const RTC_CENTER: &str = "RTC_CENTER";

/// Default encoding for semantics that may omit `componentType` and `type`
fn semantic_defaults(key: &str) -> Option<(ComponentType, ElementType)> {
    match key {
        BATCH_LENGTH => Some((ComponentType::UnsignedInt, ElementType::Scalar)),
        RTC_CENTER => Some((ComponentType::Float, ElementType::Vec3)),
        _ => None,
    }
}

/// Decoded feature table. Read-only once parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    entries: BTreeMap<String, TableValue>,
    batch_length: u32,
    rtc_center: Option<DVec3>,
}

impl FeatureTable {
    /// Parse the JSON block and resolve every binding against `binary`.
    pub fn parse(json: &[u8], binary: &[u8]) -> B3dmResult<Self> {
        let object = parse_json_block(TABLE, json)?;
        let mut entries = BTreeMap::new();

        for (key, value) in object {
            let binding = if RESERVED_KEYS.contains(&key.as_str()) {
                None
            } else {
                BindingDescriptor::from_json(&value, semantic_defaults(&key))?
            };

            let entry = match binding {
                // Feature table semantics in a b3dm are global: one element each
                Some(binding) => TableValue::Binary {
                    values: binding.resolve(&key, binary, 1)?,
                    binding,
                },
                None => TableValue::Literal(value),
            };
            entries.insert(key, entry);
        }

        let batch_length = match entries.get(BATCH_LENGTH) {
            None => 0,
            Some(entry) => read_batch_length(entry)?,
        };
        let rtc_center = entries.get(RTC_CENTER).map(read_rtc_center).transpose()?;

        log::debug!(
            "feature table: {} entries, BATCH_LENGTH={}, RTC_CENTER={:?}",
            entries.len(),
            batch_length,
            rtc_center
        );

        Ok(Self {
            entries,
            batch_length,
            rtc_center,
        })
    }

    /// Declared feature count, 0 when absent
    pub fn batch_length(&self) -> u32 {
        self.batch_length
    }

    /// Reference center for local-origin translation
    pub fn rtc_center(&self) -> Option<DVec3> {
        self.rtc_center
    }

    pub fn get(&self, key: &str) -> Option<&TableValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_batch_length(entry: &TableValue) -> B3dmResult<u32> {
    let numbers = entry.as_f64_vec().unwrap_or_default();
    match numbers.as_slice() {
        [n] if *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 => Ok(*n as u32),
        _ => Err(B3dmError::invalid_table(
            TABLE,
            "BATCH_LENGTH must be a single non-negative integer",
        )),
    }
}

fn read_rtc_center(entry: &TableValue) -> B3dmResult<DVec3> {
    let numbers = entry.as_f64_vec().unwrap_or_default();
    match numbers.as_slice() {
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        _ => Err(B3dmError::invalid_table(TABLE, "RTC_CENTER must have three numeric components")),
    }
}
