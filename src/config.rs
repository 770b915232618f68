//! Decode options
//!
//! Options deserialize from JSON with every field optional, so a host can
//! keep them in its own config file.

use serde::{Deserialize, Serialize};

use crate::error::{B3dmError, B3dmResult};

/// Axis corrections applied to a decoded scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Apply the axis swap to the scene root
    pub scene_z_up_to_y_up: bool,
    /// Apply the axis swap to every mesh node
    pub mesh_z_up_to_y_up: bool,
}

impl DecodeOptions {
    pub fn validate(&self) -> B3dmResult<()> {
        Ok(())
    }

    pub fn from_json_str(text: &str) -> B3dmResult<Self> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }
}

/// Options for the instanced decode path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstancedOptions {
    #[serde(flatten)]
    pub decode: DecodeOptions,
    /// Maximum number of instances the caller will draw
    pub capacity: u32,
}

impl Default for InstancedOptions {
    fn default() -> Self {
        Self {
            decode: DecodeOptions::default(),
            capacity: 1,
        }
    }
}

impl InstancedOptions {
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> B3dmResult<()> {
        self.decode.validate()?;
        if self.capacity == 0 {
            return Err(B3dmError::InvalidOptions(
                "instance capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(text: &str) -> B3dmResult<Self> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }
}
