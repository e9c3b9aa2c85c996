// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::omega::OmegaConfig;
use gfpop_core::GfpopError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version accepted by the engine config wire format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub type UnknownFields = Map<String, Value>;

fn default_cancel_check_every() -> usize {
    1000
}

/// Validates a wire payload's schema version against the supported range.
pub fn validate_schema_version(version: u32, what: &str) -> Result<(), GfpopError> {
    if version == 0 || version > CURRENT_SCHEMA_VERSION {
        return Err(GfpopError::not_supported(format!(
            "{what} schema_version {version} is outside the supported range [1, {CURRENT_SCHEMA_VERSION}]"
        )));
    }
    Ok(())
}

/// Wire format for versioned engine config payloads.
///
/// Unknown fields are preserved so newer writers round-trip through older
/// readers without data loss.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OmegaConfigWire {
    pub schema_version: u32,
    #[serde(default = "default_cancel_check_every")]
    pub cancel_check_every: usize,
    #[serde(default, flatten)]
    pub unknown_fields: UnknownFields,
}

impl OmegaConfigWire {
    pub fn from_runtime(config: OmegaConfig) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            cancel_check_every: config.cancel_check_every,
            unknown_fields: UnknownFields::new(),
        }
    }

    pub fn into_runtime_parts(self) -> Result<(OmegaConfig, UnknownFields), GfpopError> {
        validate_schema_version(self.schema_version, "OmegaConfig")?;
        let config = OmegaConfig {
            cancel_check_every: self.cancel_check_every,
        };
        config.validate()?;
        Ok((config, self.unknown_fields))
    }

    pub fn to_runtime(self) -> Result<OmegaConfig, GfpopError> {
        let (config, _) = self.into_runtime_parts()?;
        Ok(config)
    }
}
