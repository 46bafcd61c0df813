//! Processor configuration
//!
//! Limits are caller policy: the pipeline itself is linear-time, these just
//! bound memory for pathological inputs.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default upper bound on accepted input size (64 MiB)
pub const DEFAULT_MAX_INPUT_BYTES: usize = 64 * 1024 * 1024;

/// Default upper bound on sample records in one recording
pub const DEFAULT_MAX_ROWS: usize = 2_000_000;

/// Default number of outcomes kept by the processor cache
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Settings for the normalization stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Maximum number of sample records accepted
    pub max_rows: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// Settings for [`crate::pipeline::ActivityProcessor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Inputs larger than this are rejected before decoding
    pub max_input_bytes: usize,
    /// Outcomes kept in the content-hash cache; 0 disables caching
    pub cache_capacity: usize,
    pub normalizer: NormalizerConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Load from JSON; missing keys fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ProcessorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_input_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_input_bytes must be greater than 0".to_string(),
            ));
        }
        if self.normalizer.max_rows == 0 {
            return Err(ConfigError::Invalid(
                "normalizer.max_rows must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
