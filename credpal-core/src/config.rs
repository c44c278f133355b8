//! Store configuration.
//!
//! Every field has a default, so an empty JSON object (or no configuration
//! at all) yields the settings a device ships with.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fs::{FormatOptions, VolumeId};

/// Default bytes available for credential read buffers.
pub const DEFAULT_HEAP_BUDGET: usize = 16 * 1024;

/// Settings for the volume, the credential store and the entropy adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Logical drive holding the credential files.
    pub volume: VolumeId,
    /// Options used if the volume has to be formatted during bootstrap.
    pub format: FormatOptions,
    /// Bytes available for buffers returned by `read`.
    pub heap_budget: usize,
    /// Entropy adapter policy.
    pub entropy: EntropyConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            volume: VolumeId::default(),
            format: FormatOptions::default(),
            heap_budget: DEFAULT_HEAP_BUDGET,
            entropy: EntropyConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed, carries unknown
    /// fields, or sets a zero heap budget.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroHeapBudget`] if no read buffer could ever
    /// be allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heap_budget == 0 {
            return Err(ConfigError::ZeroHeapBudget);
        }
        Ok(())
    }
}

/// Entropy adapter policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntropyConfig {
    /// Accept a software pseudo-random generator as the word source.
    ///
    /// Off by default: a software generator is a known-weak fallback and
    /// must be opted into explicitly.
    pub allow_software_fallback: bool,
}
