//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Settings fixed for the lifetime of an [`AudioEngine`](crate::engine::AudioEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Rate every graph and sample runs at, in Hz.
    pub sample_rate: f64,
    /// Frames per render call when the engine drives itself (offline render).
    pub block_size: usize,
    /// Longest echo the delay graph can produce.
    pub max_delay_seconds: f64,
    /// Seed for reverb impulse noise; fixed so a puzzle always sounds the same.
    pub impulse_seed: u64,
    /// Resolution of the distortion transfer curve.
    pub curve_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            block_size: 128,
            max_delay_seconds: 2.0,
            impulse_seed: 0x5EED,
            curve_samples: 4096,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.block_size == 0 {
            return Err(EngineError::InvalidConfig("block size must be non-zero".into()));
        }
        if !(self.max_delay_seconds > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "max delay must be positive, got {}",
                self.max_delay_seconds
            )));
        }
        if self.curve_samples < 2 {
            return Err(EngineError::InvalidConfig("distortion curve needs at least 2 points".into()));
        }
        Ok(())
    }
}
