//! Engine Configuration
//!
//! Defaults applied to a freshly built graph. A patch description may still
//! override the sampling frequency with `@SAMPLING_FREQ`.
//!
//! ```toml
//! sampling_frequency = 44100
//! max_frames_per_read = 256
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sampling frequency used when nothing else is specified
pub const DEFAULT_SAMPLING_FREQUENCY: u32 = 48_000;

/// Frames produced by one streaming read at most, bounding per-call latency
pub const DEFAULT_MAX_FRAMES_PER_READ: usize = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sampling frequency in Hz handed to every unit
    pub sampling_frequency: u32,

    /// Cap on frames produced per streaming read
    pub max_frames_per_read: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sampling_frequency: DEFAULT_SAMPLING_FREQUENCY,
            max_frames_per_read: DEFAULT_MAX_FRAMES_PER_READ,
        }
    }
}

impl EngineConfig {
    pub fn with_sampling_frequency(mut self, hz: u32) -> Self {
        self.sampling_frequency = hz;
        self
    }

    pub fn with_max_frames_per_read(mut self, frames: usize) -> Self {
        self.max_frames_per_read = frames;
        self
    }

    /// Parse and validate TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "engine config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling_frequency == 0 {
            return Err(ConfigError::Invalid {
                field: "sampling_frequency",
                reason: "must be greater than zero",
            });
        }
        if self.max_frames_per_read == 0 {
            return Err(ConfigError::Invalid {
                field: "max_frames_per_read",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}
