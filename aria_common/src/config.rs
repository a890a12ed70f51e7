//! TOML engine configuration loader with validation.
//!
//! The configuration is loaded once at process start and passed by value
//! into the engine and the hardware handler factories. There is no global
//! config state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ApiVersion, RobotType};

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("config validation: {0}")]
    Validation(String),
}

// ─── Engine Config ──────────────────────────────────────────────────

/// Engine configuration, loaded from TOML.
///
/// `use_virtual_pipettes` selects the virtual hardware handlers; with it
/// off, handlers drive real hardware through the hardware API.
/// `use_simulated_deck_config` lets addressable-area resolution assume
/// fixtures provisionally instead of requiring a configured deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub robot_type: RobotType,
    /// Protocol API version the run targets. Gates version-dependent
    /// behavior such as the meaning of a zero-volume dispense.
    pub api_version: ApiVersion,
    pub use_virtual_pipettes: bool,
    pub use_simulated_deck_config: bool,
    /// Numeric tolerance for volume clamping: requested volumes within
    /// this distance of a bound are rounded to the bound with a warning
    /// note instead of failing.
    pub volume_rounding_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            robot_type: RobotType::default(),
            api_version: ApiVersion::new(2, 20),
            use_virtual_pipettes: false,
            use_simulated_deck_config: false,
            volume_rounding_epsilon: 1e-9,
        }
    }
}

impl EngineConfig {
    /// Fully virtual configuration, used by simulation and tests.
    pub fn virtual_config() -> Self {
        Self {
            use_virtual_pipettes: true,
            use_simulated_deck_config: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.volume_rounding_epsilon > 0.0) {
            return Err(ConfigError::Validation(format!(
                "volume_rounding_epsilon must be positive, got {}",
                self.volume_rounding_epsilon
            )));
        }
        if self.volume_rounding_epsilon >= 1e-3 {
            return Err(ConfigError::Validation(format!(
                "volume_rounding_epsilon {} is too coarse; must be below 1e-3",
                self.volume_rounding_epsilon
            )));
        }
        if self.api_version.major < 2 {
            return Err(ConfigError::Validation(format!(
                "api_version {} is older than the oldest supported version 2.0",
                self.api_version
            )));
        }
        Ok(())
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the engine configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    load_config_from_str(&text)
}

/// Load config from a TOML string.
pub fn load_config_from_str(text: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig =
        toml::from_str(text).map_err(|e| ConfigError::Parse(format!("engine config: {e}")))?;
    config.validate()?;
    Ok(config)
}
