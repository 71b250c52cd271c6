//! Engine configuration and its validation boundary.

use crate::input::ModifierBindings;
use crate::transform::Pitch;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default canvas pitch in pixels per logical unit.
pub const DEFAULT_PITCH: f64 = 40.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid pitch {0}: pixels per unit must be finite and positive")]
    InvalidPitch(f64),
    #[error("Invalid resolution {0}: subdivisions per cell must be positive")]
    InvalidResolution(u32),
    #[error("Configuration parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Static configuration for a [`DragEngine`](crate::DragEngine).
///
/// Invalid values are rejected when the config is built or deserialized,
/// so an engine never runs with a pitch that would produce NaN positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pixels per logical unit.
    pub pitch: Pitch,
    /// Which modifier keys force grid and resolution snapping.
    pub bindings: ModifierBindings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pitch: Pitch(DEFAULT_PITCH),
            bindings: ModifierBindings::default(),
        }
    }
}

impl EngineConfig {
    /// Create a config with the given pitch and default modifier bindings.
    pub fn with_pitch(pixels_per_unit: f64) -> ConfigResult<Self> {
        Ok(Self {
            pitch: Pitch::new(pixels_per_unit)?,
            ..Self::default()
        })
    }

    /// Parse a config from JSON.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded engine config from {}: pitch={}", path.display(), config.pitch.get());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ModifierKey;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!((config.pitch.get() - DEFAULT_PITCH).abs() < f64::EPSILON);
        assert_eq!(config.bindings.force_grid, ModifierKey::Shift);
        assert_eq!(config.bindings.force_resolution, ModifierKey::CtrlOrMeta);
    }

    #[test]
    fn test_with_pitch_rejects_zero() {
        assert!(matches!(EngineConfig::with_pitch(0.0), Err(ConfigError::InvalidPitch(_))));
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json_str(r#"{ "pitch": 25.0 }"#).unwrap();
        assert!((config.pitch.get() - 25.0).abs() < f64::EPSILON);
        assert_eq!(config.bindings, ModifierBindings::default());
    }

    #[test]
    fn test_from_json_bindings() {
        let config = EngineConfig::from_json_str(
            r#"{ "pitch": 10.0, "bindings": { "force_grid": "alt", "force_resolution": "shift" } }"#,
        )
        .unwrap();
        assert_eq!(config.bindings.force_grid, ModifierKey::Alt);
        assert_eq!(config.bindings.force_resolution, ModifierKey::Shift);
    }

    #[test]
    fn test_from_json_rejects_negative_pitch() {
        let result = EngineConfig::from_json_str(r#"{ "pitch": -4.0 }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = EngineConfig::load("/nonexistent/fieldcanvas.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
