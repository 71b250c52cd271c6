//! Conversion between canvas pixels and logical scene units.

use crate::config::{ConfigError, ConfigResult};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Pixels per logical unit for a canvas configuration.
///
/// This is independent of the view zoom: zooming changes how the canvas is
/// drawn on screen, never how many pixels a logical unit spans on the canvas.
/// A `Pitch` is always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Pitch(pub(crate) f64);

impl Pitch {
    /// Create a pitch, rejecting zero, negative and non-finite values.
    pub fn new(pixels_per_unit: f64) -> ConfigResult<Self> {
        if pixels_per_unit.is_finite() && pixels_per_unit > 0.0 {
            Ok(Self(pixels_per_unit))
        } else {
            Err(ConfigError::InvalidPitch(pixels_per_unit))
        }
    }

    /// Raw pixels-per-unit value.
    pub fn get(self) -> f64 {
        self.0
    }

    /// Convert a logical scalar to pixels.
    pub fn to_pixel(self, logical: f64) -> f64 {
        logical * self.0
    }

    /// Convert a pixel scalar to logical units.
    pub fn to_logical(self, pixel: f64) -> f64 {
        pixel / self.0
    }

    /// Convert a logical displacement to pixels.
    pub fn vec_to_pixel(self, logical: Vec2) -> Vec2 {
        logical * self.0
    }

    /// Convert a pixel displacement to logical units.
    pub fn vec_to_logical(self, pixel: Vec2) -> Vec2 {
        pixel / self.0
    }
}

impl TryFrom<f64> for Pitch {
    type Error = ConfigError;

    fn try_from(value: f64) -> ConfigResult<Self> {
        Self::new(value)
    }
}

impl From<Pitch> for f64 {
    fn from(pitch: Pitch) -> Self {
        pitch.0
    }
}

/// Convert a logical point to canvas pixels.
pub fn to_pixel(logical: Point, pitch: Pitch) -> Point {
    Point::new(pitch.to_pixel(logical.x), pitch.to_pixel(logical.y))
}

/// Convert a canvas pixel point to logical units.
pub fn to_logical(pixel: Point, pitch: Pitch) -> Point {
    Point::new(pitch.to_logical(pixel.x), pitch.to_logical(pixel.y))
}
