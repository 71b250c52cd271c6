//! Snap functionality for aligning logical coordinates to the unit grid or
//! to the finer resolution sub-grid.

use crate::config::{ConfigError, ConfigResult};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Momentary snap overrides, derived from held modifier keys on each event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapOverrides {
    /// Snap to whole cells regardless of the persistent settings.
    pub force_grid: bool,
    /// Snap to resolution cells regardless of the persistent settings.
    pub force_resolution: bool,
}

impl SnapOverrides {
    /// No modifier held.
    pub const NONE: Self = Self {
        force_grid: false,
        force_resolution: false,
    };
}

/// Persistent snap settings.
///
/// Grid snapping and resolution snapping are mutually exclusive: every
/// mutator that turns one on turns the other off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapSettings", into = "RawSnapSettings")]
pub struct SnapSettings {
    grid_snap: bool,
    resolution_snap: bool,
    resolution: Option<u32>,
}

/// Serialized form of [`SnapSettings`], validated on the way in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawSnapSettings {
    grid_snap: bool,
    resolution_snap: bool,
    resolution: Option<u32>,
}

impl TryFrom<RawSnapSettings> for SnapSettings {
    type Error = ConfigError;

    fn try_from(raw: RawSnapSettings) -> ConfigResult<Self> {
        let mut settings = SnapSettings::default();
        settings.set_resolution(raw.resolution)?;
        // Resolution wins when a hand-written file enables both.
        settings.set_grid_snap(raw.grid_snap);
        settings.set_resolution_snap(raw.resolution_snap);
        Ok(settings)
    }
}

impl From<SnapSettings> for RawSnapSettings {
    fn from(settings: SnapSettings) -> Self {
        Self {
            grid_snap: settings.grid_snap,
            resolution_snap: settings.resolution_snap,
            resolution: settings.resolution,
        }
    }
}

impl SnapSettings {
    /// Create settings with both snap modes off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether snapping to whole cells is enabled.
    pub fn grid_snap(&self) -> bool {
        self.grid_snap
    }

    /// Whether snapping to resolution cells is enabled.
    pub fn resolution_snap(&self) -> bool {
        self.resolution_snap
    }

    /// Subdivisions per unit cell, if configured.
    pub fn resolution(&self) -> Option<u32> {
        self.resolution
    }

    /// Flip grid snapping. Turning it on clears resolution snapping.
    pub fn toggle_grid_snap(&mut self) {
        self.set_grid_snap(!self.grid_snap);
    }

    /// Flip resolution snapping. Turning it on clears grid snapping.
    pub fn toggle_resolution_snap(&mut self) {
        self.set_resolution_snap(!self.resolution_snap);
    }

    /// Enable or disable grid snapping.
    pub fn set_grid_snap(&mut self, enabled: bool) {
        self.grid_snap = enabled;
        if enabled {
            self.resolution_snap = false;
        }
    }

    /// Enable or disable resolution snapping.
    pub fn set_resolution_snap(&mut self, enabled: bool) {
        self.resolution_snap = enabled;
        if enabled {
            self.grid_snap = false;
        }
    }

    /// Set the subdivisions per unit cell. Zero is rejected; one is accepted
    /// but makes resolution snapping a no-op.
    pub fn set_resolution(&mut self, resolution: Option<u32>) -> ConfigResult<()> {
        if resolution == Some(0) {
            return Err(ConfigError::InvalidResolution(0));
        }
        self.resolution = resolution;
        Ok(())
    }

    /// Resolution cell size in logical units, when resolution snapping can apply.
    fn cell_size(&self) -> Option<f64> {
        self.resolution
            .filter(|&r| r > 1)
            .map(|r| 1.0 / f64::from(r))
    }
}

/// Read-only access to the live snap settings.
pub trait SnapSettingsProvider {
    /// Current settings. Called on every pointer event.
    fn snap_settings(&self) -> SnapSettings;
}

impl SnapSettingsProvider for SnapSettings {
    fn snap_settings(&self) -> SnapSettings {
        *self
    }
}

impl<T: SnapSettingsProvider + ?Sized> SnapSettingsProvider for &T {
    fn snap_settings(&self) -> SnapSettings {
        (**self).snap_settings()
    }
}

impl<T: SnapSettingsProvider + ?Sized> SnapSettingsProvider for &mut T {
    fn snap_settings(&self) -> SnapSettings {
        (**self).snap_settings()
    }
}

/// Which rule produced a snapped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapRule {
    /// Snapped to the nearest multiple of `1 / resolution`.
    Resolution,
    /// Snapped to the nearest integer.
    Grid,
    /// Left unchanged.
    None,
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// The rule applied to both axes.
    pub rule: SnapRule,
}

impl SnapResult {
    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.rule != SnapRule::None
    }
}

/// Pick the rule for the given overrides and settings.
///
/// Priority, highest first: forced resolution, forced grid, persistent
/// resolution, persistent grid. Resolution rules only apply when the
/// resolution is greater than one.
pub fn select_rule(overrides: SnapOverrides, settings: &SnapSettings) -> SnapRule {
    let has_cells = settings.cell_size().is_some();
    if overrides.force_resolution && has_cells {
        SnapRule::Resolution
    } else if overrides.force_grid {
        SnapRule::Grid
    } else if settings.resolution_snap && has_cells {
        SnapRule::Resolution
    } else if settings.grid_snap {
        SnapRule::Grid
    } else {
        SnapRule::None
    }
}

/// Round to the nearest integer, ties toward positive infinity (`-0.5` goes to `0`).
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 { floor + 1.0 } else { floor }
}

fn apply_rule(value: f64, rule: SnapRule, settings: &SnapSettings) -> f64 {
    match (rule, settings.cell_size()) {
        (SnapRule::Resolution, Some(cell)) => round_half_up(value / cell) * cell,
        (SnapRule::Grid, _) => round_half_up(value),
        _ => value,
    }
}

/// Snap a single logical coordinate.
pub fn snap_value(value: f64, overrides: SnapOverrides, settings: &SnapSettings) -> f64 {
    apply_rule(value, select_rule(overrides, settings), settings)
}

/// Snap a logical point, each axis independently with the same rule.
pub fn snap_point(point: Point, overrides: SnapOverrides, settings: &SnapSettings) -> SnapResult {
    let rule = select_rule(overrides, settings);
    SnapResult {
        point: Point::new(
            apply_rule(point.x, rule, settings),
            apply_rule(point.y, rule, settings),
        ),
        rule,
    }
}
