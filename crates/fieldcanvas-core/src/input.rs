//! Pointer and modifier input for drag gestures.

use crate::scene::ElementId;
use crate::snap::SnapOverrides;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Only shift held.
    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }

    /// Only ctrl held.
    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }
}

/// A modifier key, or key combination, that can drive a snap override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKey {
    Shift,
    Ctrl,
    Alt,
    Meta,
    /// Ctrl on Linux/Windows, Cmd on macOS.
    CtrlOrMeta,
}

impl ModifierKey {
    /// Check if this key is held.
    pub fn is_held(self, modifiers: &Modifiers) -> bool {
        match self {
            ModifierKey::Shift => modifiers.shift,
            ModifierKey::Ctrl => modifiers.ctrl,
            ModifierKey::Alt => modifiers.alt,
            ModifierKey::Meta => modifiers.meta,
            ModifierKey::CtrlOrMeta => modifiers.ctrl || modifiers.meta,
        }
    }
}

/// Mapping from modifier keys to momentary snap overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierBindings {
    /// Key that forces whole-cell snapping and shows the grid overlay.
    pub force_grid: ModifierKey,
    /// Key that forces resolution snapping and shows the resolution overlay.
    pub force_resolution: ModifierKey,
}

impl Default for ModifierBindings {
    fn default() -> Self {
        Self {
            force_grid: ModifierKey::Shift,
            force_resolution: ModifierKey::CtrlOrMeta,
        }
    }
}

impl ModifierBindings {
    /// Derive the snap overrides for the given modifier state.
    pub fn overrides(&self, modifiers: &Modifiers) -> SnapOverrides {
        SnapOverrides {
            force_grid: self.force_grid.is_held(modifiers),
            force_resolution: self.force_resolution.is_held(modifiers),
        }
    }
}

/// One pointer sample: position in canvas pixels plus held modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    /// Pointer position in canvas pixels (pan and zoom already removed).
    pub position: Point,
    /// Modifier keys held when the sample was taken.
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerSample {
    /// A sample with no modifiers held.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            modifiers: Modifiers::default(),
        }
    }

    /// Same position with the given modifiers.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Gesture events as delivered by a host event loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureEvent {
    /// Pointer pressed on an element.
    Down {
        target: ElementId,
        #[serde(flatten)]
        sample: PointerSample,
    },
    /// Pointer moved while pressed.
    Move(PointerSample),
    /// Pointer released.
    Up(PointerSample),
    /// Gesture aborted (e.g. Escape).
    Cancel,
}
