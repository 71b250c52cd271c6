//! Transient overlays shown while a snap modifier is held during a drag.
//!
//! The controller snapshots the overlay flags when a gesture starts, turns an
//! overlay on while its activator is held, and at the end of the gesture
//! toggles back every flag that differs from the snapshot. It never turns off
//! an overlay the user had enabled before the gesture started.
//!
//! The controller only records what it believes the flags to be. A user who
//! clicks an overlay toggle mid-gesture is not tracked separately, so such a
//! change can be reverted by [`OverlayController::restore`].

use crate::snap::SnapOverrides;
use serde::{Deserialize, Serialize};

/// An auxiliary overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    /// Unit grid lines.
    Grid,
    /// Resolution sub-grid.
    Resolution,
}

impl Overlay {
    /// All overlays, in update order.
    pub const ALL: [Overlay; 2] = [Overlay::Grid, Overlay::Resolution];
}

/// Live overlay visibility with toggle-only mutation.
pub trait OverlayFlags {
    /// Whether the overlay is currently shown.
    fn is_visible(&self, overlay: Overlay) -> bool;

    /// Flip the overlay's visibility.
    fn toggle(&mut self, overlay: Overlay);
}

impl<T: OverlayFlags + ?Sized> OverlayFlags for &mut T {
    fn is_visible(&self, overlay: Overlay) -> bool {
        (**self).is_visible(overlay)
    }

    fn toggle(&mut self, overlay: Overlay) {
        (**self).toggle(overlay)
    }
}

/// In-memory overlay flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayState {
    pub grid: bool,
    pub resolution: bool,
}

impl OverlayFlags for OverlayState {
    fn is_visible(&self, overlay: Overlay) -> bool {
        match overlay {
            Overlay::Grid => self.grid,
            Overlay::Resolution => self.resolution,
        }
    }

    fn toggle(&mut self, overlay: Overlay) {
        match overlay {
            Overlay::Grid => self.grid = !self.grid,
            Overlay::Resolution => self.resolution = !self.resolution,
        }
    }
}

/// Snapshot of overlay flags for one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OverlaySnapshot {
    initial: OverlayState,
    current: OverlayState,
}

/// Save/restore state machine for transient overlays.
#[derive(Debug, Clone, Default)]
pub struct OverlayController {
    snapshot: Option<OverlaySnapshot>,
}

impl OverlayController {
    /// Create an inert controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a snapshot is held.
    pub fn is_captured(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Flags recorded when the gesture started.
    pub fn initial(&self) -> Option<OverlayState> {
        self.snapshot.map(|s| s.initial)
    }

    /// Flags as the controller believes them to be now.
    pub fn current(&self) -> Option<OverlayState> {
        self.snapshot.map(|s| s.current)
    }

    /// Record the live flags. No-op if a snapshot is already held.
    pub fn capture_initial_state(&mut self, flags: &impl OverlayFlags) {
        if self.snapshot.is_some() {
            return;
        }
        let live = OverlayState {
            grid: flags.is_visible(Overlay::Grid),
            resolution: flags.is_visible(Overlay::Resolution),
        };
        log::debug!("Captured overlay state: grid={} resolution={}", live.grid, live.resolution);
        self.snapshot = Some(OverlaySnapshot {
            initial: live,
            current: live,
        });
    }

    /// Drive one overlay from its activator. No-op before capture.
    pub fn update(&mut self, overlay: Overlay, activator: bool, flags: &mut impl OverlayFlags) {
        let Some(snapshot) = self.snapshot.as_mut() else {
            return;
        };
        let current = snapshot.current.is_visible(overlay);
        let initial = snapshot.initial.is_visible(overlay);

        if activator && !current {
            flags.toggle(overlay);
            snapshot.current.toggle(overlay);
        } else if !activator && current && !initial {
            flags.toggle(overlay);
            snapshot.current.toggle(overlay);
        }
    }

    /// Drive both overlays from the snap overrides of one event.
    pub fn update_all(&mut self, overrides: SnapOverrides, flags: &mut impl OverlayFlags) {
        self.update(Overlay::Grid, overrides.force_grid, flags);
        self.update(Overlay::Resolution, overrides.force_resolution, flags);
    }

    /// Toggle back every overlay that differs from the snapshot and drop it.
    /// No-op before capture.
    pub fn restore(&mut self, flags: &mut impl OverlayFlags) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        for overlay in Overlay::ALL {
            if snapshot.current.is_visible(overlay) != snapshot.initial.is_visible(overlay) {
                flags.toggle(overlay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts toggles so tests can check no spurious flips happen.
    #[derive(Default)]
    struct CountingFlags {
        state: OverlayState,
        toggles: usize,
    }

    impl OverlayFlags for CountingFlags {
        fn is_visible(&self, overlay: Overlay) -> bool {
            self.state.is_visible(overlay)
        }

        fn toggle(&mut self, overlay: Overlay) {
            self.toggles += 1;
            self.state.toggle(overlay);
        }
    }

    #[test]
    fn test_calls_before_capture_are_noops() {
        let mut controller = OverlayController::new();
        let mut flags = CountingFlags::default();

        controller.update(Overlay::Grid, true, &mut flags);
        controller.restore(&mut flags);

        assert_eq!(flags.toggles, 0);
        assert!(!controller.is_captured());
    }

    #[test]
    fn test_capture_is_idempotent() {
        let mut controller = OverlayController::new();
        let mut flags = OverlayState::default();

        controller.capture_initial_state(&flags);
        flags.grid = true;
        controller.capture_initial_state(&flags);

        assert_eq!(controller.initial(), Some(OverlayState::default()));
    }

    #[test]
    fn test_hold_and_release_restores_off() {
        let mut controller = OverlayController::new();
        let mut flags = OverlayState::default();

        controller.capture_initial_state(&flags);
        controller.update(Overlay::Grid, true, &mut flags);
        assert!(flags.grid);

        controller.update(Overlay::Grid, false, &mut flags);
        assert!(!flags.grid);

        controller.restore(&mut flags);
        assert!(!flags.grid);
        assert!(!controller.is_captured());
    }

    #[test]
    fn test_held_until_end_restores_off() {
        let mut controller = OverlayController::new();
        let mut flags = CountingFlags::default();

        controller.capture_initial_state(&flags);
        controller.update(Overlay::Resolution, true, &mut flags);
        controller.update(Overlay::Resolution, true, &mut flags);
        assert!(flags.state.resolution);
        assert_eq!(flags.toggles, 1);

        controller.restore(&mut flags);
        assert!(!flags.state.resolution);
        assert_eq!(flags.toggles, 2);
    }

    #[test]
    fn test_user_preference_never_overridden() {
        let mut controller = OverlayController::new();
        let mut flags = CountingFlags {
            state: OverlayState { grid: true, resolution: false },
            toggles: 0,
        };

        controller.capture_initial_state(&flags);
        controller.update(Overlay::Grid, true, &mut flags);
        assert!(flags.state.grid);
        controller.update(Overlay::Grid, false, &mut flags);
        assert!(flags.state.grid);
        controller.restore(&mut flags);

        assert!(flags.state.grid);
        assert_eq!(flags.toggles, 0);
    }

    #[test]
    fn test_update_all_follows_overrides() {
        let mut controller = OverlayController::new();
        let mut flags = OverlayState::default();

        controller.capture_initial_state(&flags);
        controller.update_all(
            SnapOverrides { force_grid: true, force_resolution: true },
            &mut flags,
        );
        assert_eq!(flags, OverlayState { grid: true, resolution: true });

        controller.update_all(
            SnapOverrides { force_grid: false, force_resolution: true },
            &mut flags,
        );
        assert_eq!(flags, OverlayState { grid: false, resolution: true });

        controller.restore(&mut flags);
        assert_eq!(flags, OverlayState::default());
    }

    #[test]
    fn test_user_toggle_during_gesture_is_reverted() {
        let mut controller = OverlayController::new();
        let mut flags = OverlayState::default();

        controller.capture_initial_state(&flags);
        controller.update(Overlay::Grid, true, &mut flags);
        // User clicks the grid toggle off while still holding the modifier.
        flags.toggle(Overlay::Grid);
        controller.restore(&mut flags);

        // The controller believed the grid was on, so it toggles once more.
        assert!(flags.grid);
    }
}
