//! fieldcanvas Core Library
//!
//! Platform-agnostic drag coordination engine for the fieldcanvas scene editor:
//! pixel/logical conversion, snapping, transient overlays, drag sessions and
//! multi-element delta propagation.

pub mod config;
pub mod input;
pub mod overlay;
pub mod propagate;
pub mod scene;
pub mod session;
pub mod snap;
pub mod transform;

pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use input::{GestureEvent, ModifierBindings, ModifierKey, Modifiers, PointerSample};
pub use overlay::{Overlay, OverlayController, OverlayFlags, OverlayState};
pub use propagate::{DeltaPropagator, PropagationReport, WriteMode};
pub use scene::{
    ElementCategory, ElementId, ElementRef, Instruction, InstructionSink, MemoryScene,
    SceneElement, SceneSnapshot, SceneStore, SceneWrite, UpdateEntry,
};
pub use session::{
    DragEngine, DragError, DragFrame, DragKind, DragOutcome, DragPhase, DragSession, GestureResponse,
};
pub use snap::{SnapOverrides, SnapResult, SnapRule, SnapSettings, SnapSettingsProvider, snap_point, snap_value};
pub use transform::{Pitch, to_logical, to_pixel};
