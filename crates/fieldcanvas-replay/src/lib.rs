//! Gesture replay for fieldcanvas.
//!
//! Loads a JSON script describing a scene, snap settings, overlay flags and a
//! sequence of gesture events, runs the events through a [`DragEngine`] over
//! a [`MemoryScene`], and reports what happened.

use fieldcanvas_core::{
    DragEngine, DragKind, DragOutcome, ElementCategory, ElementId, EngineConfig, GestureEvent,
    GestureResponse, Instruction, MemoryScene, OverlayState, SceneElement, SnapSettings,
    WriteMode,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid script: {0}")]
    Script(String),
    #[error("Unknown element in selection: {0}")]
    UnknownSelection(ElementId),
}

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// A replay script.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub snap: SnapSettings,
    #[serde(default)]
    pub overlays: OverlayState,
    pub elements: Vec<SceneElement>,
    #[serde(default)]
    pub selection: Vec<ElementId>,
    pub events: Vec<GestureEvent>,
}

impl ReplayScript {
    /// Parse a script from JSON.
    pub fn from_json_str(json: &str) -> ReplayResult<Self> {
        serde_json::from_str(json).map_err(|e| ReplayError::Script(e.to_string()))
    }

    /// Load a script from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}

/// What one event did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepReport {
    Started { multi: bool },
    Moved { x: f64, y: f64 },
    Committed { x: f64, y: f64, others: usize, skipped: usize },
    Cancelled { restored: usize },
    Failed { error: String },
    Rejected { error: String },
}

/// Final state of one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementReport {
    pub id: ElementId,
    pub category: ElementCategory,
    pub position: Point,
    pub persisted: Point,
    pub immediate_writes: usize,
    pub persisted_writes: usize,
}

/// Result of a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepReport>,
    pub elements: Vec<ElementReport>,
    pub overlays: OverlayState,
    /// Whether a gesture was still active after the last event.
    pub left_active: bool,
}

/// Run a script.
pub fn replay(script: ReplayScript) -> ReplayResult<ReplayReport> {
    let mut scene = MemoryScene::new();
    for element in script.elements {
        scene.insert(element);
    }
    for id in &script.selection {
        if scene.get(id).is_none() {
            return Err(ReplayError::UnknownSelection(id.clone()));
        }
        scene.add_to_selection(id);
    }

    let mut engine = DragEngine::new(script.config, scene, script.snap, script.overlays)
        .with_instruction_sink(|instruction: Instruction| {
            log::debug!("Instruction: {:?}", instruction)
        });

    let mut steps = Vec::with_capacity(script.events.len());
    for event in script.events {
        let step = match engine.handle(event) {
            Ok(response) => step_report(response),
            Err(e) => {
                log::warn!("Event rejected: {}", e);
                StepReport::Rejected { error: e.to_string() }
            }
        };
        steps.push(step);
    }

    let left_active = engine.is_active();
    let (scene, _, overlays) = engine.into_parts();
    let elements = scene
        .iter()
        .map(|e| ElementReport {
            id: e.id.clone(),
            category: e.category,
            position: e.position,
            persisted: scene.persisted_position(&e.id).unwrap_or(e.position),
            immediate_writes: scene.write_count(&e.id, WriteMode::Immediate),
            persisted_writes: scene.write_count(&e.id, WriteMode::Commit),
        })
        .collect();

    Ok(ReplayReport {
        steps,
        elements,
        overlays,
        left_active,
    })
}

fn step_report(response: GestureResponse) -> StepReport {
    match response {
        GestureResponse::Started(kind) => StepReport::Started {
            multi: kind == DragKind::Multi,
        },
        GestureResponse::Moved(frame) => StepReport::Moved {
            x: frame.logical.x,
            y: frame.logical.y,
        },
        GestureResponse::Finished(DragOutcome::Committed { position, others, .. }) => {
            StepReport::Committed {
                x: position.x,
                y: position.y,
                others: others.updated.len(),
                skipped: others.skipped.len(),
            }
        }
        GestureResponse::Finished(DragOutcome::Cancelled { restored }) => {
            StepReport::Cancelled { restored }
        }
        GestureResponse::Finished(DragOutcome::Failed(e)) => StepReport::Failed {
            error: e.to_string(),
        },
    }
}
