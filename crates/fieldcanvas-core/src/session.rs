//! Drag session lifecycle: begin, move, end or cancel.
//!
//! A [`DragEngine`] owns its collaborators (scene store, snap settings,
//! overlay flags) and drives one gesture at a time:
//!
//! - `begin` snapshots the selection and the overlay flags,
//! - `drag_to` snaps the grabbed element and writes immediate updates,
//! - `end` snaps once more and commits every participant exactly once,
//! - `cancel` puts every participant back without persisting anything.

use crate::config::EngineConfig;
use crate::input::{GestureEvent, PointerSample};
use crate::overlay::{OverlayController, OverlayFlags};
use crate::propagate::{DeltaPropagator, PropagationReport, WriteMode};
use crate::scene::{ElementId, ElementRef, Instruction, InstructionSink, SceneStore};
use crate::snap::{SnapRule, SnapSettingsProvider, snap_point};
use crate::transform::{to_logical, to_pixel};
use kurbo::{Point, Vec2};
use thiserror::Error;

/// Drag errors. None of these are shown to the user; hosts log and ignore them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DragError {
    #[error("A drag session is already active on {0}")]
    AlreadyActive(ElementId),
    #[error("No drag session is active")]
    NotActive,
    #[error("Element not found: {0}")]
    UnknownElement(ElementId),
    #[error("Element is locked: {0}")]
    Locked(ElementId),
    #[error("Grabbed element was removed during the drag: {0}")]
    ElementRemoved(ElementId),
}

/// Whether the gesture moves one element or a whole selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Only the grabbed element moves.
    Single,
    /// The whole selection moves with the grabbed element.
    Multi,
}

/// Bookkeeping for one active gesture.
#[derive(Debug, Clone)]
pub struct DragSession {
    primary: ElementRef,
    kind: DragKind,
    /// Grabbed element's logical position when the gesture began.
    anchor: Point,
    /// Pointer position minus element position, in logical units.
    grab_offset: Vec2,
    /// Participants and their positions at begin, in selection order.
    initial_positions: Vec<(ElementRef, Point)>,
    /// Last snapped position of the grabbed element.
    current: Point,
    moves: usize,
}

impl DragSession {
    /// The grabbed element.
    pub fn primary(&self) -> &ElementRef {
        &self.primary
    }

    /// Single or multi-element gesture.
    pub fn kind(&self) -> DragKind {
        self.kind
    }

    /// Grabbed element's logical position when the gesture began.
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    /// Last snapped position of the grabbed element.
    pub fn current(&self) -> Point {
        self.current
    }

    /// Current displacement of the grabbed element from the anchor.
    pub fn delta(&self) -> Vec2 {
        self.current - self.anchor
    }

    /// Every participant's position at begin.
    pub fn initial_positions(&self) -> &[(ElementRef, Point)] {
        &self.initial_positions
    }

    /// Position of one participant at begin.
    pub fn initial_position(&self, id: &ElementId) -> Option<Point> {
        self.initial_positions
            .iter()
            .find(|(r, _)| &r.id == id)
            .map(|(_, p)| *p)
    }

    /// Number of move events handled so far.
    pub fn moves(&self) -> usize {
        self.moves
    }
}

/// Engine phase.
#[derive(Debug, Clone, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Active(DragSession),
}

/// Result of one move event.
#[derive(Debug, Clone, PartialEq)]
pub struct DragFrame {
    /// Snapped logical position of the grabbed element.
    pub logical: Point,
    /// Same position in canvas pixels, for placing the rendered node.
    pub pixel: Point,
    /// Displacement from the anchor in logical units.
    pub delta: Vec2,
    /// Snap rule that produced `logical`.
    pub rule: SnapRule,
    /// Participants missing from the scene on this frame.
    pub skipped: usize,
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Final positions were persisted.
    Committed {
        kind: DragKind,
        primary: ElementId,
        /// Final logical position of the grabbed element.
        position: Point,
        delta: Vec2,
        /// Writes to the other participants.
        others: PropagationReport,
    },
    /// Participants were put back; nothing was persisted.
    Cancelled {
        /// Participants written back to their initial position.
        restored: usize,
    },
    /// The gesture could not be committed; participants were put back.
    Failed(DragError),
}

/// Response of [`DragEngine::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum GestureResponse {
    Started(DragKind),
    Moved(DragFrame),
    Finished(DragOutcome),
}

/// The drag coordination engine.
pub struct DragEngine<S, P, O> {
    config: EngineConfig,
    scene: S,
    settings: P,
    overlays: O,
    overlay_controller: OverlayController,
    propagator: DeltaPropagator,
    instructions: Option<Box<dyn InstructionSink>>,
    phase: DragPhase,
}

impl<S, P, O> DragEngine<S, P, O>
where
    S: SceneStore,
    P: SnapSettingsProvider,
    O: OverlayFlags,
{
    /// Create an idle engine around its collaborators.
    pub fn new(config: EngineConfig, scene: S, settings: P, overlays: O) -> Self {
        Self {
            config,
            scene,
            settings,
            overlays,
            overlay_controller: OverlayController::new(),
            propagator: DeltaPropagator,
            instructions: None,
            phase: DragPhase::Idle,
        }
    }

    /// Attach a sink for user-facing hint changes.
    pub fn with_instruction_sink(mut self, sink: impl InstructionSink + 'static) -> Self {
        self.instructions = Some(Box::new(sink));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable scene access. Edits made mid-gesture are seen by the next event.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn settings(&self) -> &P {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut P {
        &mut self.settings
    }

    pub fn overlays(&self) -> &O {
        &self.overlays
    }

    /// Mutable overlay access, e.g. for the user's own overlay toggles.
    pub fn overlays_mut(&mut self) -> &mut O {
        &mut self.overlays
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    /// Check if a gesture is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, DragPhase::Active(_))
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&DragSession> {
        match &self.phase {
            DragPhase::Active(session) => Some(session),
            DragPhase::Idle => None,
        }
    }

    /// Take the collaborators back.
    pub fn into_parts(self) -> (S, P, O) {
        (self.scene, self.settings, self.overlays)
    }

    /// Dispatch one host event.
    pub fn handle(&mut self, event: GestureEvent) -> Result<GestureResponse, DragError> {
        match event {
            GestureEvent::Down { target, sample } => {
                self.begin(&target, sample).map(GestureResponse::Started)
            }
            GestureEvent::Move(sample) => self
                .drag_to(sample)
                .map(GestureResponse::Moved)
                .ok_or(DragError::NotActive),
            GestureEvent::Up(sample) => self
                .end(sample)
                .map(GestureResponse::Finished)
                .ok_or(DragError::NotActive),
            GestureEvent::Cancel => self
                .cancel()
                .map(GestureResponse::Finished)
                .ok_or(DragError::NotActive),
        }
    }

    /// Start a gesture on `target`.
    ///
    /// The gesture is a multi-drag when the selection holds more than one
    /// element and includes `target`. A second `begin` while a gesture is
    /// active is rejected and the active gesture continues untouched.
    pub fn begin(&mut self, target: &ElementId, sample: PointerSample) -> Result<DragKind, DragError> {
        if let DragPhase::Active(session) = &self.phase {
            log::warn!(
                "Ignoring drag start on {} while dragging {}",
                target,
                session.primary.id
            );
            return Err(DragError::AlreadyActive(session.primary.id.clone()));
        }

        let snapshot = self.scene.snapshot();
        let element = snapshot
            .get(target)
            .ok_or_else(|| DragError::UnknownElement(target.clone()))?;
        if element.locked {
            return Err(DragError::Locked(target.clone()));
        }
        let primary = element.to_ref();
        let anchor = element.position;

        let selection = self.scene.selection();
        let kind = if selection.len() > 1 && selection.contains(target) {
            DragKind::Multi
        } else {
            DragKind::Single
        };

        let initial_positions = match kind {
            DragKind::Multi => selection
                .iter()
                .filter_map(|id| snapshot.get(id))
                .map(|e| (e.to_ref(), e.position))
                .collect(),
            DragKind::Single => vec![(primary.clone(), anchor)],
        };

        let pointer = to_logical(sample.position, self.config.pitch);
        let grab_offset = pointer - anchor;

        self.overlay_controller.capture_initial_state(&self.overlays);
        self.signal(Instruction::Dragging);

        log::info!(
            "Drag started on {} ({:?}, {} participant(s))",
            primary.id,
            kind,
            initial_positions.len()
        );

        self.phase = DragPhase::Active(DragSession {
            primary,
            kind,
            anchor,
            grab_offset,
            initial_positions,
            current: anchor,
            moves: 0,
        });
        Ok(kind)
    }

    /// Handle a pointer move. Returns `None` when no gesture is active.
    pub fn drag_to(&mut self, sample: PointerSample) -> Option<DragFrame> {
        let DragPhase::Active(session) = &mut self.phase else {
            return None;
        };

        let overrides = self.config.bindings.overrides(&sample.modifiers);
        self.overlay_controller.update_all(overrides, &mut self.overlays);

        let raw = to_logical(sample.position, self.config.pitch) - session.grab_offset;
        let snapped = snap_point(raw, overrides, &self.settings.snap_settings());
        session.current = snapped.point;
        session.moves += 1;
        let delta = session.delta();

        match self.scene.snapshot().get(&session.primary.id) {
            Some(live) => self.scene.update_immediate(
                live.category.update_entry(),
                &session.primary.id,
                snapped.point,
            ),
            None => log::debug!("Grabbed element {} is gone, not moving it", session.primary.id),
        }
        let skipped = match session.kind {
            DragKind::Multi => {
                self.propagator
                    .propagate(
                        &mut self.scene,
                        &session.primary.id,
                        session.initial_positions.iter().map(|(r, p)| (r, p)),
                        delta,
                        WriteMode::Immediate,
                    )
                    .skipped
                    .len()
            }
            DragKind::Single => 0,
        };

        log::debug!(
            "Drag move {}: raw=({:.3}, {:.3}) snapped=({:.3}, {:.3}) rule={:?}",
            session.moves,
            raw.x,
            raw.y,
            snapped.point.x,
            snapped.point.y,
            snapped.rule
        );

        Some(DragFrame {
            logical: snapped.point,
            pixel: to_pixel(snapped.point, self.config.pitch),
            delta,
            rule: snapped.rule,
            skipped,
        })
    }

    /// Finish the gesture and persist final positions.
    /// Returns `None` when no gesture is active.
    pub fn end(&mut self, sample: PointerSample) -> Option<DragOutcome> {
        let DragPhase::Active(mut session) = std::mem::take(&mut self.phase) else {
            return None;
        };

        let live_category = self
            .scene
            .snapshot()
            .get(&session.primary.id)
            .map(|e| e.category);
        let outcome = if let Some(category) = live_category {
            let overrides = self.config.bindings.overrides(&sample.modifiers);
            let raw = to_logical(sample.position, self.config.pitch) - session.grab_offset;
            let position = snap_point(raw, overrides, &self.settings.snap_settings()).point;
            session.current = position;
            let delta = session.delta();

            self.scene
                .update_persisted(category.update_entry(), &session.primary.id, position);
            let others = match session.kind {
                DragKind::Multi => self.propagator.propagate(
                    &mut self.scene,
                    &session.primary.id,
                    session.initial_positions.iter().map(|(r, p)| (r, p)),
                    delta,
                    WriteMode::Commit,
                ),
                DragKind::Single => PropagationReport::default(),
            };

            log::info!(
                "Drag committed on {}: ({:.3}, {:.3}), {} other(s) moved",
                session.primary.id,
                position.x,
                position.y,
                others.updated.len()
            );

            DragOutcome::Committed {
                kind: session.kind,
                primary: session.primary.id.clone(),
                position,
                delta,
                others,
            }
        } else {
            log::warn!("Drag on {} failed: element was removed", session.primary.id);
            self.restore_participants(&session);
            DragOutcome::Failed(DragError::ElementRemoved(session.primary.id.clone()))
        };

        self.finish();
        Some(outcome)
    }

    /// Abort the gesture: every participant goes back to its initial
    /// position through immediate writes and nothing is persisted.
    /// Returns `None` when no gesture is active.
    pub fn cancel(&mut self) -> Option<DragOutcome> {
        let DragPhase::Active(session) = std::mem::take(&mut self.phase) else {
            return None;
        };
        let restored = self.restore_participants(&session);
        log::info!("Drag cancelled on {}", session.primary.id);
        self.finish();
        Some(DragOutcome::Cancelled { restored })
    }

    /// Write every surviving participant back to its initial position.
    fn restore_participants(&mut self, session: &DragSession) -> usize {
        let snapshot = self.scene.snapshot();
        let mut restored = 0;
        for (participant, initial) in &session.initial_positions {
            let Some(live) = snapshot.get(&participant.id) else {
                continue;
            };
            self.scene
                .update_immediate(live.category.update_entry(), &participant.id, *initial);
            restored += 1;
        }
        restored
    }

    fn finish(&mut self) {
        self.overlay_controller.restore(&mut self.overlays);
        self.signal(Instruction::Default);
        self.phase = DragPhase::Idle;
    }

    fn signal(&mut self, instruction: Instruction) {
        if let Some(sink) = self.instructions.as_mut() {
            sink.set_instruction(instruction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use crate::overlay::OverlayState;
    use crate::scene::{ElementCategory, MemoryScene, SceneElement};
    use crate::snap::SnapSettings;
    use std::cell::RefCell;
    use std::rc::Rc;

    const EPS: f64 = 1e-9;

    type Engine = DragEngine<MemoryScene, SnapSettings, OverlayState>;

    fn engine(scene: MemoryScene, settings: SnapSettings) -> Engine {
        let config = EngineConfig::with_pitch(40.0).unwrap();
        DragEngine::new(config, scene, settings, OverlayState::default())
    }

    fn three_element_scene() -> MemoryScene {
        let mut scene = MemoryScene::new();
        scene.insert(SceneElement::new("a", ElementCategory::Geometry, Point::new(0.0, 0.0)));
        scene.insert(SceneElement::new("b", ElementCategory::Source, Point::new(1.0, 0.0)));
        scene.insert(SceneElement::new("c", ElementCategory::Lattice, Point::new(0.0, 1.0)));
        scene.select(&"a".into());
        scene.add_to_selection(&"b".into());
        scene.add_to_selection(&"c".into());
        scene
    }

    fn assert_point(actual: Option<Point>, x: f64, y: f64) {
        let p = actual.expect("element exists");
        assert!((p.x - x).abs() < EPS && (p.y - y).abs() < EPS, "got {p:?}, expected ({x}, {y})");
    }

    #[test]
    fn test_single_drag_grid_snap() {
        let mut scene = MemoryScene::new();
        scene.insert(SceneElement::new("a", ElementCategory::Geometry, Point::ZERO));
        let mut settings = SnapSettings::new();
        settings.set_grid_snap(true);
        let mut engine = engine(scene, settings);

        assert_eq!(engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)), Ok(DragKind::Single));
        let frame = engine.drag_to(PointerSample::at(83.0, 17.0)).unwrap();

        assert_eq!(frame.logical, Point::new(2.0, 0.0));
        assert_eq!(frame.pixel, Point::new(80.0, 0.0));
        assert_eq!(frame.rule, SnapRule::Grid);
        assert_point(engine.scene().position(&"a".into()), 2.0, 0.0);
        assert_point(engine.scene().persisted_position(&"a".into()), 0.0, 0.0);
    }

    #[test]
    fn test_grab_offset_preserved() {
        let mut scene = MemoryScene::new();
        scene.insert(SceneElement::new("a", ElementCategory::Geometry, Point::new(1.0, 1.0)));
        let mut engine = engine(scene, SnapSettings::new());

        // Grab 10px right of the element origin.
        engine.begin(&"a".into(), PointerSample::at(50.0, 40.0)).unwrap();
        let frame = engine.drag_to(PointerSample::at(90.0, 80.0)).unwrap();

        assert!((frame.logical.x - 2.0).abs() < EPS);
        assert!((frame.logical.y - 2.0).abs() < EPS);
    }

    #[test]
    fn test_resolution_modifier_override() {
        let mut scene = MemoryScene::new();
        scene.insert(SceneElement::new("a", ElementCategory::Source, Point::ZERO));
        let mut settings = SnapSettings::new();
        settings.set_resolution(Some(5)).unwrap();
        let mut engine = engine(scene, settings);

        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        // 0.37 logical units at pitch 40.
        let frame = engine
            .drag_to(PointerSample::at(14.8, 14.8).with_modifiers(Modifiers::ctrl()))
            .unwrap();

        assert!((frame.logical.x - 0.4).abs() < EPS);
        assert_eq!(frame.rule, SnapRule::Resolution);
    }

    #[test]
    fn test_multi_drag_delta_propagation() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());

        assert_eq!(engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)), Ok(DragKind::Multi));
        engine.drag_to(PointerSample::at(40.0, 40.0));
        engine.drag_to(PointerSample::at(80.0, 120.0));

        assert_point(engine.scene().position(&"a".into()), 2.0, 3.0);
        assert_point(engine.scene().position(&"b".into()), 3.0, 3.0);
        assert_point(engine.scene().position(&"c".into()), 2.0, 4.0);

        let outcome = engine.end(PointerSample::at(80.0, 120.0)).unwrap();
        assert!(matches!(outcome, DragOutcome::Committed { kind: DragKind::Multi, .. }));
        assert_point(engine.scene().persisted_position(&"a".into()), 2.0, 3.0);
        assert_point(engine.scene().persisted_position(&"b".into()), 3.0, 3.0);
        assert_point(engine.scene().persisted_position(&"c".into()), 2.0, 4.0);
    }

    #[test]
    fn test_immediate_and_commit_isolation() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        let ids: Vec<ElementId> = vec!["a".into(), "b".into(), "c".into()];

        engine.begin(&ids[0], PointerSample::at(0.0, 0.0)).unwrap();
        for step in 1..=5 {
            engine.drag_to(PointerSample::at(step as f64 * 10.0, 0.0));
        }
        for id in &ids {
            assert_eq!(engine.scene().write_count(id, WriteMode::Commit), 0);
            assert_eq!(engine.scene().write_count(id, WriteMode::Immediate), 5);
        }

        engine.end(PointerSample::at(50.0, 0.0));
        for id in &ids {
            assert_eq!(engine.scene().write_count(id, WriteMode::Commit), 1);
        }
        let last = engine.scene().writes().iter().rposition(|w| w.mode == WriteMode::Immediate);
        let first_commit = engine.scene().writes().iter().position(|w| w.mode == WriteMode::Commit);
        assert!(last < first_commit);
    }

    #[test]
    fn test_initial_positions_do_not_accumulate() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        for _ in 0..10 {
            engine.drag_to(PointerSample::at(40.0, 0.0));
        }
        assert_point(engine.scene().position(&"b".into()), 2.0, 0.0);
        assert_point(engine.session().unwrap().initial_position(&"b".into()), 1.0, 0.0);
    }

    #[test]
    fn test_unselected_target_is_single_drag() {
        let mut scene = three_element_scene();
        scene.insert(SceneElement::new("d", ElementCategory::Geometry, Point::new(5.0, 5.0)));
        let mut engine = engine(scene, SnapSettings::new());

        assert_eq!(engine.begin(&"d".into(), PointerSample::at(200.0, 200.0)), Ok(DragKind::Single));
        engine.drag_to(PointerSample::at(240.0, 200.0));
        assert_point(engine.scene().position(&"d".into()), 6.0, 5.0);
        assert_point(engine.scene().position(&"b".into()), 1.0, 0.0);
    }

    #[test]
    fn test_double_begin_rejected() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();

        let second = engine.begin(&"b".into(), PointerSample::at(40.0, 0.0));
        assert_eq!(second, Err(DragError::AlreadyActive("a".into())));
        assert_eq!(engine.session().unwrap().primary().id, ElementId::from("a"));
    }

    #[test]
    fn test_begin_rejects_unknown_and_locked() {
        let mut scene = MemoryScene::new();
        let mut locked = SceneElement::new("locked", ElementCategory::Geometry, Point::ZERO);
        locked.locked = true;
        scene.insert(locked);
        let mut engine = engine(scene, SnapSettings::new());

        assert_eq!(
            engine.begin(&"ghost".into(), PointerSample::default()),
            Err(DragError::UnknownElement("ghost".into()))
        );
        assert_eq!(
            engine.begin(&"locked".into(), PointerSample::default()),
            Err(DragError::Locked("locked".into()))
        );
        assert!(!engine.is_active());
    }

    #[test]
    fn test_events_while_idle_are_ignored() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        assert!(engine.drag_to(PointerSample::at(10.0, 10.0)).is_none());
        assert!(engine.end(PointerSample::at(10.0, 10.0)).is_none());
        assert!(engine.cancel().is_none());
        assert!(engine.scene().writes().is_empty());
        assert_eq!(
            engine.handle(GestureEvent::Move(PointerSample::default())),
            Err(DragError::NotActive)
        );
    }

    #[test]
    fn test_overlay_round_trip() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();

        engine.drag_to(PointerSample::at(10.0, 0.0).with_modifiers(Modifiers::shift()));
        assert!(engine.overlays().grid);
        engine.drag_to(PointerSample::at(20.0, 0.0));
        assert!(!engine.overlays().grid);

        engine.drag_to(PointerSample::at(30.0, 0.0).with_modifiers(Modifiers::shift()));
        engine.end(PointerSample::at(30.0, 0.0).with_modifiers(Modifiers::shift()));
        assert!(!engine.overlays().grid);
    }

    #[test]
    fn test_overlay_user_preference_kept() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        engine.overlays_mut().grid = true;

        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        engine.drag_to(PointerSample::at(10.0, 0.0).with_modifiers(Modifiers::shift()));
        assert!(engine.overlays().grid);
        engine.drag_to(PointerSample::at(20.0, 0.0));
        assert!(engine.overlays().grid);
        engine.end(PointerSample::at(20.0, 0.0));
        assert!(engine.overlays().grid);
    }

    #[test]
    fn test_cancel_restores_without_persisting() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        engine.drag_to(PointerSample::at(80.0, 80.0).with_modifiers(Modifiers::ctrl()));

        let outcome = engine.cancel().unwrap();
        assert_eq!(outcome, DragOutcome::Cancelled { restored: 3 });
        assert_point(engine.scene().position(&"a".into()), 0.0, 0.0);
        assert_point(engine.scene().position(&"b".into()), 1.0, 0.0);
        assert_point(engine.scene().position(&"c".into()), 0.0, 1.0);
        assert!(engine.scene().writes().iter().all(|w| w.mode == WriteMode::Immediate));
        assert_eq!(*engine.overlays(), OverlayState::default());
        assert!(!engine.is_active());
    }

    #[test]
    fn test_participant_removed_mid_gesture() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        engine.scene_mut().remove(&"b".into());

        let frame = engine.drag_to(PointerSample::at(40.0, 0.0)).unwrap();
        assert_eq!(frame.skipped, 1);

        let outcome = engine.end(PointerSample::at(40.0, 0.0)).unwrap();
        match outcome {
            DragOutcome::Committed { others, .. } => {
                assert_eq!(others.skipped, vec![ElementId::from("b")]);
                assert_eq!(others.updated.len(), 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_point(engine.scene().persisted_position(&"c".into()), 1.0, 1.0);
    }

    #[test]
    fn test_grabbed_element_removed_fails() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        engine.drag_to(PointerSample::at(40.0, 0.0).with_modifiers(Modifiers::shift()));
        engine.scene_mut().remove(&"a".into());

        let outcome = engine.end(PointerSample::at(40.0, 0.0)).unwrap();
        assert_eq!(outcome, DragOutcome::Failed(DragError::ElementRemoved("a".into())));
        assert_point(engine.scene().position(&"b".into()), 1.0, 0.0);
        assert_eq!(engine.scene().write_count(&"b".into(), WriteMode::Commit), 0);
        assert!(!engine.overlays().grid);
        assert!(!engine.is_active());
    }

    #[test]
    fn test_grabbed_element_written_through_live_category() {
        let mut scene = MemoryScene::new();
        scene.insert(SceneElement::new("a", ElementCategory::Geometry, Point::ZERO));
        let mut engine = engine(scene, SnapSettings::new());
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();

        // Replaced by a lattice with the same id mid-gesture.
        engine
            .scene_mut()
            .insert(SceneElement::new("a", ElementCategory::Lattice, Point::ZERO));
        engine.drag_to(PointerSample::at(40.0, 40.0));
        assert_point(engine.scene().position(&"a".into()), 1.0, 1.0);

        let outcome = engine.end(PointerSample::at(80.0, 40.0)).unwrap();
        assert!(matches!(outcome, DragOutcome::Committed { .. }));
        assert_point(engine.scene().position(&"a".into()), 2.0, 1.0);
        assert_point(engine.scene().persisted_position(&"a".into()), 2.0, 1.0);
        assert_eq!(engine.scene().writes().len(), 2);
        assert!(
            engine
                .scene()
                .writes()
                .iter()
                .all(|w| w.entry == crate::scene::UpdateEntry::Lattice)
        );
    }

    #[test]
    fn test_instruction_signals() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = {
            let seen = Rc::clone(&seen);
            move |i: Instruction| seen.borrow_mut().push(i)
        };
        let mut engine = engine(three_element_scene(), SnapSettings::new()).with_instruction_sink(sink);

        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        engine.end(PointerSample::at(0.0, 0.0));
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        engine.cancel();

        assert_eq!(
            *seen.borrow(),
            vec![
                Instruction::Dragging,
                Instruction::Default,
                Instruction::Dragging,
                Instruction::Default
            ]
        );
    }

    #[test]
    fn test_session_cleared_after_end() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
        engine.end(PointerSample::at(40.0, 0.0));
        assert!(engine.session().is_none());
        assert!(matches!(engine.phase(), DragPhase::Idle));

        // A new gesture starts from the committed positions.
        engine.begin(&"a".into(), PointerSample::at(40.0, 0.0)).unwrap();
        assert_point(engine.session().map(|s| s.anchor()), 1.0, 0.0);
        assert_point(engine.session().unwrap().initial_position(&"b".into()), 2.0, 0.0);
    }

    #[test]
    fn test_handle_dispatch() {
        let mut engine = engine(three_element_scene(), SnapSettings::new());
        let started = engine.handle(GestureEvent::Down {
            target: "a".into(),
            sample: PointerSample::at(0.0, 0.0),
        });
        assert_eq!(started, Ok(GestureResponse::Started(DragKind::Multi)));

        let moved = engine.handle(GestureEvent::Move(PointerSample::at(40.0, 0.0)));
        assert!(matches!(moved, Ok(GestureResponse::Moved(_))));

        let finished = engine.handle(GestureEvent::Up(PointerSample::at(40.0, 0.0)));
        assert!(matches!(
            finished,
            Ok(GestureResponse::Finished(DragOutcome::Committed { .. }))
        ));
    }

    #[test]
    fn test_borrowed_collaborators() {
        let mut scene = three_element_scene();
        let settings = SnapSettings::new();
        let mut overlays = OverlayState::default();
        {
            let config = EngineConfig::with_pitch(40.0).unwrap();
            let mut engine = DragEngine::new(config, &mut scene, &settings, &mut overlays);
            engine.begin(&"a".into(), PointerSample::at(0.0, 0.0)).unwrap();
            engine.end(PointerSample::at(40.0, 40.0));
        }
        assert_point(scene.persisted_position(&"c".into()), 1.0, 2.0);
    }
}
