//! Fan a drag delta out to every other element of a multi-selection.

use crate::scene::{ElementId, ElementRef, SceneStore};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Which store path a write goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Visual-only update, issued on every pointer move.
    Immediate,
    /// Persisted update, issued once per element when the gesture ends.
    Commit,
}

/// What a propagation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    /// Elements written, with their new positions.
    pub updated: Vec<(ElementId, Point)>,
    /// Participants no longer present in the scene.
    pub skipped: Vec<ElementId>,
}

/// Applies a shared delta to multi-drag participants.
///
/// Categories are resolved from a fresh scene snapshot on every pass since
/// a selection can mix all element categories and elements may be removed
/// by another actor mid-gesture.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaPropagator;

impl DeltaPropagator {
    /// Write `initial + delta` for every participant except `anchor`.
    ///
    /// Participants missing from the live scene are skipped, never an error.
    pub fn propagate<'a, S>(
        &self,
        store: &mut S,
        anchor: &ElementId,
        participants: impl IntoIterator<Item = (&'a ElementRef, &'a Point)>,
        delta: Vec2,
        mode: WriteMode,
    ) -> PropagationReport
    where
        S: SceneStore + ?Sized,
    {
        let snapshot = store.snapshot();
        let mut report = PropagationReport::default();

        for (participant, initial) in participants {
            if &participant.id == anchor {
                continue;
            }
            let Some(live) = snapshot.get(&participant.id) else {
                log::debug!("Skipping missing drag participant {}", participant.id);
                report.skipped.push(participant.id.clone());
                continue;
            };
            let position = *initial + delta;
            store.update(mode, live.category.update_entry(), &participant.id, position);
            report.updated.push((participant.id.clone(), position));
        }

        report
    }
}
