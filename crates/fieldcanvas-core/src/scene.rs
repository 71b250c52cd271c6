//! Scene element references and the scene store collaborator.
//!
//! The drag engine only needs an element's id, category and logical
//! position. Everything else about an element (shape, material, source
//! parameters, lattice basis) belongs to the host and stays behind the
//! [`SceneStore`] trait.

use crate::propagate::WriteMode;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque element identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create an id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Element category, resolved once when an element enters the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    /// Shapes: rectangles, cylinders, triangles.
    Geometry,
    /// Field sources.
    Source,
    /// Shape-like absorbing boundary elements.
    Boundary,
    /// Periodic lattices.
    Lattice,
}

impl ElementCategory {
    /// All categories.
    pub const ALL: [ElementCategory; 4] = [
        ElementCategory::Geometry,
        ElementCategory::Source,
        ElementCategory::Boundary,
        ElementCategory::Lattice,
    ];

    /// The store entry point that updates elements of this category.
    pub fn update_entry(self) -> UpdateEntry {
        match self {
            ElementCategory::Geometry | ElementCategory::Boundary => UpdateEntry::Geometry,
            ElementCategory::Source => UpdateEntry::Source,
            ElementCategory::Lattice => UpdateEntry::Lattice,
        }
    }
}

/// Per-category update entry point of the scene store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateEntry {
    Geometry,
    Source,
    Lattice,
}

/// An element reference: id plus category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub id: ElementId,
    pub category: ElementCategory,
}

/// What the engine sees of a scene element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneElement {
    pub id: ElementId,
    pub category: ElementCategory,
    /// Position in logical units.
    pub position: Point,
    /// Locked elements cannot be grabbed.
    #[serde(default)]
    pub locked: bool,
}

impl SceneElement {
    /// Create an unlocked element.
    pub fn new(id: impl Into<ElementId>, category: ElementCategory, position: Point) -> Self {
        Self {
            id: id.into(),
            category,
            position,
            locked: false,
        }
    }

    /// Reference to this element.
    pub fn to_ref(&self) -> ElementRef {
        ElementRef {
            id: self.id.clone(),
            category: self.category,
        }
    }
}

/// Read and write access to the scene.
///
/// `update_immediate` is called for every pointer move and must stay cheap
/// (in-memory/visual only). `update_persisted` is called once per element at
/// the end of a gesture and may reach durable storage.
pub trait SceneStore {
    /// Live elements of one category.
    fn elements(&self, category: ElementCategory) -> Vec<SceneElement>;

    /// Ids of currently selected elements.
    fn selection(&self) -> Vec<ElementId>;

    /// Visual-only position write.
    fn update_immediate(&mut self, entry: UpdateEntry, id: &ElementId, position: Point);

    /// Persisted position write.
    fn update_persisted(&mut self, entry: UpdateEntry, id: &ElementId, position: Point);

    /// Write through the path selected by `mode`.
    fn update(&mut self, mode: WriteMode, entry: UpdateEntry, id: &ElementId, position: Point) {
        match mode {
            WriteMode::Immediate => self.update_immediate(entry, id, position),
            WriteMode::Commit => self.update_persisted(entry, id, position),
        }
    }

    /// Lookup table over every category.
    fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot::from_elements(
            ElementCategory::ALL
                .into_iter()
                .flat_map(|category| self.elements(category)),
        )
    }
}

impl<T: SceneStore + ?Sized> SceneStore for &mut T {
    fn elements(&self, category: ElementCategory) -> Vec<SceneElement> {
        (**self).elements(category)
    }

    fn selection(&self) -> Vec<ElementId> {
        (**self).selection()
    }

    fn update_immediate(&mut self, entry: UpdateEntry, id: &ElementId, position: Point) {
        (**self).update_immediate(entry, id, position)
    }

    fn update_persisted(&mut self, entry: UpdateEntry, id: &ElementId, position: Point) {
        (**self).update_persisted(entry, id, position)
    }
}

/// Live elements keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    elements: HashMap<ElementId, SceneElement>,
}

impl SceneSnapshot {
    /// Build a snapshot from elements.
    pub fn from_elements(elements: impl IntoIterator<Item = SceneElement>) -> Self {
        Self {
            elements: elements.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn get(&self, id: &ElementId) -> Option<&SceneElement> {
        self.elements.get(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// User-facing hint shown while interacting with the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Instruction {
    Default,
    Dragging,
}

/// Receives hint changes. Best effort: the engine never depends on it.
pub trait InstructionSink {
    fn set_instruction(&mut self, instruction: Instruction);
}

impl<F: FnMut(Instruction)> InstructionSink for F {
    fn set_instruction(&mut self, instruction: Instruction) {
        self(instruction)
    }
}

/// A write recorded by [`MemoryScene`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneWrite {
    pub mode: WriteMode,
    pub entry: UpdateEntry,
    pub id: ElementId,
    pub position: Point,
}

#[derive(Debug, Clone)]
struct StoredElement {
    element: SceneElement,
    /// Last persisted position; the element's own position is the live one.
    persisted: Point,
}

/// In-memory scene store for tests and tooling.
///
/// Elements are kept in insertion order. Every write is recorded so callers
/// can check which path each update took.
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    elements: HashMap<ElementId, StoredElement>,
    order: Vec<ElementId>,
    selection: Vec<ElementId>,
    writes: Vec<SceneWrite>,
}

impl MemoryScene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, replacing any element with the same id.
    pub fn insert(&mut self, element: SceneElement) {
        let id = element.id.clone();
        if !self.elements.contains_key(&id) {
            self.order.push(id.clone());
        }
        let persisted = element.position;
        self.elements.insert(id, StoredElement { element, persisted });
    }

    /// Remove an element and drop it from the selection.
    pub fn remove(&mut self, id: &ElementId) -> Option<SceneElement> {
        self.order.retain(|other| other != id);
        self.selection.retain(|other| other != id);
        self.elements.remove(id).map(|stored| stored.element)
    }

    /// Get an element by id.
    pub fn get(&self, id: &ElementId) -> Option<&SceneElement> {
        self.elements.get(id).map(|stored| &stored.element)
    }

    /// Live position of an element.
    pub fn position(&self, id: &ElementId) -> Option<Point> {
        self.get(id).map(|e| e.position)
    }

    /// Last persisted position of an element.
    pub fn persisted_position(&self, id: &ElementId) -> Option<Point> {
        self.elements.get(id).map(|stored| stored.persisted)
    }

    /// Elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SceneElement> {
        self.order
            .iter()
            .filter_map(|id| self.elements.get(id).map(|stored| &stored.element))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Select a single element (clears other selections).
    pub fn select(&mut self, id: &ElementId) {
        self.clear_selection();
        self.add_to_selection(id);
    }

    /// Add an element to the selection. Unknown and locked elements are ignored.
    pub fn add_to_selection(&mut self, id: &ElementId) {
        let selectable = self.get(id).is_some_and(|e| !e.locked);
        if selectable && !self.selection.contains(id) {
            self.selection.push(id.clone());
        }
    }

    /// Shift-click behavior: add if absent, remove if present.
    pub fn toggle_selection(&mut self, id: &ElementId) {
        if self.selection.contains(id) {
            self.selection.retain(|other| other != id);
        } else {
            self.add_to_selection(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Every write since the last [`take_writes`](Self::take_writes).
    pub fn writes(&self) -> &[SceneWrite] {
        &self.writes
    }

    /// Drain the write log.
    pub fn take_writes(&mut self) -> Vec<SceneWrite> {
        std::mem::take(&mut self.writes)
    }

    /// Number of writes to `id` through the given path.
    pub fn write_count(&self, id: &ElementId, mode: WriteMode) -> usize {
        self.writes
            .iter()
            .filter(|w| w.mode == mode && &w.id == id)
            .count()
    }

    fn write(&mut self, mode: WriteMode, entry: UpdateEntry, id: &ElementId, position: Point) {
        let Some(stored) = self.elements.get_mut(id) else {
            log::debug!("Ignoring {:?} write to missing element {}", mode, id);
            return;
        };
        // Each entry point only sees its own categories.
        if stored.element.category.update_entry() != entry {
            log::warn!(
                "Element {} is {:?}, not reachable through the {:?} entry point",
                id,
                stored.element.category,
                entry
            );
            return;
        }
        stored.element.position = position;
        if mode == WriteMode::Commit {
            stored.persisted = position;
        }
        self.writes.push(SceneWrite {
            mode,
            entry,
            id: id.clone(),
            position,
        });
    }
}

impl SceneStore for MemoryScene {
    fn elements(&self, category: ElementCategory) -> Vec<SceneElement> {
        self.iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    fn selection(&self) -> Vec<ElementId> {
        self.selection.clone()
    }

    fn update_immediate(&mut self, entry: UpdateEntry, id: &ElementId, position: Point) {
        self.write(WriteMode::Immediate, entry, id, position);
    }

    fn update_persisted(&mut self, entry: UpdateEntry, id: &ElementId, position: Point) {
        self.write(WriteMode::Commit, entry, id, position);
    }
}
