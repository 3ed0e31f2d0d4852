//! Shapes: immutable structural descriptions of object layouts.
//!
//! A shape maps property names to storage slots and records the prototype
//! link and integrity level. Shapes are interned: applying the same
//! transition to the same origin shape always yields the same target shape
//! instance, found through the registry's memoized transition table.

use core_types::{ObjectId, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Identifier of an interned shape, unique per [`ShapeRegistry`].
pub type ShapeId = u64;

/// Storage representation of a property slot.
///
/// Widening is monotonic: `Int` → `Double` → `Generic`. A slot never
/// narrows back after observing a wider value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyStorageKind {
    /// Slot has only ever held 32-bit integers
    Int,
    /// Slot has held doubles (and possibly ints)
    Double,
    /// Slot may hold any value
    Generic,
}

impl PropertyStorageKind {
    /// Returns the narrowest kind that can store `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Int(_) => PropertyStorageKind::Int,
            Value::Double(_) => PropertyStorageKind::Double,
            _ => PropertyStorageKind::Generic,
        }
    }

    /// Returns whether a slot of this kind can store `value` without a
    /// shape transition.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            PropertyStorageKind::Int => matches!(value, Value::Int(_)),
            PropertyStorageKind::Double => matches!(value, Value::Int(_) | Value::Double(_)),
            PropertyStorageKind::Generic => true,
        }
    }

    /// Joins two kinds on the widening lattice.
    pub fn widened(self, other: Self) -> Self {
        use PropertyStorageKind::*;
        match (self, other) {
            (Int, Int) => Int,
            (Int, Double) | (Double, Int) | (Double, Double) => Double,
            _ => Generic,
        }
    }
}

/// Integrity level of an object, ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntegrityLevel {
    /// Properties may be added, removed and written
    Extensible,
    /// No additions or removals; existing properties stay writable
    Sealed,
    /// No mutations of any kind
    Frozen,
}

/// One property in a shape: its name, slot offset and storage kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeProperty {
    /// Property name
    pub name: String,
    /// Offset into the object's property slot vector
    pub offset: u32,
    /// Storage representation of the slot
    pub kind: PropertyStorageKind,
}

/// Immutable description of an object's property layout.
///
/// Two objects that went through the same sequence of property additions
/// (same names, same storage kinds, same order) share one `Shape` instance.
#[derive(Debug, PartialEq, Eq)]
pub struct Shape {
    id: ShapeId,
    properties: Vec<ShapeProperty>,
    prototype: Option<ObjectId>,
    integrity: IntegrityLevel,
}

impl Shape {
    /// Registry-unique id of this shape, used by guard comparisons.
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// Properties in insertion order.
    pub fn properties(&self) -> &[ShapeProperty] {
        &self.properties
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&ShapeProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Number of property slots described by this shape.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Prototype link.
    pub fn prototype(&self) -> Option<ObjectId> {
        self.prototype
    }

    /// Integrity level.
    pub fn integrity(&self) -> IntegrityLevel {
        self.integrity
    }

    /// Returns whether new properties may be added.
    pub fn is_extensible(&self) -> bool {
        self.integrity == IntegrityLevel::Extensible
    }

    /// Returns whether all properties are read-only.
    pub fn is_frozen(&self) -> bool {
        self.integrity == IntegrityLevel::Frozen
    }

    /// Structural equality, ignoring the shape id.
    ///
    /// Callers racing on the transition table may observe either of two
    /// structurally equal shapes; comparisons that care about layout rather
    /// than interning identity must use this.
    pub fn structurally_equal(&self, other: &Shape) -> bool {
        self.properties == other.properties
            && self.prototype == other.prototype
            && self.integrity == other.integrity
    }
}

/// A layout mutation, used as the transition-table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeTransition {
    /// Add a property with the given storage kind at the next free offset.
    AddProperty {
        /// Property name
        name: String,
        /// Storage kind of the new slot
        kind: PropertyStorageKind,
    },
    /// Widen the storage kind of an existing property.
    ChangeKind {
        /// Property name
        name: String,
        /// New, wider storage kind
        kind: PropertyStorageKind,
    },
    /// Remove a property, compacting the offsets above it.
    RemoveProperty {
        /// Property name
        name: String,
    },
    /// Replace the prototype link.
    SetPrototype {
        /// New prototype, or `None` to clear it
        prototype: Option<ObjectId>,
    },
    /// Raise the integrity level. Never lowers it.
    SetIntegrity {
        /// New integrity level
        level: IntegrityLevel,
    },
}

/// Interning registry of shapes and their transitions.
///
/// The transition table is shared and append-only. Lookups are idempotent:
/// two threads racing to transition the same shape resolve to one entry,
/// and a loser's speculative shape is discarded (costing only an unused
/// id).
#[derive(Debug)]
pub struct ShapeRegistry {
    next_id: AtomicU64,
    root: Arc<Shape>,
    transitions: RwLock<HashMap<(ShapeId, ShapeTransition), Arc<Shape>>>,
}

impl ShapeRegistry {
    /// Creates a registry with an empty, extensible root shape.
    pub fn new() -> Self {
        let root = Arc::new(Shape {
            id: 0,
            properties: Vec::new(),
            prototype: None,
            integrity: IntegrityLevel::Extensible,
        });
        Self {
            next_id: AtomicU64::new(1),
            root,
            transitions: RwLock::new(HashMap::new()),
        }
    }

    /// The empty root shape all objects start from.
    pub fn root(&self) -> Arc<Shape> {
        Arc::clone(&self.root)
    }

    /// Applies a transition to `from`, returning the interned target shape.
    ///
    /// The same `(from, transition)` pair always resolves to the same
    /// `Arc<Shape>` instance for the life of the registry.
    pub fn transition(&self, from: &Arc<Shape>, transition: ShapeTransition) -> Arc<Shape> {
        let key = (from.id, transition);
        if let Some(cached) = self.transitions.read().get(&key) {
            return Arc::clone(cached);
        }

        // Build the candidate outside the write lock; a racing thread may
        // win the insert, in which case the candidate is dropped.
        let candidate = Arc::new(self.apply(from, &key.1));
        let mut table = self.transitions.write();
        let entry = table.entry(key).or_insert_with(|| {
            trace!(
                from = from.id,
                to = candidate.id,
                "shape transition interned"
            );
            Arc::clone(&candidate)
        });
        Arc::clone(entry)
    }

    fn apply(&self, from: &Shape, transition: &ShapeTransition) -> Shape {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut properties = from.properties.clone();
        let mut prototype = from.prototype;
        let mut integrity = from.integrity;
        match transition {
            ShapeTransition::AddProperty { name, kind } => {
                debug_assert!(from.property(name).is_none(), "property already present");
                let offset = properties.len() as u32;
                properties.push(ShapeProperty {
                    name: name.clone(),
                    offset,
                    kind: *kind,
                });
            }
            ShapeTransition::ChangeKind { name, kind } => {
                let prop = properties
                    .iter_mut()
                    .find(|p| &p.name == name)
                    .expect("ChangeKind on absent property");
                debug_assert_eq!(prop.kind.widened(*kind), *kind, "kind change must widen");
                prop.kind = *kind;
            }
            ShapeTransition::RemoveProperty { name } => {
                let removed = properties
                    .iter()
                    .position(|p| &p.name == name)
                    .expect("RemoveProperty on absent property");
                let removed_offset = properties[removed].offset;
                properties.remove(removed);
                for prop in &mut properties {
                    if prop.offset > removed_offset {
                        prop.offset -= 1;
                    }
                }
            }
            ShapeTransition::SetPrototype { prototype: proto } => {
                prototype = *proto;
            }
            ShapeTransition::SetIntegrity { level } => {
                debug_assert!(*level >= integrity, "integrity level never lowers");
                integrity = *level;
            }
        }
        Shape {
            id,
            properties,
            prototype,
            integrity,
        }
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
