//! Dynamic objects and the heap that owns them.

use crate::elements::ElementStorage;
use crate::error::PropertyError;
use crate::shape::{IntegrityLevel, PropertyStorageKind, Shape, ShapeId, ShapeRegistry, ShapeTransition};
use core_types::{ObjectId, Value};
use parking_lot::RwLock;
use std::sync::Arc;

/// A dynamic object: a shape plus backing storage.
///
/// The shape always describes the current layout exactly. Named property
/// slots live in a vector indexed by the offsets the shape hands out;
/// numeric-indexed elements live in a separately specialized
/// [`ElementStorage`]. Both stores are replaced wholesale on layout
/// changes, never mutated into an inconsistent intermediate state.
///
/// Lock order is `shape` → `slots` → `elements`; every method that takes
/// more than one lock takes them in that order.
#[derive(Debug)]
pub struct JsObject {
    shape: RwLock<Arc<Shape>>,
    slots: RwLock<Vec<Value>>,
    elements: RwLock<ElementStorage>,
}

impl JsObject {
    /// Creates an object with the given starting shape.
    ///
    /// Slot storage is sized to the shape; pre-declared slots read as
    /// `undefined` until written.
    pub fn new(shape: Arc<Shape>) -> Self {
        let slots = vec![Value::Undefined; shape.property_count()];
        Self {
            shape: RwLock::new(shape),
            slots: RwLock::new(slots),
            elements: RwLock::new(ElementStorage::new()),
        }
    }

    /// The object's current shape.
    pub fn shape(&self) -> Arc<Shape> {
        Arc::clone(&self.shape.read())
    }

    /// The object's prototype link.
    pub fn prototype(&self) -> Option<ObjectId> {
        self.shape.read().prototype()
    }

    /// Generic property read: shape-indexed lookup by name.
    ///
    /// Returns `None` when the property is absent. Prototype chain walking
    /// is the caller's concern; this reads own properties only.
    pub fn get_property(&self, name: &str) -> Option<Value> {
        let shape = self.shape.read();
        let prop = shape.property(name)?;
        let slots = self.slots.read();
        slots.get(prop.offset as usize).cloned()
    }

    /// Guarded fast-path read for inline caches.
    ///
    /// Succeeds only when the object's shape still matches the caller's
    /// cached shape id; on `None` the caller must fall back to
    /// [`get_property`](Self::get_property) and refresh its cache.
    pub fn read_guarded(&self, expected: ShapeId, offset: u32) -> Option<Value> {
        let shape = self.shape.read();
        if shape.id() != expected {
            return None;
        }
        let slots = self.slots.read();
        slots.get(offset as usize).cloned()
    }

    /// Guarded fast-path write for inline caches.
    ///
    /// Returns `false` (and writes nothing) when the shape no longer
    /// matches, the slot's storage kind cannot hold `value`, or the object
    /// is frozen. The caller then takes the generic
    /// [`set_property`](Self::set_property) path.
    pub fn write_guarded(&self, expected: ShapeId, offset: u32, value: &Value) -> bool {
        let shape = self.shape.read();
        if shape.id() != expected || shape.is_frozen() {
            return false;
        }
        let Some(prop) = shape.properties().get(offset as usize) else {
            return false;
        };
        if !prop.kind.accepts(value) {
            return false;
        }
        let mut slots = self.slots.write();
        match slots.get_mut(offset as usize) {
            Some(slot) => {
                *slot = value.clone();
                true
            }
            None => false,
        }
    }

    /// Generic property write.
    ///
    /// Adds the property (transitioning the shape) when absent, widens the
    /// slot's storage kind when the value no longer fits, and otherwise
    /// writes in place. Returns the new shape when the layout changed, so
    /// call sites can refresh their caches.
    pub fn set_property(
        &self,
        shapes: &ShapeRegistry,
        name: &str,
        value: Value,
    ) -> Result<Option<Arc<Shape>>, PropertyError> {
        let mut shape = self.shape.write();
        if let Some(prop) = shape.property(name) {
            if shape.is_frozen() {
                return Err(PropertyError::NotWritable(name.to_string()));
            }
            let offset = prop.offset as usize;
            let mut changed = None;
            if !prop.kind.accepts(&value) {
                let widened = prop.kind.widened(PropertyStorageKind::of(&value));
                let next = shapes.transition(
                    &shape,
                    ShapeTransition::ChangeKind {
                        name: name.to_string(),
                        kind: widened,
                    },
                );
                *shape = Arc::clone(&next);
                changed = Some(next);
            }
            let mut slots = self.slots.write();
            if let Some(slot) = slots.get_mut(offset) {
                *slot = value;
            }
            Ok(changed)
        } else {
            if !shape.is_extensible() {
                return Err(PropertyError::NotExtensible(name.to_string()));
            }
            let next = shapes.transition(
                &shape,
                ShapeTransition::AddProperty {
                    name: name.to_string(),
                    kind: PropertyStorageKind::of(&value),
                },
            );
            *shape = Arc::clone(&next);
            let mut slots = self.slots.write();
            slots.push(value);
            Ok(Some(next))
        }
    }

    /// Removes a named property.
    ///
    /// Returns whether the property existed. Sealed and frozen objects
    /// reject removal of present properties without mutating.
    pub fn delete_property(
        &self,
        shapes: &ShapeRegistry,
        name: &str,
    ) -> Result<bool, PropertyError> {
        let mut shape = self.shape.write();
        let Some(prop) = shape.property(name) else {
            return Ok(false);
        };
        if shape.integrity() != IntegrityLevel::Extensible {
            return Err(PropertyError::NotConfigurable(name.to_string()));
        }
        let offset = prop.offset as usize;
        let next = shapes.transition(
            &shape,
            ShapeTransition::RemoveProperty {
                name: name.to_string(),
            },
        );
        *shape = next;
        let mut slots = self.slots.write();
        slots.remove(offset);
        Ok(true)
    }

    /// Replaces the prototype link, transitioning the shape.
    pub fn set_prototype(&self, shapes: &ShapeRegistry, prototype: Option<ObjectId>) {
        let mut shape = self.shape.write();
        let next = shapes.transition(&shape, ShapeTransition::SetPrototype { prototype });
        *shape = next;
    }

    /// Raises the integrity level. Lower levels are ignored (monotonic).
    pub fn set_integrity(&self, shapes: &ShapeRegistry, level: IntegrityLevel) {
        let mut shape = self.shape.write();
        if level <= shape.integrity() {
            return;
        }
        let next = shapes.transition(&shape, ShapeTransition::SetIntegrity { level });
        *shape = next;
    }

    /// Reads the element at `index`; `None` means hole or out of bounds.
    pub fn get_element(&self, index: usize) -> Option<Value> {
        self.elements.read().get(index)
    }

    /// Number of element slots, holes included.
    pub fn element_count(&self) -> usize {
        self.elements.read().len()
    }

    /// Writes the element at `index`, widening the storage variant as
    /// needed.
    ///
    /// Frozen objects reject every element write; sealed objects reject
    /// writes past the current length (no new elements), both without
    /// mutating.
    pub fn set_element(&self, index: usize, value: Value) -> Result<(), PropertyError> {
        let shape = self.shape.read();
        let mut elements = self.elements.write();
        if shape.is_frozen() {
            return Err(PropertyError::NotWritable(index.to_string()));
        }
        if index >= elements.len() && !shape.is_extensible() {
            return Err(PropertyError::NotExtensible(index.to_string()));
        }
        elements.write(index, value);
        Ok(())
    }

    /// Deletes the element at `index`, leaving a hole.
    pub fn delete_element(&self, index: usize) -> Result<bool, PropertyError> {
        let shape = self.shape.read();
        let mut elements = self.elements.write();
        if index >= elements.len() {
            return Ok(false);
        }
        if shape.integrity() != IntegrityLevel::Extensible {
            return Err(PropertyError::NotConfigurable(index.to_string()));
        }
        Ok(elements.delete(index))
    }
}

/// Owner of all objects in a realm, addressed by [`ObjectId`].
///
/// Values refer to objects only by id; the heap hands out `Arc` handles.
/// Allocation is append-only (reclamation is the host's concern).
#[derive(Debug)]
pub struct ObjectHeap {
    shapes: Arc<ShapeRegistry>,
    objects: RwLock<Vec<Arc<JsObject>>>,
}

impl ObjectHeap {
    /// Creates an empty heap with a fresh shape registry.
    pub fn new() -> Self {
        Self {
            shapes: Arc::new(ShapeRegistry::new()),
            objects: RwLock::new(Vec::new()),
        }
    }

    /// The shape registry shared by all objects in this heap.
    pub fn shapes(&self) -> &ShapeRegistry {
        &self.shapes
    }

    /// Allocates an empty object with the root shape.
    pub fn alloc(&self) -> ObjectId {
        self.alloc_with_prototype(None)
    }

    /// Allocates an empty object with the given prototype.
    pub fn alloc_with_prototype(&self, prototype: Option<ObjectId>) -> ObjectId {
        let shape = match prototype {
            None => self.shapes.root(),
            Some(_) => self
                .shapes
                .transition(&self.shapes.root(), ShapeTransition::SetPrototype { prototype }),
        };
        let mut objects = self.objects.write();
        let id = objects.len();
        objects.push(Arc::new(JsObject::new(shape)));
        id
    }

    /// Looks up an object by id.
    pub fn get(&self, id: ObjectId) -> Option<Arc<JsObject>> {
        self.objects.read().get(id).cloned()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns whether the heap holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}
