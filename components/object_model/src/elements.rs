//! Specialized backing stores for numeric-indexed elements.
//!
//! The element store is the array analogue of shape transitions: the
//! narrowest variant that can represent every element written so far, with
//! monotonic widening and a one-time conversion cost per transition. The
//! variants mirror the original engine's dynamic array hierarchy:
//! contiguous int, contiguous double, generic object, and holes-permitting.

use core_types::Value;
use tracing::trace;

/// Backing store for an object's numeric-indexed elements.
///
/// Widening transitions: `Int` → `Double` (double written), any dense
/// variant → `Object` (non-numeric written), any variant → `Holes` (a gap
/// is created by an out-of-bounds write or a delete). A transition converts
/// the full backing store before it is installed, so a concurrent reader
/// holding the previous store never observes a half-converted one.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementStorage {
    /// Contiguous zero-based 32-bit integers
    Int(Vec<i32>),
    /// Contiguous zero-based doubles
    Double(Vec<f64>),
    /// Contiguous generic values
    Object(Vec<Value>),
    /// Generic values with holes (`None` = hole)
    Holes(Vec<Option<Value>>),
}

impl ElementStorage {
    /// Creates an empty int store, the narrowest starting variant.
    pub fn new() -> Self {
        ElementStorage::Int(Vec::new())
    }

    /// Variant name, for trace output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ElementStorage::Int(_) => "int",
            ElementStorage::Double(_) => "double",
            ElementStorage::Object(_) => "object",
            ElementStorage::Holes(_) => "holes",
        }
    }

    /// Number of element slots, holes included.
    pub fn len(&self) -> usize {
        match self {
            ElementStorage::Int(v) => v.len(),
            ElementStorage::Double(v) => v.len(),
            ElementStorage::Object(v) => v.len(),
            ElementStorage::Holes(v) => v.len(),
        }
    }

    /// Returns whether no element slots exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the element at `index`.
    ///
    /// Returns `None` for holes and for indices past the end; a hole is a
    /// distinguished absence, not an error.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            ElementStorage::Int(v) => v.get(index).map(|n| Value::Int(*n)),
            ElementStorage::Double(v) => v.get(index).map(|n| Value::Double(*n)),
            ElementStorage::Object(v) => v.get(index).cloned(),
            ElementStorage::Holes(v) => v.get(index).cloned().flatten(),
        }
    }

    /// Returns whether the store currently contains a hole.
    pub fn has_holes(&self) -> bool {
        match self {
            ElementStorage::Holes(v) => v.iter().any(|e| e.is_none()),
            _ => false,
        }
    }

    /// Writes `value` at `index`, widening the variant as needed.
    ///
    /// Integrity checks happen in the owning object; by the time this runs
    /// the write is known to be permitted.
    pub fn write(&mut self, index: usize, value: Value) {
        match self {
            ElementStorage::Int(v) => match value {
                Value::Int(n) if index < v.len() => v[index] = n,
                Value::Int(n) if index == v.len() => v.push(n),
                Value::Int(_) => {
                    self.widen_to_holes(index, value);
                }
                Value::Double(_) => {
                    self.widen_to_double(index, value);
                }
                _ => {
                    self.widen_to_object(index, value);
                }
            },
            ElementStorage::Double(v) => match value {
                Value::Int(n) if index < v.len() => v[index] = f64::from(n),
                Value::Int(n) if index == v.len() => v.push(f64::from(n)),
                Value::Double(n) if index < v.len() => v[index] = n,
                Value::Double(n) if index == v.len() => v.push(n),
                Value::Int(_) | Value::Double(_) => {
                    self.widen_to_holes(index, value);
                }
                _ => {
                    self.widen_to_object(index, value);
                }
            },
            ElementStorage::Object(v) => {
                if index < v.len() {
                    v[index] = value;
                } else if index == v.len() {
                    v.push(value);
                } else {
                    self.widen_to_holes(index, value);
                }
            }
            ElementStorage::Holes(v) => {
                if index >= v.len() {
                    v.resize(index + 1, None);
                }
                v[index] = Some(value);
            }
        }
    }

    /// Replaces the element at `index` with a hole.
    ///
    /// Returns whether an element was present. Dense variants widen to the
    /// holes variant first.
    pub fn delete(&mut self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        if let ElementStorage::Holes(v) = self {
            return v[index].take().is_some();
        }
        let mut converted = self.to_holes();
        let present = converted[index].take().is_some();
        self.install(ElementStorage::Holes(converted), index);
        present
    }

    fn widen_to_double(&mut self, index: usize, value: Value) {
        let converted = match self {
            ElementStorage::Int(v) => v.iter().map(|n| f64::from(*n)).collect(),
            _ => unreachable!("double widening starts from the int variant"),
        };
        self.install(ElementStorage::Double(converted), index);
        self.write(index, value);
    }

    fn widen_to_object(&mut self, index: usize, value: Value) {
        let converted = match self {
            ElementStorage::Int(v) => v.iter().map(|n| Value::Int(*n)).collect(),
            ElementStorage::Double(v) => v.iter().map(|n| Value::Double(*n)).collect(),
            _ => unreachable!("object widening starts from a numeric variant"),
        };
        self.install(ElementStorage::Object(converted), index);
        self.write(index, value);
    }

    fn widen_to_holes(&mut self, index: usize, value: Value) {
        let converted = self.to_holes();
        self.install(ElementStorage::Holes(converted), index);
        self.write(index, value);
    }

    fn to_holes(&self) -> Vec<Option<Value>> {
        match self {
            ElementStorage::Int(v) => v.iter().map(|n| Some(Value::Int(*n))).collect(),
            ElementStorage::Double(v) => v.iter().map(|n| Some(Value::Double(*n))).collect(),
            ElementStorage::Object(v) => v.iter().map(|e| Some(e.clone())).collect(),
            ElementStorage::Holes(v) => v.clone(),
        }
    }

    fn install(&mut self, wider: ElementStorage, index: usize) {
        trace!(
            from = self.kind_name(),
            to = wider.kind_name(),
            index,
            "element storage transition"
        );
        *self = wider;
    }
}

impl Default for ElementStorage {
    fn default() -> Self {
        Self::new()
    }
}
