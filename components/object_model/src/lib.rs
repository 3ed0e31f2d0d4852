//! Property storage model for dynamic objects.
//!
//! Objects have no fixed schema; their field layout is described by an
//! immutable, structurally shared [`Shape`]. Adding, removing or retyping a
//! property transitions the object to another shape through a memoized
//! transition table, so two objects built the same way share one shape
//! instance and call sites can guard property access on a single shape
//! comparison.
//!
//! Numeric-indexed elements use a separate specialization:
//! [`ElementStorage`] keeps the backing store in the narrowest variant that
//! can represent every element written so far, widening (int → double →
//! generic → holes) with a one-time conversion cost.
//!
//! # Examples
//!
//! ```
//! use core_types::Value;
//! use object_model::ObjectHeap;
//!
//! let heap = ObjectHeap::new();
//! let id = heap.alloc();
//! let obj = heap.get(id).unwrap();
//!
//! obj.set_property(heap.shapes(), "x", Value::Int(1)).unwrap();
//! assert_eq!(obj.get_property("x"), Some(Value::Int(1)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod elements;
mod error;
mod object;
mod shape;

pub use elements::ElementStorage;
pub use error::PropertyError;
pub use object::{JsObject, ObjectHeap};
pub use shape::{
    IntegrityLevel, PropertyStorageKind, Shape, ShapeId, ShapeProperty, ShapeRegistry,
    ShapeTransition,
};
