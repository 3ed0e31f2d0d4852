//! Core value and location types for the execution engine.
//!
//! This crate provides the foundational types shared by the object model
//! and the node interpreter:
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`ObjectId`] - Heap handle used by [`Value::Object`]
//! - [`ErrorKind`] - Classification of catchable language errors
//! - [`SourceSection`] / [`SourcePosition`] - Source location tracking
//!
//! # Examples
//!
//! ```
//! use core_types::Value;
//!
//! let n = Value::Int(42);
//! assert!(n.is_truthy());
//! assert_eq!(n.type_of(), "number");
//! assert!(n.strict_equals(&Value::Double(42.0)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;
mod value;

pub use error::ErrorKind;
pub use source::{SourcePosition, SourceSection};
pub use value::{ObjectId, Value};
