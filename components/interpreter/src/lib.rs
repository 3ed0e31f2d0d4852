//! Tree-walking execution engine with self-specializing nodes.
//!
//! Programs arrive as a tree of [`JsNode`]s built by an upstream parser
//! (or reconstructed by the [`decoder`]). Each node exposes typed entry
//! points and records what it observes: frame slots infer a storage kind,
//! property sites cache shapes and the representation of committed values,
//! and every such specialization only ever widens, so one tree can be
//! interpreted by several threads at once.
//!
//! Language-level failures travel as [`JsException`] values carrying a
//! stack trace captured through the host's frame walker; representation
//! mismatches travel as [`ExecError::UnexpectedResult`] and never escape
//! the generic fallback paths.
//!
//! # Example
//!
//! ```
//! use core_types::Value;
//! use interpreter::{Frame, FrameDescriptor, JsNode, RealmContext};
//! use std::sync::Arc;
//!
//! let cx = RealmContext::new();
//! let frame = Frame::new(Arc::new(FrameDescriptor::new()));
//! let program = JsNode::Block(vec![
//!     JsNode::Constant(Value::Int(1)),
//!     JsNode::Constant(Value::Int(2)),
//! ]);
//! assert_eq!(program.execute(&cx, &frame).unwrap(), Value::Int(2));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod context;
pub mod decoder;
pub mod exception;
pub mod frame;
pub mod frame_slot;
pub mod inline_cache;
pub mod node;
pub mod property;
pub mod stack_trace;
pub mod switch;

pub use context::{RealmContext, RuntimeOptions};
pub use decoder::{decode, DecodeError, DecodedTree};
pub use exception::JsException;
pub use frame::{Frame, FrameAccess, FrameDescriptor, FrameRef, FrameSlot, FrameSlotKind};
pub use frame_slot::{ReadFrameSlotNode, WriteFrameSlotNode};
pub use inline_cache::InlineCache;
pub use node::{ExecError, JsNode, JumpTargetId};
pub use property::{ReadPropertyNode, WritePropertyNode};
pub use stack_trace::{capture_stack_trace, HostFrame, StackTraceElement};
pub use switch::SwitchNode;
