//! The execution node tree and its interpretation protocol.
//!
//! Every node executes against an activation frame and a realm context.
//! Besides the generic [`JsNode::execute`], nodes expose narrow entry
//! points (`execute_int`, `execute_double`, `execute_boolean`,
//! `execute_void`). A narrow entry point that cannot represent the actual
//! value fails with [`ExecError::UnexpectedResult`] carrying that value;
//! callers must consume or propagate it, never discard it.

use crate::context::RealmContext;
use crate::exception::JsException;
use crate::frame::FrameRef;
use crate::frame_slot::{ReadFrameSlotNode, WriteFrameSlotNode};
use crate::property::{ReadPropertyNode, WritePropertyNode};
use crate::switch::SwitchNode;
use core_types::Value;

/// Identifier of a jump target, matching breaks to the construct they
/// exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTargetId(pub u32);

/// Non-local outcomes of executing a node.
///
/// `Throw` is a catchable language error. `Break` is control flow,
/// consumed by the construct owning the target. `UnexpectedResult` is the
/// representation-mismatch signal of the narrow entry points; it always
/// carries the already-computed value and is never observable once the
/// generic path has taken over.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecError {
    /// A language-level exception in flight
    Throw(JsException),
    /// An explicit jump-target exit
    Break(JumpTargetId),
    /// A narrow entry point met a value outside its representation
    UnexpectedResult(Value),
}

impl From<JsException> for ExecError {
    fn from(exception: JsException) -> Self {
        ExecError::Throw(exception)
    }
}

/// A node of the executable tree.
///
/// The tree is immutable after construction except for each node's
/// specialization state, which is internally synchronized so the same tree
/// may be interpreted by several threads at once.
#[derive(Debug)]
pub enum JsNode {
    /// A literal value
    Constant(Value),
    /// A statement sequence; yields the last statement's value
    Block(Vec<JsNode>),
    /// An explicit exit to the enclosing construct with this target
    Break(JumpTargetId),
    /// Frame-slot read with kind specialization
    ReadFrameSlot(ReadFrameSlotNode),
    /// Frame-slot write with kind observation
    WriteFrameSlot(WriteFrameSlotNode),
    /// Property read through a per-site inline cache
    ReadProperty(ReadPropertyNode),
    /// Property write with value-representation specialization
    WriteProperty(WritePropertyNode),
    /// Switch dispatch over a jump table
    Switch(SwitchNode),
}

impl JsNode {
    /// Executes the node producing a generic value.
    pub fn execute(&self, cx: &RealmContext, frame: &FrameRef) -> Result<Value, ExecError> {
        match self {
            JsNode::Constant(value) => Ok(value.clone()),
            JsNode::Block(statements) => {
                let mut result = Value::Undefined;
                for statement in statements {
                    result = statement.execute(cx, frame)?;
                }
                Ok(result)
            }
            JsNode::Break(target) => Err(ExecError::Break(*target)),
            JsNode::ReadFrameSlot(node) => node.execute(cx, frame),
            JsNode::WriteFrameSlot(node) => node.execute(cx, frame),
            JsNode::ReadProperty(node) => node.execute(cx, frame),
            JsNode::WriteProperty(node) => node.execute(cx, frame),
            JsNode::Switch(node) => node.execute(cx, frame),
        }
    }

    /// Executes the node producing an `i32`.
    ///
    /// Fails with [`ExecError::UnexpectedResult`] when the value has any
    /// other representation.
    pub fn execute_int(&self, cx: &RealmContext, frame: &FrameRef) -> Result<i32, ExecError> {
        match self {
            JsNode::Constant(Value::Int(n)) => Ok(*n),
            JsNode::ReadFrameSlot(node) => node.execute_int(cx, frame),
            JsNode::WriteProperty(node) => node.execute_int(cx, frame),
            _ => expect_int(self.execute(cx, frame)?),
        }
    }

    /// Executes the node producing an `f64`.
    ///
    /// `Int` results widen transparently; everything else fails with
    /// [`ExecError::UnexpectedResult`].
    pub fn execute_double(&self, cx: &RealmContext, frame: &FrameRef) -> Result<f64, ExecError> {
        match self {
            JsNode::Constant(Value::Double(n)) => Ok(*n),
            JsNode::Constant(Value::Int(n)) => Ok(f64::from(*n)),
            JsNode::ReadFrameSlot(node) => node.execute_double(cx, frame),
            JsNode::WriteProperty(node) => node.execute_double(cx, frame),
            _ => expect_double(self.execute(cx, frame)?),
        }
    }

    /// Executes the node producing a `bool`.
    pub fn execute_boolean(&self, cx: &RealmContext, frame: &FrameRef) -> Result<bool, ExecError> {
        match self {
            JsNode::Constant(Value::Boolean(b)) => Ok(*b),
            JsNode::ReadFrameSlot(node) => node.execute_boolean(cx, frame),
            _ => match self.execute(cx, frame)? {
                Value::Boolean(b) => Ok(b),
                other => Err(ExecError::UnexpectedResult(other)),
            },
        }
    }

    /// Executes the node for its effects only.
    pub fn execute_void(&self, cx: &RealmContext, frame: &FrameRef) -> Result<(), ExecError> {
        match self {
            JsNode::Constant(_) => Ok(()),
            JsNode::WriteProperty(node) => node.execute_void(cx, frame),
            JsNode::WriteFrameSlot(node) => node.execute_void(cx, frame),
            _ => self.execute(cx, frame).map(|_| ()),
        }
    }
}

pub(crate) fn expect_int(value: Value) -> Result<i32, ExecError> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(ExecError::UnexpectedResult(other)),
    }
}

pub(crate) fn expect_double(value: Value) -> Result<f64, ExecError> {
    match value {
        Value::Double(n) => Ok(n),
        Value::Int(n) => Ok(f64::from(n)),
        other => Err(ExecError::UnexpectedResult(other)),
    }
}
