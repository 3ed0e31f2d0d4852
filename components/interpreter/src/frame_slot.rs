//! Frame-slot read and write nodes.
//!
//! Reads record the representation they observe on the shared slot and
//! honor the temporal dead zone of block-scoped bindings; writes observe
//! the representation of the value they store. The slot's inferred kind
//! only widens, so concurrent interpretation of the same tree stays
//! consistent.

use crate::context::RealmContext;
use crate::frame::{FrameAccess, FrameRef, FrameSlot, FrameSlotKind};
use crate::node::{expect_double, expect_int, ExecError, JsNode};
use crate::exception::JsException;
use core_types::Value;
use std::sync::Arc;

/// Reads a local variable from an activation frame.
#[derive(Debug)]
pub struct ReadFrameSlotNode {
    slot: Arc<FrameSlot>,
    access: FrameAccess,
}

impl ReadFrameSlotNode {
    /// Creates a read of `slot` in the frame `access` resolves to.
    pub fn new(slot: Arc<FrameSlot>, access: FrameAccess) -> Self {
        Self { slot, access }
    }

    /// The slot this node reads.
    pub fn slot(&self) -> &Arc<FrameSlot> {
        &self.slot
    }

    /// Generic read.
    ///
    /// Reading an uninitialized TDZ slot raises a reference error every
    /// time; an uninitialized non-TDZ slot reads as `undefined`.
    pub fn execute(&self, _cx: &RealmContext, frame: &FrameRef) -> Result<Value, ExecError> {
        let target = self.access.resolve(frame);
        let value = target.borrow().get(self.slot.index());
        match value {
            Some(value) => {
                self.slot.observe(FrameSlotKind::of(&value));
                Ok(value)
            }
            None if self.slot.has_temporal_dead_zone() => {
                Err(ExecError::Throw(JsException::reference_error(format!(
                    "Cannot access '{}' before initialization",
                    self.slot.identifier()
                ))))
            }
            None => Ok(Value::Undefined),
        }
    }

    /// Reads expecting an `i32`.
    pub fn execute_int(&self, cx: &RealmContext, frame: &FrameRef) -> Result<i32, ExecError> {
        expect_int(self.execute(cx, frame)?)
    }

    /// Reads expecting an `f64`; `Int` contents widen.
    pub fn execute_double(&self, cx: &RealmContext, frame: &FrameRef) -> Result<f64, ExecError> {
        expect_double(self.execute(cx, frame)?)
    }

    /// Reads expecting a `bool`.
    pub fn execute_boolean(&self, cx: &RealmContext, frame: &FrameRef) -> Result<bool, ExecError> {
        match self.execute(cx, frame)? {
            Value::Boolean(b) => Ok(b),
            other => Err(ExecError::UnexpectedResult(other)),
        }
    }
}

/// Writes a local variable in an activation frame.
#[derive(Debug)]
pub struct WriteFrameSlotNode {
    slot: Arc<FrameSlot>,
    access: FrameAccess,
    rhs: Box<JsNode>,
}

impl WriteFrameSlotNode {
    /// Creates a write of `rhs` into `slot` in the frame `access`
    /// resolves to.
    pub fn new(slot: Arc<FrameSlot>, access: FrameAccess, rhs: JsNode) -> Self {
        Self {
            slot,
            access,
            rhs: Box::new(rhs),
        }
    }

    /// Evaluates the right-hand side, stores it, and yields it.
    pub fn execute(&self, cx: &RealmContext, frame: &FrameRef) -> Result<Value, ExecError> {
        let value = self.rhs.execute(cx, frame)?;
        self.slot.observe(FrameSlotKind::of(&value));
        let target = self.access.resolve(frame);
        target.borrow_mut().set(self.slot.index(), value.clone());
        Ok(value)
    }

    /// Effect-only write.
    pub fn execute_void(&self, cx: &RealmContext, frame: &FrameRef) -> Result<(), ExecError> {
        self.execute(cx, frame).map(|_| ())
    }
}
