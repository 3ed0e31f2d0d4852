//! Property read and write nodes.
//!
//! Both nodes carry a per-site [`InlineCache`] guarded by shape id. The
//! write node additionally specializes on the representation of the value
//! it commits: the first committed representation installs a narrow fast
//! path for the right-hand side, and a later mismatch permanently widens
//! the site to the generic path.
//!
//! Evaluation order is fixed: target first, then the distinct receiver
//! (super-property writes only), then the right-hand side. The order is
//! observable whenever the right-hand side has side effects.

use crate::context::RealmContext;
use crate::exception::JsException;
use crate::frame::FrameRef;
use crate::inline_cache::InlineCache;
use crate::node::{ExecError, JsNode};
use core_types::Value;
use object_model::{JsObject, PropertyError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::trace;

const VALUE_UNSET: u8 = 0;
const VALUE_INT: u8 = 1;
const VALUE_DOUBLE: u8 = 2;
const VALUE_OBJECT: u8 = 3;

fn value_state_of(value: &Value) -> u8 {
    match value {
        Value::Int(_) => VALUE_INT,
        Value::Double(_) => VALUE_DOUBLE,
        _ => VALUE_OBJECT,
    }
}

/// Reads a named property from the value produced by a target expression.
#[derive(Debug)]
pub struct ReadPropertyNode {
    target: Box<JsNode>,
    key: String,
    cache: Mutex<InlineCache>,
}

impl ReadPropertyNode {
    /// Creates a read of `key` from `target`.
    pub fn new(target: JsNode, key: impl Into<String>) -> Self {
        Self {
            target: Box::new(target),
            key: key.into(),
            cache: Mutex::new(InlineCache::new()),
        }
    }

    /// Evaluates the target and reads the property, walking the prototype
    /// chain; an absent property reads as `undefined`.
    pub fn execute(&self, cx: &RealmContext, frame: &FrameRef) -> Result<Value, ExecError> {
        let target = self.target.execute(cx, frame)?;
        let Some(object_id) = target.as_object() else {
            return Err(ExecError::Throw(JsException::type_error(format!(
                "cannot read properties of {} (reading '{}')",
                target.type_of(),
                self.key
            ))));
        };

        let mut current_id = object_id;
        loop {
            let object = heap_object(cx, current_id)?;
            if current_id == object_id {
                if let Some(value) = self.read_own_cached(&object) {
                    return Ok(value);
                }
            }
            let shape = object.shape();
            if let Some(prop) = shape.property(&self.key) {
                if current_id == object_id {
                    self.cache.lock().update(shape.id(), prop.offset);
                }
                let value = object
                    .get_property(&self.key)
                    .unwrap_or(Value::Undefined);
                return Ok(value);
            }
            match shape.prototype() {
                Some(proto) => current_id = proto,
                None => return Ok(Value::Undefined),
            }
        }
    }

    fn read_own_cached(&self, object: &JsObject) -> Option<Value> {
        let shape_id = object.shape().id();
        let offset = self.cache.lock().lookup(shape_id)?;
        object.read_guarded(shape_id, offset)
    }
}

/// Writes a named property on the value produced by a target expression.
#[derive(Debug)]
pub struct WritePropertyNode {
    target: Box<JsNode>,
    receiver: Option<Box<JsNode>>,
    key: String,
    rhs: Box<JsNode>,
    value_state: AtomicU8,
    cache: Mutex<InlineCache>,
}

impl WritePropertyNode {
    /// Creates a write of `rhs` into `key` on `target`.
    pub fn new(target: JsNode, key: impl Into<String>, rhs: JsNode) -> Self {
        Self {
            target: Box::new(target),
            receiver: None,
            key: key.into(),
            rhs: Box::new(rhs),
            value_state: AtomicU8::new(VALUE_UNSET),
            cache: Mutex::new(InlineCache::new()),
        }
    }

    /// Creates a super-property write: the lookup target and the object
    /// the write lands on differ.
    pub fn with_receiver(target: JsNode, receiver: JsNode, key: impl Into<String>, rhs: JsNode) -> Self {
        let mut node = Self::new(target, key, rhs);
        node.receiver = Some(Box::new(receiver));
        node
    }

    /// The representation specialization currently installed, for tests
    /// and diagnostics.
    pub fn specialized_state(&self) -> u8 {
        self.value_state.load(Ordering::Acquire)
    }

    fn evaluate_receiver(
        &self,
        cx: &RealmContext,
        frame: &FrameRef,
        target: &Value,
    ) -> Result<Value, ExecError> {
        match &self.receiver {
            Some(receiver) => receiver.execute(cx, frame),
            None => Ok(target.clone()),
        }
    }

    /// Generic write; yields the committed value.
    pub fn execute(&self, cx: &RealmContext, frame: &FrameRef) -> Result<Value, ExecError> {
        let target = self.target.execute(cx, frame)?;
        let receiver = self.evaluate_receiver(cx, frame, &target)?;
        let value = self.rhs.execute(cx, frame)?;
        self.commit(cx, &receiver, value.clone())?;
        Ok(value)
    }

    /// Write whose right-hand side is expected to be an `i32`.
    ///
    /// On a representation mismatch the already-computed value is
    /// committed on the generic path before the mismatch propagates.
    pub fn execute_int(&self, cx: &RealmContext, frame: &FrameRef) -> Result<i32, ExecError> {
        let target = self.target.execute(cx, frame)?;
        let receiver = self.evaluate_receiver(cx, frame, &target)?;
        match self.rhs.execute_int(cx, frame) {
            Ok(n) => {
                self.commit(cx, &receiver, Value::Int(n))?;
                Ok(n)
            }
            Err(ExecError::UnexpectedResult(actual)) => {
                self.commit(cx, &receiver, actual.clone())?;
                Err(ExecError::UnexpectedResult(actual))
            }
            Err(other) => Err(other),
        }
    }

    /// Write whose right-hand side is expected to be an `f64`.
    pub fn execute_double(&self, cx: &RealmContext, frame: &FrameRef) -> Result<f64, ExecError> {
        let target = self.target.execute(cx, frame)?;
        let receiver = self.evaluate_receiver(cx, frame, &target)?;
        match self.rhs.execute_double(cx, frame) {
            Ok(n) => {
                self.commit(cx, &receiver, Value::Double(n))?;
                Ok(n)
            }
            Err(ExecError::UnexpectedResult(actual)) => {
                self.commit(cx, &receiver, actual.clone())?;
                Err(ExecError::UnexpectedResult(actual))
            }
            Err(other) => Err(other),
        }
    }

    /// Effect-only write driven by the installed representation state.
    pub fn execute_void(&self, cx: &RealmContext, frame: &FrameRef) -> Result<(), ExecError> {
        let target = self.target.execute(cx, frame)?;
        let receiver = self.evaluate_receiver(cx, frame, &target)?;

        match self.value_state.load(Ordering::Acquire) {
            VALUE_UNSET => {
                let value = self.rhs.execute(cx, frame)?;
                let observed = value_state_of(&value);
                // a racing thread may have installed a state already; the
                // lattice only moves forward either way
                let _ = self.value_state.compare_exchange(
                    VALUE_UNSET,
                    observed,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                trace!(key = self.key.as_str(), state = observed, "write site specialized");
                self.commit(cx, &receiver, value)
            }
            VALUE_INT => match self.rhs.execute_int(cx, frame) {
                Ok(n) => self.commit(cx, &receiver, Value::Int(n)),
                Err(ExecError::UnexpectedResult(actual)) => {
                    self.widen_to_generic();
                    self.commit(cx, &receiver, actual)
                }
                Err(other) => Err(other),
            },
            VALUE_DOUBLE => match self.rhs.execute_double(cx, frame) {
                Ok(n) => self.commit(cx, &receiver, Value::Double(n)),
                Err(ExecError::UnexpectedResult(actual)) => {
                    self.widen_to_generic();
                    self.commit(cx, &receiver, actual)
                }
                Err(other) => Err(other),
            },
            _ => {
                let value = self.rhs.execute(cx, frame)?;
                self.commit(cx, &receiver, value)
            }
        }
    }

    fn widen_to_generic(&self) {
        self.value_state.fetch_max(VALUE_OBJECT, Ordering::AcqRel);
        trace!(key = self.key.as_str(), "write site widened to generic");
    }

    fn commit(&self, cx: &RealmContext, receiver: &Value, value: Value) -> Result<(), ExecError> {
        let Some(object_id) = receiver.as_object() else {
            return Err(ExecError::Throw(JsException::type_error(format!(
                "cannot set property '{}' on {}",
                self.key,
                receiver.type_of()
            ))));
        };
        let object = heap_object(cx, object_id)?;

        // guarded fast path against the cached shape
        {
            let shape_id = object.shape().id();
            let cached = self.cache.lock().lookup(shape_id);
            if let Some(offset) = cached {
                if object.write_guarded(shape_id, offset, &value) {
                    return Ok(());
                }
            }
        }

        match object.set_property(cx.heap().shapes(), &self.key, value) {
            Ok(_) => {
                let shape = object.shape();
                if let Some(prop) = shape.property(&self.key) {
                    self.cache.lock().update(shape.id(), prop.offset);
                }
                Ok(())
            }
            Err(err) => Err(ExecError::Throw(property_error_to_exception(err))),
        }
    }
}

fn heap_object(cx: &RealmContext, id: core_types::ObjectId) -> Result<Arc<JsObject>, ExecError> {
    cx.heap().get(id).ok_or_else(|| {
        ExecError::Throw(JsException::new(
            core_types::ErrorKind::InternalError,
            format!("dangling object reference #{}", id),
        ))
    })
}

fn property_error_to_exception(err: PropertyError) -> JsException {
    JsException::type_error(err.to_string())
}
