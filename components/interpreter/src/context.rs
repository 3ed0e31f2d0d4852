//! Realm-wide execution context.
//!
//! All state that would otherwise live in ambient globals is gathered here
//! and passed down explicitly: the object heap, runtime options, and the
//! realm's well-known function objects that stack capture special-cases.

use core_types::ObjectId;
use object_model::ObjectHeap;
use std::sync::Arc;

/// Tunable runtime options, fixed at context construction.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Maximum number of elements recorded in a captured stack trace.
    pub stack_trace_limit: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            stack_trace_limit: 16,
        }
    }
}

/// One realm's execution context.
///
/// Constructed once at startup and passed by reference to every node
/// execution; nodes never reach for process-global state.
#[derive(Debug)]
pub struct RealmContext {
    heap: Arc<ObjectHeap>,
    options: RuntimeOptions,
    apply_function: Option<ObjectId>,
    call_function: Option<ObjectId>,
}

impl RealmContext {
    /// Creates a context with a fresh heap and default options.
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    /// Creates a context with a fresh heap and the given options.
    pub fn with_options(options: RuntimeOptions) -> Self {
        Self {
            heap: Arc::new(ObjectHeap::new()),
            options,
            apply_function: None,
            call_function: None,
        }
    }

    /// The realm's object heap.
    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    /// A shareable handle to the realm's object heap.
    pub fn heap_arc(&self) -> Arc<ObjectHeap> {
        Arc::clone(&self.heap)
    }

    /// The runtime options this context was built with.
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Registers the realm's `Function.prototype.apply` object.
    pub fn set_apply_function(&mut self, id: ObjectId) {
        self.apply_function = Some(id);
    }

    /// Registers the realm's `Function.prototype.call` object.
    pub fn set_call_function(&mut self, id: ObjectId) {
        self.call_function = Some(id);
    }

    /// Returns whether `id` is the realm's apply or call trampoline.
    ///
    /// Stack capture never records these frames.
    pub fn is_apply_or_call(&self, id: ObjectId) -> bool {
        self.apply_function == Some(id) || self.call_function == Some(id)
    }
}

impl Default for RealmContext {
    fn default() -> Self {
        Self::new()
    }
}
