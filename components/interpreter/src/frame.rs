//! Activation frames and frame-slot kind inference.
//!
//! The slot layout (the [`FrameDescriptor`]) belongs to the shared node
//! tree and may be observed by several threads at once; the inferred
//! storage kind of each slot is therefore an atomic lattice that only ever
//! widens. The frames themselves are per-thread and cheaply chained, one
//! link for the enclosing function frame and one for the parent block
//! scope.

use core_types::Value;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Inferred storage kind of a frame slot.
///
/// Starts at `Illegal` (nothing observed). Observing a value moves the
/// slot to that value's kind; conflicting observations join at `Object`,
/// except `Int` under `Double`, which stays numeric. The kind never
/// narrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameSlotKind {
    /// No value observed yet
    Illegal = 0,
    /// Booleans only
    Boolean = 1,
    /// 32-bit integers only
    Int = 2,
    /// Doubles (and ints widened to double)
    Double = 3,
    /// Safe integers beyond 32 bits
    Long = 4,
    /// Any value; terminal state
    Object = 5,
}

impl FrameSlotKind {
    /// The kind a freshly observed value belongs to.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Boolean(_) => FrameSlotKind::Boolean,
            Value::Int(_) => FrameSlotKind::Int,
            Value::Double(_) => FrameSlotKind::Double,
            Value::Long(_) => FrameSlotKind::Long,
            _ => FrameSlotKind::Object,
        }
    }

    /// Joins two kinds: equal kinds stay, `Int` and `Double` meet at
    /// `Double`, everything else meets at `Object`.
    pub fn join(self, other: Self) -> Self {
        use FrameSlotKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Illegal, k) | (k, Illegal) => k,
            (Int, Double) | (Double, Int) => Double,
            _ => Object,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => FrameSlotKind::Illegal,
            1 => FrameSlotKind::Boolean,
            2 => FrameSlotKind::Int,
            3 => FrameSlotKind::Double,
            4 => FrameSlotKind::Long,
            _ => FrameSlotKind::Object,
        }
    }
}

/// One local-variable slot in a frame layout.
///
/// Created once per declaration site at tree-construction time and shared
/// by every read/write node that accesses the variable.
#[derive(Debug)]
pub struct FrameSlot {
    index: usize,
    identifier: String,
    kind: AtomicU8,
    temporal_dead_zone: bool,
}

impl FrameSlot {
    /// Index of this slot in its frame's value vector.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The variable name this slot was declared for.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether this is a block-scoped binding with a temporal dead zone.
    pub fn has_temporal_dead_zone(&self) -> bool {
        self.temporal_dead_zone
    }

    /// The currently inferred storage kind.
    pub fn kind(&self) -> FrameSlotKind {
        FrameSlotKind::from_u8(self.kind.load(Ordering::Acquire))
    }

    /// Folds an observed kind into the slot's inferred kind.
    ///
    /// Compare-and-set loop so racing observers can only widen; a lost
    /// race re-joins against the winner's kind.
    pub fn observe(&self, observed: FrameSlotKind) {
        let mut current = self.kind.load(Ordering::Acquire);
        loop {
            let joined = FrameSlotKind::from_u8(current).join(observed);
            if joined as u8 == current {
                return;
            }
            match self.kind.compare_exchange_weak(
                current,
                joined as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    trace!(
                        slot = self.identifier.as_str(),
                        kind = ?joined,
                        "frame slot kind widened"
                    );
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// The slot layout shared by all frames of one function or block.
#[derive(Debug, Default)]
pub struct FrameDescriptor {
    slots: RwLock<Vec<Arc<FrameSlot>>>,
}

impl FrameDescriptor {
    /// Creates an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot declared for `identifier`, declaring it if absent.
    pub fn find_or_add_slot(&self, identifier: &str, temporal_dead_zone: bool) -> Arc<FrameSlot> {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.iter().find(|s| s.identifier == identifier) {
            return Arc::clone(slot);
        }
        let slot = Arc::new(FrameSlot {
            index: slots.len(),
            identifier: identifier.to_string(),
            kind: AtomicU8::new(FrameSlotKind::Illegal as u8),
            temporal_dead_zone,
        });
        slots.push(Arc::clone(&slot));
        slot
    }

    /// Number of declared slots.
    pub fn slot_count(&self) -> usize {
        self.slots.read().len()
    }
}

/// A per-thread activation record.
///
/// `values[i] == None` means slot `i` has not been initialized; for
/// TDZ-flagged slots that state is observable as a reference error.
#[derive(Debug)]
pub struct Frame {
    descriptor: Arc<FrameDescriptor>,
    values: Vec<Option<Value>>,
    enclosing: Option<FrameRef>,
    parent_scope: Option<FrameRef>,
}

/// Shared handle to a frame within one thread of execution.
pub type FrameRef = Rc<RefCell<Frame>>;

impl Frame {
    /// Creates a root frame for the given layout.
    pub fn new(descriptor: Arc<FrameDescriptor>) -> FrameRef {
        Self::with_links(descriptor, None, None)
    }

    /// Creates a frame with enclosing-function and parent-scope links.
    pub fn with_links(
        descriptor: Arc<FrameDescriptor>,
        enclosing: Option<FrameRef>,
        parent_scope: Option<FrameRef>,
    ) -> FrameRef {
        let values = vec![None; descriptor.slot_count()];
        Rc::new(RefCell::new(Frame {
            descriptor,
            values,
            enclosing,
            parent_scope,
        }))
    }

    /// The layout this frame was created from.
    pub fn descriptor(&self) -> &Arc<FrameDescriptor> {
        &self.descriptor
    }

    /// Reads slot `index`; `None` means uninitialized.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.values.get(index).cloned().flatten()
    }

    /// Writes slot `index`, growing the value vector if the descriptor
    /// gained slots after this frame was created.
    pub fn set(&mut self, index: usize, value: Value) {
        if index >= self.values.len() {
            self.values.resize(index + 1, None);
        }
        self.values[index] = Some(value);
    }
}

/// Which activation a frame-slot access targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAccess {
    /// The current frame.
    Current,
    /// `frame_level` enclosing-function hops, then `scope_level` parent
    /// scope hops.
    Leveled {
        /// Number of enclosing-function links to follow
        frame_level: usize,
        /// Number of parent-scope links to follow after that
        scope_level: usize,
    },
}

impl FrameAccess {
    /// Resolves the frame this access targets, starting from `frame`.
    ///
    /// The tree builder guarantees the levels are in range; a missing link
    /// is a malformed tree.
    pub fn resolve(&self, frame: &FrameRef) -> FrameRef {
        match self {
            FrameAccess::Current => Rc::clone(frame),
            FrameAccess::Leveled {
                frame_level,
                scope_level,
            } => {
                let mut current = Rc::clone(frame);
                for _ in 0..*frame_level {
                    let next = current
                        .borrow()
                        .enclosing
                        .as_ref()
                        .map(Rc::clone)
                        .expect("frame level exceeds enclosing chain");
                    current = next;
                }
                for _ in 0..*scope_level {
                    let next = current
                        .borrow()
                        .parent_scope
                        .as_ref()
                        .map(Rc::clone)
                        .expect("scope level exceeds scope chain");
                    current = next;
                }
                current
            }
        }
    }
}
