//! Inline caches for property access sites.
//!
//! Each property read/write node owns one cache mapping the shapes it has
//! seen to the resolved slot offset, so repeat accesses against a stable
//! shape skip the generic name lookup.

use arrayvec::ArrayVec;
use object_model::ShapeId;

/// Maximum number of shapes a polymorphic cache tracks.
const POLYMORPHIC_LIMIT: usize = 4;

/// Per-call-site property cache.
///
/// Transitions through states as more shapes are observed and never moves
/// backwards: uninitialized, one shape, up to four shapes, then megamorphic
/// (generic lookup every time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineCache {
    /// No shape observed yet
    Uninitialized,
    /// Single observed shape, the common case
    Monomorphic {
        /// The cached shape id
        shape: ShapeId,
        /// Slot offset of the property under that shape
        offset: u32,
    },
    /// Several observed shapes
    Polymorphic {
        /// Observed (shape, offset) pairs, oldest first
        entries: ArrayVec<(ShapeId, u32), POLYMORPHIC_LIMIT>,
    },
    /// Too many shapes; this site stays on the generic path
    Megamorphic,
}

impl InlineCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        InlineCache::Uninitialized
    }

    /// Returns the cached slot offset for `shape`, if present.
    pub fn lookup(&self, shape: ShapeId) -> Option<u32> {
        match self {
            InlineCache::Uninitialized | InlineCache::Megamorphic => None,
            InlineCache::Monomorphic {
                shape: cached,
                offset,
            } => (*cached == shape).then_some(*offset),
            InlineCache::Polymorphic { entries } => entries
                .iter()
                .find(|(cached, _)| *cached == shape)
                .map(|(_, offset)| *offset),
        }
    }

    /// Records a resolved `(shape, offset)` pair, widening the cache state
    /// as needed.
    pub fn update(&mut self, shape: ShapeId, offset: u32) {
        match self {
            InlineCache::Uninitialized => {
                *self = InlineCache::Monomorphic { shape, offset };
            }
            InlineCache::Monomorphic {
                shape: cached,
                offset: cached_offset,
            } => {
                if *cached == shape {
                    *cached_offset = offset;
                } else {
                    let mut entries = ArrayVec::new();
                    entries.push((*cached, *cached_offset));
                    entries.push((shape, offset));
                    *self = InlineCache::Polymorphic { entries };
                }
            }
            InlineCache::Polymorphic { entries } => {
                if let Some(entry) = entries.iter_mut().find(|(cached, _)| *cached == shape) {
                    entry.1 = offset;
                } else if entries.len() < POLYMORPHIC_LIMIT {
                    entries.push((shape, offset));
                } else {
                    *self = InlineCache::Megamorphic;
                }
            }
            InlineCache::Megamorphic => {}
        }
    }
}

impl Default for InlineCache {
    fn default() -> Self {
        Self::new()
    }
}
