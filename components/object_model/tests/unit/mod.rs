//! Unit tests for the property storage model

use core_types::Value;
use object_model::{
    IntegrityLevel, ObjectHeap, PropertyError, PropertyStorageKind, ShapeRegistry, ShapeTransition,
};
use std::sync::Arc;
use std::thread;

// ============================================================================
// Structural sharing
// ============================================================================

#[test]
fn test_objects_built_the_same_way_share_a_shape() {
    let heap = ObjectHeap::new();
    let a = heap.get(heap.alloc()).unwrap();
    let b = heap.get(heap.alloc()).unwrap();

    for obj in [&a, &b] {
        obj.set_property(heap.shapes(), "x", Value::Int(1)).unwrap();
        obj.set_property(heap.shapes(), "y", Value::Double(2.0))
            .unwrap();
    }

    assert!(Arc::ptr_eq(&a.shape(), &b.shape()));
    assert_eq!(a.shape().id(), b.shape().id());
}

#[test]
fn test_divergent_histories_yield_distinct_shapes() {
    let heap = ObjectHeap::new();
    let a = heap.get(heap.alloc()).unwrap();
    let b = heap.get(heap.alloc()).unwrap();

    a.set_property(heap.shapes(), "x", Value::Int(1)).unwrap();
    // same name, wider representation: different slot kind, different shape
    b.set_property(heap.shapes(), "x", Value::Double(1.0))
        .unwrap();

    assert!(!Arc::ptr_eq(&a.shape(), &b.shape()));
    assert_eq!(
        a.shape().property("x").unwrap().kind,
        PropertyStorageKind::Int
    );
    assert_eq!(
        b.shape().property("x").unwrap().kind,
        PropertyStorageKind::Double
    );
}

#[test]
fn test_shape_reconverges_after_widening() {
    let heap = ObjectHeap::new();
    let a = heap.get(heap.alloc()).unwrap();
    let b = heap.get(heap.alloc()).unwrap();

    a.set_property(heap.shapes(), "x", Value::Int(1)).unwrap();
    a.set_property(heap.shapes(), "x", Value::Double(1.5))
        .unwrap();
    b.set_property(heap.shapes(), "x", Value::Double(2.5))
        .unwrap();

    // a widened Int -> Double; b started at Double. Layouts agree even
    // though the interned instances came from different transition chains.
    assert!(a.shape().structurally_equal(&b.shape()));
}

// ============================================================================
// Concurrent interning
// ============================================================================

#[test]
fn test_racing_transitions_intern_one_shape() {
    let registry = Arc::new(ShapeRegistry::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            let mut shape = registry.root();
            for name in ["a", "b", "c", "d"] {
                shape = registry.transition(
                    &shape,
                    ShapeTransition::AddProperty {
                        name: name.to_string(),
                        kind: PropertyStorageKind::Generic,
                    },
                );
            }
            shape
        }));
    }
    let shapes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for shape in &shapes[1..] {
        assert!(Arc::ptr_eq(&shapes[0], shape));
    }
}

#[test]
fn test_concurrent_writers_to_distinct_objects() {
    let heap = Arc::new(ObjectHeap::new());
    let ids: Vec<_> = (0..8).map(|_| heap.alloc()).collect();

    let mut handles = Vec::new();
    for id in ids.clone() {
        let heap = Arc::clone(&heap);
        handles.push(thread::spawn(move || {
            let obj = heap.get(id).unwrap();
            for i in 0..100 {
                obj.set_property(heap.shapes(), "n", Value::Int(i)).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let first = heap.get(ids[0]).unwrap();
    for id in &ids {
        let obj = heap.get(*id).unwrap();
        assert_eq!(obj.get_property("n"), Some(Value::Int(99)));
        assert!(Arc::ptr_eq(&first.shape(), &obj.shape()));
    }
}

// ============================================================================
// Inline-cache guard contract
// ============================================================================

#[test]
fn test_guarded_access_invalidated_by_layout_change() {
    let heap = ObjectHeap::new();
    let obj = heap.get(heap.alloc()).unwrap();
    obj.set_property(heap.shapes(), "x", Value::Int(1)).unwrap();

    let cached = obj.shape();
    let offset = cached.property("x").unwrap().offset;
    assert_eq!(obj.read_guarded(cached.id(), offset), Some(Value::Int(1)));

    // adding a property moves the object to a new shape; the old guard
    // must miss rather than read stale layout
    obj.set_property(heap.shapes(), "y", Value::Int(2)).unwrap();
    assert_eq!(obj.read_guarded(cached.id(), offset), None);
    assert!(!obj.write_guarded(cached.id(), offset, &Value::Int(3)));

    let fresh = obj.shape();
    let offset = fresh.property("x").unwrap().offset;
    assert_eq!(obj.read_guarded(fresh.id(), offset), Some(Value::Int(1)));
}

// ============================================================================
// Element storage round trips
// ============================================================================

#[test]
fn test_element_variant_round_trips() {
    let heap = ObjectHeap::new();
    let obj = heap.get(heap.alloc()).unwrap();

    for i in 0..10 {
        obj.set_element(i, Value::Int(i as i32)).unwrap();
    }
    for i in 0..10 {
        assert_eq!(obj.get_element(i), Some(Value::Int(i as i32)));
    }

    obj.set_element(3, Value::Double(3.5)).unwrap();
    assert_eq!(obj.get_element(3), Some(Value::Double(3.5)));
    assert_eq!(obj.get_element(2), Some(Value::Double(2.0)));

    obj.set_element(4, Value::String("four".to_string())).unwrap();
    assert_eq!(obj.get_element(4), Some(Value::String("four".to_string())));
    assert_eq!(obj.get_element(9), Some(Value::Double(9.0)));

    obj.delete_element(5).unwrap();
    assert_eq!(obj.get_element(5), None);
    assert_eq!(obj.element_count(), 10);
}

// ============================================================================
// Integrity levels
// ============================================================================

#[test]
fn test_seal_then_freeze_is_monotonic() {
    let heap = ObjectHeap::new();
    let obj = heap.get(heap.alloc()).unwrap();
    obj.set_property(heap.shapes(), "x", Value::Int(1)).unwrap();

    obj.set_integrity(heap.shapes(), IntegrityLevel::Frozen);
    // attempting to lower back to sealed is ignored
    obj.set_integrity(heap.shapes(), IntegrityLevel::Sealed);
    assert_eq!(obj.shape().integrity(), IntegrityLevel::Frozen);

    assert_eq!(
        obj.set_property(heap.shapes(), "x", Value::Int(2)),
        Err(PropertyError::NotWritable("x".to_string()))
    );
}

#[test]
fn test_rejected_mutations_leave_object_unchanged() {
    let heap = ObjectHeap::new();
    let obj = heap.get(heap.alloc()).unwrap();
    obj.set_property(heap.shapes(), "x", Value::Int(1)).unwrap();
    obj.set_element(0, Value::Int(10)).unwrap();
    obj.set_integrity(heap.shapes(), IntegrityLevel::Sealed);
    let shape = obj.shape();

    assert!(obj.set_property(heap.shapes(), "new", Value::Int(0)).is_err());
    assert!(obj.delete_property(heap.shapes(), "x").is_err());
    assert!(obj.set_element(1, Value::Int(11)).is_err());
    assert!(obj.delete_element(0).is_err());

    assert!(Arc::ptr_eq(&shape, &obj.shape()));
    assert_eq!(obj.get_property("x"), Some(Value::Int(1)));
    assert_eq!(obj.get_element(0), Some(Value::Int(10)));
    assert_eq!(obj.element_count(), 1);
}
