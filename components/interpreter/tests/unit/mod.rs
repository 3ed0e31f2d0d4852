//! Unit tests for the execution node tree

use core_types::{ErrorKind, SourceSection, Value};
use interpreter::{
    capture_stack_trace, Frame, FrameAccess, FrameDescriptor, FrameRef, FrameSlotKind, HostFrame,
    JsNode, JumpTargetId, RealmContext, ReadFrameSlotNode, ReadPropertyNode, RuntimeOptions,
    SwitchNode, WriteFrameSlotNode, WritePropertyNode,
};
use rand::Rng;
use std::sync::Arc;

fn empty_frame() -> FrameRef {
    Frame::new(Arc::new(FrameDescriptor::new()))
}

// ============================================================================
// Switch dispatch
// ============================================================================

/// Builds a switch whose statement `i` records its execution by writing
/// slot `s<i>`, so tests can observe exactly which statements ran.
fn tracing_switch(
    flags: &[bool],
    jumptable: Vec<usize>,
    statement_count: usize,
) -> (SwitchNode, Arc<FrameDescriptor>) {
    let descriptor = Arc::new(FrameDescriptor::new());
    let cases = flags
        .iter()
        .map(|&b| JsNode::Constant(Value::Boolean(b)))
        .collect();
    let statements = (0..statement_count)
        .map(|i| {
            let slot = descriptor.find_or_add_slot(&format!("s{}", i), false);
            JsNode::WriteFrameSlot(WriteFrameSlotNode::new(
                slot,
                FrameAccess::Current,
                JsNode::Constant(Value::Int(i as i32)),
            ))
        })
        .collect();
    (
        SwitchNode::new(cases, jumptable, statements, JumpTargetId(0)),
        descriptor,
    )
}

fn executed_statements(frame: &FrameRef, statement_count: usize) -> Vec<usize> {
    (0..statement_count)
        .filter(|&i| frame.borrow().get(i).is_some())
        .collect()
}

/// First matching case's start, or the default start; execution then runs
/// to the end of the statement list.
fn expected_range(flags: &[bool], jumptable: &[usize], statement_count: usize) -> Vec<usize> {
    let index = flags.iter().position(|&b| b).unwrap_or(flags.len());
    (jumptable[index]..statement_count).collect()
}

#[test]
fn test_matching_last_case_runs_only_final_statement() {
    let cx = RealmContext::new();
    let (node, descriptor) = tracing_switch(&[false, false, true], vec![0, 0, 2, 3], 3);
    let frame = Frame::new(descriptor);
    node.execute(&cx, &frame).unwrap();
    assert_eq!(executed_statements(&frame, 3), vec![2]);
}

#[test]
fn test_fallthrough_without_break_runs_following_cases() {
    let cx = RealmContext::new();
    let (node, descriptor) = tracing_switch(&[true, false], vec![0, 2, 2], 3);
    let frame = Frame::new(descriptor);
    node.execute(&cx, &frame).unwrap();
    // case 0 range, case 1 range, and the default tail all run
    assert_eq!(executed_statements(&frame, 3), vec![0, 1, 2]);
}

#[test]
fn test_no_match_runs_default_tail() {
    let cx = RealmContext::new();
    let (node, descriptor) = tracing_switch(&[false, false], vec![0, 1, 2], 3);
    let frame = Frame::new(descriptor);
    node.execute(&cx, &frame).unwrap();
    assert_eq!(executed_statements(&frame, 3), vec![2]);
}

#[test]
fn test_ordered_and_unordered_strategies_agree() {
    let cx = RealmContext::new();
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let case_count = rng.gen_range(1..5);
        let statement_count = rng.gen_range(1..6);
        let monotonic = rng.gen_bool(0.5);

        let mut jumptable: Vec<usize> = (0..=case_count)
            .map(|_| rng.gen_range(0..=statement_count))
            .collect();
        if monotonic {
            jumptable.sort_unstable();
        }
        let flags: Vec<bool> = (0..case_count).map(|_| rng.gen_bool(0.4)).collect();

        let (node, descriptor) =
            tracing_switch(&flags, jumptable.clone(), statement_count);
        let frame = Frame::new(descriptor);
        node.execute(&cx, &frame).unwrap();

        // whichever strategy construction picked, the executed set must
        // match the one model both strategies implement
        assert_eq!(
            executed_statements(&frame, statement_count),
            expected_range(&flags, &jumptable, statement_count),
            "table {:?}, flags {:?}, ordered {}",
            jumptable,
            flags,
            node.is_ordered(),
        );
    }
}

#[test]
fn test_break_stops_fallthrough() {
    let cx = RealmContext::new();
    let descriptor = Arc::new(FrameDescriptor::new());
    let target = JumpTargetId(7);
    let recorded = descriptor.find_or_add_slot("ran", false);
    let after_break = descriptor.find_or_add_slot("skipped", false);
    let node = SwitchNode::new(
        vec![JsNode::Constant(Value::Boolean(true))],
        vec![0, 3],
        vec![
            JsNode::WriteFrameSlot(WriteFrameSlotNode::new(
                Arc::clone(&recorded),
                FrameAccess::Current,
                JsNode::Constant(Value::Int(1)),
            )),
            JsNode::Break(target),
            JsNode::WriteFrameSlot(WriteFrameSlotNode::new(
                Arc::clone(&after_break),
                FrameAccess::Current,
                JsNode::Constant(Value::Int(2)),
            )),
        ],
        target,
    );
    let frame = Frame::new(descriptor);
    assert_eq!(node.execute(&cx, &frame).unwrap(), Value::Undefined);
    assert_eq!(frame.borrow().get(recorded.index()), Some(Value::Int(1)));
    assert_eq!(frame.borrow().get(after_break.index()), None);
}

// ============================================================================
// Frame slots
// ============================================================================

#[test]
fn test_tdz_read_fails_until_written() {
    let cx = RealmContext::new();
    let descriptor = Arc::new(FrameDescriptor::new());
    let slot = descriptor.find_or_add_slot("binding", true);
    let frame = Frame::new(Arc::clone(&descriptor));
    let read = ReadFrameSlotNode::new(Arc::clone(&slot), FrameAccess::Current);

    for _ in 0..5 {
        match read.execute(&cx, &frame) {
            Err(interpreter::ExecError::Throw(exc)) => {
                assert_eq!(exc.kind(), ErrorKind::ReferenceError)
            }
            other => panic!("TDZ read must throw, got {:?}", other),
        }
    }

    frame.borrow_mut().set(slot.index(), Value::Int(3));
    assert_eq!(read.execute(&cx, &frame).unwrap(), Value::Int(3));
}

#[test]
fn test_slot_kind_inference_is_monotonic_across_nodes() {
    let cx = RealmContext::new();
    let descriptor = Arc::new(FrameDescriptor::new());
    let slot = descriptor.find_or_add_slot("n", false);
    let frame = Frame::new(Arc::clone(&descriptor));

    let write_int = WriteFrameSlotNode::new(
        Arc::clone(&slot),
        FrameAccess::Current,
        JsNode::Constant(Value::Int(1)),
    );
    write_int.execute(&cx, &frame).unwrap();
    assert_eq!(slot.kind(), FrameSlotKind::Int);

    let write_double = WriteFrameSlotNode::new(
        Arc::clone(&slot),
        FrameAccess::Current,
        JsNode::Constant(Value::Double(2.5)),
    );
    write_double.execute(&cx, &frame).unwrap();
    assert_eq!(slot.kind(), FrameSlotKind::Double);

    // a later int write does not narrow the shared slot back
    write_int.execute(&cx, &frame).unwrap();
    assert_eq!(slot.kind(), FrameSlotKind::Double);
}

// ============================================================================
// Property access
// ============================================================================

#[test]
fn test_property_roundtrip_through_nodes() {
    let cx = RealmContext::new();
    let id = cx.heap().alloc();
    let frame = empty_frame();

    let write = WritePropertyNode::new(
        JsNode::Constant(Value::Object(id)),
        "count",
        JsNode::Constant(Value::Int(41)),
    );
    write.execute(&cx, &frame).unwrap();

    let read = ReadPropertyNode::new(JsNode::Constant(Value::Object(id)), "count");
    assert_eq!(read.execute(&cx, &frame).unwrap(), Value::Int(41));
}

#[test]
fn test_shape_change_between_reads_refreshes_cache() {
    let cx = RealmContext::new();
    let id = cx.heap().alloc();
    let frame = empty_frame();
    let obj = cx.heap().get(id).unwrap();
    obj.set_property(cx.heap().shapes(), "a", Value::Int(1))
        .unwrap();

    let read = ReadPropertyNode::new(JsNode::Constant(Value::Object(id)), "a");
    assert_eq!(read.execute(&cx, &frame).unwrap(), Value::Int(1));

    // layout change invalidates the cached shape; the read must still
    // find the property through the generic path
    obj.set_property(cx.heap().shapes(), "b", Value::Int(2))
        .unwrap();
    assert_eq!(read.execute(&cx, &frame).unwrap(), Value::Int(1));
}

// ============================================================================
// Stack capture
// ============================================================================

fn frame_named(name: &str, function: Option<Value>, strict: bool) -> HostFrame {
    HostFrame {
        function_name: name.to_string(),
        source: Some(SourceSection::new("app.js", 1, 1, 0)),
        receiver: Value::Undefined,
        function,
        strict,
        builtin: false,
        internal: false,
        foreign: false,
        eval: false,
    }
}

#[test]
fn test_skip_marker_drops_frames_up_to_and_including_marker() {
    let cx = RealmContext::new();
    let marker = cx.heap().alloc();
    let frames = vec![
        frame_named("f0", None, false),
        frame_named("f1", None, false),
        frame_named("marker", Some(Value::Object(marker)), false),
        frame_named("f3", None, false),
    ];
    let total = frames.len();
    let stack = capture_stack_trace(&cx, frames, Some(marker));
    assert_eq!(stack.len(), total - 3);
    assert_eq!(stack[0].function_name(), "f3");
}

#[test]
fn test_strict_mode_latches_for_later_frames() {
    let cx = RealmContext::new();
    let frames = vec![
        frame_named("sloppy", None, false),
        frame_named("strict", None, true),
        frame_named("after", None, false),
    ];
    let stack = capture_stack_trace(&cx, frames, None);
    assert_eq!(stack.len(), 3);
    assert!(!stack[0].is_strict());
    assert!(stack[1].is_strict());
    assert!(stack[2].is_strict());
}

#[test]
fn test_apply_and_call_trampolines_are_never_recorded() {
    let mut cx = RealmContext::new();
    let apply = cx.heap().alloc();
    let call = cx.heap().alloc();
    cx.set_apply_function(apply);
    cx.set_call_function(call);

    let frames = vec![
        frame_named("user", None, false),
        frame_named("apply", Some(Value::Object(apply)), false),
        frame_named("call", Some(Value::Object(call)), false),
        frame_named("outer", None, false),
    ];
    let stack = capture_stack_trace(&cx, frames, None);
    let names: Vec<_> = stack.iter().map(|e| e.function_name()).collect();
    assert_eq!(names, vec!["user", "outer"]);
}

#[test]
fn test_zero_limit_captures_nothing() {
    let cx = RealmContext::with_options(RuntimeOptions {
        stack_trace_limit: 0,
    });
    let stack = capture_stack_trace(&cx, vec![frame_named("f", None, false)], None);
    assert!(stack.is_empty());
}

#[test]
fn test_method_name_derived_from_receiver_chain() {
    let cx = RealmContext::new();
    let function = cx.heap().alloc();
    let receiver = cx.heap().alloc();
    cx.heap()
        .get(receiver)
        .unwrap()
        .set_property(cx.heap().shapes(), "greet", Value::Object(function))
        .unwrap();

    let mut frame = frame_named("", Some(Value::Object(function)), false);
    frame.receiver = Value::Object(receiver);
    let stack = capture_stack_trace(&cx, vec![frame], None);
    assert_eq!(stack[0].method_name(cx.heap()), Some("greet".to_string()));
    assert_eq!(stack[0].format(cx.heap()), "greet (app.js:1:1)");
}
