//! End-to-end tests: trees built by hand or decoded from the compact
//! encoding, executed against a realm with live objects.

use core_types::{ErrorKind, SourceSection, Value};
use interpreter::{
    capture_stack_trace, decode, ExecError, Frame, FrameAccess, FrameDescriptor, HostFrame,
    JsNode, JsException, JumpTargetId, RealmContext, ReadFrameSlotNode, ReadPropertyNode,
    SwitchNode, WriteFrameSlotNode, WritePropertyNode,
};
use std::sync::Arc;

#[test]
fn test_switch_dispatch_over_live_property_reads() {
    let cx = RealmContext::new();
    let id = cx.heap().alloc();
    cx.heap()
        .get(id)
        .unwrap()
        .set_property(cx.heap().shapes(), "mode", Value::Boolean(true))
        .unwrap();

    let descriptor = Arc::new(FrameDescriptor::new());
    let result_slot = descriptor.find_or_add_slot("result", false);
    let target = JumpTargetId(0);

    // switch (obj.mode) { case true: result = 1; break; default: result = 2 }
    let switch = SwitchNode::new(
        vec![JsNode::ReadProperty(ReadPropertyNode::new(
            JsNode::Constant(Value::Object(id)),
            "mode",
        ))],
        vec![0, 2],
        vec![
            JsNode::WriteFrameSlot(WriteFrameSlotNode::new(
                Arc::clone(&result_slot),
                FrameAccess::Current,
                JsNode::Constant(Value::Int(1)),
            )),
            JsNode::Break(target),
            JsNode::WriteFrameSlot(WriteFrameSlotNode::new(
                Arc::clone(&result_slot),
                FrameAccess::Current,
                JsNode::Constant(Value::Int(2)),
            )),
        ],
        target,
    );

    let frame = Frame::new(Arc::clone(&descriptor));
    switch.execute(&cx, &frame).unwrap();
    assert_eq!(frame.borrow().get(result_slot.index()), Some(Value::Int(1)));
}

#[test]
fn test_uncaught_error_carries_formatted_stack_trace() {
    let cx = RealmContext::new();
    let descriptor = Arc::new(FrameDescriptor::new());
    let slot = descriptor.find_or_add_slot("notYet", true);
    let frame = Frame::new(Arc::clone(&descriptor));

    let read = JsNode::ReadFrameSlot(ReadFrameSlotNode::new(slot, FrameAccess::Current));
    let exc = match read.execute(&cx, &frame) {
        Err(ExecError::Throw(exc)) => exc,
        other => panic!("expected throw, got {:?}", other),
    };
    assert_eq!(exc.kind(), ErrorKind::ReferenceError);

    // the host walks its stack and the exception keeps the snapshot
    let host_frames = vec![
        HostFrame {
            function_name: "inner".to_string(),
            source: Some(SourceSection::new("main.js", 12, 3, 200)),
            receiver: Value::Undefined,
            function: None,
            strict: false,
            builtin: false,
            internal: false,
            foreign: false,
            eval: false,
        },
        HostFrame {
            function_name: "main".to_string(),
            source: Some(SourceSection::new("main.js", 40, 1, 900)),
            receiver: Value::Undefined,
            function: None,
            strict: false,
            builtin: false,
            internal: false,
            foreign: false,
            eval: false,
        },
    ];
    let exc: JsException = exc.with_stack(capture_stack_trace(&cx, host_frames, None));
    assert_eq!(exc.stack().len(), 2);
    assert_eq!(exc.stack()[0].format(cx.heap()), "inner (main.js:12:3)");
    assert_eq!(exc.stack()[1].format(cx.heap()), "main (main.js:40:1)");
    assert_eq!(
        exc.to_string(),
        "ReferenceError: Cannot access 'notYet' before initialization"
    );
}

#[test]
fn test_property_writes_build_shared_shapes_across_trees() {
    let cx = RealmContext::new();
    let frame = Frame::new(Arc::new(FrameDescriptor::new()));
    let a = cx.heap().alloc();
    let b = cx.heap().alloc();

    for id in [a, b] {
        for (key, value) in [("x", Value::Int(1)), ("y", Value::Double(2.0))] {
            let write = WritePropertyNode::new(
                JsNode::Constant(Value::Object(id)),
                key,
                JsNode::Constant(value),
            );
            write.execute(&cx, &frame).unwrap();
        }
    }

    let shape_a = cx.heap().get(a).unwrap().shape();
    let shape_b = cx.heap().get(b).unwrap().shape();
    assert!(Arc::ptr_eq(&shape_a, &shape_b));
}

// ============================================================================
// Decoder round trips
// ============================================================================

mod encoding {
    //! Byte-stream builder mirroring the decoder's instruction layout.

    const LDC_INT: u8 = 0x01;
    const LDC_BOOLEAN: u8 = 0x03;
    const COLLECT_NODES: u8 = 0x07;
    const FRAME_SLOT: u8 = 0x08;
    const JUMP_TARGET: u8 = 0x09;
    const JUMPTABLE: u8 = 0x0a;
    const CONSTANT_NODE: u8 = 0x0b;
    const WRITE_FRAME_SLOT_NODE: u8 = 0x0f;
    const SWITCH_NODE: u8 = 0x12;
    const RETURN: u8 = 0x13;

    pub struct Encoder {
        bytes: Vec<u8>,
    }

    impl Encoder {
        pub fn new(registers: u16) -> Self {
            Self {
                bytes: registers.to_le_bytes().to_vec(),
            }
        }

        fn reg(&mut self, reg: u16) -> &mut Self {
            self.bytes.extend_from_slice(&reg.to_le_bytes());
            self
        }

        pub fn ldc_int(&mut self, dest: u16, n: i32) -> &mut Self {
            self.bytes.push(LDC_INT);
            self.reg(dest);
            self.bytes.extend_from_slice(&n.to_le_bytes());
            self
        }

        pub fn ldc_boolean(&mut self, dest: u16, b: bool) -> &mut Self {
            self.bytes.push(LDC_BOOLEAN);
            self.reg(dest);
            self.bytes.push(b as u8);
            self
        }

        pub fn constant_node(&mut self, dest: u16, src: u16) -> &mut Self {
            self.bytes.push(CONSTANT_NODE);
            self.reg(dest).reg(src)
        }

        pub fn collect(&mut self, dest: u16, srcs: &[u16]) -> &mut Self {
            self.bytes.push(COLLECT_NODES);
            self.reg(dest);
            self.bytes
                .extend_from_slice(&(srcs.len() as u16).to_le_bytes());
            for &src in srcs {
                self.reg(src);
            }
            self
        }

        pub fn frame_slot(&mut self, dest: u16, tdz: bool, name: &str) -> &mut Self {
            self.bytes.push(FRAME_SLOT);
            self.reg(dest);
            self.bytes.push(tdz as u8);
            self.bytes
                .extend_from_slice(&(name.len() as u16).to_le_bytes());
            self.bytes.extend_from_slice(name.as_bytes());
            self
        }

        pub fn write_frame_slot(&mut self, dest: u16, slot: u16, rhs: u16) -> &mut Self {
            self.bytes.push(WRITE_FRAME_SLOT_NODE);
            self.reg(dest).reg(slot).reg(rhs);
            self.bytes.push(0);
            self
        }

        pub fn jump_target(&mut self, dest: u16) -> &mut Self {
            self.bytes.push(JUMP_TARGET);
            self.reg(dest)
        }

        pub fn jumptable(&mut self, dest: u16, entries: &[u32]) -> &mut Self {
            self.bytes.push(JUMPTABLE);
            self.reg(dest);
            self.bytes
                .extend_from_slice(&(entries.len() as u16).to_le_bytes());
            for &entry in entries {
                self.bytes.extend_from_slice(&entry.to_le_bytes());
            }
            self
        }

        pub fn switch_node(
            &mut self,
            dest: u16,
            cases: u16,
            statements: u16,
            table: u16,
            target: u16,
        ) -> &mut Self {
            self.bytes.push(SWITCH_NODE);
            self.reg(dest).reg(cases).reg(statements).reg(table).reg(target)
        }

        pub fn ret(&mut self, src: u16) -> Vec<u8> {
            self.bytes.push(RETURN);
            self.reg(src);
            std::mem::take(&mut self.bytes)
        }
    }
}

#[test]
fn test_decoded_switch_executes_like_hand_built_tree() {
    // switch (false, true) over three recording statements with table
    // [0, 1, 3]: case 1 matches, statements 1 and 2 run
    let mut enc = encoding::Encoder::new(12);
    enc.ldc_boolean(0, false)
        .constant_node(0, 0)
        .ldc_boolean(1, true)
        .constant_node(1, 1)
        .collect(2, &[0, 1]);
    for (i, reg) in [(0u16, 3u16), (1, 4), (2, 5)] {
        enc.frame_slot(6, false, &format!("s{}", i))
            .ldc_int(7, i as i32)
            .write_frame_slot(reg, 6, 7);
    }
    let stream = enc
        .collect(8, &[3, 4, 5])
        .jumptable(9, &[0, 1, 3])
        .jump_target(10)
        .switch_node(11, 2, 8, 9, 10)
        .ret(11);

    let tree = decode(&stream).unwrap();
    assert_eq!(tree.descriptor.slot_count(), 3);

    let cx = RealmContext::new();
    let frame = Frame::new(Arc::clone(&tree.descriptor));
    tree.root.execute(&cx, &frame).unwrap();

    let executed: Vec<usize> = (0..3)
        .filter(|&i| frame.borrow().get(i).is_some())
        .collect();
    assert_eq!(executed, vec![1, 2]);
}
