//! Decoder for the compact node-tree encoding.
//!
//! The encoding is a little register machine over a byte stream: constant
//! loads fill registers, node-construction instructions consume registers
//! and produce nodes, and a final return instruction names the root. The
//! stream is produced internally ahead of time for fast startup of
//! precompiled functions; it is trusted input, so any corruption (unknown
//! tag, truncation, bad register) is a fatal [`DecodeError`], never a
//! catchable language error.
//!
//! All multi-byte integers are little-endian.

use crate::frame::{FrameAccess, FrameDescriptor};
use crate::frame_slot::{ReadFrameSlotNode, WriteFrameSlotNode};
use crate::node::{JsNode, JumpTargetId};
use crate::property::{ReadPropertyNode, WritePropertyNode};
use crate::switch::SwitchNode;
use core_types::Value;
use std::sync::Arc;
use thiserror::Error;

/// Fatal corruption of an encoded node stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream contains an instruction tag the decoder does not know.
    #[error("unknown instruction tag {tag:#04x} at offset {offset}")]
    UnknownTag {
        /// The offending tag byte
        tag: u8,
        /// Stream offset of the tag
        offset: usize,
    },
    /// The stream ended in the middle of an instruction.
    #[error("unexpected end of stream at offset {0}")]
    UnexpectedEof(usize),
    /// An instruction named a register outside the declared register file.
    #[error("register {0} out of range")]
    InvalidRegister(u32),
    /// A register held an operand of the wrong kind for the instruction.
    #[error("register {0} holds the wrong operand kind")]
    WrongOperand(u32),
    /// The stream ended without a return instruction.
    #[error("stream ended without a return instruction")]
    MissingReturn,
}

/// Instruction tags of the encoding.
mod tag {
    pub const NOP: u8 = 0x00;
    pub const LDC_INT: u8 = 0x01;
    pub const LDC_DOUBLE: u8 = 0x02;
    pub const LDC_BOOLEAN: u8 = 0x03;
    pub const LDC_STRING: u8 = 0x04;
    pub const LDC_SINGLETON: u8 = 0x05;
    pub const MOV: u8 = 0x06;
    pub const COLLECT_NODES: u8 = 0x07;
    pub const FRAME_SLOT: u8 = 0x08;
    pub const JUMP_TARGET: u8 = 0x09;
    pub const JUMPTABLE: u8 = 0x0a;
    pub const CONSTANT_NODE: u8 = 0x0b;
    pub const BLOCK_NODE: u8 = 0x0c;
    pub const BREAK_NODE: u8 = 0x0d;
    pub const READ_FRAME_SLOT_NODE: u8 = 0x0e;
    pub const WRITE_FRAME_SLOT_NODE: u8 = 0x0f;
    pub const READ_PROPERTY_NODE: u8 = 0x10;
    pub const WRITE_PROPERTY_NODE: u8 = 0x11;
    pub const SWITCH_NODE: u8 = 0x12;
    pub const RETURN: u8 = 0x13;
}

/// What a register currently holds.
#[derive(Debug)]
enum Operand {
    Empty,
    Value(Value),
    Node(JsNode),
    Nodes(Vec<JsNode>),
    Slot(Arc<crate::frame::FrameSlot>),
    Target(JumpTargetId),
    Table(Vec<usize>),
}

/// Result of decoding a stream: the root node and the frame layout the
/// tree's slot nodes refer to.
#[derive(Debug)]
pub struct DecodedTree {
    /// Root of the reconstructed tree
    pub root: JsNode,
    /// Frame layout declared by the stream
    pub descriptor: Arc<FrameDescriptor>,
}

/// Decodes an encoded node tree.
///
/// The stream starts with a `u16` register-file size, followed by
/// instructions, and must end in a return naming the root node register.
pub fn decode(bytes: &[u8]) -> Result<DecodedTree, DecodeError> {
    Decoder::new(bytes)?.run()
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    registers: Vec<Operand>,
    descriptor: Arc<FrameDescriptor>,
    next_target: u32,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let mut decoder = Self {
            bytes,
            pos: 0,
            registers: Vec::new(),
            descriptor: Arc::new(FrameDescriptor::new()),
            next_target: 0,
        };
        let register_count = decoder.read_u16()?;
        decoder.registers = (0..register_count).map(|_| Operand::Empty).collect();
        Ok(decoder)
    }

    fn run(mut self) -> Result<DecodedTree, DecodeError> {
        loop {
            if self.pos >= self.bytes.len() {
                return Err(DecodeError::MissingReturn);
            }
            let offset = self.pos;
            let instruction = self.read_u8()?;
            match instruction {
                tag::NOP => {}
                tag::LDC_INT => {
                    let dest = self.read_reg()?;
                    let n = self.read_i32()?;
                    self.store(dest, Operand::Value(Value::Int(n)))?;
                }
                tag::LDC_DOUBLE => {
                    let dest = self.read_reg()?;
                    let n = self.read_f64()?;
                    self.store(dest, Operand::Value(Value::Double(n)))?;
                }
                tag::LDC_BOOLEAN => {
                    let dest = self.read_reg()?;
                    let b = self.read_u8()? != 0;
                    self.store(dest, Operand::Value(Value::Boolean(b)))?;
                }
                tag::LDC_STRING => {
                    let dest = self.read_reg()?;
                    let s = self.read_string()?;
                    self.store(dest, Operand::Value(Value::String(s)))?;
                }
                tag::LDC_SINGLETON => {
                    let dest = self.read_reg()?;
                    let which = self.read_u8()?;
                    let value = if which == 0 {
                        Value::Undefined
                    } else {
                        Value::Null
                    };
                    self.store(dest, Operand::Value(value))?;
                }
                tag::MOV => {
                    let dest = self.read_reg()?;
                    let src = self.read_reg()?;
                    let operand = self.take(src)?;
                    self.store(dest, operand)?;
                }
                tag::COLLECT_NODES => {
                    let dest = self.read_reg()?;
                    let count = self.read_u16()?;
                    let mut nodes = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        let src = self.read_reg()?;
                        nodes.push(self.take_node(src)?);
                    }
                    self.store(dest, Operand::Nodes(nodes))?;
                }
                tag::FRAME_SLOT => {
                    let dest = self.read_reg()?;
                    let tdz = self.read_u8()? != 0;
                    let identifier = self.read_string()?;
                    let slot = self.descriptor.find_or_add_slot(&identifier, tdz);
                    self.store(dest, Operand::Slot(slot))?;
                }
                tag::JUMP_TARGET => {
                    let dest = self.read_reg()?;
                    let target = JumpTargetId(self.next_target);
                    self.next_target += 1;
                    self.store(dest, Operand::Target(target))?;
                }
                tag::JUMPTABLE => {
                    let dest = self.read_reg()?;
                    let count = self.read_u16()?;
                    let mut table = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        table.push(self.read_u32()? as usize);
                    }
                    self.store(dest, Operand::Table(table))?;
                }
                tag::CONSTANT_NODE => {
                    let dest = self.read_reg()?;
                    let src = self.read_reg()?;
                    let value = self.take_value(src)?;
                    self.store(dest, Operand::Node(JsNode::Constant(value)))?;
                }
                tag::BLOCK_NODE => {
                    let dest = self.read_reg()?;
                    let src = self.read_reg()?;
                    let nodes = self.take_nodes(src)?;
                    self.store(dest, Operand::Node(JsNode::Block(nodes)))?;
                }
                tag::BREAK_NODE => {
                    let dest = self.read_reg()?;
                    let src = self.read_reg()?;
                    let target = self.take_target(src)?;
                    self.store(dest, Operand::Node(JsNode::Break(target)))?;
                }
                tag::READ_FRAME_SLOT_NODE => {
                    let dest = self.read_reg()?;
                    let slot_reg = self.read_reg()?;
                    let access = self.read_access()?;
                    let slot = self.take_slot(slot_reg)?;
                    let node = JsNode::ReadFrameSlot(ReadFrameSlotNode::new(slot, access));
                    self.store(dest, Operand::Node(node))?;
                }
                tag::WRITE_FRAME_SLOT_NODE => {
                    let dest = self.read_reg()?;
                    let slot_reg = self.read_reg()?;
                    let rhs_reg = self.read_reg()?;
                    let access = self.read_access()?;
                    let slot = self.take_slot(slot_reg)?;
                    let rhs = self.take_node(rhs_reg)?;
                    let node = JsNode::WriteFrameSlot(WriteFrameSlotNode::new(slot, access, rhs));
                    self.store(dest, Operand::Node(node))?;
                }
                tag::READ_PROPERTY_NODE => {
                    let dest = self.read_reg()?;
                    let target_reg = self.read_reg()?;
                    let key = self.read_string()?;
                    let target = self.take_node(target_reg)?;
                    let node = JsNode::ReadProperty(ReadPropertyNode::new(target, key));
                    self.store(dest, Operand::Node(node))?;
                }
                tag::WRITE_PROPERTY_NODE => {
                    let dest = self.read_reg()?;
                    let target_reg = self.read_reg()?;
                    let rhs_reg = self.read_reg()?;
                    let has_receiver = self.read_u8()? != 0;
                    let receiver_reg = if has_receiver {
                        Some(self.read_reg()?)
                    } else {
                        None
                    };
                    let key = self.read_string()?;
                    let target = self.take_node(target_reg)?;
                    let rhs = self.take_node(rhs_reg)?;
                    let node = match receiver_reg {
                        Some(reg) => {
                            let receiver = self.take_node(reg)?;
                            WritePropertyNode::with_receiver(target, receiver, key, rhs)
                        }
                        None => WritePropertyNode::new(target, key, rhs),
                    };
                    self.store(dest, Operand::Node(JsNode::WriteProperty(node)))?;
                }
                tag::SWITCH_NODE => {
                    let dest = self.read_reg()?;
                    let cases_reg = self.read_reg()?;
                    let statements_reg = self.read_reg()?;
                    let table_reg = self.read_reg()?;
                    let target_reg = self.read_reg()?;
                    let cases = self.take_nodes(cases_reg)?;
                    let statements = self.take_nodes(statements_reg)?;
                    let table = self.take_table(table_reg)?;
                    let target = self.take_target(target_reg)?;
                    let node = JsNode::Switch(SwitchNode::new(cases, table, statements, target));
                    self.store(dest, Operand::Node(node))?;
                }
                tag::RETURN => {
                    let src = self.read_reg()?;
                    let root = self.take_node(src)?;
                    return Ok(DecodedTree {
                        root,
                        descriptor: self.descriptor,
                    });
                }
                unknown => {
                    return Err(DecodeError::UnknownTag {
                        tag: unknown,
                        offset,
                    })
                }
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(DecodeError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(DecodeError::UnexpectedEof(self.pos))?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::UnexpectedEof(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(buf))
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let offset = self.pos;
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::UnexpectedEof(offset))
    }

    fn read_reg(&mut self) -> Result<u32, DecodeError> {
        let reg = u32::from(self.read_u16()?);
        if (reg as usize) < self.registers.len() {
            Ok(reg)
        } else {
            Err(DecodeError::InvalidRegister(reg))
        }
    }

    fn read_access(&mut self) -> Result<FrameAccess, DecodeError> {
        let kind = self.read_u8()?;
        if kind == 0 {
            Ok(FrameAccess::Current)
        } else {
            let frame_level = self.read_u16()? as usize;
            let scope_level = self.read_u16()? as usize;
            Ok(FrameAccess::Leveled {
                frame_level,
                scope_level,
            })
        }
    }

    fn store(&mut self, reg: u32, operand: Operand) -> Result<(), DecodeError> {
        self.registers[reg as usize] = operand;
        Ok(())
    }

    fn take(&mut self, reg: u32) -> Result<Operand, DecodeError> {
        let slot = &mut self.registers[reg as usize];
        match std::mem::replace(slot, Operand::Empty) {
            Operand::Empty => Err(DecodeError::WrongOperand(reg)),
            operand => Ok(operand),
        }
    }

    fn take_node(&mut self, reg: u32) -> Result<JsNode, DecodeError> {
        match self.take(reg)? {
            Operand::Node(node) => Ok(node),
            Operand::Value(value) => Ok(JsNode::Constant(value)),
            _ => Err(DecodeError::WrongOperand(reg)),
        }
    }

    fn take_value(&mut self, reg: u32) -> Result<Value, DecodeError> {
        match self.take(reg)? {
            Operand::Value(value) => Ok(value),
            _ => Err(DecodeError::WrongOperand(reg)),
        }
    }

    fn take_nodes(&mut self, reg: u32) -> Result<Vec<JsNode>, DecodeError> {
        match self.take(reg)? {
            Operand::Nodes(nodes) => Ok(nodes),
            _ => Err(DecodeError::WrongOperand(reg)),
        }
    }

    fn take_slot(&mut self, reg: u32) -> Result<Arc<crate::frame::FrameSlot>, DecodeError> {
        match self.take(reg)? {
            Operand::Slot(slot) => Ok(slot),
            _ => Err(DecodeError::WrongOperand(reg)),
        }
    }

    fn take_target(&mut self, reg: u32) -> Result<JumpTargetId, DecodeError> {
        match self.take(reg)? {
            Operand::Target(target) => Ok(target),
            _ => Err(DecodeError::WrongOperand(reg)),
        }
    }

    fn take_table(&mut self, reg: u32) -> Result<Vec<usize>, DecodeError> {
        match self.take(reg)? {
            Operand::Table(table) => Ok(table),
            _ => Err(DecodeError::WrongOperand(reg)),
        }
    }
}
