//! Script interpreter.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};
#[cfg(feature = "std")]
use std::vec::Vec;

use core::fmt;

use bitcoin::opcodes::{all, Opcode};
use tracing::{debug, trace};

use crate::{
    decode::{Cursor, Instruction},
    opcodes::{family, OpcodeFamily},
    stack::{cast_to_bool, decode_index, encode_count, ScriptStack},
    Error, Execution, ExecutionStats, ScriptFailure, VERIFY_CLOSED_CONDITIONALS,
    VERIFY_DISCOURAGE_UNASSIGNED_OPCODES,
};

/// Reasons a script aborts before reaching the end of its buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScriptError {
    StackUnderflow,
    AltStackUnderflow,
    MalformedNesting,
    NumericOverflow,
    UnknownOpcode(u8),
    TruncatedPush,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ScriptError::*;

        match *self {
            StackUnderflow => f.write_str("operation needs more items than the stack holds"),
            AltStackUnderflow => f.write_str("alternate stack is empty"),
            MalformedNesting => f.write_str("unbalanced conditional"),
            NumericOverflow => f.write_str("numeric operand wider than 8 bytes"),
            UnknownOpcode(code) => write!(f, "opcode {code:#04x} has no handler"),
            TruncatedPush => f.write_str("push runs past the end of the script"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScriptError {}

const SUPPORTED_FLAGS: u32 = VERIFY_CLOSED_CONDITIONALS | VERIFY_DISCOURAGE_UNASSIGNED_OPCODES;

/// Wrapper for script execution flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptFlags(u32);

impl ScriptFlags {
    pub fn from_bits(bits: u32) -> Result<Self, Error> {
        if bits & !SUPPORTED_FLAGS != 0 {
            return Err(Error::InvalidFlags(bits));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn requires_closed_conditionals(self) -> bool {
        self.0 & VERIFY_CLOSED_CONDITIONALS != 0
    }

    pub fn discourages_unassigned_opcodes(self) -> bool {
        self.0 & VERIFY_DISCOURAGE_UNASSIGNED_OPCODES != 0
    }
}

/// Open IF/NOTIF blocks and whether instructions currently take effect.
///
/// Each mask entry records whether its block was opened while executing.
/// Only such blocks may flip execution on ELSE or restore it on ENDIF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionStack {
    mask: Vec<bool>,
    executing: bool,
}

impl Default for ConditionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionStack {
    pub fn new() -> Self {
        Self {
            mask: Vec::new(),
            executing: true,
        }
    }

    #[inline]
    pub fn executing(&self) -> bool {
        self.executing
    }

    /// Opens a block whose branch was evaluated to `taken`.
    pub fn open(&mut self, taken: bool) {
        self.mask.push(true);
        self.executing = taken;
    }

    /// Opens a block inside suppressed code.
    pub fn open_suppressed(&mut self) {
        self.mask.push(false);
    }

    pub fn toggle(&mut self) -> Result<(), ScriptError> {
        let live = *self.mask.last().ok_or(ScriptError::MalformedNesting)?;
        if live {
            self.executing = !self.executing;
        }
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ScriptError> {
        let live = self.mask.pop().ok_or(ScriptError::MalformedNesting)?;
        if live {
            self.executing = true;
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.mask.len()
    }

    pub fn is_balanced(&self) -> bool {
        self.mask.is_empty()
    }
}

/// Executes one script against fresh stacks.
pub struct Interpreter<'script> {
    script: &'script [u8],
    flags: ScriptFlags,
    stack: ScriptStack,
    altstack: ScriptStack,
    conditions: ConditionStack,
    valid: bool,
    stats: ExecutionStats,
}

impl<'script> Interpreter<'script> {
    pub fn new(script: &'script [u8], flags: ScriptFlags) -> Self {
        Self {
            script,
            flags,
            stack: ScriptStack::new(),
            altstack: ScriptStack::new(),
            conditions: ConditionStack::new(),
            valid: true,
            stats: ExecutionStats::default(),
        }
    }

    /// Runs the script to the end of its buffer.
    ///
    /// A failed VERIFY or an executed RETURN only clears the validity flag;
    /// the remaining instructions are still decoded and executed.
    pub fn run(mut self) -> Result<Execution, ScriptFailure> {
        let mut cursor = Cursor::new(self.script);

        while !cursor.is_at_end() {
            let offset = cursor.position();
            let consumed = self.step(&cursor).map_err(|error| {
                debug!(offset, %error, "script aborted");
                ScriptFailure { error, offset }
            })?;
            cursor.advance(consumed);
        }

        if self.flags.requires_closed_conditionals() && !self.conditions.is_balanced() {
            debug!(
                open = self.conditions.depth(),
                "script ended inside a conditional"
            );
            return Err(ScriptFailure {
                error: ScriptError::MalformedNesting,
                offset: self.script.len(),
            });
        }

        debug!(
            valid = self.valid,
            depth = self.stack.len(),
            alt_depth = self.altstack.len(),
            "script finished"
        );
        Ok(Execution {
            stack: self.stack.into_items(),
            altstack: self.altstack.into_items(),
            valid: self.valid,
            stats: self.stats,
        })
    }

    /// Decodes and dispatches the instruction under the cursor.
    ///
    /// Returns the number of bytes the instruction occupies.
    fn step(&mut self, cursor: &Cursor<'_>) -> Result<usize, ScriptError> {
        let (instruction, width) = cursor.decode()?;
        let op = instruction.opcode();
        let executing = self.conditions.executing();
        trace!(
            offset = cursor.position(),
            opcode = op.to_u8(),
            executing,
            "step"
        );

        if executing {
            self.stats.executed += 1;
        } else {
            self.stats.skipped += 1;
        }

        match instruction {
            Instruction::Push { data, .. } => {
                if executing {
                    self.stack.push(data.to_vec());
                }
            }
            Instruction::Op(op) => match family(op) {
                OpcodeFamily::Constant => {
                    if executing {
                        self.push_constant(op);
                    }
                }
                OpcodeFamily::FlowControl => self.handle_control_flow(op)?,
                OpcodeFamily::Stack => {
                    if executing {
                        self.execute_stack_op(op)?;
                    }
                }
                OpcodeFamily::Unassigned => {
                    if executing && self.flags.discourages_unassigned_opcodes() {
                        return Err(ScriptError::UnknownOpcode(op.to_u8()));
                    }
                }
            },
        }

        Ok(width)
    }

    fn push_constant(&mut self, op: Opcode) {
        use all::*;

        let opcode = op.to_u8();
        let value = match op {
            OP_PUSHBYTES_0 => Vec::new(),
            OP_PUSHNUM_NEG1 => vec![0xff],
            _ => vec![opcode - OP_PUSHNUM_1.to_u8() + 1],
        };
        self.stack.push(value);
    }

    fn handle_control_flow(&mut self, op: Opcode) -> Result<(), ScriptError> {
        use all::*;

        let executing = self.conditions.executing();
        match op {
            OP_IF | OP_NOTIF => {
                if executing {
                    let condition = self.stack.pop()?;
                    let mut value = cast_to_bool(&condition);
                    if op == OP_NOTIF {
                        value = !value;
                    }
                    self.conditions.open(value);
                } else {
                    self.conditions.open_suppressed();
                }
                self.stats.conditionals_opened += 1;
            }
            OP_ELSE => self.conditions.toggle()?,
            OP_ENDIF => {
                self.conditions.close()?;
                self.stats.conditionals_closed += 1;
            }
            OP_VERIFY => {
                if executing {
                    let value = self.stack.pop()?;
                    if !cast_to_bool(&value) {
                        self.valid = false;
                    }
                }
            }
            OP_RETURN => {
                if executing {
                    self.valid = false;
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn execute_stack_op(&mut self, op: Opcode) -> Result<(), ScriptError> {
        use all::*;

        let stack = &mut self.stack;
        match op {
            OP_TOALTSTACK => {
                let value = stack.pop()?;
                self.altstack.push(value);
            }
            OP_FROMALTSTACK => {
                let value = self
                    .altstack
                    .pop()
                    .map_err(|_| ScriptError::AltStackUnderflow)?;
                stack.push(value);
            }
            OP_2DROP => {
                stack.require(2)?;
                stack.pop()?;
                stack.pop()?;
            }
            OP_2DUP => stack.duplicate_top(2)?,
            OP_3DUP => stack.duplicate_top(3)?,
            OP_2OVER => {
                stack.require(4)?;
                stack.copy_range(3, 2)?;
            }
            OP_2ROT => {
                stack.require(6)?;
                let first = stack.remove(5)?;
                let second = stack.remove(4)?;
                stack.push(first);
                stack.push(second);
            }
            OP_2SWAP => {
                stack.require(4)?;
                stack.swap(3, 1)?;
                stack.swap(2, 0)?;
            }
            OP_IFDUP => {
                let value = stack.top()?;
                if cast_to_bool(value) {
                    let value = value.clone();
                    stack.push(value);
                }
            }
            OP_DEPTH => {
                let depth = encode_count(stack.len());
                stack.push(depth);
            }
            OP_DROP => {
                stack.pop()?;
            }
            OP_DUP => {
                let value = stack.top()?.clone();
                stack.push(value);
            }
            OP_NIP => {
                stack.remove(1)?;
            }
            OP_OVER => {
                let value = stack.peek(1)?.clone();
                stack.push(value);
            }
            OP_PICK => {
                let depth = decode_index(&stack.pop()?)?;
                let value = stack.peek(depth)?.clone();
                stack.push(value);
            }
            OP_ROLL => {
                let depth = decode_index(&stack.pop()?)?;
                let value = stack.remove(depth)?;
                stack.push(value);
            }
            OP_ROT => {
                let value = stack.remove(2)?;
                stack.push(value);
            }
            OP_SWAP => stack.swap(1, 0)?,
            OP_TUCK => {
                stack.require(2)?;
                let value = stack.top()?.clone();
                stack.insert(2, value)?;
            }
            _ => {}
        }

        Ok(())
    }
}
