//! Opcode assignments and the metadata a disassembler needs to render them.
//!
//! Numeric values come from `bitcoin::opcodes::all` so the table cannot drift
//! from the upstream assignment. Only the constant, flow-control and stack
//! families are interpreted; every other byte is unassigned here.

use bitcoin::opcodes::{all, Opcode};

/// Operation group an opcode belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpcodeFamily {
    /// Pushes a constant or inline data.
    Constant,
    /// Conditionals, VERIFY, RETURN and NOP.
    FlowControl,
    /// Stack manipulation over the main and alternate stacks.
    Stack,
    /// No handler; skipped as a one-byte no-op.
    Unassigned,
}

/// Operand bytes that follow an opcode in the instruction stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operand {
    None,
    /// Exactly this many payload bytes follow.
    Inline(usize),
    /// A little-endian length of this width follows, then the payload.
    LengthPrefixed(usize),
}

/// Static description of an assigned opcode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub code: u8,
    pub name: &'static str,
    pub family: OpcodeFamily,
    pub operand: Operand,
}

impl OpcodeInfo {
    /// Number of bytes between the opcode and its payload.
    pub fn header_len(&self) -> usize {
        match self.operand {
            Operand::LengthPrefixed(width) => width,
            Operand::None | Operand::Inline(_) => 0,
        }
    }
}

/// Classifies an opcode into the family whose handler executes it.
pub fn family(opcode: Opcode) -> OpcodeFamily {
    use all::*;

    let code = opcode.to_u8();
    if code <= OP_PUSHNUM_NEG1.to_u8()
        || (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&code)
    {
        return OpcodeFamily::Constant;
    }

    match opcode {
        OP_NOP | OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF | OP_VERIFY | OP_RETURN => {
            OpcodeFamily::FlowControl
        }
        OP_TOALTSTACK | OP_FROMALTSTACK | OP_2DROP | OP_2DUP | OP_3DUP | OP_2OVER | OP_2ROT
        | OP_2SWAP | OP_IFDUP | OP_DEPTH | OP_DROP | OP_DUP | OP_NIP | OP_OVER | OP_PICK
        | OP_ROLL | OP_ROT | OP_SWAP | OP_TUCK => OpcodeFamily::Stack,
        _ => OpcodeFamily::Unassigned,
    }
}

/// Mnemonic for an assigned opcode.
///
/// Direct pushes (1 to 75) share `OP_PUSHBYTES`; their length is the opcode
/// value itself, see [`info`].
pub fn mnemonic(code: u8) -> Option<&'static str> {
    let name = match code {
        0x00 => "OP_FALSE",
        0x01..=0x4b => "OP_PUSHBYTES",
        0x4c => "OP_PUSHDATA1",
        0x4d => "OP_PUSHDATA2",
        0x4e => "OP_PUSHDATA4",
        0x4f => "OP_1NEGATE",
        0x51 => "OP_TRUE",
        0x52 => "OP_2",
        0x53 => "OP_3",
        0x54 => "OP_4",
        0x55 => "OP_5",
        0x56 => "OP_6",
        0x57 => "OP_7",
        0x58 => "OP_8",
        0x59 => "OP_9",
        0x5a => "OP_10",
        0x5b => "OP_11",
        0x5c => "OP_12",
        0x5d => "OP_13",
        0x5e => "OP_14",
        0x5f => "OP_15",
        0x60 => "OP_16",
        0x61 => "OP_NOP",
        0x63 => "OP_IF",
        0x64 => "OP_NOTIF",
        0x67 => "OP_ELSE",
        0x68 => "OP_ENDIF",
        0x69 => "OP_VERIFY",
        0x6a => "OP_RETURN",
        0x6b => "OP_TOALTSTACK",
        0x6c => "OP_FROMALTSTACK",
        0x6d => "OP_2DROP",
        0x6e => "OP_2DUP",
        0x6f => "OP_3DUP",
        0x70 => "OP_2OVER",
        0x71 => "OP_2ROT",
        0x72 => "OP_2SWAP",
        0x73 => "OP_IFDUP",
        0x74 => "OP_DEPTH",
        0x75 => "OP_DROP",
        0x76 => "OP_DUP",
        0x77 => "OP_NIP",
        0x78 => "OP_OVER",
        0x79 => "OP_PICK",
        0x7a => "OP_ROLL",
        0x7b => "OP_ROT",
        0x7c => "OP_SWAP",
        0x7d => "OP_TUCK",
        _ => return None,
    };
    Some(name)
}

/// Full metadata for an assigned opcode, `None` for unassigned bytes.
pub fn info(code: u8) -> Option<OpcodeInfo> {
    let name = mnemonic(code)?;
    let operand = match code {
        0x01..=0x4b => Operand::Inline(code as usize),
        0x4c => Operand::LengthPrefixed(1),
        0x4d => Operand::LengthPrefixed(2),
        0x4e => Operand::LengthPrefixed(4),
        _ => Operand::None,
    };
    Some(OpcodeInfo {
        code,
        name,
        family: family(Opcode::from(code)),
        operand,
    })
}

/// Width of the little-endian length prefix for PUSHDATA1/2/4.
pub(crate) fn pushdata_width(opcode: Opcode) -> Option<usize> {
    match opcode {
        all::OP_PUSHDATA1 => Some(1),
        all::OP_PUSHDATA2 => Some(2),
        all::OP_PUSHDATA4 => Some(4),
        _ => None,
    }
}
