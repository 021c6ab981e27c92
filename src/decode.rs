//! Instruction decoding over an immutable script buffer.

use bitcoin::opcodes::{all, Opcode};

use crate::{opcodes::pushdata_width, script::ScriptError};

/// A decoded instruction borrowing its payload from the script.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// Direct push (1 to 75) or PUSHDATA1/2/4 with its payload.
    Push { opcode: Opcode, data: &'a [u8] },
    /// Any opcode without operand bytes.
    Op(Opcode),
}

impl<'a> Instruction<'a> {
    pub fn opcode(&self) -> Opcode {
        match *self {
            Instruction::Push { opcode, .. } | Instruction::Op(opcode) => opcode,
        }
    }
}

/// Read-only view of a script with an instruction pointer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }

    /// Moves the instruction pointer forward, never past the end.
    pub fn advance(&mut self, delta: usize) {
        self.position = self
            .position
            .saturating_add(delta)
            .min(self.bytes.len());
    }

    /// Decodes the instruction at the current position.
    ///
    /// Returns the instruction and the number of bytes it occupies, opcode
    /// included. Push encodings that run past the buffer are rejected instead
    /// of being read.
    ///
    /// Callers check [`Cursor::is_at_end`] first; a cursor already at the end
    /// has no opcode to decode and reports [`ScriptError::TruncatedPush`].
    pub fn decode(&self) -> Result<(Instruction<'a>, usize), ScriptError> {
        let bytes = self.bytes;
        let start = self.position;
        let opcode = *bytes.get(start).ok_or(ScriptError::TruncatedPush)?;
        let op = Opcode::from(opcode);

        let (header, push_len) = if (0x01..=all::OP_PUSHBYTES_75.to_u8()).contains(&opcode) {
            (1, opcode as usize)
        } else if let Some(width) = pushdata_width(op) {
            let mut len_cursor = start + 1;
            let push_len = read_push_length(bytes, &mut len_cursor, width)?;
            (1 + width, push_len)
        } else {
            return Ok((Instruction::Op(op), 1));
        };

        let data_start = start + header;
        let data_end = data_start
            .checked_add(push_len)
            .filter(|end| *end <= bytes.len())
            .ok_or(ScriptError::TruncatedPush)?;
        let instruction = Instruction::Push {
            opcode: op,
            data: &bytes[data_start..data_end],
        };
        Ok((instruction, header + push_len))
    }
}

/// Iterator over `(offset, instruction)` pairs, ending after the first error.
pub struct Instructions<'a> {
    cursor: Cursor<'a>,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            failed: false,
        }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<(usize, Instruction<'a>), ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_at_end() {
            return None;
        }
        let offset = self.cursor.position();
        match self.cursor.decode() {
            Ok((instruction, width)) => {
                self.cursor.advance(width);
                Some(Ok((offset, instruction)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn read_push_length(bytes: &[u8], index: &mut usize, width: usize) -> Result<usize, ScriptError> {
    if bytes.len() < *index + width {
        return Err(ScriptError::TruncatedPush);
    }
    let mut len: usize = 0;
    for i in 0..width {
        len |= (bytes[*index + i] as usize) << (8 * i);
    }
    *index += width;
    Ok(len)
}
