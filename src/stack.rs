//! Stack storage and the value interpretations opcodes apply to stack items.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::script::ScriptError;

/// Widest item accepted as a PICK/ROLL index.
pub const MAX_INDEX_LEN: usize = 8;

/// Ordered byte-string stack, top at the tail.
///
/// Depth arguments count from the top: depth 0 is the last item pushed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptStack {
    items: Vec<Vec<u8>>,
}

impl ScriptStack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_items(items: Vec<Vec<u8>>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.items.push(data);
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.items.pop().ok_or(ScriptError::StackUnderflow)
    }

    pub fn top(&self) -> Result<&Vec<u8>, ScriptError> {
        self.peek(0)
    }

    /// Fails unless at least `count` items are present.
    pub fn require(&self, count: usize) -> Result<(), ScriptError> {
        if self.items.len() < count {
            Err(ScriptError::StackUnderflow)
        } else {
            Ok(())
        }
    }

    pub fn peek(&self, depth: usize) -> Result<&Vec<u8>, ScriptError> {
        let idx = self.index_of(depth)?;
        Ok(&self.items[idx])
    }

    pub fn remove(&mut self, depth: usize) -> Result<Vec<u8>, ScriptError> {
        let idx = self.index_of(depth)?;
        Ok(self.items.remove(idx))
    }

    /// Inserts `data` so that it ends up at `depth` once inserted.
    ///
    /// `depth == len()` inserts at the bottom.
    pub fn insert(&mut self, depth: usize, data: Vec<u8>) -> Result<(), ScriptError> {
        let idx = self
            .items
            .len()
            .checked_sub(depth)
            .ok_or(ScriptError::StackUnderflow)?;
        self.items.insert(idx, data);
        Ok(())
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), ScriptError> {
        let a = self.index_of(a)?;
        let b = self.index_of(b)?;
        self.items.swap(a, b);
        Ok(())
    }

    /// Copies the top `count` items onto the top, preserving their order.
    pub fn duplicate_top(&mut self, count: usize) -> Result<(), ScriptError> {
        self.copy_range(count - 1, count)
    }

    /// Copies `count` consecutive items, the deepest at `depth`, onto the top.
    pub fn copy_range(&mut self, depth: usize, count: usize) -> Result<(), ScriptError> {
        let start = self.index_of(depth)?;
        let end = start + count;
        if end > self.items.len() {
            return Err(ScriptError::StackUnderflow);
        }
        self.items.extend_from_within(start..end);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<Vec<u8>> {
        self.items
    }

    fn index_of(&self, depth: usize) -> Result<usize, ScriptError> {
        if depth >= self.items.len() {
            return Err(ScriptError::StackUnderflow);
        }
        Ok(self.items.len() - 1 - depth)
    }
}

/// Truthiness of a stack item.
///
/// Empty, all-zero and negative-zero encodings (sign bit alone in the first
/// byte, every following byte zero) are false.
pub fn cast_to_bool(data: &[u8]) -> bool {
    match data.split_first() {
        None => false,
        Some((&first, rest)) => {
            let rest_zero = rest.iter().all(|&byte| byte == 0);
            !(rest_zero && (first == 0 || first == 0x80))
        }
    }
}

/// Minimal little-endian encoding of a non-negative count.
///
/// Zero encodes as the empty item. A padding byte is appended when the most
/// significant byte has its top bit set, so the value never reads as negative.
pub fn encode_count(value: usize) -> Vec<u8> {
    let mut result = Vec::new();
    let mut remaining = value as u64;
    while remaining > 0 {
        result.push((remaining & 0xff) as u8);
        remaining >>= 8;
    }
    if let Some(&last) = result.last() {
        if last & 0x80 != 0 {
            result.push(0x00);
        }
    }
    result
}

/// Reads a PICK/ROLL depth from an unsigned little-endian item.
pub fn decode_index(bytes: &[u8]) -> Result<usize, ScriptError> {
    if bytes.len() > MAX_INDEX_LEN {
        return Err(ScriptError::NumericOverflow);
    }
    let value = bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));
    usize::try_from(value).map_err(|_| ScriptError::NumericOverflow)
}
