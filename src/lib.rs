#![cfg_attr(not(feature = "std"), no_std)]
//! Dual-stack interpreter for a compact subset of the Bitcoin script language.
//!
//! A script is a flat byte buffer of variable-length instructions. Executing
//! it yields the final main and alternate stacks plus a single validity
//! verdict. Constant pushes, flow control and stack manipulation are
//! interpreted; every other opcode is treated as a one-byte no-op.
//!
//! Two failure classes are kept apart. A script that runs to completion but
//! hits a failing VERIFY or an executed RETURN is *rejected*:
//! [`Execution::is_valid`] returns `false`. A script that cannot be executed
//! at all (stack underflow, unbalanced conditional, truncated push, ...) is
//! *malformed* and produces [`Error::Script`].

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod decode;
pub mod opcodes;
mod script;
pub mod stack;

pub use decode::{Cursor, Instruction, Instructions};
pub use opcodes::{OpcodeFamily, OpcodeInfo, Operand};
pub use script::{ConditionStack, Interpreter, ScriptError, ScriptFlags};
pub use stack::{cast_to_bool, ScriptStack};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use core::fmt;

/// No checks beyond the opcode semantics.
pub const VERIFY_NONE: u32 = 0;
/// Fail with [`ScriptError::MalformedNesting`] when a script ends inside an
/// IF/NOTIF block.
pub const VERIFY_CLOSED_CONDITIONALS: u32 = 1 << 0;
/// Fail with [`ScriptError::UnknownOpcode`] when an unassigned opcode is
/// executed, instead of skipping it.
pub const VERIFY_DISCOURAGE_UNASSIGNED_OPCODES: u32 = 1 << 1;

/// Flags applied by [`execute`] and [`verify`].
pub const VERIFY_STANDARD: u32 = VERIFY_CLOSED_CONDITIONALS;

/// Counters collected while a script runs.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Instructions dispatched while executing.
    pub executed: usize,
    /// Instructions dispatched inside a suppressed branch.
    pub skipped: usize,
    /// IF/NOTIF instructions encountered, taken or not.
    pub conditionals_opened: usize,
    /// ENDIF instructions encountered.
    pub conditionals_closed: usize,
}

impl ExecutionStats {
    /// Conditional blocks still open when the script ended.
    pub fn open_conditionals(&self) -> usize {
        self.conditionals_opened - self.conditionals_closed
    }
}

/// Final machine state of a script that ran to the end of its buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub(crate) stack: Vec<Vec<u8>>,
    pub(crate) altstack: Vec<Vec<u8>>,
    pub(crate) valid: bool,
    pub(crate) stats: ExecutionStats,
}

impl Execution {
    /// Main stack, bottom to top.
    pub fn stack(&self) -> &[Vec<u8>] {
        &self.stack
    }

    /// Alternate stack, bottom to top.
    pub fn altstack(&self) -> &[Vec<u8>] {
        &self.altstack
    }

    /// The validity verdict: `false` once a VERIFY failed or a RETURN ran.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn into_stacks(self) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
        (self.stack, self.altstack)
    }
}

/// Detailed failure information for an aborted script.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    /// Why execution stopped.
    pub error: ScriptError,
    /// Offset of the offending instruction, or the script length when the
    /// failure was detected after the last instruction.
    pub offset: usize,
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.error, self.offset)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScriptFailure {}

/// Errors returned by the execution entry points.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// The flag word contains bits this interpreter does not know.
    InvalidFlags(u32),
    /// The script is malformed and could not be executed.
    Script(ScriptFailure),
}

impl Error {
    /// The interpreter error, if the script itself failed.
    pub fn script_error(&self) -> Option<ScriptError> {
        match self {
            Error::Script(failure) => Some(failure.error),
            Error::InvalidFlags(_) => None,
        }
    }
}

impl From<ScriptFailure> for Error {
    fn from(failure: ScriptFailure) -> Self {
        Error::Script(failure)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidFlags(bits) => write!(f, "script flags {bits:#x} are invalid"),
            Error::Script(failure) => write!(f, "script failed: {failure}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Script(failure) => Some(failure),
            Error::InvalidFlags(_) => None,
        }
    }
}

/// Executes `script` with [`VERIFY_STANDARD`].
pub fn execute(script: &[u8]) -> Result<Execution, Error> {
    execute_with_flags(script, VERIFY_STANDARD)
}

/// Same as [`execute`] but with explicit flags.
pub fn execute_with_flags(script: &[u8], flags: u32) -> Result<Execution, Error> {
    let flags = ScriptFlags::from_bits(flags)?;
    Ok(Interpreter::new(script, flags).run()?)
}

/// Executes `script` and returns only the validity verdict.
pub fn verify(script: &[u8]) -> Result<bool, Error> {
    verify_with_flags(script, VERIFY_STANDARD)
}

/// Same as [`verify`] but with explicit flags.
pub fn verify_with_flags(script: &[u8], flags: u32) -> Result<bool, Error> {
    execute_with_flags(script, flags).map(|execution| execution.is_valid())
}
