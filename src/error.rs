//! # Error Handling for the Script VM
//!
//! This module defines [`ScriptError`], the set of **fatal faults** the
//! virtual machine can hit while executing room bytecode.
//!
//! ## Design
//! - Every variant represents corrupt or malformed bytecode, or a violation
//!   of one of the VM's structural bounds (sub-routine depth, join-stack
//!   depth, loop-frame depth). None of them are recoverable in-situ.
//! - Variants carry the program counter and, where it matters, the opcode or
//!   offending value, so the scheduler can emit a single diagnostic naming
//!   the fault before halting the machine.
//! - Conditional-false results and unknown opcodes are **not** errors; they
//!   flow through the stepper's normal control paths.
//!
//! ## Display
//! - Implements [`fmt::Display`] with one human-readable line per fault.
//! - Implements [`std::error::Error`] so `ScriptError` integrates with Rust's
//!   standard error handling ecosystem.

use std::fmt;

/// Fatal faults raised while stepping a script thread.
///
/// All program counters are byte offsets into the room's instruction map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    /// The instruction map has no entry at the current program counter.
    MissingInstruction { pc: usize },
    /// A pop was required from an empty if/else join stack.
    EmptyConditionalStack { pc: usize, opcode: u8 },
    /// IF_START would push a ninth entry onto the join stack.
    ConditionalStackOverflow { pc: usize },
    /// GOSUB would nest past the deepest sub-routine level.
    SubroutineDepthExceeded { pc: usize },
    /// SLEEP/FOR/SWITCH would push a fifth loop frame.
    LoopStackOverflow { pc: usize, opcode: u8 },
    /// SLEEPING/FOR_END/BREAK/END_SWITCH ran with no active loop frame.
    NoActiveLoop { pc: usize, opcode: u8 },
    /// SET_BIT with an operation outside {0, 1, 7}.
    InvalidBitOp { pc: usize, operation: u8 },
    /// The SWITCH case scan hit an opcode that is not CASE/DEFAULT/END_SWITCH.
    UnexpectedSwitchOpcode { pc: usize, opcode: u8 },
    /// ITEM_AOT_SET whose trigger kind is not the item kind.
    WrongAotKind { pc: usize, kind: u8 },
    /// An event index past the end of the event entry table.
    BadEventIndex { pc: usize, event: usize },
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::MissingInstruction { pc } => {
                write!(f, "no instruction at pc {pc:#06x}")
            }
            ScriptError::EmptyConditionalStack { pc, opcode } => {
                write!(
                    f,
                    "if/else join stack is empty at pc {pc:#06x} (opcode {opcode:#04x})"
                )
            }
            ScriptError::ConditionalStackOverflow { pc } => {
                write!(f, "if/else join stack overflow at pc {pc:#06x}")
            }
            ScriptError::SubroutineDepthExceeded { pc } => {
                write!(f, "sub-routine depth exceeded at pc {pc:#06x}")
            }
            ScriptError::LoopStackOverflow { pc, opcode } => {
                write!(
                    f,
                    "loop frame overflow at pc {pc:#06x} (opcode {opcode:#04x})"
                )
            }
            ScriptError::NoActiveLoop { pc, opcode } => {
                write!(
                    f,
                    "no active loop frame at pc {pc:#06x} (opcode {opcode:#04x})"
                )
            }
            ScriptError::InvalidBitOp { pc, operation } => {
                write!(f, "invalid SET_BIT operation {operation} at pc {pc:#06x}")
            }
            ScriptError::UnexpectedSwitchOpcode { pc, opcode } => {
                write!(
                    f,
                    "unexpected opcode {opcode:#04x} inside SWITCH scan at pc {pc:#06x}"
                )
            }
            ScriptError::WrongAotKind { pc, kind } => {
                write!(
                    f,
                    "ITEM_AOT_SET with non-item trigger kind {kind} at pc {pc:#06x}"
                )
            }
            ScriptError::BadEventIndex { pc, event } => {
                write!(f, "event index {event} out of range at pc {pc:#06x}")
            }
        }
    }
}

impl std::error::Error for ScriptError {}
