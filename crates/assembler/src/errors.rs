//! Structured error reporting for the assembler.
//!
//! Assembly stops at the first error; every error carries the 1-indexed
//! source line it was detected on, and all messages are stable enough to
//! surface directly in a UI.

use thiserror::Error;

/// Classification of assembly failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleErrorKind {
    /// The mnemonic is not part of the instruction set.
    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),
    /// An operand is missing, superfluous, or malformed.
    #[error("bad operand: {0}")]
    BadOperand(String),
    /// An immediate, offset, or jump address does not fit its field.
    #[error("immediate value {value} out of range [{min}, {max}]")]
    ImmediateOutOfRange {
        /// The offending value.
        value: i64,
        /// Smallest encodable value.
        min: i64,
        /// Largest encodable value.
        max: i64,
    },
    /// A branch or jump references a label that is never defined.
    #[error("undefined label: {0}")]
    UndefinedLabel(String),
    /// The same label is defined twice.
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),
    /// The program does not fit in instruction memory.
    #[error("program exceeds {limit} instructions")]
    TooManyInstructions {
        /// Instruction-memory capacity in words.
        limit: usize,
    },
}

/// An assembly failure with its source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct AssembleError {
    /// What went wrong.
    pub kind: AssembleErrorKind,
    /// 1-indexed source line the error was detected on.
    pub line: usize,
}

impl AssembleError {
    /// Attaches a source line to an error kind.
    #[must_use]
    pub const fn new(kind: AssembleErrorKind, line: usize) -> Self {
        Self { kind, line }
    }
}
