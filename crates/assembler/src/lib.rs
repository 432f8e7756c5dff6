//! Ripple-16 assembler library.

/// Top-level two-pass assembler pipeline.
pub mod assembler;
pub use assembler::assemble;

/// Instruction encoding with label resolution and range checks.
pub mod encoder;

/// Structured assembly error types.
pub mod errors;
pub use errors::{AssembleError, AssembleErrorKind};

/// Mnemonic resolution against the core encoding tables.
pub mod mnemonic;

/// Source-line parser for labels, instructions, and operands.
pub mod parser;

/// Symbol table and pass-1 address assignment.
pub mod symbols;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
