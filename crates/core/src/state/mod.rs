//! Architectural and microarchitectural state primitives.

/// Pipeline latches between adjacent stages.
pub mod latch;
/// Instruction and data memory models.
pub mod memory;
/// General-purpose register file.
pub mod registers;
