//! Cycle-accurate pipeline core for the Ripple-16 CPU simulator.
//!
//! Ripple-16 is a 16-bit pedagogical RISC with the classical five-stage
//! pipeline (IF, ID, EX, MEM, WB), a forwarding unit, hazard detection with
//! stalls and flushes, branch/jump resolution in decode, and running
//! performance counters. This crate owns the architectural state model, the
//! per-cycle execution engine, and the serialized observer view; the
//! assembler and the session facade live in sibling crates.

/// Deterministic opcode/funct tables and bit-field helpers.
pub mod encoding;
pub use encoding::{
    encode_i_type, encode_j_type, encode_r_type, sign_extend_imm6, Funct, InstrFormat, Opcode,
    IMM6_MAX, IMM6_MIN, JUMP_ADDR_MAX, REGISTER_COUNT,
};

/// Total instruction decoder producing a tagged variant per operation.
pub mod decoder;
pub use decoder::{decode, source_regs, Instruction};

/// Canonical disassembly used as timeline and UI keys.
pub mod disasm;
pub use disasm::disassemble;

/// Assembled program records and symbol table.
pub mod program;
pub use program::{InstructionRecord, Program};

/// Architectural state primitives: registers, memories, pipeline latches.
pub mod state;
pub use state::latch::{ExMem, IdEx, IfId, Latch, MemWb};
pub use state::memory::{
    DataMemory, InstructionMemory, MemoryWarning, DATA_ADDR_MASK, IMEM_WORDS,
};
pub use state::registers::RegisterFile;

/// The per-cycle pipeline engine with its control, forwarding, and hazard
/// units.
pub mod pipeline;
pub use pipeline::control::{AluOp, AluSrc, Control, RegDst, WriteSource};
pub use pipeline::forward::{ForwardSource, ForwardUse};
pub use pipeline::hazard::{HazardKind, StallInfo};

/// The core state container.
pub mod cpu;
pub use cpu::{ControlTransfer, Cpu, PerfCounters, TransferKind};

/// Per-cycle records and timeline reconstruction.
pub mod history;
pub use history::{extract_timeline, CycleRecord, ForwardRecord, InstructionTimeline};

/// The serialized observer view of one cycle.
pub mod view;
pub use view::CpuView;

/// Engine error types.
pub mod error;
pub use error::StepError;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use serde_json as _;
