//! The architectural and microarchitectural state of one Ripple-16 core.
//!
//! [`Cpu`] owns everything a cycle snapshot must capture: register file,
//! memories, PC, cycle counter, the four pipeline latches, the per-cycle
//! observer signals, the accumulated histories, and the performance
//! counters. It is deliberately a plain value: cloning it yields the deep
//! snapshot the history store needs for reverse stepping.

use crate::history::{CycleRecord, ForwardRecord};
use crate::pipeline::forward::ForwardUse;
use crate::pipeline::hazard::StallInfo;
use crate::program::Program;
use crate::state::latch::{ExMem, IdEx, IfId, Latch, MemWb};
use crate::state::memory::{DataMemory, InstructionMemory, MemoryWarning};
use crate::state::registers::RegisterFile;

/// Kinds of control transfer resolved in the decode stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TransferKind {
    /// A taken `BEQ`/`BNE`.
    Branch,
    /// `JUMP` to an absolute address.
    Jump,
    /// `JAL`: like `JUMP`, but the instruction continues down the pipeline
    /// to write the link register.
    Jal,
    /// `JR` through a register.
    Jr,
}

impl TransferKind {
    /// Display label for the serialized view (`JAL` reports as a jump).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Branch => "Branch",
            Self::Jump | Self::Jal => "Jump",
            Self::Jr => "JR",
        }
    }
}

/// A control transfer taken this cycle: the wrong-path fetch is flushed
/// and the PC redirected to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ControlTransfer {
    /// What kind of transfer fired.
    pub kind: TransferKind,
    /// The redirected PC.
    pub target: u16,
}

/// Monotonic event counters, reset together with architectural state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PerfCounters {
    /// Valid instructions committed by MEM/WB.
    pub instructions: u64,
    /// Cycles in which the hazard unit asserted a stall.
    pub stalls: u64,
    /// Cycles in which any EX- or ID-stage forward fired.
    pub forwards: u64,
    /// Cycles in which a flush was injected.
    pub flushes: u64,
}

/// One Ripple-16 core: architectural state, pipeline latches, observer
/// signals for the most recent cycle, and accumulated histories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Cpu {
    pub(crate) pc: u16,
    pub(crate) cycle: u64,
    pub(crate) regs: RegisterFile,
    pub(crate) imem: InstructionMemory,
    pub(crate) dmem: DataMemory,

    pub(crate) if_id: Latch<IfId>,
    pub(crate) id_ex: Latch<IdEx>,
    pub(crate) ex_mem: Latch<ExMem>,
    pub(crate) mem_wb: Latch<MemWb>,

    pub(crate) halted: bool,

    // Observer signals describing the most recent committed cycle.
    pub(crate) stalling: bool,
    pub(crate) stall_info: Option<StallInfo>,
    pub(crate) forward_a: Option<ForwardUse>,
    pub(crate) forward_b: Option<ForwardUse>,
    pub(crate) id_forwards: Vec<ForwardUse>,
    pub(crate) control_hazard: Option<ControlTransfer>,
    pub(crate) flush_occurred: bool,
    pub(crate) memory_warning: Option<MemoryWarning>,

    pub(crate) pipeline_history: Vec<CycleRecord>,
    pub(crate) stall_history: Vec<u64>,
    pub(crate) forward_history: Vec<ForwardRecord>,
    pub(crate) counters: PerfCounters,
}

impl Cpu {
    /// A core with no program loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a core with `program` loaded and all other state zeroed.
    #[must_use]
    pub fn with_program(program: &Program) -> Self {
        Self {
            imem: InstructionMemory::load(&program.words()),
            ..Self::default()
        }
    }

    /// Zeroes architectural and observer state while keeping the loaded
    /// program image.
    pub fn reset(&mut self) {
        let imem = std::mem::take(&mut self.imem);
        *self = Self {
            imem,
            ..Self::default()
        };
    }

    /// The program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Committed cycle count.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// The data memory.
    #[must_use]
    pub const fn data_memory(&self) -> &DataMemory {
        &self.dmem
    }

    /// True once the pipeline has drained with no instruction left to
    /// fetch; further [`Cpu::step`](crate::pipeline) calls fail.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Performance counters accumulated since the last reset.
    #[must_use]
    pub const fn counters(&self) -> &PerfCounters {
        &self.counters
    }

    /// Per-cycle stage occupancy records since the last reset.
    #[must_use]
    pub fn pipeline_history(&self) -> &[CycleRecord] {
        &self.pipeline_history
    }

    /// Cycle numbers in which the hazard unit stalled the pipeline.
    #[must_use]
    pub fn stall_history(&self) -> &[u64] {
        &self.stall_history
    }

    /// Forwarding activity per cycle in which any forward fired.
    #[must_use]
    pub fn forward_history(&self) -> &[ForwardRecord] {
        &self.forward_history
    }

    /// Clears the observer signals at the start of a new cycle.
    pub(crate) fn clear_cycle_indicators(&mut self) {
        self.stalling = false;
        self.stall_info = None;
        self.forward_a = None;
        self.forward_b = None;
        self.id_forwards.clear();
        self.control_hazard = None;
        self.flush_occurred = false;
        self.memory_warning = None;
    }
}
