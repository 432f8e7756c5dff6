//! The serialized CPU view handed to observers.
//!
//! [`CpuView::from_cpu`] deep-copies everything a presentation layer needs
//! for one cycle: architectural state, latch contents with disassembly,
//! forwarding/stall/flush events, the per-cycle histories, and derived
//! performance figures. The view owns all of its data; later steps cannot
//! mutate an already returned snapshot.

use std::collections::BTreeMap;

use crate::cpu::{ControlTransfer, Cpu, PerfCounters};
use crate::disasm::disassemble;
use crate::history::{CycleRecord, ForwardRecord};
use crate::pipeline::forward::ForwardUse;
use crate::pipeline::hazard::StallInfo;
use crate::state::latch::{ExMem, IdEx, IfId, Latch, MemWb};
use crate::state::memory::MemoryWarning;

/// Disassembly shown for an empty pipeline slot.
const BUBBLE_DISASM: &str = "NOP";

/// View of the IF/ID latch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IfIdView {
    /// False for a bubble.
    pub valid: bool,
    /// Canonical disassembly, `"NOP"` for a bubble.
    pub disasm: String,
    /// Hex encoding of the held word, if valid.
    pub instruction: Option<String>,
    /// PC + 1 of the fetched instruction.
    pub pc_plus1: u16,
}

/// View of the ID/EX latch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IdExView {
    /// False for a bubble.
    pub valid: bool,
    /// Canonical disassembly, `"NOP"` for a bubble.
    pub disasm: String,
    /// Hex encoding of the held word, if valid.
    pub instruction: Option<String>,
    /// PC + 1 of the instruction.
    pub pc_plus1: u16,
    /// First source register field.
    pub rs: u8,
    /// Second source register field.
    pub rt: u8,
    /// Destination register (0 when none).
    pub write_reg: u8,
    /// Operand value read for rs.
    pub rs_val: u16,
    /// Operand value read for rt.
    pub rt_val: u16,
    /// Sign-extended immediate.
    pub imm: i16,
    /// ALU operation label.
    pub alu_op: String,
    /// Register write-back enable.
    pub reg_write: bool,
    /// Memory read enable.
    pub mem_read: bool,
    /// Memory write enable.
    pub mem_write: bool,
}

/// View of the EX/MEM latch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExMemView {
    /// False for a bubble.
    pub valid: bool,
    /// Canonical disassembly, `"NOP"` for a bubble.
    pub disasm: String,
    /// Hex encoding of the held word, if valid.
    pub instruction: Option<String>,
    /// ALU output (effective address for loads/stores).
    pub alu_result: u16,
    /// Captured store data.
    pub store_val: u16,
    /// Destination register (0 when none).
    pub write_reg: u8,
    /// Register write-back enable.
    pub reg_write: bool,
    /// Memory read enable.
    pub mem_read: bool,
    /// Memory write enable.
    pub mem_write: bool,
}

/// View of the MEM/WB latch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemWbView {
    /// False for a bubble.
    pub valid: bool,
    /// Canonical disassembly, `"NOP"` for a bubble.
    pub disasm: String,
    /// Hex encoding of the held word, if valid.
    pub instruction: Option<String>,
    /// ALU output carried from EX.
    pub alu_result: u16,
    /// Loaded memory word (0 when the instruction did not load).
    pub mem_data: u16,
    /// Destination register (0 when none).
    pub write_reg: u8,
    /// Register write-back enable.
    pub reg_write: bool,
    /// Write-back source label (`"ALU"`, `"MEM"`, `"PC+1"`).
    pub mem_to_reg: String,
}

/// A forwarding event: which latch fed which register's pending value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ForwardView {
    /// `"EX_MEM"`, `"MEM_WB"`, or `"ID_EX"`.
    pub source: String,
    /// The register, formatted `$rN`.
    pub reg: String,
    /// The forwarded value.
    pub value: u16,
}

impl ForwardView {
    fn from_use(fwd: &ForwardUse) -> Self {
        Self {
            source: fwd.source.label().to_owned(),
            reg: format!("$r{}", fwd.reg),
            value: fwd.value,
        }
    }
}

/// A stall report for the current cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StallView {
    /// `"LoadUse"` or `"LoadUseControl"`.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// The register being waited on, formatted `$rN`.
    pub waiting_reg: String,
    /// Disassembly of the load producing the value.
    pub waiting_for: String,
    /// Disassembly of the instruction held in decode.
    pub blocked: String,
}

/// A taken control transfer report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ControlHazardView {
    /// `"Branch"`, `"Jump"`, or `"JR"`.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// The redirected PC.
    pub target_address: u16,
}

/// A non-fatal uninitialized-read warning.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryWarningView {
    /// Always `"UninitializedRead"`.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    /// The 9-bit word address that was read.
    pub address: u16,
}

/// One row of the per-cycle stage-occupancy history.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CycleView {
    /// The cycle number.
    pub cycle: u64,
    /// Hex word fetched this cycle, if any.
    #[cfg_attr(feature = "serde", serde(rename = "IF"))]
    pub fetch: Option<String>,
    /// Hex word in decode, if any.
    #[cfg_attr(feature = "serde", serde(rename = "ID"))]
    pub decode: Option<String>,
    /// Hex word in execute, if any.
    #[cfg_attr(feature = "serde", serde(rename = "EX"))]
    pub execute: Option<String>,
    /// Hex word in memory access, if any.
    #[cfg_attr(feature = "serde", serde(rename = "MEM"))]
    pub memory: Option<String>,
    /// Hex word retiring, if any.
    #[cfg_attr(feature = "serde", serde(rename = "WB"))]
    pub writeback: Option<String>,
    /// True when the hazard unit stalled this cycle.
    pub stalled: bool,
}

/// Forwarding activity for one recorded cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ForwardRecordView {
    /// The cycle number.
    pub cycle: u64,
    /// EX-stage forward into ALU input A.
    pub forward_a: Option<ForwardView>,
    /// EX-stage forward into ALU input B.
    pub forward_b: Option<ForwardView>,
    /// ID-stage forwards.
    pub id_forwards: Vec<ForwardView>,
}

/// Derived performance figures.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PerformanceView {
    /// Committed cycles.
    pub cycles: u64,
    /// Retired instructions.
    pub instructions: u64,
    /// Cycles per instruction; `null` until the first retirement.
    pub cpi: Option<f64>,
    /// Stall cycles as a fraction of all cycles.
    pub stall_rate: f64,
    /// Forwarding cycles as a fraction of all cycles.
    pub forward_rate: f64,
    /// Cycles in which a flush was injected.
    pub flush_count: u64,
    /// Stall cycle count.
    pub stalls: u64,
    /// Forwarding cycle count.
    pub forwards: u64,
}

impl PerformanceView {
    #[allow(clippy::cast_precision_loss)]
    fn derive(cycle: u64, counters: &PerfCounters) -> Self {
        let rate = |count: u64| {
            if cycle == 0 {
                0.0
            } else {
                count as f64 / cycle as f64
            }
        };
        Self {
            cycles: cycle,
            instructions: counters.instructions,
            cpi: (counters.instructions > 0).then(|| cycle as f64 / counters.instructions as f64),
            stall_rate: rate(counters.stalls),
            forward_rate: rate(counters.forwards),
            flush_count: counters.flushes,
            stalls: counters.stalls,
            forwards: counters.forwards,
        }
    }
}

/// The complete serialized CPU state for one cycle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuView {
    /// The program counter.
    pub pc: u16,
    /// Committed cycle count.
    pub cycle: u64,
    /// All eight register values.
    pub registers: [u16; 8],
    /// Written data-memory words by address.
    pub data_memory: BTreeMap<u16, u16>,
    /// IF/ID latch contents.
    #[cfg_attr(feature = "serde", serde(rename = "IF_ID"))]
    pub if_id: IfIdView,
    /// ID/EX latch contents.
    #[cfg_attr(feature = "serde", serde(rename = "ID_EX"))]
    pub id_ex: IdExView,
    /// EX/MEM latch contents.
    #[cfg_attr(feature = "serde", serde(rename = "EX_MEM"))]
    pub ex_mem: ExMemView,
    /// MEM/WB latch contents.
    #[cfg_attr(feature = "serde", serde(rename = "MEM_WB"))]
    pub mem_wb: MemWbView,
    /// EX-stage forward into ALU input A this cycle.
    pub forward_a: Option<ForwardView>,
    /// EX-stage forward into ALU input B this cycle.
    pub forward_b: Option<ForwardView>,
    /// ID-stage forwards this cycle.
    pub id_forwards: Vec<ForwardView>,
    /// True when the hazard unit stalled this cycle.
    pub is_stalling: bool,
    /// Stall details, when stalling.
    pub stall_info: Option<StallView>,
    /// Taken control transfer, if any.
    pub control_hazard: Option<ControlHazardView>,
    /// True when a flush was injected this cycle.
    pub flush_occurred: bool,
    /// Uninitialized-read warning, if one fired this cycle.
    pub memory_warning: Option<MemoryWarningView>,
    /// Per-cycle stage occupancy since reset.
    pub pipeline_history: Vec<CycleView>,
    /// Stall cycle numbers since reset.
    pub stall_history: Vec<u64>,
    /// Forwarding activity since reset.
    pub forward_history: Vec<ForwardRecordView>,
    /// Derived performance figures.
    pub performance: PerformanceView,
}

impl CpuView {
    /// Builds a deep snapshot of `cpu`.
    #[must_use]
    pub fn from_cpu(cpu: &Cpu) -> Self {
        Self {
            pc: cpu.pc,
            cycle: cpu.cycle,
            registers: cpu.regs.snapshot(),
            data_memory: cpu.dmem.entries().clone(),
            if_id: if_id_view(&cpu.if_id),
            id_ex: id_ex_view(&cpu.id_ex),
            ex_mem: ex_mem_view(&cpu.ex_mem),
            mem_wb: mem_wb_view(&cpu.mem_wb),
            forward_a: cpu.forward_a.as_ref().map(ForwardView::from_use),
            forward_b: cpu.forward_b.as_ref().map(ForwardView::from_use),
            id_forwards: cpu.id_forwards.iter().map(ForwardView::from_use).collect(),
            is_stalling: cpu.stalling,
            stall_info: cpu.stall_info.as_ref().map(stall_view),
            control_hazard: cpu.control_hazard.as_ref().map(control_hazard_view),
            flush_occurred: cpu.flush_occurred,
            memory_warning: cpu.memory_warning.as_ref().map(memory_warning_view),
            pipeline_history: cpu.pipeline_history.iter().map(cycle_view).collect(),
            stall_history: cpu.stall_history.clone(),
            forward_history: cpu.forward_history.iter().map(forward_record_view).collect(),
            performance: PerformanceView::derive(cpu.cycle, &cpu.counters),
        }
    }
}

fn hex(raw: u16) -> String {
    format!("{raw:04X}")
}

fn if_id_view(latch: &Latch<IfId>) -> IfIdView {
    latch.stage().map_or_else(
        || IfIdView {
            disasm: BUBBLE_DISASM.to_owned(),
            ..IfIdView::default()
        },
        |stage| IfIdView {
            valid: true,
            disasm: disassemble(stage.raw),
            instruction: Some(hex(stage.raw)),
            pc_plus1: stage.pc_plus1,
        },
    )
}

fn id_ex_view(latch: &Latch<IdEx>) -> IdExView {
    latch.stage().map_or_else(
        || IdExView {
            disasm: BUBBLE_DISASM.to_owned(),
            alu_op: "NOP".to_owned(),
            ..IdExView::default()
        },
        |stage| IdExView {
            valid: true,
            disasm: disassemble(stage.raw),
            instruction: Some(hex(stage.raw)),
            pc_plus1: stage.pc_plus1,
            rs: stage.rs,
            rt: stage.rt,
            write_reg: stage.write_reg,
            rs_val: stage.rs_val,
            rt_val: stage.rt_val,
            imm: stage.imm,
            alu_op: stage.ctrl.alu_op.label().to_owned(),
            reg_write: stage.ctrl.reg_write,
            mem_read: stage.ctrl.mem_read,
            mem_write: stage.ctrl.mem_write,
        },
    )
}

fn ex_mem_view(latch: &Latch<ExMem>) -> ExMemView {
    latch.stage().map_or_else(
        || ExMemView {
            disasm: BUBBLE_DISASM.to_owned(),
            ..ExMemView::default()
        },
        |stage| ExMemView {
            valid: true,
            disasm: disassemble(stage.raw),
            instruction: Some(hex(stage.raw)),
            alu_result: stage.alu_result,
            store_val: stage.store_val,
            write_reg: stage.write_reg,
            reg_write: stage.ctrl.reg_write,
            mem_read: stage.ctrl.mem_read,
            mem_write: stage.ctrl.mem_write,
        },
    )
}

fn mem_wb_view(latch: &Latch<MemWb>) -> MemWbView {
    latch.stage().map_or_else(
        || MemWbView {
            disasm: BUBBLE_DISASM.to_owned(),
            mem_to_reg: "ALU".to_owned(),
            ..MemWbView::default()
        },
        |stage| MemWbView {
            valid: true,
            disasm: disassemble(stage.raw),
            instruction: Some(hex(stage.raw)),
            alu_result: stage.alu_result,
            mem_data: stage.mem_data,
            write_reg: stage.write_reg,
            reg_write: stage.ctrl.reg_write,
            mem_to_reg: stage.ctrl.mem_to_reg.label().to_owned(),
        },
    )
}

fn stall_view(info: &StallInfo) -> StallView {
    StallView {
        kind: info.kind.label().to_owned(),
        waiting_reg: format!("$r{}", info.reg),
        waiting_for: disassemble(info.producer),
        blocked: disassemble(info.blocked),
    }
}

fn control_hazard_view(transfer: &ControlTransfer) -> ControlHazardView {
    ControlHazardView {
        kind: transfer.kind.label().to_owned(),
        target_address: transfer.target,
    }
}

fn memory_warning_view(warning: &MemoryWarning) -> MemoryWarningView {
    MemoryWarningView {
        kind: "UninitializedRead".to_owned(),
        address: warning.address,
    }
}

fn cycle_view(record: &CycleRecord) -> CycleView {
    CycleView {
        cycle: record.cycle,
        fetch: record.fetch.map(hex),
        decode: record.decode.map(hex),
        execute: record.execute.map(hex),
        memory: record.memory.map(hex),
        writeback: record.writeback.map(hex),
        stalled: record.stalled,
    }
}

fn forward_record_view(record: &ForwardRecord) -> ForwardRecordView {
    ForwardRecordView {
        cycle: record.cycle,
        forward_a: record.forward_a.as_ref().map(ForwardView::from_use),
        forward_b: record.forward_b.as_ref().map(ForwardView::from_use),
        id_forwards: record.id_forwards.iter().map(ForwardView::from_use).collect(),
    }
}
