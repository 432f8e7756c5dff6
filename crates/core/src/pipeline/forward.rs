//! Forwarding networks.
//!
//! Two priority-encoded multiplexers route not-yet-written results back to
//! earlier stages:
//!
//! - **EX-stage** operand selection prefers EX/MEM over MEM/WB.
//! - **ID-stage** selection (branch compare and JR target) prefers the
//!   same-cycle EX output, then EX/MEM, then MEM/WB.
//!
//! Every selection is gated on the source latch writing a register and the
//! destination being non-zero, so `$r0` never forwards.

use crate::state::latch::{ExMem, Latch, MemWb};

/// Which latch supplied a forwarded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ForwardSource {
    /// The result the EX stage computed this same cycle (ID-stage only).
    IdEx,
    /// The EX/MEM latch.
    ExMem,
    /// The MEM/WB latch (write-back mux output).
    MemWb,
}

impl ForwardSource {
    /// Display label for the serialized view.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IdEx => "ID_EX",
            Self::ExMem => "EX_MEM",
            Self::MemWb => "MEM_WB",
        }
    }
}

/// A single forwarding event observed during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ForwardUse {
    /// The latch that supplied the value.
    pub source: ForwardSource,
    /// The register whose pending value was routed.
    pub reg: u8,
    /// The forwarded value.
    pub value: u16,
}

const fn wants(write_reg: u8, reg: u8) -> bool {
    write_reg != 0 && write_reg == reg
}

/// Selects an EX-stage ALU operand for `reg`, whose register-file value is
/// `reg_val`. EX/MEM has priority over MEM/WB.
#[must_use]
pub fn ex_operand(
    reg: u8,
    reg_val: u16,
    ex_mem: &Latch<ExMem>,
    mem_wb: &Latch<MemWb>,
) -> (u16, Option<ForwardUse>) {
    if let Some(stage) = ex_mem.stage() {
        if stage.ctrl.reg_write && wants(stage.write_reg, reg) {
            let value = stage.forward_value();
            return (
                value,
                Some(ForwardUse {
                    source: ForwardSource::ExMem,
                    reg,
                    value,
                }),
            );
        }
    }
    if let Some(stage) = mem_wb.stage() {
        if stage.ctrl.reg_write && wants(stage.write_reg, reg) {
            let value = stage.write_back_value();
            return (
                value,
                Some(ForwardUse {
                    source: ForwardSource::MemWb,
                    reg,
                    value,
                }),
            );
        }
    }
    (reg_val, None)
}

/// Selects an ID-stage operand (branch compare or JR target) for `reg`.
/// Priority: same-cycle EX output (`ex_now`), then EX/MEM, then MEM/WB.
#[must_use]
pub fn id_operand(
    reg: u8,
    reg_val: u16,
    ex_now: &Latch<ExMem>,
    ex_mem: &Latch<ExMem>,
    mem_wb: &Latch<MemWb>,
) -> (u16, Option<ForwardUse>) {
    if let Some(stage) = ex_now.stage() {
        if stage.ctrl.reg_write && wants(stage.write_reg, reg) {
            let value = stage.forward_value();
            return (
                value,
                Some(ForwardUse {
                    source: ForwardSource::IdEx,
                    reg,
                    value,
                }),
            );
        }
    }
    ex_operand(reg, reg_val, ex_mem, mem_wb)
}
