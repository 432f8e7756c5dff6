//! Hazard detection unit.
//!
//! Two conditions stall the front of the pipeline for one cycle (PC and
//! IF/ID freeze, ID/EX receives a bubble):
//!
//! 1. **Load-use**: a load sits in ID/EX and its destination matches a
//!    source field of the instruction being decoded.
//! 2. **Control-after-load**: a branch or JR is being decoded while the
//!    load producing its operand is still in EX/MEM; the loaded word only
//!    becomes forwardable once it reaches MEM/WB, one cycle later.

use crate::decoder::{decode, source_regs, Instruction};
use crate::state::latch::{ExMem, IdEx, IfId, Latch};

/// Why the pipeline front is stalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HazardKind {
    /// A load result is needed by the next instruction's EX (or store-data)
    /// operand.
    LoadUse,
    /// A branch or JR resolving in ID needs a load still in MEM.
    LoadControl,
}

impl HazardKind {
    /// Display label for the serialized view.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LoadUse => "LoadUse",
            Self::LoadControl => "LoadUseControl",
        }
    }
}

/// A detected stall: the hazard class, the register being waited on, and
/// the producing/blocked instruction words for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StallInfo {
    /// Hazard classification.
    pub kind: HazardKind,
    /// Register whose value is not yet available.
    pub reg: u8,
    /// Encoding of the load producing the value.
    pub producer: u16,
    /// Encoding of the instruction held in decode.
    pub blocked: u16,
}

/// Runs hazard detection for the instruction sitting in IF/ID against the
/// load still in flight, if any. Returns the stall to apply this cycle.
#[must_use]
pub fn detect(
    if_id: &Latch<IfId>,
    id_ex: &Latch<IdEx>,
    ex_mem: &Latch<ExMem>,
) -> Option<StallInfo> {
    let fetched = if_id.stage()?;
    let (rs, rt) = source_regs(fetched.raw);

    // Load-use: load in EX, consumer in ID.
    if let Some(ex) = id_ex.stage() {
        if ex.ctrl.mem_read && ex.write_reg != 0 {
            let reg = [rs, rt].into_iter().find(|&reg| reg == ex.write_reg);
            if let Some(reg) = reg {
                return Some(StallInfo {
                    kind: HazardKind::LoadUse,
                    reg,
                    producer: ex.raw,
                    blocked: fetched.raw,
                });
            }
        }
    }

    // Control-after-load: branch/JR in ID, load in MEM. ID-stage
    // forwarding cannot reach a load until it is in MEM/WB.
    if let Some(mem) = ex_mem.stage() {
        if mem.ctrl.mem_read && mem.write_reg != 0 {
            let compare_regs = match decode(fetched.raw) {
                Instruction::Beq { rs, rt, .. } | Instruction::Bne { rs, rt, .. } => {
                    Some((rs, Some(rt)))
                }
                Instruction::Jr { rs } => Some((rs, None)),
                _ => None,
            };
            if let Some((a, b)) = compare_regs {
                let reg = (a == mem.write_reg)
                    .then_some(a)
                    .or_else(|| b.filter(|&b| b == mem.write_reg));
                if let Some(reg) = reg {
                    return Some(StallInfo {
                        kind: HazardKind::LoadControl,
                        reg,
                        producer: mem.raw,
                        blocked: fetched.raw,
                    });
                }
            }
        }
    }

    None
}
