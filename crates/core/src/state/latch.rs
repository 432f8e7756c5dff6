//! Pipeline latches between adjacent stages.
//!
//! Each latch is either a [`Latch::Bubble`] (the stage behind it does
//! nothing this cycle and must not commit architectural effects) or a
//! captured payload. Modeling the invalid case as a variant forces every
//! consumer through exhaustive case analysis.

use crate::decoder::Instruction;
use crate::pipeline::control::{Control, WriteSource};

/// A pipeline latch: a bubble or a captured stage payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Latch<T> {
    /// No instruction; propagates as a NOP.
    Bubble,
    /// A valid payload captured at the last clock edge.
    Stage(T),
}

impl<T> Default for Latch<T> {
    fn default() -> Self {
        Self::Bubble
    }
}

impl<T> Latch<T> {
    /// True when the latch holds no instruction.
    #[must_use]
    pub const fn is_bubble(&self) -> bool {
        matches!(self, Self::Bubble)
    }

    /// The payload, if the latch is valid.
    #[must_use]
    pub const fn stage(&self) -> Option<&T> {
        match self {
            Self::Bubble => None,
            Self::Stage(payload) => Some(payload),
        }
    }
}

/// IF/ID payload: the fetched word and the incremented fetch PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IfId {
    /// Address of the instruction after the fetched one.
    pub pc_plus1: u16,
    /// The fetched instruction word.
    pub raw: u16,
}

/// ID/EX payload: decoded fields, operand values, and control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IdEx {
    /// The instruction word, kept for display.
    pub raw: u16,
    /// PC + 1 of the instruction (JAL link value, branch base).
    pub pc_plus1: u16,
    /// Decoded instruction.
    pub instr: Instruction,
    /// First source register field.
    pub rs: u8,
    /// Second source register field.
    pub rt: u8,
    /// Value read for rs at decode.
    pub rs_val: u16,
    /// Value read for rt at decode.
    pub rt_val: u16,
    /// Sign-extended immediate.
    pub imm: i16,
    /// Resolved destination register (0 when the instruction writes none).
    pub write_reg: u8,
    /// Derived control word.
    pub ctrl: Control,
}

/// EX/MEM payload: the ALU result and the signals MEM and WB still need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExMem {
    /// The instruction word, kept for display.
    pub raw: u16,
    /// PC + 1 of the instruction.
    pub pc_plus1: u16,
    /// ALU output (also the effective address for loads and stores).
    pub alu_result: u16,
    /// Store data: the post-forwarding rt operand captured in EX.
    pub store_val: u16,
    /// Destination register.
    pub write_reg: u8,
    /// Control word.
    pub ctrl: Control,
}

impl ExMem {
    /// The value this latch supplies to forwarding consumers: the link
    /// address for a JAL, otherwise the ALU result.
    #[must_use]
    pub const fn forward_value(&self) -> u16 {
        match self.ctrl.mem_to_reg {
            WriteSource::PcPlus1 => self.pc_plus1,
            WriteSource::Alu | WriteSource::Mem => self.alu_result,
        }
    }
}

/// MEM/WB payload: everything the write-back stage needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemWb {
    /// The instruction word, kept for display.
    pub raw: u16,
    /// PC + 1 of the instruction.
    pub pc_plus1: u16,
    /// ALU output carried from EX.
    pub alu_result: u16,
    /// Word read from data memory (zero when the instruction did not load).
    pub mem_data: u16,
    /// Destination register.
    pub write_reg: u8,
    /// Control word.
    pub ctrl: Control,
}

impl MemWb {
    /// Output of the write-back multiplexer: ALU result, memory data, or
    /// the link address, per the `MemToReg` selector.
    #[must_use]
    pub const fn write_back_value(&self) -> u16 {
        match self.ctrl.mem_to_reg {
            WriteSource::Alu => self.alu_result,
            WriteSource::Mem => self.mem_data,
            WriteSource::PcPlus1 => self.pc_plus1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExMem, Latch, MemWb};
    use crate::pipeline::control::{Control, WriteSource};

    fn mem_wb(ctrl: Control) -> MemWb {
        MemWb {
            raw: 0,
            pc_plus1: 10,
            alu_result: 0x1111,
            mem_data: 0x2222,
            write_reg: 1,
            ctrl,
        }
    }

    #[test]
    fn default_latch_is_a_bubble() {
        let latch: Latch<super::IfId> = Latch::default();
        assert!(latch.is_bubble());
        assert!(latch.stage().is_none());
    }

    #[test]
    fn write_back_mux_selects_by_control() {
        let mut ctrl = Control::NONE;
        ctrl.mem_to_reg = WriteSource::Alu;
        assert_eq!(mem_wb(ctrl).write_back_value(), 0x1111);

        ctrl.mem_to_reg = WriteSource::Mem;
        assert_eq!(mem_wb(ctrl).write_back_value(), 0x2222);

        ctrl.mem_to_reg = WriteSource::PcPlus1;
        assert_eq!(mem_wb(ctrl).write_back_value(), 10);
    }

    #[test]
    fn ex_mem_forwards_the_link_address_for_jal() {
        let mut ctrl = Control::NONE;
        ctrl.mem_to_reg = WriteSource::PcPlus1;
        let latch = ExMem {
            raw: 0,
            pc_plus1: 1,
            alu_result: 0xDEAD,
            store_val: 0,
            write_reg: 7,
            ctrl,
        };
        assert_eq!(latch.forward_value(), 1);

        ctrl.mem_to_reg = WriteSource::Alu;
        let latch = ExMem { ctrl, ..latch };
        assert_eq!(latch.forward_value(), 0xDEAD);
    }
}
