//! Control-signal derivation.
//!
//! The decode stage turns an [`Instruction`] into a [`Control`] word that
//! the downstream stages consume. Bubbles and illegal encodings get
//! [`Control::NONE`], so they cannot commit architectural effects.

use crate::decoder::Instruction;

/// ALU operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AluOp {
    /// No computation; the ALU outputs zero.
    #[default]
    Nop,
    /// Wrapping 16-bit addition.
    Add,
    /// Wrapping 16-bit subtraction.
    Sub,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Signed set-less-than (1 or 0).
    Slt,
}

impl AluOp {
    /// Display label for the serialized view.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Slt => "SLT",
        }
    }
}

/// Second-ALU-operand selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AluSrc {
    /// The (forwarded) rt register operand.
    #[default]
    Register,
    /// The sign-extended immediate.
    SignedImm,
    /// The immediate zero-extended to its raw 6-bit pattern (ANDI).
    ZeroImm,
}

/// Destination-register selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegDst {
    /// No destination.
    #[default]
    None,
    /// The rd field (R-type).
    Rd,
    /// The rt field (I-type).
    Rt,
    /// `$r7`, the JAL link register.
    Link,
}

/// Write-back value source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum WriteSource {
    /// The ALU result.
    #[default]
    Alu,
    /// The loaded memory word.
    Mem,
    /// PC + 1 (JAL return address).
    PcPlus1,
}

impl WriteSource {
    /// Display label for the serialized view.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Alu => "ALU",
            Self::Mem => "MEM",
            Self::PcPlus1 => "PC+1",
        }
    }
}

/// The control word produced in decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Control {
    /// Write the destination register in WB.
    pub reg_write: bool,
    /// Second ALU operand selection.
    pub alu_src: AluSrc,
    /// Destination register selection.
    pub reg_dst: RegDst,
    /// Read data memory in MEM.
    pub mem_read: bool,
    /// Write data memory in MEM.
    pub mem_write: bool,
    /// Write-back value selection.
    pub mem_to_reg: WriteSource,
    /// ALU operation.
    pub alu_op: AluOp,
}

impl Control {
    /// The all-inactive control word carried by bubbles.
    pub const NONE: Self = Self {
        reg_write: false,
        alu_src: AluSrc::Register,
        reg_dst: RegDst::None,
        mem_read: false,
        mem_write: false,
        mem_to_reg: WriteSource::Alu,
        alu_op: AluOp::Nop,
    };

    /// Derives the control word for a decoded instruction.
    #[must_use]
    pub const fn derive(instr: &Instruction) -> Self {
        match instr {
            Instruction::Add { .. } => Self::r_type(AluOp::Add),
            Instruction::Sub { .. } => Self::r_type(AluOp::Sub),
            Instruction::And { .. } => Self::r_type(AluOp::And),
            Instruction::Or { .. } => Self::r_type(AluOp::Or),
            Instruction::Slt { .. } => Self::r_type(AluOp::Slt),
            Instruction::Lw { .. } => Self {
                reg_write: true,
                alu_src: AluSrc::SignedImm,
                reg_dst: RegDst::Rt,
                mem_read: true,
                mem_write: false,
                mem_to_reg: WriteSource::Mem,
                alu_op: AluOp::Add,
            },
            Instruction::Sw { .. } => Self {
                alu_src: AluSrc::SignedImm,
                mem_write: true,
                alu_op: AluOp::Add,
                ..Self::NONE
            },
            Instruction::Addi { .. } => Self::i_arith(AluOp::Add, AluSrc::SignedImm),
            Instruction::Subi { .. } => Self::i_arith(AluOp::Sub, AluSrc::SignedImm),
            Instruction::Slti { .. } => Self::i_arith(AluOp::Slt, AluSrc::SignedImm),
            Instruction::Andi { .. } => Self::i_arith(AluOp::And, AluSrc::ZeroImm),
            Instruction::Jal { .. } => Self {
                reg_write: true,
                reg_dst: RegDst::Link,
                mem_to_reg: WriteSource::PcPlus1,
                ..Self::NONE
            },
            // Branches resolve in ID; JR transfers in ID; illegal words do
            // nothing. All of them flow downstream as NOPs.
            Instruction::Beq { .. }
            | Instruction::Bne { .. }
            | Instruction::Jr { .. }
            | Instruction::Jump { .. }
            | Instruction::Illegal { .. } => Self::NONE,
        }
    }

    const fn r_type(alu_op: AluOp) -> Self {
        Self {
            reg_write: true,
            reg_dst: RegDst::Rd,
            alu_op,
            ..Self::NONE
        }
    }

    const fn i_arith(alu_op: AluOp, alu_src: AluSrc) -> Self {
        Self {
            reg_write: true,
            alu_src,
            reg_dst: RegDst::Rt,
            alu_op,
            ..Self::NONE
        }
    }
}
