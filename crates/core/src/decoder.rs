//! Total instruction decoder for the Ripple-16 ISA.
//!
//! [`decode`] maps every 16-bit word to an [`Instruction`]: a tagged variant
//! per operation with typed fields. Undefined encodings (reserved opcodes and
//! the unassigned R-type funct values) decode to [`Instruction::Illegal`],
//! which flows through the pipeline with no control signals, so the decoder
//! never fails and dispatch stays exhaustive.

use crate::encoding::{
    addr12_bits, funct_bits, imm6_bits, opcode_bits, rd_bits, rs_bits, rt_bits, sign_extend_imm6,
    Funct, Opcode,
};

/// Executable instruction forms. The raw word is kept alongside in the
/// pipeline latches for display; immediates here are already sign-extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Instruction {
    Add { rd: u8, rs: u8, rt: u8 },
    Sub { rd: u8, rs: u8, rt: u8 },
    And { rd: u8, rs: u8, rt: u8 },
    Or { rd: u8, rs: u8, rt: u8 },
    Slt { rd: u8, rs: u8, rt: u8 },
    Jr { rs: u8 },
    Lw { rt: u8, rs: u8, imm: i16 },
    Sw { rt: u8, rs: u8, imm: i16 },
    Addi { rt: u8, rs: u8, imm: i16 },
    Subi { rt: u8, rs: u8, imm: i16 },
    Slti { rt: u8, rs: u8, imm: i16 },
    Beq { rs: u8, rt: u8, offset: i16 },
    Bne { rs: u8, rt: u8, offset: i16 },
    Andi { rt: u8, rs: u8, imm: i16 },
    Jump { addr: u16 },
    Jal { addr: u16 },
    /// Reserved opcode or unassigned funct; executes as a NOP.
    Illegal { raw: u16 },
}

impl Instruction {
    /// True for the conditional branches (`BEQ`/`BNE`).
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(self, Self::Beq { .. } | Self::Bne { .. })
    }
}

/// Decodes a 16-bit word. Total: every word maps to some variant.
#[must_use]
pub fn decode(word: u16) -> Instruction {
    let Some(opcode) = Opcode::from_u4(opcode_bits(word)) else {
        return Instruction::Illegal { raw: word };
    };

    let rs = rs_bits(word);
    let rt = rt_bits(word);

    match opcode {
        Opcode::RType => {
            let rd = rd_bits(word);
            match Funct::from_u3(funct_bits(word)) {
                Some(Funct::Add) => Instruction::Add { rd, rs, rt },
                Some(Funct::Sub) => Instruction::Sub { rd, rs, rt },
                Some(Funct::And) => Instruction::And { rd, rs, rt },
                Some(Funct::Or) => Instruction::Or { rd, rs, rt },
                Some(Funct::Slt) => Instruction::Slt { rd, rs, rt },
                Some(Funct::Jr) => Instruction::Jr { rs },
                None => Instruction::Illegal { raw: word },
            }
        }
        Opcode::Jump => Instruction::Jump {
            addr: addr12_bits(word),
        },
        Opcode::Jal => Instruction::Jal {
            addr: addr12_bits(word),
        },
        _ => {
            let imm = sign_extend_imm6(imm6_bits(word));
            match opcode {
                Opcode::Lw => Instruction::Lw { rt, rs, imm },
                Opcode::Sw => Instruction::Sw { rt, rs, imm },
                Opcode::Addi => Instruction::Addi { rt, rs, imm },
                Opcode::Subi => Instruction::Subi { rt, rs, imm },
                Opcode::Slti => Instruction::Slti { rt, rs, imm },
                Opcode::Beq => Instruction::Beq {
                    rs,
                    rt,
                    offset: imm,
                },
                Opcode::Bne => Instruction::Bne {
                    rs,
                    rt,
                    offset: imm,
                },
                Opcode::Andi => Instruction::Andi { rt, rs, imm },
                Opcode::RType | Opcode::Jump | Opcode::Jal => unreachable!(),
            }
        }
    }
}

/// Source-register fields of a word as seen by the hazard unit and the
/// decode-stage register read: the encoded rs/rt fields for R- and I-format
/// words, zero for J-format and illegal words (they read no registers).
#[must_use]
pub fn source_regs(word: u16) -> (u8, u8) {
    match decode(word) {
        Instruction::Jump { .. } | Instruction::Jal { .. } | Instruction::Illegal { .. } => (0, 0),
        _ => (rs_bits(word), rt_bits(word)),
    }
}
