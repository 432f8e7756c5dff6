//! Canonical disassembly for the Ripple-16 ISA.
//!
//! The strings produced here are stable: the timeline and the presentation
//! layer use them as display keys, and re-assembling a disassembled
//! instruction yields the original word. Illegal encodings render as `???`.

use crate::decoder::{decode, Instruction};

/// Disassembles a 16-bit word into its canonical assembly form,
/// e.g. `ADD $r3,$r1,$r2` or `LW $r2,0($r1)`.
#[must_use]
pub fn disassemble(word: u16) -> String {
    match decode(word) {
        Instruction::Add { rd, rs, rt } => format!("ADD $r{rd},$r{rs},$r{rt}"),
        Instruction::Sub { rd, rs, rt } => format!("SUB $r{rd},$r{rs},$r{rt}"),
        Instruction::And { rd, rs, rt } => format!("AND $r{rd},$r{rs},$r{rt}"),
        Instruction::Or { rd, rs, rt } => format!("OR $r{rd},$r{rs},$r{rt}"),
        Instruction::Slt { rd, rs, rt } => format!("SLT $r{rd},$r{rs},$r{rt}"),
        Instruction::Jr { rs } => format!("JR $r{rs}"),
        Instruction::Lw { rt, rs, imm } => format!("LW $r{rt},{imm}($r{rs})"),
        Instruction::Sw { rt, rs, imm } => format!("SW $r{rt},{imm}($r{rs})"),
        Instruction::Addi { rt, rs, imm } => format!("ADDI $r{rt},$r{rs},{imm}"),
        Instruction::Subi { rt, rs, imm } => format!("SUBI $r{rt},$r{rs},{imm}"),
        Instruction::Slti { rt, rs, imm } => format!("SLTI $r{rt},$r{rs},{imm}"),
        Instruction::Beq { rs, rt, offset } => format!("BEQ $r{rs},$r{rt},{offset}"),
        Instruction::Bne { rs, rt, offset } => format!("BNE $r{rs},$r{rt},{offset}"),
        Instruction::Andi { rt, rs, imm } => format!("ANDI $r{rt},$r{rs},{imm}"),
        Instruction::Jump { addr } => format!("JUMP {addr}"),
        Instruction::Jal { addr } => format!("JAL {addr}"),
        Instruction::Illegal { .. } => "???".to_owned(),
    }
}
