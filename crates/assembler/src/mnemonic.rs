//! Mnemonic resolution against the core encoding tables.

use ripple_core::{Funct, InstrFormat, Opcode};

/// How a mnemonic's operand list is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandForm {
    /// `OP $rd, $rs, $rt`.
    ThreeRegister,
    /// `JR $rs`.
    JumpRegister,
    /// `OP $rt, imm($rs)` or `OP $rt, $rs, imm`.
    Memory,
    /// `OP $rt, $rs, imm`.
    ArithImmediate,
    /// `OP $rs, $rt, label|offset`.
    Branch,
    /// `OP label|address`.
    JumpTarget,
}

/// Which encoder a mnemonic routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicKind {
    /// R-type with the given funct.
    RType(Funct),
    /// I-type with the given opcode.
    IType(Opcode),
    /// J-type with the given opcode.
    JType(Opcode),
}

impl MnemonicKind {
    /// The format tag recorded on the assembled instruction.
    #[must_use]
    pub const fn format(self) -> InstrFormat {
        match self {
            Self::RType(_) => InstrFormat::R,
            Self::IType(_) => InstrFormat::I,
            Self::JType(_) => InstrFormat::J,
        }
    }
}

/// A resolved mnemonic: its encoder routing and operand shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MnemonicSpec {
    /// Encoder routing.
    pub kind: MnemonicKind,
    /// Operand shape.
    pub form: OperandForm,
}

/// Resolves a mnemonic, case-insensitively. `BNQ` is accepted as an alias
/// for `BNE`.
#[must_use]
pub fn resolve(mnemonic: &str) -> Option<MnemonicSpec> {
    let spec = |kind, form| Some(MnemonicSpec { kind, form });
    match mnemonic.to_ascii_uppercase().as_str() {
        "ADD" => spec(MnemonicKind::RType(Funct::Add), OperandForm::ThreeRegister),
        "SUB" => spec(MnemonicKind::RType(Funct::Sub), OperandForm::ThreeRegister),
        "AND" => spec(MnemonicKind::RType(Funct::And), OperandForm::ThreeRegister),
        "OR" => spec(MnemonicKind::RType(Funct::Or), OperandForm::ThreeRegister),
        "SLT" => spec(MnemonicKind::RType(Funct::Slt), OperandForm::ThreeRegister),
        "JR" => spec(MnemonicKind::RType(Funct::Jr), OperandForm::JumpRegister),
        "LW" => spec(MnemonicKind::IType(Opcode::Lw), OperandForm::Memory),
        "SW" => spec(MnemonicKind::IType(Opcode::Sw), OperandForm::Memory),
        "ADDI" => spec(MnemonicKind::IType(Opcode::Addi), OperandForm::ArithImmediate),
        "SUBI" => spec(MnemonicKind::IType(Opcode::Subi), OperandForm::ArithImmediate),
        "SLTI" => spec(MnemonicKind::IType(Opcode::Slti), OperandForm::ArithImmediate),
        "ANDI" => spec(MnemonicKind::IType(Opcode::Andi), OperandForm::ArithImmediate),
        "BEQ" => spec(MnemonicKind::IType(Opcode::Beq), OperandForm::Branch),
        "BNE" | "BNQ" => spec(MnemonicKind::IType(Opcode::Bne), OperandForm::Branch),
        "JUMP" => spec(MnemonicKind::JType(Opcode::Jump), OperandForm::JumpTarget),
        "JAL" => spec(MnemonicKind::JType(Opcode::Jal), OperandForm::JumpTarget),
        _ => None,
    }
}
