//! Pass 2: encoding with label resolution and range checks.

use ripple_core::{
    encode_i_type, encode_j_type, encode_r_type, Funct, IMM6_MAX, IMM6_MIN, JUMP_ADDR_MAX,
};

use crate::errors::{AssembleError, AssembleErrorKind};
use crate::mnemonic::MnemonicKind;
use crate::parser::{BranchTarget, InstructionArgs, JumpTarget, ParsedInstruction};
use crate::symbols::SymbolTable;

/// Encodes one parsed instruction at `address`, resolving labels through
/// `symbols`.
///
/// # Errors
///
/// Returns `ImmediateOutOfRange` for immediates, branch offsets, or jump
/// addresses that do not fit their fields, and `UndefinedLabel` for
/// unresolved label references.
pub fn encode_instruction(
    parsed: &ParsedInstruction,
    symbols: &SymbolTable,
    address: u16,
    line: usize,
) -> Result<u16, AssembleError> {
    match (&parsed.spec.kind, &parsed.args) {
        (MnemonicKind::RType(funct), InstructionArgs::ThreeRegister { rd, rs, rt }) => {
            Ok(encode_r_type(*rs, *rt, *rd, *funct))
        }

        (MnemonicKind::RType(Funct::Jr), InstructionArgs::JumpRegister { rs }) => {
            Ok(encode_r_type(*rs, 0, 0, Funct::Jr))
        }

        (MnemonicKind::IType(op), InstructionArgs::Memory { rt, rs, imm })
        | (MnemonicKind::IType(op), InstructionArgs::ArithImmediate { rt, rs, imm }) => {
            let imm = check_imm6(*imm, line)?;
            Ok(encode_i_type(*op, *rs, *rt, imm))
        }

        (MnemonicKind::IType(op), InstructionArgs::Branch { rs, rt, target }) => {
            let offset = match target {
                BranchTarget::Offset(offset) => *offset,
                BranchTarget::Label(name) => {
                    let label_address = symbols.lookup(name).ok_or_else(|| {
                        AssembleError::new(
                            AssembleErrorKind::UndefinedLabel(name.clone()),
                            line,
                        )
                    })?;
                    // Relative to the instruction after the branch.
                    i64::from(label_address) - (i64::from(address) + 1)
                }
            };
            let offset = check_imm6(offset, line)?;
            Ok(encode_i_type(*op, *rs, *rt, offset))
        }

        (MnemonicKind::JType(op), InstructionArgs::Jump { target }) => {
            let target_address = match target {
                JumpTarget::Address(address) => *address,
                JumpTarget::Label(name) => symbols.lookup(name).map(i64::from).ok_or_else(|| {
                    AssembleError::new(AssembleErrorKind::UndefinedLabel(name.clone()), line)
                })?,
            };
            if !(0..=i64::from(JUMP_ADDR_MAX)).contains(&target_address) {
                return Err(AssembleError::new(
                    AssembleErrorKind::ImmediateOutOfRange {
                        value: target_address,
                        min: 0,
                        max: i64::from(JUMP_ADDR_MAX),
                    },
                    line,
                ));
            }
            Ok(encode_j_type(*op, target_address as u16))
        }

        // The parser only builds args matching the mnemonic's form.
        _ => Err(AssembleError::new(
            AssembleErrorKind::BadOperand(parsed.mnemonic.clone()),
            line,
        )),
    }
}

fn check_imm6(value: i64, line: usize) -> Result<i16, AssembleError> {
    if (i64::from(IMM6_MIN)..=i64::from(IMM6_MAX)).contains(&value) {
        Ok(value as i16)
    } else {
        Err(AssembleError::new(
            AssembleErrorKind::ImmediateOutOfRange {
                value,
                min: i64::from(IMM6_MIN),
                max: i64::from(IMM6_MAX),
            },
            line,
        ))
    }
}
