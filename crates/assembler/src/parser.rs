//! Source-line parser: comments, labels, mnemonics, and operand shapes.
//!
//! One instruction per non-blank line. Comments start with `#`, `;`, or
//! `//`. A label is an identifier followed by `:` and may share a line with
//! an instruction. Registers are `$r0`..`$r7` (the `$` may be omitted),
//! case-insensitive. Immediates are decimal with an optional sign or hex
//! with `0x`. Range checks happen at encode time so literal and
//! label-derived values take the same path.

use crate::errors::{AssembleError, AssembleErrorKind};
use crate::mnemonic::{resolve, MnemonicSpec, OperandForm};

/// A branch target operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchTarget {
    /// A literal signed offset.
    Offset(i64),
    /// A label, resolved relative to PC+1 at encode time.
    Label(String),
}

/// A jump target operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    /// A literal absolute word address.
    Address(i64),
    /// A label, resolved to its absolute address at encode time.
    Label(String),
}

/// Operands, already matched against the mnemonic's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionArgs {
    /// `OP $rd, $rs, $rt`.
    ThreeRegister {
        /// Destination register.
        rd: u8,
        /// First source register.
        rs: u8,
        /// Second source register.
        rt: u8,
    },
    /// `JR $rs`.
    JumpRegister {
        /// Target register.
        rs: u8,
    },
    /// `LW`/`SW` with a base register and displacement.
    Memory {
        /// Data register.
        rt: u8,
        /// Base register.
        rs: u8,
        /// Signed displacement.
        imm: i64,
    },
    /// `OP $rt, $rs, imm`.
    ArithImmediate {
        /// Destination register.
        rt: u8,
        /// Source register.
        rs: u8,
        /// Signed immediate.
        imm: i64,
    },
    /// `BEQ`/`BNE`.
    Branch {
        /// First compare register.
        rs: u8,
        /// Second compare register.
        rt: u8,
        /// Offset or label.
        target: BranchTarget,
    },
    /// `JUMP`/`JAL`.
    Jump {
        /// Address or label.
        target: JumpTarget,
    },
}

/// A parsed instruction: the resolved mnemonic and its matched operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstruction {
    /// The mnemonic as written (uppercased).
    pub mnemonic: String,
    /// Resolved encoder routing and operand shape.
    pub spec: MnemonicSpec,
    /// Matched operands.
    pub args: InstructionArgs,
}

/// One parsed source line: an optional label and an optional instruction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLine {
    /// Label defined on this line, if any.
    pub label: Option<String>,
    /// Instruction on this line, if any.
    pub instruction: Option<ParsedInstruction>,
}

/// Parses one source line.
///
/// # Errors
///
/// Returns [`AssembleError`] for unknown mnemonics and malformed operands,
/// tagged with `line_number`.
pub fn parse_line(line: &str, line_number: usize) -> Result<ParsedLine, AssembleError> {
    let stripped = strip_comment(line);
    let mut text = stripped.trim();

    let mut parsed = ParsedLine::default();

    if let Some((label, rest)) = split_label(text) {
        parsed.label = Some(label);
        text = rest.trim();
    }

    if text.is_empty() {
        return Ok(parsed);
    }

    parsed.instruction = Some(parse_instruction(text, line_number)?);
    Ok(parsed)
}

fn strip_comment(line: &str) -> &str {
    let mut end = line.len();
    for marker in ["#", ";", "//"] {
        if let Some(pos) = line.find(marker) {
            end = end.min(pos);
        }
    }
    &line[..end]
}

fn split_label(text: &str) -> Option<(String, &str)> {
    let colon = text.find(':')?;
    let label = text[..colon].trim();
    is_identifier(label).then(|| (label.to_owned(), &text[colon + 1..]))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_instruction(text: &str, line: usize) -> Result<ParsedInstruction, AssembleError> {
    let (mnemonic, rest) = text
        .find(char::is_whitespace)
        .map_or((text, ""), |pos| (&text[..pos], text[pos..].trim()));

    let spec = resolve(mnemonic).ok_or_else(|| {
        AssembleError::new(AssembleErrorKind::UnknownMnemonic(mnemonic.to_owned()), line)
    })?;

    let operands: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };

    let args = match spec.form {
        OperandForm::ThreeRegister => {
            let [rd, rs, rt] = expect_operands(mnemonic, &operands, line)?;
            InstructionArgs::ThreeRegister {
                rd: parse_register(rd, line)?,
                rs: parse_register(rs, line)?,
                rt: parse_register(rt, line)?,
            }
        }
        OperandForm::JumpRegister => {
            let [rs] = expect_operands(mnemonic, &operands, line)?;
            InstructionArgs::JumpRegister {
                rs: parse_register(rs, line)?,
            }
        }
        OperandForm::Memory => parse_memory_args(mnemonic, &operands, line)?,
        OperandForm::ArithImmediate => {
            let [rt, rs, imm] = expect_operands(mnemonic, &operands, line)?;
            InstructionArgs::ArithImmediate {
                rt: parse_register(rt, line)?,
                rs: parse_register(rs, line)?,
                imm: parse_number(imm)
                    .ok_or_else(|| bad_operand(imm, line))?,
            }
        }
        OperandForm::Branch => {
            let [rs, rt, target] = expect_operands(mnemonic, &operands, line)?;
            InstructionArgs::Branch {
                rs: parse_register(rs, line)?,
                rt: parse_register(rt, line)?,
                target: parse_branch_target(target, line)?,
            }
        }
        OperandForm::JumpTarget => {
            let [target] = expect_operands(mnemonic, &operands, line)?;
            InstructionArgs::Jump {
                target: parse_jump_target(target, line)?,
            }
        }
    };

    Ok(ParsedInstruction {
        mnemonic: mnemonic.to_ascii_uppercase(),
        spec,
        args,
    })
}

fn expect_operands<'a, const N: usize>(
    mnemonic: &str,
    operands: &[&'a str],
    line: usize,
) -> Result<[&'a str; N], AssembleError> {
    <[&str; N]>::try_from(operands.to_vec()).map_err(|_| {
        AssembleError::new(
            AssembleErrorKind::BadOperand(format!(
                "{mnemonic} takes {N} operand(s), got {}",
                operands.len()
            )),
            line,
        )
    })
}

fn parse_memory_args(
    mnemonic: &str,
    operands: &[&str],
    line: usize,
) -> Result<InstructionArgs, AssembleError> {
    match operands {
        // LW $rt, imm($rs)
        [rt, mem] if mem.contains('(') => {
            let open = mem.find('(').unwrap_or_default();
            let close = mem
                .rfind(')')
                .ok_or_else(|| bad_operand(mem, line))?;
            if close < open {
                return Err(bad_operand(mem, line));
            }
            let offset_text = mem[..open].trim();
            let imm = if offset_text.is_empty() {
                0
            } else {
                parse_number(offset_text).ok_or_else(|| bad_operand(mem, line))?
            };
            Ok(InstructionArgs::Memory {
                rt: parse_register(rt, line)?,
                rs: parse_register(mem[open + 1..close].trim(), line)?,
                imm,
            })
        }
        // LW $rt, $rs, imm
        [rt, rs, imm] => Ok(InstructionArgs::Memory {
            rt: parse_register(rt, line)?,
            rs: parse_register(rs, line)?,
            imm: parse_number(imm).ok_or_else(|| bad_operand(imm, line))?,
        }),
        _ => Err(AssembleError::new(
            AssembleErrorKind::BadOperand(format!("{mnemonic} takes $rt, imm($rs)")),
            line,
        )),
    }
}

fn parse_register(text: &str, line: usize) -> Result<u8, AssembleError> {
    let name = text.trim().to_ascii_lowercase();
    let name = name.strip_prefix('$').unwrap_or(&name);
    name.strip_prefix('r')
        .and_then(|digits| digits.parse::<u8>().ok())
        .filter(|&n| n <= 7)
        .ok_or_else(|| bad_operand(text, line))
}

fn parse_number(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = text
        .strip_prefix('-')
        .map_or((false, text), |rest| (true, rest));
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_branch_target(text: &str, line: usize) -> Result<BranchTarget, AssembleError> {
    if let Some(offset) = parse_number(text) {
        Ok(BranchTarget::Offset(offset))
    } else if is_identifier(text) {
        Ok(BranchTarget::Label(text.to_owned()))
    } else {
        Err(bad_operand(text, line))
    }
}

fn parse_jump_target(text: &str, line: usize) -> Result<JumpTarget, AssembleError> {
    if let Some(address) = parse_number(text) {
        Ok(JumpTarget::Address(address))
    } else if is_identifier(text) {
        Ok(JumpTarget::Label(text.to_owned()))
    } else {
        Err(bad_operand(text, line))
    }
}

fn bad_operand(text: &str, line: usize) -> AssembleError {
    AssembleError::new(AssembleErrorKind::BadOperand(text.trim().to_owned()), line)
}

#[cfg(test)]
mod tests {
    use super::{parse_line, BranchTarget, InstructionArgs, JumpTarget};
    use crate::errors::AssembleErrorKind;

    #[test]
    fn blank_and_comment_lines_parse_to_nothing() {
        for line in ["", "   ", "# comment", "; comment", "// comment", "  # x"] {
            let parsed = parse_line(line, 1).expect("parses");
            assert!(parsed.label.is_none());
            assert!(parsed.instruction.is_none());
        }
    }

    #[test]
    fn labels_may_stand_alone_or_prefix_an_instruction() {
        let parsed = parse_line("loop:", 1).expect("parses");
        assert_eq!(parsed.label.as_deref(), Some("loop"));
        assert!(parsed.instruction.is_none());

        let parsed = parse_line("end: ADDI $r1, $r0, 1", 1).expect("parses");
        assert_eq!(parsed.label.as_deref(), Some("end"));
        assert!(parsed.instruction.is_some());
    }

    #[test]
    fn three_register_operands_parse_in_rd_rs_rt_order() {
        let parsed = parse_line("ADD $r3, $r1, $r2", 1).expect("parses");
        let instr = parsed.instruction.expect("instruction");
        assert_eq!(
            instr.args,
            InstructionArgs::ThreeRegister { rd: 3, rs: 1, rt: 2 }
        );
    }

    #[test]
    fn registers_accept_lowercase_and_a_missing_dollar() {
        let parsed = parse_line("add r3, $R1, r2", 1).expect("parses");
        let instr = parsed.instruction.expect("instruction");
        assert_eq!(instr.mnemonic, "ADD");
        assert_eq!(
            instr.args,
            InstructionArgs::ThreeRegister { rd: 3, rs: 1, rt: 2 }
        );
    }

    #[test]
    fn both_memory_operand_spellings_parse() {
        let displacement = parse_line("LW $r2, 4($r1)", 1)
            .expect("parses")
            .instruction
            .expect("instruction");
        let three_operand = parse_line("LW $r2, $r1, 4", 1)
            .expect("parses")
            .instruction
            .expect("instruction");
        assert_eq!(displacement.args, three_operand.args);
        assert_eq!(
            displacement.args,
            InstructionArgs::Memory { rt: 2, rs: 1, imm: 4 }
        );
    }

    #[test]
    fn negative_and_hex_immediates_parse() {
        let parsed = parse_line("ADDI $r1, $r0, -5", 1).expect("parses");
        let InstructionArgs::ArithImmediate { imm, .. } =
            parsed.instruction.expect("instruction").args
        else {
            panic!("expected arith immediate");
        };
        assert_eq!(imm, -5);

        let parsed = parse_line("ADDI $r1, $r0, 0x1F", 1).expect("parses");
        let InstructionArgs::ArithImmediate { imm, .. } =
            parsed.instruction.expect("instruction").args
        else {
            panic!("expected arith immediate");
        };
        assert_eq!(imm, 31);
    }

    #[test]
    fn branch_targets_may_be_labels_or_offsets() {
        let parsed = parse_line("BEQ $r1, $r2, loop", 1).expect("parses");
        let InstructionArgs::Branch { target, .. } = parsed.instruction.expect("i").args else {
            panic!("expected branch");
        };
        assert_eq!(target, BranchTarget::Label("loop".to_owned()));

        let parsed = parse_line("BNE $r1, $r2, -2", 1).expect("parses");
        let InstructionArgs::Branch { target, .. } = parsed.instruction.expect("i").args else {
            panic!("expected branch");
        };
        assert_eq!(target, BranchTarget::Offset(-2));
    }

    #[test]
    fn jump_targets_may_be_labels_or_addresses() {
        let parsed = parse_line("JAL subroutine", 1).expect("parses");
        let InstructionArgs::Jump { target } = parsed.instruction.expect("i").args else {
            panic!("expected jump");
        };
        assert_eq!(target, JumpTarget::Label("subroutine".to_owned()));

        let parsed = parse_line("JUMP 0x10", 1).expect("parses");
        let InstructionArgs::Jump { target } = parsed.instruction.expect("i").args else {
            panic!("expected jump");
        };
        assert_eq!(target, JumpTarget::Address(16));
    }

    #[test]
    fn unknown_mnemonics_error_with_the_line_number() {
        let error = parse_line("FROB $r1", 7).expect_err("must fail");
        assert_eq!(error.line, 7);
        assert_eq!(
            error.kind,
            AssembleErrorKind::UnknownMnemonic("FROB".to_owned())
        );
    }

    #[test]
    fn wrong_operand_counts_and_bad_registers_are_bad_operands() {
        let error = parse_line("ADD $r1, $r2", 2).expect_err("must fail");
        assert!(matches!(error.kind, AssembleErrorKind::BadOperand(_)));

        let error = parse_line("ADD $r8, $r1, $r2", 3).expect_err("must fail");
        assert!(matches!(error.kind, AssembleErrorKind::BadOperand(_)));

        let error = parse_line("JR $rx", 4).expect_err("must fail");
        assert!(matches!(error.kind, AssembleErrorKind::BadOperand(_)));
    }

    #[test]
    fn malformed_memory_operands_are_rejected() {
        let error = parse_line("LW $r1, 4($r2", 5).expect_err("must fail");
        assert!(matches!(error.kind, AssembleErrorKind::BadOperand(_)));
    }
}
