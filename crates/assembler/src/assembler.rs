//! Top-level two-pass assembler pipeline.
//!
//! 1. Parse every source line into labels and instructions.
//! 2. **Pass 1**: assign word addresses and build the symbol table.
//! 3. **Pass 2**: encode each instruction, resolving label references.
//!
//! The output is a [`Program`]: instruction records with address, encoding,
//! hex/binary display forms, originating source text, and canonical
//! disassembly, plus the symbol table. Assembly is deterministic and stops
//! at the first error.

use ripple_core::{InstructionRecord, Program};

use crate::encoder::encode_instruction;
use crate::errors::AssembleError;
use crate::parser::parse_line;
use crate::symbols::assign_addresses;

/// Assembles source text into a [`Program`].
///
/// # Errors
///
/// Returns the first [`AssembleError`] encountered, tagged with its
/// 1-indexed source line.
pub fn assemble(source: &str) -> Result<Program, AssembleError> {
    let mut lines = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let line_number = index + 1;
        let parsed = parse_line(text, line_number)?;
        lines.push((line_number, text.to_owned(), parsed));
    }

    let assignment = assign_addresses(&lines)?;

    let mut records = Vec::with_capacity(assignment.instructions.len());
    for assigned in &assignment.instructions {
        let word = encode_instruction(
            &assigned.instruction,
            &assignment.symbols,
            assigned.address,
            assigned.line,
        )?;
        records.push(InstructionRecord::new(
            assigned.address,
            word,
            assigned.source.clone(),
            assigned.instruction.spec.kind.format(),
        ));
    }

    Ok(Program {
        records,
        symbols: assignment.symbols.into_map(),
    })
}

#[cfg(test)]
mod tests {
    use super::assemble;
    use crate::errors::AssembleErrorKind;
    use ripple_core::InstrFormat;

    #[test]
    fn a_small_program_assembles_with_source_mapping() {
        let program = assemble(
            "# demo\n\
             ADDI $r1, $r0, 5\n\
             ADDI $r2, $r0, 3\n\
             ADD $r3, $r1, $r2\n",
        )
        .expect("assembles");

        assert_eq!(program.len(), 3);
        assert_eq!(program.records[0].address, 0);
        assert_eq!(program.records[0].hex, "3045");
        assert_eq!(program.records[0].source, "ADDI $r1, $r0, 5");
        assert_eq!(program.records[0].disasm, "ADDI $r1,$r0,5");
        assert_eq!(program.records[0].format, InstrFormat::I);
        assert_eq!(program.records[2].format, InstrFormat::R);
    }

    #[test]
    fn labels_resolve_across_the_program() {
        let program = assemble(
            "ADDI $r1, $r0, 5\n\
             BEQ $r1, $r0, end\n\
             ADDI $r2, $r0, 9\n\
             end: ADDI $r3, $r0, 1\n",
        )
        .expect("assembles");

        assert_eq!(program.symbols.get("end"), Some(&3));
        // Branch at address 1: offset = 3 - (1 + 1) = 1.
        assert_eq!(program.records[1].raw & 0x3F, 1);
    }

    #[test]
    fn errors_carry_the_offending_line() {
        let error = assemble("ADDI $r1, $r0, 5\nFROB $r1\n").expect_err("must fail");
        assert_eq!(error.line, 2);
        assert_eq!(
            error.kind,
            AssembleErrorKind::UnknownMnemonic("FROB".to_owned())
        );
    }

    #[test]
    fn assembly_failure_produces_no_partial_program() {
        assert!(assemble("ADDI $r1, $r0, 99\n").is_err());
    }

    #[test]
    fn empty_source_assembles_to_an_empty_program() {
        let program = assemble("# only comments\n\n").expect("assembles");
        assert!(program.is_empty());
        assert!(program.symbols.is_empty());
    }
}
