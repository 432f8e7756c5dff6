//! Pass 1: address assignment and symbol table construction.

use std::collections::BTreeMap;

use ripple_core::IMEM_WORDS;

use crate::errors::{AssembleError, AssembleErrorKind};
use crate::parser::{ParsedInstruction, ParsedLine};

/// Labels mapped to the word address of the instruction that follows them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolTable {
    labels: BTreeMap<String, u16>,
}

impl SymbolTable {
    /// Defines a label.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateLabel` when the name is already defined.
    pub fn define(&mut self, name: &str, address: u16, line: usize) -> Result<(), AssembleError> {
        if self.labels.contains_key(name) {
            return Err(AssembleError::new(
                AssembleErrorKind::DuplicateLabel(name.to_owned()),
                line,
            ));
        }
        self.labels.insert(name.to_owned(), address);
        Ok(())
    }

    /// Looks up a label's address.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.labels.get(name).copied()
    }

    /// Consumes the table into its underlying map.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, u16> {
        self.labels
    }
}

/// An instruction with its assigned address and source context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedInstruction {
    /// Word address in instruction memory.
    pub address: u16,
    /// 1-indexed source line.
    pub line: usize,
    /// The trimmed source text, kept for the instruction record.
    pub source: String,
    /// The parsed instruction.
    pub instruction: ParsedInstruction,
}

/// Output of pass 1: addressed instructions plus the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    /// Instructions in address order.
    pub instructions: Vec<AssignedInstruction>,
    /// The completed symbol table.
    pub symbols: SymbolTable,
}

/// Walks parsed lines in order, assigning one word address per instruction
/// and binding each label to the address of the instruction that follows.
///
/// # Errors
///
/// Returns `DuplicateLabel` for a label defined twice and
/// `TooManyInstructions` when the program exceeds instruction memory.
pub fn assign_addresses(
    lines: &[(usize, String, ParsedLine)],
) -> Result<Assignment, AssembleError> {
    let mut assignment = Assignment::default();
    let mut address: usize = 0;

    for (line_number, source, parsed) in lines {
        if let Some(label) = &parsed.label {
            assignment
                .symbols
                .define(label, address as u16, *line_number)?;
        }

        if let Some(instruction) = &parsed.instruction {
            if address >= IMEM_WORDS {
                return Err(AssembleError::new(
                    AssembleErrorKind::TooManyInstructions { limit: IMEM_WORDS },
                    *line_number,
                ));
            }
            assignment.instructions.push(AssignedInstruction {
                address: address as u16,
                line: *line_number,
                source: source.trim().to_owned(),
                instruction: instruction.clone(),
            });
            address += 1;
        }
    }

    Ok(assignment)
}
