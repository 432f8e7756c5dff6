//! Assembled program representation: instruction records with source
//! mapping, display forms, and the label symbol table.

use std::collections::BTreeMap;

use crate::disasm::disassemble;
use crate::encoding::{opcode_bits, InstrFormat, Opcode};

/// One assembled instruction: its word address, raw encoding, display
/// strings, originating source line, and format tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionRecord {
    /// Word address in instruction memory.
    pub address: u16,
    /// The 16-bit encoding.
    pub raw: u16,
    /// Four-digit uppercase hex form of the encoding.
    pub hex: String,
    /// Sixteen-character binary form of the encoding, MSB first.
    pub binary: String,
    /// The trimmed source line this instruction was assembled from.
    pub source: String,
    /// Canonical disassembly of the encoding.
    pub disasm: String,
    /// Instruction format tag.
    pub format: InstrFormat,
}

impl InstructionRecord {
    /// Builds a record for an encoded word, deriving the display forms.
    #[must_use]
    pub fn new(address: u16, raw: u16, source: impl Into<String>, format: InstrFormat) -> Self {
        Self {
            address,
            raw,
            hex: format!("{raw:04X}"),
            binary: format!("{raw:016b}"),
            source: source.into(),
            disasm: disassemble(raw),
            format,
        }
    }
}

/// A fully assembled program: records in address order plus the label map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Program {
    /// Instruction records in address order.
    pub records: Vec<InstructionRecord>,
    /// Labels mapped to the word address of the following instruction.
    pub symbols: BTreeMap<String, u16>,
}

impl Program {
    /// Builds a program directly from encoded words, with no source text or
    /// labels. Used by tests, the fuzzer, and embedding hosts that bring
    /// their own machine code.
    #[must_use]
    pub fn from_words(words: &[u16]) -> Self {
        let records = words
            .iter()
            .enumerate()
            .map(|(address, &raw)| {
                let format = Opcode::from_u4(opcode_bits(raw))
                    .map_or(InstrFormat::R, Opcode::format);
                InstructionRecord::new(address as u16, raw, "", format)
            })
            .collect();
        Self {
            records,
            symbols: BTreeMap::new(),
        }
    }

    /// Returns the encodings in address order.
    #[must_use]
    pub fn words(&self) -> Vec<u16> {
        self.records.iter().map(|record| record.raw).collect()
    }

    /// Number of assembled instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the program contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{InstructionRecord, Program};
    use crate::encoding::{encode_i_type, InstrFormat, Opcode};

    #[test]
    fn record_derives_hex_binary_and_disasm() {
        let raw = encode_i_type(Opcode::Addi, 0, 1, 5);
        let record = InstructionRecord::new(0, raw, "ADDI $r1, $r0, 5", InstrFormat::I);

        assert_eq!(record.hex, "3045");
        assert_eq!(record.binary, "0011000001000101");
        assert_eq!(record.binary.len(), 16);
        assert_eq!(record.disasm, "ADDI $r1,$r0,5");
        assert_eq!(record.format, InstrFormat::I);
    }

    #[test]
    fn from_words_assigns_sequential_addresses() {
        let program = Program::from_words(&[0x0000, 0x3045]);
        assert_eq!(program.len(), 2);
        assert_eq!(program.records[0].address, 0);
        assert_eq!(program.records[1].address, 1);
        assert_eq!(program.words(), vec![0x0000, 0x3045]);
    }

    #[test]
    fn empty_program_reports_empty() {
        assert!(Program::default().is_empty());
        assert!(!Program::from_words(&[0]).is_empty());
    }
}
