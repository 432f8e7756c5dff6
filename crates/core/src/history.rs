//! Per-cycle execution records and timeline reconstruction.
//!
//! The engine appends one [`CycleRecord`] per committed clock edge: which
//! instruction each stage worked on, plus a stall flag. A held instruction
//! repeats in the decode column across stall cycles; squashed wrong-path
//! fetches never appear. [`extract_timeline`] folds the records into
//! per-instruction rows for a pipeline diagram.

use std::collections::HashMap;

use crate::disasm::disassemble;
use crate::pipeline::forward::ForwardUse;

/// Stage occupancy for one committed cycle. `None` means the stage worked
/// on a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CycleRecord {
    /// The cycle number (1-based; assigned at commit).
    pub cycle: u64,
    /// Word fetched this cycle, unless the fetch was squashed or frozen.
    pub fetch: Option<u16>,
    /// Word the decode stage worked on (repeats while stalled).
    pub decode: Option<u16>,
    /// Word the execute stage worked on.
    pub execute: Option<u16>,
    /// Word the memory stage worked on.
    pub memory: Option<u16>,
    /// Word the write-back stage retired.
    pub writeback: Option<u16>,
    /// True when the hazard unit asserted a stall this cycle.
    pub stalled: bool,
}

/// Forwarding activity for one cycle in which at least one forward fired.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ForwardRecord {
    /// The cycle number.
    pub cycle: u64,
    /// EX-stage forward into ALU input A.
    pub forward_a: Option<ForwardUse>,
    /// EX-stage forward into ALU input B.
    pub forward_b: Option<ForwardUse>,
    /// ID-stage forwards (branch compare and JR target operands).
    pub id_forwards: Vec<ForwardUse>,
}

impl ForwardRecord {
    /// True when no forward fired this cycle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward_a.is_none() && self.forward_b.is_none() && self.id_forwards.is_empty()
    }
}

/// Stage-by-stage life of one instruction, keyed by its 16-bit encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionTimeline {
    /// The instruction encoding.
    pub raw: u16,
    /// Canonical disassembly (the diagram row label).
    pub disasm: String,
    /// First cycle the instruction occupied IF.
    pub fetch: Option<u64>,
    /// Every cycle it occupied ID; repetition denotes a stall.
    pub decode: Vec<u64>,
    /// Every cycle it occupied EX.
    pub execute: Vec<u64>,
    /// Every cycle it occupied MEM.
    pub memory: Vec<u64>,
    /// First cycle it occupied WB.
    pub writeback: Option<u64>,
    /// Decode cycles during which the hazard unit was stalling it.
    pub stalled_decodes: Vec<u64>,
}

/// Folds cycle records into per-instruction timelines. Instructions are
/// keyed by encoding and emitted in first-appearance order across cycles;
/// identical encodings at different addresses share a row.
#[must_use]
pub fn extract_timeline(records: &[CycleRecord]) -> Vec<InstructionTimeline> {
    let mut rows: Vec<InstructionTimeline> = Vec::new();
    let mut index: HashMap<u16, usize> = HashMap::new();

    let mut row_for = |rows: &mut Vec<InstructionTimeline>, raw: u16| -> usize {
        *index.entry(raw).or_insert_with(|| {
            rows.push(InstructionTimeline {
                raw,
                disasm: disassemble(raw),
                ..InstructionTimeline::default()
            });
            rows.len() - 1
        })
    };

    for record in records {
        // Deepest stage first: the oldest instruction appears first.
        if let Some(raw) = record.writeback {
            let row = row_for(&mut rows, raw);
            rows[row].writeback.get_or_insert(record.cycle);
        }
        if let Some(raw) = record.memory {
            let row = row_for(&mut rows, raw);
            rows[row].memory.push(record.cycle);
        }
        if let Some(raw) = record.execute {
            let row = row_for(&mut rows, raw);
            rows[row].execute.push(record.cycle);
        }
        if let Some(raw) = record.decode {
            let row = row_for(&mut rows, raw);
            rows[row].decode.push(record.cycle);
            if record.stalled {
                rows[row].stalled_decodes.push(record.cycle);
            }
        }
        if let Some(raw) = record.fetch {
            let row = row_for(&mut rows, raw);
            rows[row].fetch.get_or_insert(record.cycle);
        }
    }

    rows
}
