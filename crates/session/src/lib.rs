//! Stateful session facade for the Ripple-16 simulator.
//!
//! A [`Session`] owns the loaded program, the live CPU, and the snapshot
//! history, and exposes the observer operations: assemble, step, run,
//! step-back, and reset. Every operation is synchronous and atomic: it
//! either completes and returns a deep-copied view or fails with a typed
//! error leaving the state untouched. The facade assumes mutually
//! exclusive entry; a concurrent host must serialize access around it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ripple_asm::{assemble, AssembleError};
use ripple_core::{Cpu, CpuView, InstructionRecord, Program, StepError};

/// Operation failures surfaced to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Assembly failed; carries the offending line.
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    /// Step or reset was requested before any program was assembled.
    #[error("no program loaded")]
    NoProgram,
    /// Step-back was requested with an empty history.
    #[error("no history to step back to")]
    NoHistory,
    /// Step was requested after the pipeline drained.
    #[error("execution has halted")]
    Halted,
}

impl From<StepError> for SessionError {
    fn from(error: StepError) -> Self {
        match error {
            StepError::Halted => Self::Halted,
        }
    }
}

/// One row of the assembled machine-code listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MachineCodeRow {
    /// Word address.
    pub address: u16,
    /// Four-digit uppercase hex encoding.
    pub hex: String,
    /// Sixteen-character binary encoding.
    pub binary: String,
    /// Originating source line.
    pub source: String,
    /// Canonical disassembly.
    pub disasm: String,
    /// Format tag: `'R'`, `'I'`, or `'J'`.
    pub format: char,
}

impl MachineCodeRow {
    fn from_record(record: &InstructionRecord) -> Self {
        Self {
            address: record.address,
            hex: record.hex.clone(),
            binary: record.binary.clone(),
            source: record.source.clone(),
            disasm: record.disasm.clone(),
            format: record.format.tag(),
        }
    }
}

/// Successful assemble result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssembleOutcome {
    /// The machine-code listing in address order.
    pub machine_code: Vec<MachineCodeRow>,
    /// Labels mapped to word addresses.
    pub labels: BTreeMap<String, u16>,
    /// The freshly initialized CPU state.
    pub cpu_state: CpuView,
}

/// Successful step result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StepOutcome {
    /// False on the edge that drained the pipeline.
    pub running: bool,
    /// True when at least one snapshot is available to step back to.
    pub can_step_back: bool,
    /// The post-step CPU state.
    pub cpu_state: CpuView,
}

/// Successful run-to-completion result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunOutcome {
    /// False when the pipeline drained; true when the cycle limit stopped
    /// the run first.
    pub running: bool,
    /// Cycles executed by this call.
    pub cycles_executed: u64,
    /// True when at least one snapshot is available to step back to.
    pub can_step_back: bool,
    /// The final CPU state.
    pub cpu_state: CpuView,
}

/// Successful step-back result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StepBackOutcome {
    /// True when further snapshots remain.
    pub can_step_back: bool,
    /// The restored CPU state.
    pub cpu_state: CpuView,
}

/// Successful reset result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResetOutcome {
    /// The zeroed CPU state (program retained).
    pub cpu_state: CpuView,
}

/// Cycle safety limit applied when a [`Session::run`] caller does not
/// supply one.
pub const DEFAULT_RUN_CYCLE_LIMIT: u64 = 1000;

/// The session: loaded program, live CPU, and snapshot history.
#[derive(Debug, Clone, Default)]
pub struct Session {
    program: Option<Program>,
    cpu: Cpu,
    history: Vec<Cpu>,
}

impl Session {
    /// An empty session with nothing loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles `source`, replaces the loaded program, rebuilds the CPU,
    /// and clears history.
    ///
    /// # Errors
    ///
    /// Returns the assembler's error (with its source line) and leaves the
    /// previous program, CPU, and history untouched.
    pub fn assemble(&mut self, source: &str) -> Result<AssembleOutcome, SessionError> {
        let program = assemble(source)?;

        self.cpu = Cpu::with_program(&program);
        self.history.clear();

        let outcome = AssembleOutcome {
            machine_code: program.records.iter().map(MachineCodeRow::from_record).collect(),
            labels: program.symbols.clone(),
            cpu_state: CpuView::from_cpu(&self.cpu),
        };
        self.program = Some(program);
        Ok(outcome)
    }

    /// Advances the CPU one cycle, pushing the pre-step snapshot.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoProgram`] before any assemble and
    /// [`SessionError::Halted`] after the pipeline drains; the state is
    /// unchanged on error.
    pub fn step(&mut self) -> Result<StepOutcome, SessionError> {
        if self.program.is_none() {
            return Err(SessionError::NoProgram);
        }

        let snapshot = self.cpu.clone();
        let running = self.cpu.step()?;
        self.history.push(snapshot);

        Ok(StepOutcome {
            running,
            can_step_back: true,
            cpu_state: CpuView::from_cpu(&self.cpu),
        })
    }

    /// Runs until the pipeline drains or `max_cycles` cycles have
    /// executed, pushing one snapshot per cycle so every intermediate
    /// state remains reachable through [`Session::step_back`].
    ///
    /// # Errors
    ///
    /// [`SessionError::NoProgram`] before any assemble and
    /// [`SessionError::Halted`] when the pipeline had already drained
    /// before the call; the state is unchanged on error.
    pub fn run(&mut self, max_cycles: u64) -> Result<RunOutcome, SessionError> {
        if self.program.is_none() {
            return Err(SessionError::NoProgram);
        }

        let mut cycles_executed = 0;
        let mut running = true;
        while running && cycles_executed < max_cycles {
            let snapshot = self.cpu.clone();
            running = self.cpu.step()?;
            self.history.push(snapshot);
            cycles_executed += 1;
        }

        Ok(RunOutcome {
            running,
            cycles_executed,
            can_step_back: !self.history.is_empty(),
            cpu_state: CpuView::from_cpu(&self.cpu),
        })
    }

    /// Restores the most recent snapshot and discards it.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoHistory`] when no snapshot is available.
    pub fn step_back(&mut self) -> Result<StepBackOutcome, SessionError> {
        let snapshot = self.history.pop().ok_or(SessionError::NoHistory)?;
        self.cpu = snapshot;

        Ok(StepBackOutcome {
            can_step_back: !self.history.is_empty(),
            cpu_state: CpuView::from_cpu(&self.cpu),
        })
    }

    /// Zeroes architectural state and clears history, retaining the
    /// loaded program.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoProgram`] when nothing has been assembled yet.
    pub fn reset(&mut self) -> Result<ResetOutcome, SessionError> {
        if self.program.is_none() {
            return Err(SessionError::NoProgram);
        }

        self.cpu.reset();
        self.history.clear();

        Ok(ResetOutcome {
            cpu_state: CpuView::from_cpu(&self.cpu),
        })
    }

    /// True when at least one snapshot is available to step back to.
    #[must_use]
    pub fn can_step_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// The live CPU, for read-only inspection.
    #[must_use]
    pub const fn cpu(&self) -> &Cpu {
        &self.cpu
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionError};

    const DEMO: &str = "ADDI $r1, $r0, 5\nADDI $r2, $r0, 7\nADD $r3, $r1, $r2\n";

    #[test]
    fn step_before_assemble_is_no_program() {
        let mut session = Session::new();
        assert_eq!(session.step().unwrap_err(), SessionError::NoProgram);
        assert_eq!(session.run(10).unwrap_err(), SessionError::NoProgram);
        assert_eq!(session.reset().unwrap_err(), SessionError::NoProgram);
    }

    #[test]
    fn assemble_returns_listing_and_fresh_state() {
        let mut session = Session::new();
        let outcome = session.assemble(DEMO).expect("assembles");
        assert_eq!(outcome.machine_code.len(), 3);
        assert_eq!(outcome.machine_code[0].hex, "3045");
        assert_eq!(outcome.machine_code[0].format, 'I');
        assert_eq!(outcome.cpu_state.cycle, 0);
        assert!(!session.can_step_back());
    }

    #[test]
    fn failed_assembly_leaves_the_previous_program_runnable() {
        let mut session = Session::new();
        session.assemble(DEMO).expect("assembles");
        session.step().expect("steps");

        let error = session.assemble("BOGUS $r1\n").unwrap_err();
        assert!(matches!(error, SessionError::Assemble(_)));

        // The old program and its history are still live.
        assert!(session.can_step_back());
        assert_eq!(session.cpu().cycle(), 1);
        session.step().expect("old program still steps");
    }

    #[test]
    fn run_executes_to_halt_and_records_every_cycle() {
        let mut session = Session::new();
        session.assemble(DEMO).expect("assembles");

        let outcome = session
            .run(super::DEFAULT_RUN_CYCLE_LIMIT)
            .expect("runs to halt");
        assert!(!outcome.running);
        assert_eq!(outcome.cycles_executed, session.cpu().cycle());
        assert_eq!(outcome.cpu_state.registers[3], 12);
        assert!(outcome.can_step_back);
    }

    #[test]
    fn run_stops_at_the_cycle_limit() {
        let mut session = Session::new();
        session.assemble(DEMO).expect("assembles");

        let outcome = session.run(2).expect("runs");
        assert!(outcome.running);
        assert_eq!(outcome.cycles_executed, 2);
        assert_eq!(session.cpu().cycle(), 2);
    }

    #[test]
    fn run_after_halt_is_rejected() {
        let mut session = Session::new();
        session.assemble(DEMO).expect("assembles");
        session.run(super::DEFAULT_RUN_CYCLE_LIMIT).expect("runs");

        assert_eq!(session.run(10).unwrap_err(), SessionError::Halted);
    }

    #[test]
    fn step_back_pops_one_snapshot_at_a_time() {
        let mut session = Session::new();
        session.assemble(DEMO).expect("assembles");
        session.step().expect("steps");
        session.step().expect("steps");

        let outcome = session.step_back().expect("steps back");
        assert!(outcome.can_step_back);
        let outcome = session.step_back().expect("steps back");
        assert!(!outcome.can_step_back);
        assert_eq!(session.step_back().unwrap_err(), SessionError::NoHistory);
    }
}
