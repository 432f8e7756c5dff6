//! Typed errors surfaced by the pipeline engine.

use thiserror::Error;

/// Failure of a single-cycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepError {
    /// The pipeline has drained and the PC rests on a NOP; the program is
    /// over and further steps are rejected.
    #[error("execution has halted")]
    Halted,
}
