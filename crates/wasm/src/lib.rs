//! Browser host bridge: the session facade behind `wasm-bindgen`.
//!
//! Every operation returns a JSON-shaped envelope: `{success: true, ...}`
//! with the operation's payload, or `{success: false, error, line?}` on
//! failure. The transport stays oblivious to the core's types; everything
//! crosses the boundary through `serde-wasm-bindgen`.

use ripple_core::CpuView;
use ripple_session::{Session, SessionError, DEFAULT_RUN_CYCLE_LIMIT};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format!($($t)*)))
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
}

#[derive(Serialize)]
struct AssembleEnvelope {
    success: bool,
    machine_code: Vec<ripple_session::MachineCodeRow>,
    labels: std::collections::BTreeMap<String, u16>,
    cpu_state: CpuView,
}

#[derive(Serialize)]
struct StepEnvelope {
    success: bool,
    running: bool,
    can_step_back: bool,
    cpu_state: CpuView,
}

#[derive(Serialize)]
struct RunEnvelope {
    success: bool,
    running: bool,
    cycles_executed: u64,
    can_step_back: bool,
    cpu_state: CpuView,
}

#[derive(Serialize)]
struct StepBackEnvelope {
    success: bool,
    can_step_back: bool,
    cpu_state: CpuView,
}

#[derive(Serialize)]
struct ResetEnvelope {
    success: bool,
    cpu_state: CpuView,
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn error_envelope(error: &SessionError) -> JsValue {
    let line = match error {
        SessionError::Assemble(assemble_error) => Some(assemble_error.line),
        _ => None,
    };
    to_js(&ErrorEnvelope {
        success: false,
        error: error.to_string(),
        line,
    })
}

/// A Ripple-16 simulator session owned by the host page.
#[wasm_bindgen]
pub struct WasmSimulator {
    session: Session,
}

impl Default for WasmSimulator {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmSimulator {
    /// Creates an empty session.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        Self {
            session: Session::new(),
        }
    }

    /// Assembles source text, loads the program, and returns the listing
    /// plus the initial CPU state.
    pub fn assemble(&mut self, code: &str) -> JsValue {
        match self.session.assemble(code) {
            Ok(outcome) => {
                console_log!("assembled {} instructions", outcome.machine_code.len());
                to_js(&AssembleEnvelope {
                    success: true,
                    machine_code: outcome.machine_code,
                    labels: outcome.labels,
                    cpu_state: outcome.cpu_state,
                })
            }
            Err(error) => error_envelope(&error),
        }
    }

    /// Executes one clock cycle.
    pub fn step(&mut self) -> JsValue {
        match self.session.step() {
            Ok(outcome) => to_js(&StepEnvelope {
                success: true,
                running: outcome.running,
                can_step_back: outcome.can_step_back,
                cpu_state: outcome.cpu_state,
            }),
            Err(error) => error_envelope(&error),
        }
    }

    /// Runs until the program halts or a cycle limit is reached
    /// (default 1000 when `max_cycles` is omitted).
    pub fn run(&mut self, max_cycles: Option<u32>) -> JsValue {
        let limit = max_cycles.map_or(DEFAULT_RUN_CYCLE_LIMIT, u64::from);
        match self.session.run(limit) {
            Ok(outcome) => {
                console_log!("ran {} cycles", outcome.cycles_executed);
                to_js(&RunEnvelope {
                    success: true,
                    running: outcome.running,
                    cycles_executed: outcome.cycles_executed,
                    can_step_back: outcome.can_step_back,
                    cpu_state: outcome.cpu_state,
                })
            }
            Err(error) => error_envelope(&error),
        }
    }

    /// Restores the previous cycle's state.
    pub fn step_back(&mut self) -> JsValue {
        match self.session.step_back() {
            Ok(outcome) => to_js(&StepBackEnvelope {
                success: true,
                can_step_back: outcome.can_step_back,
                cpu_state: outcome.cpu_state,
            }),
            Err(error) => error_envelope(&error),
        }
    }

    /// Zeroes the CPU while keeping the loaded program.
    pub fn reset(&mut self) -> JsValue {
        match self.session.reset() {
            Ok(outcome) => to_js(&ResetEnvelope {
                success: true,
                cpu_state: outcome.cpu_state,
            }),
            Err(error) => error_envelope(&error),
        }
    }

    /// True when a snapshot is available to step back to.
    #[must_use]
    pub fn can_step_back(&self) -> bool {
        self.session.can_step_back()
    }

    /// The register file as a typed array, cheaper than a full state
    /// snapshot for per-frame register displays.
    #[must_use]
    pub fn registers(&self) -> js_sys::Uint16Array {
        js_sys::Uint16Array::from(self.session.cpu().registers().snapshot().as_slice())
    }
}
