//! Stepped continuation runner.

use crate::system::{build_system, decode, decode_settings, encode, solver_error};
use bethe_core::{BetheEquations, ContinuationRunner};
use num_complex::Complex64;
use wasm_bindgen::prelude::*;

/// WASM-exported runner for stepped continuation of one seed.
/// Allows progress reporting by running batches of path points at a time.
#[wasm_bindgen]
pub struct WasmContinuationRunner {
    runner: Option<ContinuationRunner<BetheEquations>>,
}

#[wasm_bindgen]
impl WasmContinuationRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        settings: JsValue,
        seed: JsValue,
        q_path: JsValue,
    ) -> Result<WasmContinuationRunner, JsValue> {
        console_error_panic_hook::set_once();

        let system = build_system(config)?;
        let settings = decode_settings(settings)?;
        let seed: Vec<Complex64> = decode(seed, "seed")?;
        let q_path: Vec<Complex64> = decode(q_path, "parameter path")?;

        let runner = ContinuationRunner::new(system, seed, q_path, settings)
            .map_err(|e| solver_error("Continuation init failed", e))?;

        Ok(WasmContinuationRunner {
            runner: Some(runner),
        })
    }

    pub fn is_done(&self) -> bool {
        self.runner.as_ref().map_or(true, |runner| runner.is_done())
    }

    /// Run a batch of continuation steps and return progress.
    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let progress = runner
            .run_steps(batch_size as usize)
            .map_err(|e| solver_error("Continuation step failed", e))?;

        encode(&progress)
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        encode(&runner.progress())
    }

    /// Get the trajectory over the completed steps. Consumes the runner.
    pub fn get_result(&mut self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .take()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        encode(&runner.take_result())
    }
}
