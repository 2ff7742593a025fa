//! Core WASM system wrapper and value conversion helpers.

use bethe_core::{
    continue_along_path, newton_correct, trace_seeds_with, BetheEquations, Config,
    NewtonSettings, RootSystem, Seed,
};
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub(crate) fn decode<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

pub(crate) fn decode_settings(value: JsValue) -> Result<NewtonSettings, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(NewtonSettings::default());
    }
    decode(value, "Newton settings")
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

pub(crate) fn solver_error(context: &str, err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{}: {:#}", context, err))
}

pub(crate) fn build_system(config: JsValue) -> Result<BetheEquations, JsValue> {
    let config: Config = decode(config, "config")?;
    BetheEquations::new(&config).map_err(|e| solver_error("Invalid config", e))
}

/// Row-major copy of a complex matrix, the layout JS callers index as `rows[i][j]`.
pub(crate) fn jacobian_rows(matrix: &DMatrix<Complex64>) -> Vec<Vec<Complex64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().cloned().collect())
        .collect()
}

/// Corrector outcome as handed to JS.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CorrectorReport {
    pub roots: Vec<Complex64>,
    pub iterations: usize,
    pub converged: bool,
    pub change: f64,
}

/// Residual system bound to one config and one set of Newton settings.
#[wasm_bindgen]
pub struct WasmBetheSystem {
    system: BetheEquations,
    settings: NewtonSettings,
}

#[wasm_bindgen]
impl WasmBetheSystem {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, settings: JsValue) -> Result<WasmBetheSystem, JsValue> {
        console_error_panic_hook::set_once();

        let system = build_system(config)?;
        let settings = decode_settings(settings)?;
        settings
            .validate()
            .map_err(|e| solver_error("Invalid Newton settings", e))?;

        Ok(WasmBetheSystem { system, settings })
    }

    /// Residuals at `roots` (array of `[re, im]`) and parameter `q` (`[re, im]`).
    pub fn eqns(&self, roots: JsValue, q: JsValue) -> Result<JsValue, JsValue> {
        let roots: Vec<Complex64> = decode(roots, "roots")?;
        let q: Complex64 = decode(q, "parameter")?;
        let mut out = vec![Complex64::new(0.0, 0.0); roots.len()];
        self.system.residual(&roots, q, &mut out);
        encode(&out)
    }

    /// Jacobian rows at `roots` and `q`.
    pub fn eqnsd(&self, roots: JsValue, q: JsValue) -> Result<JsValue, JsValue> {
        let roots: Vec<Complex64> = decode(roots, "roots")?;
        let q: Complex64 = decode(q, "parameter")?;
        encode(&jacobian_rows(&self.system.jacobian(&roots, q)))
    }

    pub fn solve_in_q(&self, seed: JsValue, q: JsValue) -> Result<JsValue, JsValue> {
        let seed: Vec<Complex64> = decode(seed, "seed")?;
        let q: Complex64 = decode(q, "parameter")?;
        let result = newton_correct(&self.system, &seed, q, &self.settings)
            .map_err(|e| solver_error("Newton solve failed", e))?;
        encode(&CorrectorReport {
            roots: result.roots,
            iterations: result.iterations,
            converged: result.converged,
            change: result.change,
        })
    }

    pub fn solve_in_q_array(&self, seed: JsValue, q_path: JsValue) -> Result<JsValue, JsValue> {
        let seed: Vec<Complex64> = decode(seed, "seed")?;
        let q_path: Vec<Complex64> = decode(q_path, "parameter path")?;
        let trajectory = continue_along_path(&self.system, &seed, &q_path, &self.settings)
            .map_err(|e| solver_error("Continuation failed", e))?;
        encode(&trajectory)
    }

    /// Continues every seed (`[{ name, roots }]`) along `q_path`; failures are reported per seed.
    pub fn trace_seeds(&self, seeds: JsValue, q_path: JsValue) -> Result<JsValue, JsValue> {
        let seeds: Vec<Seed> = decode(seeds, "seeds")?;
        let q_path: Vec<Complex64> = decode(q_path, "parameter path")?;
        encode(&trace_seeds_with(&self.system, &seeds, &q_path, &self.settings))
    }
}
