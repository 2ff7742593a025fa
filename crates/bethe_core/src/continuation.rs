//! Natural-parameter continuation along a sampled complex path.
//!
//! Every point of the path is solved with the Newton corrector, seeded with the root vector
//! converged at the previous point (the seed itself for the first point). The path must be sampled
//! finely enough for consecutive roots to stay inside each other's basin of attraction; branch
//! jumps are not detected.

use anyhow::{bail, Context, Result};
use log::info;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::equations::BetheEquations;
use crate::error::SolverError;
use crate::newton::{newton_correct, NewtonResult, NewtonSettings};
use crate::traits::RootSystem;

/// Root trajectories of one continuation run.
///
/// `components[k][s]` is the value of root component `k` at path step `s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub components: Vec<Vec<Complex64>>,
    /// Path steps at which the corrector ran out of iterations.
    #[serde(default)]
    pub unconverged_steps: Vec<usize>,
}

impl Trajectory {
    fn from_steps(steps: &[Vec<Complex64>], dim: usize, unconverged_steps: Vec<usize>) -> Self {
        let components = (0..dim)
            .map(|k| steps.iter().map(|roots| roots[k]).collect())
            .collect();
        Self {
            components,
            unconverged_steps,
        }
    }

    /// Number of root components (M).
    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    /// Number of path steps (K).
    pub fn len(&self) -> usize {
        self.components.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn component(&self, k: usize) -> Option<&[Complex64]> {
        self.components.get(k).map(Vec::as_slice)
    }

    /// Root vector at path index `step`.
    pub fn roots_at(&self, step: usize) -> Option<Vec<Complex64>> {
        if step >= self.len() {
            return None;
        }
        Some(self.components.iter().map(|c| c[step]).collect())
    }

    /// Roots at the first path point.
    pub fn start(&self) -> Option<Vec<Complex64>> {
        self.roots_at(0)
    }

    /// Roots at the last path point; the natural seed for a following path segment.
    pub fn end(&self) -> Option<Vec<Complex64>> {
        self.len().checked_sub(1).and_then(|last| self.roots_at(last))
    }

    pub fn converged(&self) -> bool {
        self.unconverged_steps.is_empty()
    }
}

fn continuation_step<S: RootSystem + ?Sized>(
    system: &S,
    guess: &[Complex64],
    step: usize,
    q: Complex64,
    settings: &NewtonSettings,
) -> Result<NewtonResult> {
    newton_correct(system, guess, q, settings)
        .with_context(|| format!("Continuation step {step} (q = {q}) failed."))
}

fn check_seed(seed: &[Complex64]) -> Result<()> {
    if seed.is_empty() {
        bail!(SolverError::EmptySeed);
    }
    Ok(())
}

/// Continues `seed` along `q_path`, returning one trajectory per root component.
pub fn continue_along_path<S: RootSystem + ?Sized>(
    system: &S,
    seed: &[Complex64],
    q_path: &[Complex64],
    settings: &NewtonSettings,
) -> Result<Trajectory> {
    check_seed(seed)?;
    settings.validate()?;
    info!(
        "continuing {} roots along {} path points",
        seed.len(),
        q_path.len()
    );

    let (steps, unconverged) = q_path.iter().enumerate().try_fold(
        (Vec::<Vec<Complex64>>::with_capacity(q_path.len()), Vec::new()),
        |(mut steps, mut unconverged), (step, &q)| {
            let guess = steps.last().map_or(seed, Vec::as_slice);
            let result = continuation_step(system, guess, step, q, settings)?;
            if !result.converged {
                unconverged.push(step);
            }
            steps.push(result.roots);
            Ok::<_, anyhow::Error>((steps, unconverged))
        },
    )?;

    info!(
        "continuation finished ({} unconverged steps)",
        unconverged.len()
    );
    Ok(Trajectory::from_steps(&steps, seed.len(), unconverged))
}

/// Continues `seed` along `q_path` for the system defined by `config`, using default settings.
pub fn solve_in_q_array(
    seed: &[Complex64],
    q_path: &[Complex64],
    config: &Config,
) -> Result<Trajectory> {
    let system = BetheEquations::new(config)?;
    continue_along_path(&system, seed, q_path, &NewtonSettings::default())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContinuationProgress {
    pub done: bool,
    pub current_step: usize,
    pub total_steps: usize,
}

/// Stepped continuation that can be advanced in batches to report progress.
///
/// Running it to completion yields the same trajectory as [`continue_along_path`].
pub struct ContinuationRunner<S: RootSystem> {
    system: S,
    seed: Vec<Complex64>,
    q_path: Vec<Complex64>,
    settings: NewtonSettings,
    steps: Vec<Vec<Complex64>>,
    unconverged: Vec<usize>,
}

impl<S: RootSystem> ContinuationRunner<S> {
    pub fn new(
        system: S,
        seed: Vec<Complex64>,
        q_path: Vec<Complex64>,
        settings: NewtonSettings,
    ) -> Result<Self> {
        check_seed(&seed)?;
        settings.validate()?;
        Ok(Self {
            system,
            seed,
            steps: Vec::with_capacity(q_path.len()),
            q_path,
            settings,
            unconverged: Vec::new(),
        })
    }

    pub fn is_done(&self) -> bool {
        self.steps.len() >= self.q_path.len()
    }

    pub fn progress(&self) -> ContinuationProgress {
        ContinuationProgress {
            done: self.is_done(),
            current_step: self.steps.len(),
            total_steps: self.q_path.len(),
        }
    }

    /// Advances by at most `batch_size` path points. A failed step is not recorded; steps completed
    /// earlier in the same batch are kept.
    pub fn run_steps(&mut self, batch_size: usize) -> Result<ContinuationProgress> {
        for _ in 0..batch_size {
            if self.is_done() {
                break;
            }
            let step = self.steps.len();
            let guess = self.steps.last().unwrap_or(&self.seed);
            let result =
                continuation_step(&self.system, guess, step, self.q_path[step], &self.settings)?;
            if !result.converged {
                self.unconverged.push(step);
            }
            self.steps.push(result.roots);
        }
        Ok(self.progress())
    }

    /// Trajectory over the steps completed so far.
    pub fn take_result(self) -> Trajectory {
        Trajectory::from_steps(&self.steps, self.seed.len(), self.unconverged)
    }
}
