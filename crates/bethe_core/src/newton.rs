use anyhow::{bail, Context, Result};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::complex::{abs_sum, all_finite};
use crate::config::Config;
use crate::embedding::{matrix_complex_to_real, vector_complex_to_real, vector_real_to_complex};
use crate::equations::BetheEquations;
use crate::error::SolverError;
use crate::traits::RootSystem;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonSettings {
    pub max_steps: usize,
    /// Stop once the change of Σ|x_i| between iterations drops below this.
    pub tolerance: f64,
    /// Fraction of the Newton step applied per iteration; 1.0 is the undamped method.
    pub damping: f64,
    /// Treat an exhausted iteration budget as an error instead of returning the last iterate.
    pub require_convergence: bool,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 20,
            tolerance: 1e-10,
            damping: 1.0,
            require_convergence: false,
        }
    }
}

impl NewtonSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            bail!(SolverError::InvalidSettings(
                "max_steps must be greater than zero".to_string()
            ));
        }
        if !(self.tolerance > 0.0) {
            bail!(SolverError::InvalidSettings(
                "tolerance must be positive".to_string()
            ));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            bail!(SolverError::InvalidSettings(
                "damping must lie in (0, 1]".to_string()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewtonResult {
    pub roots: Vec<Complex64>,
    pub iterations: usize,
    pub converged: bool,
    /// Last observed change of Σ|x_i|.
    pub change: f64,
}

/// Newton–Raphson corrector at a fixed parameter value.
///
/// Each iteration solves the real embedding of `J·x = F` and updates `roots ← roots − damping·x`.
/// Iteration stops when Σ|roots_i| changes by less than `settings.tolerance`. Running out of
/// iterations is reported through `NewtonResult::converged`, or as
/// [`SolverError::NotConverged`] when `settings.require_convergence` is set.
pub fn newton_correct<S: RootSystem + ?Sized>(
    system: &S,
    seed: &[Complex64],
    q: Complex64,
    settings: &NewtonSettings,
) -> Result<NewtonResult> {
    let dim = seed.len();
    if dim == 0 {
        bail!(SolverError::EmptySeed);
    }
    settings.validate()?;

    let mut roots = seed.to_vec();
    let mut previous_sum = abs_sum(&roots);
    let mut residual = vec![Complex64::new(0.0, 0.0); dim];
    let mut change = f64::INFINITY;

    for iteration in 1..=settings.max_steps {
        let jacobian = matrix_complex_to_real(&system.jacobian(&roots, q));
        system.residual(&roots, q, &mut residual);
        let rhs = vector_complex_to_real(&residual);

        let delta = solve_linear_system(&jacobian, &rhs)
            .ok_or(SolverError::SingularJacobian { iteration })
            .context("Failed to solve linear system during Newton iteration.")?;
        let delta = vector_real_to_complex(&delta)?;

        for (x, dx) in roots.iter_mut().zip(delta.iter()) {
            *x -= *dx * settings.damping;
        }
        if !all_finite(&roots) {
            bail!(SolverError::NonFinite { iteration });
        }

        let sum = abs_sum(&roots);
        change = (sum - previous_sum).abs();
        debug!("newton iteration {iteration}: change {change:e}");

        if change < settings.tolerance {
            return Ok(NewtonResult {
                roots,
                iterations: iteration,
                converged: true,
                change,
            });
        }
        previous_sum = sum;
    }

    if settings.require_convergence {
        bail!(SolverError::NotConverged {
            iterations: settings.max_steps,
            change,
        });
    }
    warn!(
        "Newton corrector stopped after {} iterations without meeting tolerance (change {change:e}) at q = {q}",
        settings.max_steps
    );

    Ok(NewtonResult {
        roots,
        iterations: settings.max_steps,
        converged: false,
        change,
    })
}

/// Converged root vector of the system defined by `config` at parameter `q`, using default settings.
pub fn solve_in_q(seed: &[Complex64], q: Complex64, config: &Config) -> Result<Vec<Complex64>> {
    let system = BetheEquations::new(config)?;
    Ok(newton_correct(&system, seed, q, &NewtonSettings::default())?.roots)
}

/// Σ|F_i(roots; q)|.
pub fn residual_abs_sum<S: RootSystem + ?Sized>(system: &S, roots: &[Complex64], q: Complex64) -> f64 {
    let mut out = vec![Complex64::new(0.0, 0.0); roots.len()];
    system.residual(roots, q, &mut out);
    abs_sum(&out)
}

fn solve_linear_system(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    matrix.clone().lu().solve(rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::tests::{c, reference_config};

    /// x_i² − q for every component.
    struct SquareRoots;

    impl RootSystem for SquareRoots {
        fn residual(&self, roots: &[Complex64], q: Complex64, out: &mut [Complex64]) {
            for (o, x) in out.iter_mut().zip(roots.iter()) {
                *o = x * x - q;
            }
        }

        fn jacobian(&self, roots: &[Complex64], _q: Complex64) -> DMatrix<Complex64> {
            let m = roots.len();
            DMatrix::from_fn(m, m, |i, j| if i == j { roots[i] * 2.0 } else { c(0.0, 0.0) })
        }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn assert_close(actual: &[Complex64], expected: &[(f64, f64)]) {
        assert_eq!(actual.len(), expected.len());
        for (a, &(re, im)) in actual.iter().zip(expected.iter()) {
            assert!(
                (a.re - re).abs() < 1e-12 && (a.im - im).abs() < 1e-12,
                "got {a}, expected {re} + {im}i"
            );
        }
    }

    #[test]
    fn single_root_fixture() {
        let roots = solve_in_q(&[c(0.5, 0.25)], c(0.5, 0.25), &reference_config())
            .expect("solve should succeed");
        assert_close(&roots, &[(3.804535746476545, 0.15110607406879045)]);
    }

    #[test]
    fn three_root_fixture() {
        let seed = [c(1.1, -0.5), c(6.0, 0.4), c(2.9, 0.4)];
        let roots = solve_in_q(&seed, c(0.5, 0.25), &reference_config()).expect("solve should succeed");
        assert_close(
            &roots,
            &[
                (1.0740858432655949, -0.4934167579564024),
                (5.998287899119127, 0.43201254132427974),
                (2.886920021420951, 0.42132987446173636),
            ],
        );
    }

    #[test]
    fn converged_roots_have_small_residual() {
        let system = BetheEquations::new(&reference_config()).expect("valid config");
        let seed = [c(1.1, -0.5), c(6.0, 0.4), c(2.9, 0.4)];
        let q = c(0.5, 0.25);
        let result = newton_correct(&system, &seed, q, &NewtonSettings::default())
            .expect("solve should succeed");
        assert!(result.converged);
        assert!(result.iterations < 20);
        assert!(residual_abs_sum(&system, &result.roots, q) < 1e-9);
    }

    #[test]
    fn generic_system_converges_to_square_root() {
        let q = c(-4.0, 0.0);
        let result = newton_correct(&SquareRoots, &[c(0.5, 1.5), c(0.1, -1.0)], q, &NewtonSettings::default())
            .expect("solve should succeed");
        assert!(result.converged);
        assert!((result.roots[0] - c(0.0, 2.0)).norm() < 1e-9);
        assert!((result.roots[1] - c(0.0, -2.0)).norm() < 1e-9);
    }

    #[test]
    fn damped_iteration_still_converges() {
        let settings = NewtonSettings {
            max_steps: 200,
            damping: 0.5,
            ..NewtonSettings::default()
        };
        let result = newton_correct(&SquareRoots, &[c(1.0, 0.0)], c(2.0, 0.0), &settings)
            .expect("solve should succeed");
        assert!(result.converged);
        assert!(result.iterations > 5);
        assert!((result.roots[0].re - 2f64.sqrt()).abs() < 1e-8);
    }

    #[test]
    fn exhausted_budget_returns_last_iterate_by_default() {
        let settings = NewtonSettings {
            max_steps: 1,
            ..NewtonSettings::default()
        };
        let system = BetheEquations::new(&reference_config()).expect("valid config");
        let result = newton_correct(&system, &[c(0.5, 0.25)], c(0.5, 0.25), &settings)
            .expect("unconverged result is still returned");
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert!(result.change > 1e-10);
        assert!((result.roots[0] - c(3.527433628318584, -1.886504424778761)).norm() < 1e-12);
    }

    #[test]
    fn exhausted_budget_is_an_error_when_required() {
        let settings = NewtonSettings {
            max_steps: 1,
            require_convergence: true,
            ..NewtonSettings::default()
        };
        let system = BetheEquations::new(&reference_config()).expect("valid config");
        let err = newton_correct(&system, &[c(0.5, 0.25)], c(0.5, 0.25), &settings)
            .expect_err("should not converge in one step");
        assert!(matches!(
            err.downcast_ref::<SolverError>(),
            Some(SolverError::NotConverged { iterations: 1, .. })
        ));
    }

    #[test]
    fn singular_jacobian_is_reported() {
        // No pairs and a single root: F = q − 1 is constant, so J = 0.
        let one = c(1.0, 0.0);
        let config = Config::new([one, one, one], &[], &[]);
        assert_err_contains(solve_in_q(&[c(0.5, 0.0)], c(2.0, 0.0), &config), "singular");

        let system = BetheEquations::new(&config).expect("valid config");
        let err = newton_correct(&system, &[c(0.5, 0.0)], c(2.0, 0.0), &NewtonSettings::default())
            .expect_err("singular");
        assert_eq!(
            err.downcast_ref::<SolverError>(),
            Some(&SolverError::SingularJacobian { iteration: 1 })
        );
    }

    #[test]
    fn non_finite_iterate_is_reported() {
        let system = BetheEquations::new(&reference_config()).expect("valid config");
        let err = newton_correct(&system, &[c(f64::NAN, 0.0)], c(2.0, 0.0), &NewtonSettings::default())
            .expect_err("non-finite seed");
        assert_eq!(
            err.downcast_ref::<SolverError>(),
            Some(&SolverError::NonFinite { iteration: 1 })
        );
    }

    #[test]
    fn empty_seed_is_rejected() {
        let err = newton_correct(&SquareRoots, &[], c(1.0, 0.0), &NewtonSettings::default())
            .expect_err("empty seed");
        assert_eq!(err.downcast_ref::<SolverError>(), Some(&SolverError::EmptySeed));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let seed = [c(1.0, 0.0)];
        let q = c(1.0, 0.0);
        for settings in [
            NewtonSettings { max_steps: 0, ..NewtonSettings::default() },
            NewtonSettings { tolerance: 0.0, ..NewtonSettings::default() },
            NewtonSettings { damping: 1.5, ..NewtonSettings::default() },
            NewtonSettings { damping: f64::NAN, ..NewtonSettings::default() },
        ] {
            assert_err_contains(newton_correct(&SquareRoots, &seed, q, &settings), "Invalid settings");
        }
    }

    #[test]
    fn settings_fill_missing_fields_from_defaults() {
        let settings: NewtonSettings =
            serde_json::from_str(r#"{ "max_steps": 50 }"#).expect("settings should parse");
        assert_eq!(settings.max_steps, 50);
        assert_eq!(settings.tolerance, 1e-10);
        assert_eq!(settings.damping, 1.0);
        assert!(!settings.require_convergence);
    }
}
