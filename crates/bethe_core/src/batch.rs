//! Independent continuation of several seeds over the same path.
//!
//! Each seed is one unit of work sharing the system and the path read-only. With the `parallel`
//! feature the units run on the rayon pool; the call returns once every unit has finished. A
//! failing seed only affects its own report.

use anyhow::Result;
use log::{info, warn};
use num_complex::Complex64;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::continuation::{continue_along_path, Trajectory};
use crate::equations::BetheEquations;
use crate::newton::NewtonSettings;
use crate::traits::RootSystem;

/// A named initial root vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub name: String,
    pub roots: Vec<Complex64>,
}

impl Seed {
    pub fn new(name: impl Into<String>, roots: Vec<Complex64>) -> Self {
        Self {
            name: name.into(),
            roots,
        }
    }
}

/// Outcome of one seed: a trajectory with its end points, or the error chain as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedReport {
    pub name: String,
    pub trajectory: Option<Trajectory>,
    pub start: Option<Vec<Complex64>>,
    pub end: Option<Vec<Complex64>>,
    pub error: Option<String>,
}

impl SeedReport {
    fn from_result(name: &str, result: Result<Trajectory>) -> Self {
        match result {
            Ok(trajectory) => Self {
                name: name.to_string(),
                start: trajectory.start(),
                end: trajectory.end(),
                trajectory: Some(trajectory),
                error: None,
            },
            Err(err) => {
                let message = format!("{err:#}");
                warn!("seed '{name}' failed: {message}");
                Self {
                    name: name.to_string(),
                    trajectory: None,
                    start: None,
                    end: None,
                    error: Some(message),
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs one continuation per seed and returns the reports in seed order.
pub fn trace_seeds_with<S: RootSystem + Sync + ?Sized>(
    system: &S,
    seeds: &[Seed],
    q_path: &[Complex64],
    settings: &NewtonSettings,
) -> Vec<SeedReport> {
    info!(
        "tracing {} seeds along {} path points",
        seeds.len(),
        q_path.len()
    );

    #[cfg(feature = "parallel")]
    let units = seeds.par_iter();
    #[cfg(not(feature = "parallel"))]
    let units = seeds.iter();

    let reports: Vec<SeedReport> = units
        .map(|seed| {
            let result = continue_along_path(system, &seed.roots, q_path, settings);
            SeedReport::from_result(&seed.name, result)
        })
        .collect();

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    info!("seed batch finished: {} ok, {failed} failed", reports.len() - failed);
    reports
}

/// [`trace_seeds_with`] for the system defined by `config`. Only an invalid config fails the
/// whole batch.
pub fn trace_seeds(
    seeds: &[Seed],
    q_path: &[Complex64],
    config: &Config,
    settings: &NewtonSettings,
) -> Result<Vec<SeedReport>> {
    let system = BetheEquations::new(config)?;
    Ok(trace_seeds_with(&system, seeds, q_path, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuation::solve_in_q_array;
    use crate::equations::tests::{c, reference_config};

    fn path() -> Vec<Complex64> {
        vec![c(2.0, 0.0), c(2.02, 0.01), c(2.04, 0.02)]
    }

    #[test]
    fn reports_follow_seed_order() {
        let config = reference_config();
        let seeds = vec![
            Seed::new("a", vec![c(0.5, 0.25)]),
            Seed::new("b", vec![c(12.0, 0.5)]),
            Seed::new("c", vec![c(1.1, -0.5), c(6.0, 0.4), c(2.9, 0.4)]),
        ];
        let reports =
            trace_seeds(&seeds, &path(), &config, &NewtonSettings::default()).expect("valid config");

        let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        for (seed, report) in seeds.iter().zip(reports.iter()) {
            let expected = solve_in_q_array(&seed.roots, &path(), &config);
            match expected {
                Ok(trajectory) => {
                    assert_eq!(report.start, trajectory.start());
                    assert_eq!(report.end, trajectory.end());
                    assert_eq!(report.trajectory.as_ref(), Some(&trajectory));
                }
                Err(_) => assert!(!report.is_ok()),
            }
        }
    }

    #[test]
    fn failing_seed_does_not_affect_others() {
        // At q = 2 and x = 8.5 both Ax contributions to dF/dx cancel exactly.
        let seeds = vec![
            Seed::new("good", vec![c(0.5, 0.25)]),
            Seed::new("singular", vec![c(8.5, 0.0)]),
            Seed::new("also good", vec![c(4.0, 0.0)]),
        ];
        let reports = trace_seeds(&seeds, &path(), &reference_config(), &NewtonSettings::default())
            .expect("valid config");

        assert!(reports[0].is_ok());
        assert!(reports[2].is_ok());
        assert_eq!(reports[0].trajectory.as_ref().map(Trajectory::len), Some(3));

        let bad = &reports[1];
        assert!(!bad.is_ok());
        assert!(bad.trajectory.is_none());
        assert!(bad.start.is_none() && bad.end.is_none());
        let message = bad.error.as_deref().unwrap_or_default();
        assert!(message.contains("Continuation step 0"), "{message}");
        assert!(message.contains("singular"), "{message}");
    }

    #[test]
    fn converged_seed_lands_on_quadratic_root() {
        // q(x − 6)(x − 5) = (x − 3)(x − 2) at q = 2 gives x² − 17x + 54 = 0.
        let seeds = vec![Seed::new("low", vec![c(4.0, 0.0)])];
        let reports = trace_seeds(&seeds, &[c(2.0, 0.0)], &reference_config(), &NewtonSettings::default())
            .expect("valid config");
        let start = reports[0].start.as_ref().expect("trajectory");
        let expected = (17.0 - 73f64.sqrt()) / 2.0;
        assert!((start[0].re - expected).abs() < 1e-9);
        assert!(start[0].im.abs() < 1e-9);
    }

    #[test]
    fn empty_seed_fails_alone() {
        let seeds = vec![Seed::new("empty", Vec::new()), Seed::new("ok", vec![c(4.0, 0.0)])];
        let reports = trace_seeds(&seeds, &path(), &reference_config(), &NewtonSettings::default())
            .expect("valid config");
        assert!(!reports[0].is_ok());
        assert!(reports[1].is_ok());
    }

    #[test]
    fn non_finite_seed_fails_alone() {
        let seeds = vec![
            Seed::new("nan", vec![c(f64::NAN, 0.0)]),
            Seed::new("single", vec![c(4.0, 0.0)]),
            Seed::new("pair", vec![c(6.0, 0.0), c(6.0, 0.0)]),
        ];
        let reports = trace_seeds(&seeds, &[c(2.0, 0.0)], &reference_config(), &NewtonSettings::default())
            .expect("valid config");

        let message = reports[0].error.as_deref().unwrap_or_default();
        assert!(message.contains("Continuation step 0"), "{message}");
        assert!(message.contains("non-finite at iteration 1"), "{message}");
        assert!(reports[0].trajectory.is_none());
        assert!(reports[1].is_ok());
        assert!(reports[2].is_ok());
    }

    #[test]
    fn invalid_config_fails_whole_batch() {
        let one = c(1.0, 0.0);
        let config = Config::new([one, one, one], &[one], &[]);
        let seeds = vec![Seed::new("a", vec![one])];
        assert!(trace_seeds(&seeds, &path(), &config, &NewtonSettings::default()).is_err());
    }

    #[test]
    fn no_seeds_gives_no_reports() {
        let reports = trace_seeds(&[], &path(), &reference_config(), &NewtonSettings::default())
            .expect("valid config");
        assert!(reports.is_empty());
    }

    #[test]
    fn seed_round_trips_through_json() {
        let seed: Seed = serde_json::from_str(r#"{ "name": "s", "roots": [[1.0, -0.5], [2.0, 0.0]] }"#)
            .expect("seed should parse");
        assert_eq!(seed.roots, vec![c(1.0, -0.5), c(2.0, 0.0)]);
    }
}
