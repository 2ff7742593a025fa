use anyhow::{bail, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::complex::all_finite;
use crate::error::SolverError;

/// The three coupling constants shifting pairwise root differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ex {
    pub e1: Complex64,
    pub e2: Complex64,
    pub e3: Complex64,
}

impl Ex {
    pub fn as_array(&self) -> [Complex64; 3] {
        [self.e1, self.e2, self.e3]
    }
}

/// Paired constants `AL[j]`, `AR[j]` entering the left and right product of every equation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ax {
    pub al: Vec<Complex64>,
    pub ar: Vec<Complex64>,
}

/// Constants parameterizing the root system. Read-only for the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub ex: Ex,
    pub ax: Ax,
}

impl Config {
    pub fn new(e: [Complex64; 3], al: &[Complex64], ar: &[Complex64]) -> Self {
        Self {
            ex: Ex {
                e1: e[0],
                e2: e[1],
                e3: e[2],
            },
            ax: Ax {
                al: al.to_vec(),
                ar: ar.to_vec(),
            },
        }
    }

    /// Number of `(AL, AR)` pairs.
    pub fn pair_count(&self) -> usize {
        self.ax.al.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.ax.al.len() != self.ax.ar.len() {
            bail!(SolverError::ConfigMismatch {
                al: self.ax.al.len(),
                ar: self.ax.ar.len(),
            });
        }
        let ex = self.ex.as_array();
        if !(all_finite(&ex) && all_finite(&self.ax.al) && all_finite(&self.ax.ar)) {
            bail!(SolverError::InvalidSettings(
                "config constants must be finite".to_string()
            ));
        }
        Ok(())
    }
}
