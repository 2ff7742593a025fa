//! Product-form residual system and its analytic Jacobian.
//!
//! For roots `x` (length M) and parameter `q` the i-th residual is
//!
//! ```text
//! F_i = q · Π_j (x_i − AL_j) · Π_{k≠i} Π_E (x_i − x_k + E)
//!         − Π_j (x_i − AR_j) · Π_{k≠i} Π_E (x_i − x_k − E)
//! ```
//!
//! with `E` ranging over `{E1, E2, E3}`. Factors are accumulated in a fixed order (parameter,
//! then the `Ax` pairs, then the pairwise shifts) so that repeated evaluation is bit-reproducible.

use anyhow::Result;
use nalgebra::DMatrix;
use num_complex::Complex64;
use num_traits::{One, Zero};

use crate::config::Config;
use crate::traits::RootSystem;

/// Residual and Jacobian builder for one [`Config`].
#[derive(Debug, Clone)]
pub struct BetheEquations {
    e: [Complex64; 3],
    al: Vec<Complex64>,
    ar: Vec<Complex64>,
}

impl BetheEquations {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            e: config.ex.as_array(),
            al: config.ax.al.clone(),
            ar: config.ax.ar.clone(),
        })
    }

    pub fn residuals(&self, roots: &[Complex64], q: Complex64) -> Vec<Complex64> {
        let mut out = vec![Complex64::zero(); roots.len()];
        self.residual(roots, q, &mut out);
        out
    }

    /// Multiplies in `(x − AL_j)` and `(x − AR_j)` for every pair except `skip`.
    fn mul_ax(&self, x: Complex64, skip: Option<usize>, left: &mut Complex64, right: &mut Complex64) {
        for (j, (al, ar)) in self.al.iter().zip(self.ar.iter()).enumerate() {
            if Some(j) == skip {
                continue;
            }
            *left *= x - al;
            *right *= x - ar;
        }
    }

    /// Multiplies in the shifted differences `(x_i − x_k ± E)` for every `k ∉ {i, skip}`.
    fn mul_shifts(
        &self,
        roots: &[Complex64],
        i: usize,
        skip: Option<usize>,
        left: &mut Complex64,
        right: &mut Complex64,
    ) {
        for (k, xk) in roots.iter().enumerate() {
            if k == i || Some(k) == skip {
                continue;
            }
            let d = roots[i] - xk;
            for e in &self.e {
                *left *= d + e;
                *right *= d - e;
            }
        }
    }

    /// Derivative factors of `Π_E (d ± E)` with respect to `d`:
    /// the sums of pairwise products of the three shifted differences.
    fn shift_derivatives(&self, d: Complex64) -> (Complex64, Complex64) {
        let [e1, e2, e3] = self.e;
        let (p1, p2, p3) = (d + e1, d + e2, d + e3);
        let (m1, m2, m3) = (d - e1, d - e2, d - e3);
        (
            p1 * p2 + p1 * p3 + p2 * p3,
            m1 * m2 + m1 * m3 + m2 * m3,
        )
    }

    fn off_diagonal(&self, roots: &[Complex64], q: Complex64, i: usize, j: usize) -> Complex64 {
        let mut left = -q;
        let mut right = -Complex64::one();
        self.mul_ax(roots[i], None, &mut left, &mut right);
        self.mul_shifts(roots, i, Some(j), &mut left, &mut right);
        let (dl, dr) = self.shift_derivatives(roots[i] - roots[j]);
        left *= dl;
        right *= dr;
        left - right
    }

    fn diagonal(&self, roots: &[Complex64], q: Complex64, i: usize) -> Complex64 {
        let mut acc = Complex64::zero();

        for k in 0..self.al.len() {
            let mut left = q;
            let mut right = Complex64::one();
            self.mul_ax(roots[i], Some(k), &mut left, &mut right);
            self.mul_shifts(roots, i, None, &mut left, &mut right);
            acc += left - right;
        }

        for k in (0..roots.len()).filter(|&k| k != i) {
            let mut left = q;
            let mut right = Complex64::one();
            self.mul_ax(roots[i], None, &mut left, &mut right);
            self.mul_shifts(roots, i, Some(k), &mut left, &mut right);
            let (dl, dr) = self.shift_derivatives(roots[i] - roots[k]);
            left *= dl;
            right *= dr;
            acc += left - right;
        }

        acc
    }
}

impl RootSystem for BetheEquations {
    fn residual(&self, roots: &[Complex64], q: Complex64, out: &mut [Complex64]) {
        for i in 0..roots.len() {
            let mut left = q;
            let mut right = Complex64::one();
            self.mul_ax(roots[i], None, &mut left, &mut right);
            self.mul_shifts(roots, i, None, &mut left, &mut right);
            out[i] = left - right;
        }
    }

    fn jacobian(&self, roots: &[Complex64], q: Complex64) -> DMatrix<Complex64> {
        let m = roots.len();
        DMatrix::from_fn(m, m, |i, j| {
            if i == j {
                self.diagonal(roots, q, i)
            } else {
                self.off_diagonal(roots, q, i, j)
            }
        })
    }
}

/// Residual vector of the system defined by `config` at `(roots; q)`.
pub fn eqns(roots: &[Complex64], q: Complex64, config: &Config) -> Result<Vec<Complex64>> {
    Ok(BetheEquations::new(config)?.residuals(roots, q))
}

/// Jacobian of [`eqns`] with respect to `roots`.
pub fn eqnsd(roots: &[Complex64], q: Complex64, config: &Config) -> Result<DMatrix<Complex64>> {
    Ok(BetheEquations::new(config)?.jacobian(roots, q))
}
