//! Real embedding of complex linear algebra.
//!
//! A complex `M×M` matrix `A` maps to the real `2M×2M` block matrix
//!
//! ```text
//! [ Re(A)  -Im(A) ]
//! [ Im(A)   Re(A) ]
//! ```
//!
//! and a complex `M`-vector `v` to `[Re(v); Im(v)]`, so that the real product reproduces `A·v`.

use anyhow::{bail, Result};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::SolverError;

pub fn matrix_complex_to_real(a: &DMatrix<Complex64>) -> DMatrix<f64> {
    let (rows, cols) = a.shape();
    let mut real = DMatrix::zeros(2 * rows, 2 * cols);
    for i in 0..rows {
        for j in 0..cols {
            let z = a[(i, j)];
            real[(i, j)] = z.re;
            real[(i, cols + j)] = -z.im;
            real[(rows + i, j)] = z.im;
            real[(rows + i, cols + j)] = z.re;
        }
    }
    real
}

pub fn vector_complex_to_real(v: &[Complex64]) -> DVector<f64> {
    let m = v.len();
    DVector::from_fn(2 * m, |idx, _| {
        if idx < m {
            v[idx].re
        } else {
            v[idx - m].im
        }
    })
}

/// Pairs entry `i` (real part) with entry `M + i` (imaginary part).
pub fn vector_real_to_complex(v: &DVector<f64>) -> Result<Vec<Complex64>> {
    if v.len() % 2 != 0 {
        bail!(SolverError::OddRealLength(v.len()));
    }
    let m = v.len() / 2;
    Ok((0..m).map(|i| Complex64::new(v[i], v[m + i])).collect())
}
