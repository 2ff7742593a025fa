//! Complex scalar helpers.
//!
//! Arithmetic itself is `num_complex::Complex64` (`+`, `-`, `*`, unary `-`, `norm`, `Copy`).
//! With the `serde` feature of `num-complex` values serialize as `[re, im]`. This module adds the
//! pieces the solver needs on top of that: the multiplicative inverse and division in conjugate
//! form, magnitude sums over root vectors, and finiteness checks.

use num_complex::Complex64;

/// `conj(a) / |a|²`. The zero value yields non-finite components.
pub fn inverse(a: Complex64) -> Complex64 {
    let norm_sqr = a.re * a.re + a.im * a.im;
    Complex64::new(a.re / norm_sqr, -a.im / norm_sqr)
}

/// `a * inverse(b)`.
pub fn divide(a: Complex64, b: Complex64) -> Complex64 {
    a * inverse(b)
}

/// Sum of magnitudes, the quantity the corrector monitors between iterations.
pub fn abs_sum(values: &[Complex64]) -> f64 {
    values.iter().map(|v| v.norm()).sum()
}

pub fn all_finite(values: &[Complex64]) -> bool {
    values.iter().all(|v| v.re.is_finite() && v.im.is_finite())
}
