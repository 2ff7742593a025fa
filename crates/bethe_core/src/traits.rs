use nalgebra::DMatrix;
use num_complex::Complex64;

/// A square system of complex residual equations depending on a scalar complex parameter.
///
/// This is what the Newton corrector and the continuation driver are written against.
pub trait RootSystem {
    /// Evaluates the residuals F(roots; q).
    /// roots: current estimate (length M)
    /// q: continuation parameter
    /// out: buffer of length M receiving the residuals
    fn residual(&self, roots: &[Complex64], q: Complex64, out: &mut [Complex64]);

    /// Returns the M×M Jacobian dF/droots at (roots; q).
    fn jacobian(&self, roots: &[Complex64], q: Complex64) -> DMatrix<Complex64>;
}
