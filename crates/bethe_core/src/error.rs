use thiserror::Error;

/// Failure conditions raised by the corrector, the continuation driver and input validation.
///
/// Library functions return `anyhow::Result` with context attached along the way; the typed
/// cause can be recovered with `err.downcast_ref::<SolverError>()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("Seed has no components.")]
    EmptySeed,

    #[error("AL and AR must have the same length (AL has {al}, AR has {ar}).")]
    ConfigMismatch { al: usize, ar: usize },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Jacobian is singular at Newton iteration {iteration}.")]
    SingularJacobian { iteration: usize },

    #[error("Newton iterate became non-finite at iteration {iteration}.")]
    NonFinite { iteration: usize },

    #[error("Newton solver failed to converge in {iterations} steps (last change = {change:e}).")]
    NotConverged { iterations: usize, change: f64 },

    #[error("Real vector of length {0} cannot be split into real and imaginary halves.")]
    OddRealLength(usize),
}
