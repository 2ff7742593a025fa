//! The `bethe_core` crate traces roots of a product-form algebraic system over complex numbers as
//! a complex parameter `q` moves along a sampled path.
//!
//! Key components:
//! - **Equations**: residuals and analytic Jacobian of the system, driven by a `Config`.
//! - **Embedding**: complex linear systems rewritten as real ones of twice the size.
//! - **Newton**: the corrector solving the system at a fixed `q`.
//! - **Continuation**: predictor-corrector walk along the path, one trajectory per root.
//! - **Batch**: independent, optionally parallel, continuation of several named seeds.

pub mod batch;
pub mod complex;
pub mod config;
pub mod continuation;
pub mod embedding;
pub mod equations;
pub mod error;
pub mod newton;
pub mod traits;

pub use batch::{trace_seeds, trace_seeds_with, Seed, SeedReport};
pub use config::{Ax, Config, Ex};
pub use continuation::{
    continue_along_path, solve_in_q_array, ContinuationProgress, ContinuationRunner, Trajectory,
};
pub use equations::{eqns, eqnsd, BetheEquations};
pub use error::SolverError;
pub use newton::{newton_correct, solve_in_q, NewtonResult, NewtonSettings};
pub use traits::RootSystem;
