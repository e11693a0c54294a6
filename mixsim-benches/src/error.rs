//! Benchmark setup error type.
//!
//! Lets setup helpers propagate failures with `?` instead of panicking inside
//! Criterion closures.

use mixsim_core::SimulationError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Configuration or topology generation failed.
    #[error("simulation setup failed: {0}")]
    Simulation(#[from] SimulationError),
}
