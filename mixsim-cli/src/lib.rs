//! Support library for the mixsim CLI binary.
//!
//! Exposes the command pipeline and logging setup so doctests and tests can
//! drive simulations without spawning a subprocess.

pub mod cli;
pub mod logging;
