//! Pseudo-time drivers for steady-state problems.
//!
//! # Submodules
//!
//! - [`core`]: the cell-state container shared by every driver
//!
//! # Drivers
//!
//! All steady drivers implement [`SteadySolver`]:
//!
//! - [`SteadyForwardEulerSolver`]: explicit local time stepping
//! - [`SteadyBackwardEulerSolver`]: implicit, assembled Jacobian + Krylov solver
//! - [`MatrixFreeImplicitSolver`]: implicit, matrix-free LU-SGS sweeps
//!
//! The unsteady multistage driver lives in [`crate::time`].

mod backward_euler;
mod config;
pub mod core;
mod error;
mod forward_euler;
mod matrix_free;
mod ramp;
mod steady;

pub use backward_euler::SteadyBackwardEulerSolver;
pub use config::{SteadySolverConfig, UnsteadySolverConfig};
pub use core::StateVector;
pub use error::{ConfigError, SolverError};
pub use forward_euler::SteadyForwardEulerSolver;
pub use matrix_free::MatrixFreeImplicitSolver;
pub use ramp::{RampSchedule, RampValues};
pub use steady::{LinearStats, SteadyReport, SteadySolver, residual_norm};
