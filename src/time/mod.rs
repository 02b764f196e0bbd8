//! Time integration methods.
//!
//! - [`TvdRkSolver`]: explicit TVD Runge-Kutta driver of order 1 to 3 with a
//!   global time step from the smallest admissible local step

mod tvd_rk;

pub use tvd_rk::{TvdRkCoefficients, TvdRkSolver, UnsteadyReport};
