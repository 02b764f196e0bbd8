//! # fv-march
//!
//! Pseudo-time and physical-time marching for cell-centred finite-volume
//! discretizations of systems of conservation laws.
//!
//! This crate provides:
//! - Steady-state drivers: explicit forward Euler, implicit backward Euler
//!   with CFL ramping and a Krylov linear solve, and matrix-free LU-SGS
//! - An explicit TVD Runge-Kutta driver for unsteady problems
//! - The collaborators the drivers need: an unstructured 2D mesh, inviscid
//!   fluxes, a first-order spatial operator, block sparse matrices,
//!   preconditioners and Krylov solvers
//!
//! # Example
//!
//! ```
//! use fv_march::{
//!     BoundaryCondition, FirstOrderFv, LinearAdvection, Mesh2D, StateVector,
//!     SteadyBackwardEulerSolver, SteadySolver, SteadySolverConfig,
//! };
//!
//! let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 8, 8).unwrap();
//! let op = FirstOrderFv::new(
//!     mesh,
//!     LinearAdvection::new(1.0, 0.5),
//!     BoundaryCondition::Farfield([1.0]),
//! );
//! let config = SteadySolverConfig::new(1e-8, 50)
//!     .with_cfl_ramp(10.0, 1000.0, 0, 5)
//!     .with_linear_solver("GMRES", "ILU0");
//! let mut solver = SteadyBackwardEulerSolver::new(&op, config).unwrap();
//!
//! let mut u = StateVector::from_rows(vec![[0.0]; 64]);
//! let report = solver.solve(&mut u).unwrap();
//! assert!(report.converged);
//! ```

pub mod flux;
pub mod io;
pub mod linalg;
pub mod mesh;
pub mod solver;
pub mod spatial;
pub mod time;
pub mod timing;
pub mod types;

// Re-export main types for convenience
pub use flux::{EulerFlux, InviscidFlux, LinearAdvection, rusanov_flux};
pub use linalg::{
    BlockSparseMatrix, LinearSolver, LinearSolverKind, LuSgsSweep, Preconditioner,
    PreconditionerKind, SystemMatrix,
};
pub use mesh::{Mesh2D, MeshError};
pub use solver::{
    ConfigError, LinearStats, MatrixFreeImplicitSolver, SolverError, StateVector,
    SteadyBackwardEulerSolver, SteadyForwardEulerSolver, SteadyReport, SteadySolver,
    SteadySolverConfig, UnsteadySolverConfig,
};
pub use spatial::{BoundaryCondition, FirstOrderFv, SpatialOperator};
pub use time::{TvdRkSolver, UnsteadyReport};
pub use timing::RunTimes;
pub use types::{CellIndex, FaceIndex};
