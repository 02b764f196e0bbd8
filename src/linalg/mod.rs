//! Linear algebra for the implicit drivers.
//!
//! - [`block`]: fixed-size N x N block arithmetic
//! - [`dense`]: Gaussian elimination and block inversion
//! - [`BlockSparseMatrix`]: block CSR storage behind the [`SystemMatrix`] trait
//! - [`Preconditioner`]s: none, block Jacobi, block SGS, block ILU(0)
//! - [`LinearSolver`]s: Richardson, BiCGStab, GMRES(m)
//! - [`LuSgsSweep`]: matrix-free symmetric Gauss-Seidel sweep
//! - [`PreconditionerKind`] / [`LinearSolverKind`]: selection by name

pub mod block;
mod block_matrix;
pub mod dense;
mod error;
mod krylov;
mod lusgs;
mod preconditioner;
mod selection;
pub mod vector_ops;

pub use block::Block;
pub use block_matrix::{BlockSparseMatrix, SystemMatrix};
pub use dense::{gauss_elim, invert_block};
pub use error::{DenseSolveError, LinearSolverError, MatrixError, UnknownSelector};
pub use krylov::{BiCgStab, Gmres, LinearSolver, Richardson};
pub use lusgs::LuSgsSweep;
pub use preconditioner::{BlockIlu0, BlockJacobi, BlockSgs, NoPreconditioner, Preconditioner};
pub use selection::{DEFAULT_RESTART, LinearSolverKind, PreconditionerKind, select_lenient};
