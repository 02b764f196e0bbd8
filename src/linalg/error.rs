//! Error types for the linear-algebra layer.

use thiserror::Error;

/// Errors raised by system-matrix storage and assembly.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatrixError {
    #[error("block ({row}, {col}) is outside a {n} x {n} block matrix")]
    OutOfBounds { row: usize, col: usize, n: usize },

    #[error("new nonzero block ({row}, {col}) after the sparsity pattern was frozen")]
    NewNonzero { row: usize, col: usize },

    #[error("matrix is not in an assembly phase")]
    NotAssembling,

    #[error("assembly already in progress")]
    AlreadyAssembling,

    #[error("vector length {got} does not match matrix size {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Errors from small dense solves.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DenseSolveError {
    #[error("singular matrix: zero pivot in column {column}")]
    Singular { column: usize },

    #[error("non-finite entries after factorization")]
    NonFinite,
}

/// Errors from preconditioner setup and Krylov solves.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinearSolverError {
    #[error("matrix error: {0}")]
    Matrix(#[from] MatrixError),

    #[error("singular diagonal block in row {row}: {source}")]
    SingularBlock {
        row: usize,
        #[source]
        source: DenseSolveError,
    },

    #[error("preconditioner used before setup")]
    PreconditionerNotSetUp,
}

/// A solver or preconditioner name that matches no known kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{name}'")]
pub struct UnknownSelector {
    /// What was being selected ("preconditioner", "linear solver")
    pub kind: &'static str,
    /// The name as given
    pub name: String,
}
