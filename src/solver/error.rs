//! Error types for driver configuration and execution.

use thiserror::Error;

use crate::io::LogError;
use crate::linalg::{LinearSolverError, MatrixError, UnknownSelector};

/// Invalid configuration, detected at construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0}")]
    UnknownSelector(#[from] UnknownSelector),

    #[error("unsupported temporal order {0}, expected 1, 2 or 3")]
    UnsupportedOrder(usize),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: f64 },

    #[error("state has {got} rows but the mesh has {expected} cells")]
    StateSizeMismatch { expected: usize, got: usize },
}

/// Errors that end a `solve` call.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("matrix assembly failed: {0}")]
    Matrix(#[from] MatrixError),

    #[error("linear solve failed: {0}")]
    LinearSolver(#[from] LinearSolverError),

    #[error("log output failed: {0}")]
    Log(#[from] LogError),

    #[error("invalid physical time step {dt} at step {step}")]
    InvalidTimeStep { dt: f64, step: usize },
}
