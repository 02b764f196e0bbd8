//! Driver configuration.
//!
//! Plain structs with defaults and builder-style setters, validated once
//! when a driver is constructed.

use std::path::PathBuf;

use super::error::ConfigError;
use super::ramp::RampSchedule;
use crate::linalg::DEFAULT_RESTART;

// =============================================================================
// Steady drivers
// =============================================================================

/// Configuration shared by the steady pseudo-time drivers.
#[derive(Clone, Debug)]
pub struct SteadySolverConfig {
    /// Relative residual reduction at which the solve stops.
    pub tol: f64,
    /// Maximum number of nonlinear iterations. Zero makes `solve` a no-op.
    pub max_iter: usize,
    /// CFL number before the ramp (and the only CFL used by the explicit driver).
    pub cfl_init: f64,
    /// CFL number after the ramp.
    pub cfl_final: f64,
    /// Iteration at which the CFL/linear-iteration ramp starts.
    pub ramp_start: usize,
    /// Iteration at which the ramp reaches its final values.
    pub ramp_end: usize,
    /// Relative tolerance of each linear solve.
    pub lin_tol: f64,
    /// Linear iteration cap before the ramp.
    pub lin_max_iter_start: usize,
    /// Linear iteration cap after the ramp.
    pub lin_max_iter_end: usize,
    /// GMRES restart length.
    pub restart_vecs: usize,
    /// Preconditioner name ("J", "SGS", "ILU0", "none").
    pub preconditioner: String,
    /// Linear solver name ("BCGSTB", "GMRES", "richardson").
    pub linear_solver: String,
    /// Reject unknown preconditioner/solver names instead of falling back.
    pub strict_selection: bool,
    /// LU-SGS sweeps per iteration of the matrix-free implicit driver.
    pub lusgs_sweeps: usize,
    /// Run-summary log; the convergence history goes to `<log_file>.conv`.
    pub log_file: Option<PathBuf>,
    /// Write the per-iteration convergence history.
    pub log_residuals: bool,
}

impl Default for SteadySolverConfig {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            max_iter: 1000,
            cfl_init: 1.0,
            cfl_final: 1.0,
            ramp_start: 0,
            ramp_end: 0,
            lin_tol: 1e-3,
            lin_max_iter_start: 10,
            lin_max_iter_end: 10,
            restart_vecs: DEFAULT_RESTART,
            preconditioner: "none".to_string(),
            linear_solver: "richardson".to_string(),
            strict_selection: false,
            lusgs_sweeps: 1,
            log_file: None,
            log_residuals: false,
        }
    }
}

impl SteadySolverConfig {
    /// Create a configuration with the given tolerance and iteration budget.
    pub fn new(tol: f64, max_iter: usize) -> Self {
        Self {
            tol,
            max_iter,
            ..Default::default()
        }
    }

    /// Set a constant CFL number.
    pub fn with_cfl(mut self, cfl: f64) -> Self {
        self.cfl_init = cfl;
        self.cfl_final = cfl;
        self
    }

    /// Ramp the CFL number from `init` to `fin` over iterations `start..end`.
    pub fn with_cfl_ramp(mut self, init: f64, fin: f64, start: usize, end: usize) -> Self {
        self.cfl_init = init;
        self.cfl_final = fin;
        self.ramp_start = start;
        self.ramp_end = end;
        self
    }

    /// Linear tolerance and iteration caps before and after the ramp.
    pub fn with_linear_iterations(mut self, tol: f64, start: usize, end: usize) -> Self {
        self.lin_tol = tol;
        self.lin_max_iter_start = start;
        self.lin_max_iter_end = end;
        self
    }

    /// Select the linear solver and preconditioner by name.
    pub fn with_linear_solver(
        mut self,
        solver: impl Into<String>,
        preconditioner: impl Into<String>,
    ) -> Self {
        self.linear_solver = solver.into();
        self.preconditioner = preconditioner.into();
        self
    }

    /// Set the GMRES restart length.
    pub fn with_restart(mut self, restart_vecs: usize) -> Self {
        self.restart_vecs = restart_vecs;
        self
    }

    /// Reject unknown solver names.
    pub fn strict(mut self) -> Self {
        self.strict_selection = true;
        self
    }

    /// Set the number of LU-SGS sweeps per iteration.
    pub fn with_lusgs_sweeps(mut self, sweeps: usize) -> Self {
        self.lusgs_sweeps = sweeps;
        self
    }

    /// Write logs to `path` (run summary) and `<path>.conv` if `residuals` is set.
    pub fn with_log(mut self, path: impl Into<PathBuf>, residuals: bool) -> Self {
        self.log_file = Some(path.into());
        self.log_residuals = residuals;
        self
    }

    /// The CFL/linear-iteration ramp described by this configuration.
    pub fn ramp(&self) -> RampSchedule {
        RampSchedule {
            cfl_init: self.cfl_init,
            cfl_final: self.cfl_final,
            lin_max_iter_start: self.lin_max_iter_start,
            lin_max_iter_end: self.lin_max_iter_end,
            ramp_start: self.ramp_start,
            ramp_end: self.ramp_end,
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tol", self.tol)?;
        positive("cfl_init", self.cfl_init)?;
        positive("cfl_final", self.cfl_final)?;
        positive("lin_tol", self.lin_tol)?;
        at_least_one("lin_max_iter_start", self.lin_max_iter_start)?;
        at_least_one("lin_max_iter_end", self.lin_max_iter_end)?;
        at_least_one("lusgs_sweeps", self.lusgs_sweeps)?;
        at_least_one("restart_vecs", self.restart_vecs)?;
        Ok(())
    }
}

// =============================================================================
// Unsteady driver
// =============================================================================

/// Configuration of the multistage unsteady driver.
#[derive(Clone, Debug)]
pub struct UnsteadySolverConfig {
    /// Temporal order (number of TVD-RK stages), 1 to 3.
    pub order: usize,
    /// CFL number applied to the smallest local time step.
    pub cfl: f64,
    /// Run-summary log.
    pub log_file: Option<PathBuf>,
}

impl Default for UnsteadySolverConfig {
    fn default() -> Self {
        Self {
            order: 3,
            cfl: 0.5,
            log_file: None,
        }
    }
}

impl UnsteadySolverConfig {
    pub fn new(order: usize, cfl: f64) -> Self {
        Self {
            order,
            cfl,
            log_file: None,
        }
    }

    /// Append a run summary to `path` after each solve.
    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3).contains(&self.order) {
            return Err(ConfigError::UnsupportedOrder(self.order));
        }
        positive("cfl", self.cfl)
    }
}

fn at_least_one(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidValue { name, value: 0.0 })
    } else {
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { name, value })
    }
}
