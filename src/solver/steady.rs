//! Shared skeleton of the steady-state pseudo-time drivers.
//!
//! Every steady driver runs the same outer loop:
//!
//! ```text
//! while rel > tol && step < max_iter {
//!     R, dt_local <- space(u)
//!     u <- update(u, R, dt_local)        // driver specific
//!     rel <- ||R|| / ||R_0||
//! }
//! ```
//!
//! The residual norm is `sqrt(sum_i R_i[N-1]^2 area_i)`, measured on the
//! residual that produced the update, and normalized by its value at the
//! first iteration of the current `solve` call.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::config::SteadySolverConfig;
use super::core::StateVector;
use super::error::{ConfigError, SolverError};
use crate::io::{ConvergenceLog, LogError};
use crate::linalg::{UnknownSelector, select_lenient};
use crate::mesh::Mesh2D;
use crate::timing::RunTimes;

// =============================================================================
// Driver interface
// =============================================================================

/// A driver that marches a state to steady state in pseudo-time.
pub trait SteadySolver<const N: usize> {
    /// Iterate on `u` in place until converged or out of iterations.
    ///
    /// Running out of iterations is reported in the returned
    /// [`SteadyReport`], not as an error.
    fn solve(&mut self, u: &mut StateVector<N>) -> Result<SteadyReport, SolverError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Driver wall and CPU time as tracked by this driver.
    fn run_times(&self) -> RunTimes;
}

/// Linear-solver statistics of one implicit solve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LinearStats {
    /// Linear iterations per nonlinear iteration.
    pub average_iterations: f64,
    /// Wall-clock seconds spent in preconditioner setup and linear solves.
    pub wall: f64,
    /// CPU seconds spent in preconditioner setup and linear solves.
    pub cpu: f64,
}

/// Outcome of one steady `solve` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteadyReport {
    /// Nonlinear iterations performed.
    pub steps: usize,
    /// Residual norm of the last iteration relative to the first.
    pub relative_residual: f64,
    /// Whether the tolerance was reached.
    pub converged: bool,
    /// Wall and CPU time of this call.
    pub times: RunTimes,
    /// Present for drivers that solve a linear system per iteration.
    pub linear: Option<LinearStats>,
}

impl SteadyReport {
    /// Report of a call that did not iterate.
    pub fn not_run() -> Self {
        Self {
            steps: 0,
            relative_residual: 1.0,
            converged: false,
            times: RunTimes::default(),
            linear: None,
        }
    }
}

impl fmt::Display for SteadyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "steps = {}, rel residual = {:e}, {}",
            self.steps,
            self.relative_residual,
            if self.converged {
                "converged"
            } else {
                "not converged"
            }
        )
    }
}

// =============================================================================
// Shared pieces
// =============================================================================

/// `sqrt(sum_i r_i[N-1]^2 area_i)`.
pub fn residual_norm<const N: usize>(areas: &[f64], residual: &StateVector<N>) -> f64 {
    let term = |(r, a): (&[f64; N], &f64)| r[N - 1] * r[N - 1] * a;

    #[cfg(feature = "parallel")]
    let sum: f64 = residual
        .rows()
        .par_iter()
        .zip(areas.par_iter())
        .map(term)
        .sum();
    #[cfg(not(feature = "parallel"))]
    let sum: f64 = residual.rows().iter().zip(areas.iter()).map(term).sum();

    sum.sqrt()
}

/// Reject a state whose row count does not match the mesh.
pub(crate) fn check_state<const N: usize>(
    mesh: &Mesh2D,
    u: &StateVector<N>,
) -> Result<(), ConfigError> {
    if u.n_cells() != mesh.n_cells() {
        return Err(ConfigError::StateSizeMismatch {
            expected: mesh.n_cells(),
            got: u.n_cells(),
        });
    }
    Ok(())
}

/// Resolve a solver or preconditioner name.
///
/// Strict selection rejects unknown names; otherwise they fall back to
/// the default with a warning.
pub(crate) fn select<T>(name: &str, strict: bool) -> Result<T, ConfigError>
where
    T: FromStr<Err = UnknownSelector> + Default + fmt::Display,
{
    if strict {
        Ok(name.parse::<T>()?)
    } else {
        Ok(select_lenient(name))
    }
}

/// Per-call convergence bookkeeping and the optional convergence log.
pub(crate) struct ConvergenceMonitor {
    tol: f64,
    max_iter: usize,
    step: usize,
    initial: f64,
    relative: f64,
    log: Option<ConvergenceLog>,
}

impl ConvergenceMonitor {
    pub(crate) fn start(config: &SteadySolverConfig) -> Result<Self, LogError> {
        let log = match (&config.log_file, config.log_residuals) {
            (Some(path), true) => Some(ConvergenceLog::open(path)?),
            _ => None,
        };
        Ok(Self {
            tol: config.tol,
            max_iter: config.max_iter,
            step: 0,
            initial: 1.0,
            relative: 1.0,
            log,
        })
    }

    /// Iterations completed so far.
    pub(crate) fn step(&self) -> usize {
        self.step
    }

    pub(crate) fn keep_going(&self) -> bool {
        self.relative > self.tol && self.step < self.max_iter
    }

    /// The last relative residual is NaN or infinite.
    pub(crate) fn non_finite(&self) -> bool {
        !self.relative.is_finite()
    }

    /// Record the residual norm of the iteration just performed.
    pub(crate) fn record(&mut self, norm: f64) -> Result<f64, LogError> {
        if self.step == 0 {
            self.initial = norm;
        }
        self.relative = if self.initial == 0.0 {
            0.0
        } else {
            norm / self.initial
        };
        self.step += 1;
        if let Some(log) = self.log.as_mut() {
            log.record(self.step, self.relative)?;
        }
        Ok(self.relative)
    }

    /// Close the log and build the report.
    pub(crate) fn finish(
        mut self,
        driver: &str,
        times: RunTimes,
        linear: Option<LinearStats>,
    ) -> Result<SteadyReport, LogError> {
        if let Some(log) = self.log.take() {
            log.finish()?;
        }
        let converged = self.relative <= self.tol;
        if self.non_finite() {
            log::warn!(
                "{driver}: non-finite rel residual {} after {} of {} iterations",
                self.relative,
                self.step,
                self.max_iter
            );
        } else if !converged {
            log::warn!(
                "{driver}: exceeded max iterations ({}), rel residual {:e}",
                self.max_iter,
                self.relative
            );
        }
        let report = SteadyReport {
            steps: self.step,
            relative_residual: self.relative,
            converged,
            times,
            linear,
        };
        log::info!(
            "{driver}: done, {report}; wall time = {:.3}s, CPU time = {:.3}s",
            times.wall,
            times.cpu
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::PreconditionerKind;

    #[test]
    fn test_residual_norm_uses_last_variable() {
        let r = StateVector::from_rows(vec![[100.0, 3.0], [-50.0, 4.0]]);
        let norm = residual_norm(&[1.0, 1.0], &r);
        assert!((norm - 5.0).abs() < 1e-14);

        let norm = residual_norm(&[4.0, 0.0], &r);
        assert!((norm - 6.0).abs() < 1e-14);
    }

    #[test]
    fn test_monitor_relative_to_first_iteration() {
        let mut m = ConvergenceMonitor::start(&SteadySolverConfig::new(1e-2, 10)).unwrap();
        assert!(m.keep_going());
        assert_eq!(m.record(4.0).unwrap(), 1.0);
        assert!((m.record(1.0).unwrap() - 0.25).abs() < 1e-15);
        assert!(m.keep_going());
        assert!((m.record(0.02).unwrap() - 0.005).abs() < 1e-15);
        assert!(!m.keep_going());
        assert_eq!(m.step(), 3);
        let report = m.finish("test", RunTimes::default(), None).unwrap();
        assert!(report.converged);
        assert_eq!(report.steps, 3);
    }

    #[test]
    fn test_monitor_zero_initial_residual_converges() {
        let mut m = ConvergenceMonitor::start(&SteadySolverConfig::new(1e-8, 10)).unwrap();
        assert_eq!(m.record(0.0).unwrap(), 0.0);
        assert!(!m.keep_going());
        let report = m.finish("test", RunTimes::default(), None).unwrap();
        assert!(report.converged);
        assert!(report.relative_residual.is_finite());
    }

    #[test]
    fn test_monitor_budget() {
        let mut m = ConvergenceMonitor::start(&SteadySolverConfig::new(1e-8, 2)).unwrap();
        m.record(1.0).unwrap();
        m.record(1.0).unwrap();
        assert!(!m.keep_going());
        let report = m.finish("test", RunTimes::default(), None).unwrap();
        assert!(!report.converged);
        assert_eq!(report.steps, 2);
    }

    #[test]
    fn test_monitor_stops_on_non_finite_residual() {
        let mut m = ConvergenceMonitor::start(&SteadySolverConfig::new(1e-6, 10)).unwrap();
        m.record(2.0).unwrap();
        assert!(!m.non_finite());
        assert!(m.record(f64::NAN).unwrap().is_nan());
        assert!(m.non_finite());
        assert!(!m.keep_going());

        let report = m.finish("test", RunTimes::default(), None).unwrap();
        assert_eq!(report.steps, 2);
        assert!(!report.converged);
        assert!(report.relative_residual.is_nan());
    }

    #[test]
    fn test_select_strict_and_lenient() {
        let kind: PreconditionerKind = select("SGS", true).unwrap();
        assert_eq!(kind, PreconditionerKind::Sgs);

        let kind: PreconditionerKind = select("bogus", false).unwrap();
        assert_eq!(kind, PreconditionerKind::None);

        let err = select::<PreconditionerKind>("bogus", true).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSelector(_)));
    }
}
