//! Explicit forward-Euler pseudo-time driver.
//!
//! Each iteration applies, per cell,
//!
//! ```text
//! u_i <- u_i - cfl * dt_i / area_i * R_i
//! ```
//!
//! with the local time steps from the spatial operator. The CFL number is
//! `cfl_init`; the ramp only applies to the implicit drivers.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::config::SteadySolverConfig;
use super::core::StateVector;
use super::error::{ConfigError, SolverError};
use super::steady::{
    ConvergenceMonitor, SteadyReport, SteadySolver, check_state, residual_norm,
};
use crate::io::{append_timing_summary, thread_count};
use crate::spatial::SpatialOperator;
use crate::timing::{RunTimer, RunTimes};

/// Progress line cadence.
const PROGRESS_EVERY: usize = 50;

/// Explicit local-time-stepping driver.
pub struct SteadyForwardEulerSolver<const N: usize, S> {
    space: S,
    config: SteadySolverConfig,
    residual: StateVector<N>,
    dt_local: Vec<f64>,
    times: RunTimes,
}

impl<const N: usize, S: SpatialOperator<N>> SteadyForwardEulerSolver<N, S> {
    pub fn new(space: S, config: SteadySolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = space.mesh().n_cells();
        log::info!(
            "{}: {} cells, CFL = {}",
            Self::NAME,
            n,
            config.cfl_init
        );
        Ok(Self {
            space,
            config,
            residual: StateVector::zeros(n),
            dt_local: vec![0.0; n],
            times: RunTimes::default(),
        })
    }

    const NAME: &'static str = "SteadyForwardEulerSolver";

    /// The spatial operator.
    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn config(&self) -> &SteadySolverConfig {
        &self.config
    }

    /// Residual of the last iteration.
    pub fn residual(&self) -> &StateVector<N> {
        &self.residual
    }
}

/// `u_i -= cfl * dt_i / area_i * r_i` for every cell.
fn explicit_update<const N: usize>(
    u: &mut StateVector<N>,
    residual: &StateVector<N>,
    dt_local: &[f64],
    areas: &[f64],
    cfl: f64,
) {
    let kernel = |(((ui, ri), dt), area): (((&mut [f64; N], &[f64; N]), &f64), &f64)| {
        let c = cfl * dt / area;
        for (x, r) in ui.iter_mut().zip(ri) {
            *x -= c * r;
        }
    };

    #[cfg(feature = "parallel")]
    u.rows_mut()
        .par_iter_mut()
        .zip(residual.rows().par_iter())
        .zip(dt_local.par_iter())
        .zip(areas.par_iter())
        .for_each(kernel);
    #[cfg(not(feature = "parallel"))]
    u.rows_mut()
        .iter_mut()
        .zip(residual.rows().iter())
        .zip(dt_local.iter())
        .zip(areas.iter())
        .for_each(kernel);
}

impl<const N: usize, S: SpatialOperator<N>> SteadySolver<N> for SteadyForwardEulerSolver<N, S> {
    fn solve(&mut self, u: &mut StateVector<N>) -> Result<SteadyReport, SolverError> {
        let mesh = self.space.mesh();
        check_state(mesh, u)?;

        if self.config.max_iter == 0 {
            log::info!("{}: no iterations to be done", Self::NAME);
            return Ok(SteadyReport::not_run());
        }

        let timer = RunTimer::start();
        let mut monitor = ConvergenceMonitor::start(&self.config)?;
        let areas = mesh.areas();
        let cfl = self.config.cfl_init;

        while monitor.keep_going() {
            let step = monitor.step();
            self.residual.fill(0.0);
            self.space
                .compute_residual(u, &mut self.residual, true, &mut self.dt_local);

            explicit_update(u, &self.residual, &self.dt_local, areas, cfl);

            let rel = monitor.record(residual_norm(areas, &self.residual))?;
            if step % PROGRESS_EVERY == 0 {
                log::info!("{}: step {step}, rel residual {rel:e}", Self::NAME);
            }
        }

        let elapsed = timer.elapsed();
        self.times.accumulate(elapsed);

        if let Some(path) = &self.config.log_file {
            append_timing_summary(path, thread_count(), self.times)?;
        }
        Ok(monitor.finish(Self::NAME, elapsed, None)?)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Accumulated over every `solve` call on this driver.
    fn run_times(&self) -> RunTimes {
        self.times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux::LinearAdvection;
    use crate::mesh::Mesh2D;
    use crate::spatial::{BoundaryCondition, FirstOrderFv};

    fn advection(nx: usize) -> FirstOrderFv<1, LinearAdvection> {
        FirstOrderFv::new(
            Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 0.25, nx, 1).unwrap(),
            LinearAdvection::new(1.0, 0.0),
            BoundaryCondition::Farfield([1.0]),
        )
    }

    #[test]
    fn test_explicit_update_formula() {
        let mut u = StateVector::from_rows(vec![[1.0, 2.0], [0.0, 0.0]]);
        let r = StateVector::from_rows(vec![[1.0, -1.0], [4.0, 2.0]]);
        explicit_update(&mut u, &r, &[0.5, 1.0], &[1.0, 2.0], 0.8);
        // c = 0.4 and 0.4
        assert_eq!(u.rows(), &[[0.6, 2.4], [-1.6, -0.8]]);
    }

    #[test]
    fn test_advection_converges_to_inflow_state() {
        let op = advection(8);
        let mut u = StateVector::from_fn(8, |k| [2.0 + k.get() as f64]);
        let config = SteadySolverConfig::new(1e-10, 2000).with_cfl(0.9);
        let mut solver = SteadyForwardEulerSolver::new(&op, config).unwrap();

        let report = solver.solve(&mut u).unwrap();
        assert!(report.converged, "{report}");
        assert!(report.linear.is_none());
        for row in u.rows() {
            assert!((row[0] - 1.0).abs() < 1e-8, "u = {}", row[0]);
        }
    }

    #[test]
    fn test_state_size_mismatch() {
        let op = advection(4);
        let mut solver =
            SteadyForwardEulerSolver::new(&op, SteadySolverConfig::default()).unwrap();
        let mut u = StateVector::<1>::zeros(3);
        let err = solver.solve(&mut u).unwrap_err();
        assert!(matches!(
            err,
            SolverError::Config(ConfigError::StateSizeMismatch {
                expected: 4,
                got: 3
            })
        ));
    }

    #[test]
    fn test_run_times_accumulate() {
        let op = advection(4);
        let config = SteadySolverConfig::new(1e-12, 5).with_cfl(0.5);
        let mut solver = SteadyForwardEulerSolver::new(&op, config).unwrap();
        let mut u = StateVector::from_fn(4, |k| [k.get() as f64]);

        let first = solver.solve(&mut u).unwrap();
        let after_one = solver.run_times();
        let second = solver.solve(&mut u).unwrap();
        let after_two = solver.run_times();

        assert!((after_one.wall - first.times.wall).abs() < 1e-12);
        assert!((after_two.wall - (first.times.wall + second.times.wall)).abs() < 1e-12);
    }
}
