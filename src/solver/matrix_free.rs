//! Matrix-free implicit pseudo-time driver (LU-SGS).
//!
//! Approximates the backward-Euler system with a Rusanov-split Jacobian
//! whose diagonal is a scalar multiple of the identity,
//!
//! ```text
//! D_i = (area_i / (cfl dt_i) + 0.5 sum_f s_f len_f) I
//! ```
//!
//! and relaxes it with symmetric Gauss-Seidel sweeps that evaluate the
//! off-diagonal contributions from flux differences. No matrix is stored.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::config::SteadySolverConfig;
use super::core::StateVector;
use super::error::{ConfigError, SolverError};
use super::steady::{
    ConvergenceMonitor, SteadyReport, SteadySolver, check_state, residual_norm,
};
use crate::flux::InviscidFlux;
use crate::io::{append_timing_summary, thread_count};
use crate::linalg::{Block, LuSgsSweep, block};
use crate::mesh::Mesh2D;
use crate::spatial::SpatialOperator;
use crate::timing::{RunTimer, RunTimes};
use crate::types::CellIndex;

/// Progress line cadence.
const PROGRESS_EVERY: usize = 10;

/// LU-SGS driver over a spatial operator and the flux it discretizes.
///
/// `flux` must be the physical flux used by `space`; the sweep uses it to
/// evaluate the off-diagonal terms.
pub struct MatrixFreeImplicitSolver<const N: usize, S, F> {
    space: S,
    flux: F,
    config: SteadySolverConfig,
    sweep: LuSgsSweep<N>,
    residual: StateVector<N>,
    dt_local: Vec<f64>,
    du: StateVector<N>,
    diag: Vec<Block<N>>,
    times: RunTimes,
}

impl<const N: usize, S, F> MatrixFreeImplicitSolver<N, S, F>
where
    S: SpatialOperator<N>,
    F: InviscidFlux<N>,
{
    const NAME: &'static str = "MatrixFreeImplicitSolver";

    pub fn new(space: S, flux: F, config: SteadySolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = space.mesh().n_cells();
        log::info!(
            "{}: {} LU-SGS sweep(s) per iteration, {} flux",
            Self::NAME,
            config.lusgs_sweeps,
            flux.name()
        );
        Ok(Self {
            space,
            flux,
            config,
            sweep: LuSgsSweep::new(),
            residual: StateVector::zeros(n),
            dt_local: vec![0.0; n],
            du: StateVector::zeros(n),
            diag: vec![block::zero::<N>(); n],
            times: RunTimes::default(),
        })
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn config(&self) -> &SteadySolverConfig {
        &self.config
    }

    /// Diagonal blocks of the last iteration.
    pub fn diagonal(&self) -> &[Block<N>] {
        &self.diag
    }
}

/// `D_i = (area_i / (cfl dt_i) + 0.5 sum_f s_f len_f) I` for every cell.
fn lusgs_diagonal<const N: usize, F: InviscidFlux<N>>(
    mesh: &Mesh2D,
    flux: &F,
    u: &StateVector<N>,
    dt_local: &[f64],
    cfl: f64,
    diag: &mut [Block<N>],
) {
    let kernel = |(k, d): (usize, &mut Block<N>)| {
        let cell = CellIndex::new(k);
        let u_i = u.row(cell);
        let wave: f64 = mesh
            .cell_faces(cell)
            .iter()
            .map(|cf| {
                let s = flux.spectral_radius(u_i, cf.normal);
                let s = match cf.neighbor {
                    Some(j) => s.max(flux.spectral_radius(u.row(j), cf.normal)),
                    None => s,
                };
                s * cf.length
            })
            .sum();
        *d = block::scaled_identity(mesh.area(cell) / (cfl * dt_local[k]) + 0.5 * wave);
    };

    #[cfg(feature = "parallel")]
    diag.par_iter_mut().enumerate().for_each(kernel);
    #[cfg(not(feature = "parallel"))]
    diag.iter_mut().enumerate().for_each(kernel);
}

impl<const N: usize, S, F> SteadySolver<N> for MatrixFreeImplicitSolver<N, S, F>
where
    S: SpatialOperator<N>,
    F: InviscidFlux<N>,
{
    fn solve(&mut self, u: &mut StateVector<N>) -> Result<SteadyReport, SolverError> {
        let mesh = self.space.mesh();
        check_state(mesh, u)?;

        if self.config.max_iter == 0 {
            log::info!("{}: no iterations to be done", Self::NAME);
            return Ok(SteadyReport::not_run());
        }

        let timer = RunTimer::start();
        let mut monitor = ConvergenceMonitor::start(&self.config)?;
        let ramp = self.config.ramp();

        while monitor.keep_going() {
            let step = monitor.step();

            self.residual.fill(0.0);
            self.space
                .compute_residual(u, &mut self.residual, true, &mut self.dt_local);

            let cfl = ramp.at(step).cfl;
            lusgs_diagonal(mesh, &self.flux, u, &self.dt_local, cfl, &mut self.diag);

            self.du.fill(0.0);
            for _ in 0..self.config.lusgs_sweeps {
                self.sweep
                    .sweep(mesh, &self.flux, u, &self.residual, &self.diag, &mut self.du)?;
            }
            u.axpy(1.0, &self.du);

            let rel = monitor.record(residual_norm(mesh.areas(), &self.residual))?;
            if step % PROGRESS_EVERY == 0 {
                log::info!(
                    "{}: step {step}, rel residual {rel:e}, CFL = {cfl}",
                    Self::NAME
                );
            }
        }

        self.times = timer.elapsed();
        if let Some(path) = &self.config.log_file {
            append_timing_summary(path, thread_count(), self.times)?;
        }
        Ok(monitor.finish(Self::NAME, self.times, None)?)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Wall and CPU time of the last `solve` call.
    fn run_times(&self) -> RunTimes {
        self.times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux::{EulerFlux, LinearAdvection};
    use crate::spatial::{BoundaryCondition, FirstOrderFv};

    #[test]
    fn test_diagonal_formula() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 2.0, 0.0, 1.0, 2, 1).unwrap();
        let flux = LinearAdvection::new(1.0, 0.0);
        let u = StateVector::from_rows(vec![[1.0], [2.0]]);
        let mut diag = vec![block::zero::<1>(); 2];
        lusgs_diagonal(&mesh, &flux, &u, &[0.5, 0.25], 4.0, &mut diag);

        // area 1, two unit x-faces with s = 1, y-faces s = 0
        assert!((diag[0][0][0] - (1.0 / 2.0 + 1.0)).abs() < 1e-14);
        assert!((diag[1][0][0] - (1.0 / 1.0 + 1.0)).abs() < 1e-14);
    }

    #[test]
    fn test_advection_converges() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 5, 5).unwrap();
        let flux = LinearAdvection::new(1.0, 0.5);
        let op = FirstOrderFv::new(mesh, flux, BoundaryCondition::Farfield([1.0]));
        let config = SteadySolverConfig::new(1e-10, 200).with_cfl_ramp(5.0, 1e6, 0, 10);
        let mut solver = MatrixFreeImplicitSolver::new(&op, flux, config).unwrap();
        let mut u = StateVector::from_fn(25, |k| [2.0 - 0.03 * k.get() as f64]);

        let report = solver.solve(&mut u).unwrap();
        assert!(report.converged, "{report}");
        assert!(u.rows().iter().all(|r| (r[0] - 1.0).abs() < 1e-8));
    }

    #[test]
    fn test_euler_residual_decreases() {
        let gamma = 1.4;
        let free = EulerFlux::conserved_from_primitive(1.0, 0.5, 0.1, 1.0 / gamma, gamma);
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 4, 4).unwrap();
        let flux = EulerFlux::new(gamma);
        let op = FirstOrderFv::new(mesh, flux, BoundaryCondition::Farfield(free));
        let config = SteadySolverConfig::new(1e-6, 100)
            .with_cfl_ramp(2.0, 50.0, 0, 20)
            .with_lusgs_sweeps(2);
        let mut solver = MatrixFreeImplicitSolver::new(&op, flux, config).unwrap();

        let mut u = StateVector::from_fn(16, |k| {
            let bump = if k.get() == 5 { 1.1 } else { 1.0 };
            EulerFlux::conserved_from_primitive(bump, 0.5, 0.1, bump / gamma, gamma)
        });
        let report = solver.solve(&mut u).unwrap();
        assert!(u.is_finite());
        assert!(report.relative_residual < 1e-2, "{report}");
    }
}
