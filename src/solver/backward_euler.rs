//! Implicit backward-Euler pseudo-time driver.
//!
//! Each iteration solves the linearized system
//!
//! ```text
//! (area_i / (cfl dt_i) I + ∂R/∂u) du = -R(u)
//! u <- u + du
//! ```
//!
//! with a CFL number and linear iteration cap following the configured
//! ramp. The system matrix is assembled into a block CSR matrix whose
//! pattern is taken from the mesh and frozen after the first assembly.

use super::config::SteadySolverConfig;
use super::core::StateVector;
use super::error::{ConfigError, SolverError};
use super::ramp::RampValues;
use super::steady::{
    ConvergenceMonitor, LinearStats, SteadyReport, SteadySolver, check_state, residual_norm,
    select,
};
use crate::io::{ImplicitRunSummary, append_implicit_summary, thread_count};
use crate::linalg::{
    BlockSparseMatrix, LinearSolver, LinearSolverKind, MatrixError, PreconditionerKind,
    SystemMatrix, block,
};
use crate::spatial::SpatialOperator;
use crate::timing::{RunTimer, RunTimes};
use crate::types::CellIndex;

/// Progress line cadence.
const PROGRESS_EVERY: usize = 10;

/// Implicit driver with an assembled Jacobian and a Krylov solver.
pub struct SteadyBackwardEulerSolver<const N: usize, S> {
    space: S,
    config: SteadySolverConfig,
    preconditioner_kind: PreconditionerKind,
    linear_solver_kind: LinearSolverKind,
    matrix: BlockSparseMatrix<N>,
    linear_solver: Box<dyn LinearSolver<N>>,
    residual: StateVector<N>,
    dt_local: Vec<f64>,
    du: StateVector<N>,
    rhs: Vec<f64>,
    times: RunTimes,
}

impl<const N: usize, S: SpatialOperator<N>> SteadyBackwardEulerSolver<N, S> {
    const NAME: &'static str = "SteadyBackwardEulerSolver";

    /// Build the driver, its system matrix and its linear solver.
    ///
    /// Unknown solver or preconditioner names fall back to Richardson and no
    /// preconditioning unless `config.strict_selection` is set.
    pub fn new(space: S, config: SteadySolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let preconditioner_kind: PreconditionerKind =
            select(&config.preconditioner, config.strict_selection)?;
        let linear_solver_kind: LinearSolverKind =
            select(&config.linear_solver, config.strict_selection)?;

        log::info!("{}: selected {preconditioner_kind} preconditioner", Self::NAME);
        match linear_solver_kind {
            LinearSolverKind::Gmres => log::info!(
                "{}: GMRES solver selected, restart after {} iterations",
                Self::NAME,
                config.restart_vecs
            ),
            kind => log::info!("{}: {kind} solver selected", Self::NAME),
        }

        let mesh = space.mesh();
        let n = mesh.n_cells();
        let matrix = BlockSparseMatrix::from_mesh(mesh);
        let linear_solver =
            linear_solver_kind.create(preconditioner_kind.create::<N>(), config.restart_vecs);

        Ok(Self {
            space,
            config,
            preconditioner_kind,
            linear_solver_kind,
            matrix,
            linear_solver,
            residual: StateVector::zeros(n),
            dt_local: vec![0.0; n],
            du: StateVector::zeros(n),
            rhs: vec![0.0; n * N],
            times: RunTimes::default(),
        })
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn config(&self) -> &SteadySolverConfig {
        &self.config
    }

    /// The preconditioner actually in use.
    pub fn preconditioner_kind(&self) -> PreconditionerKind {
        self.preconditioner_kind
    }

    /// The linear solver actually in use.
    pub fn linear_solver_kind(&self) -> LinearSolverKind {
        self.linear_solver_kind
    }

    /// The system matrix of the last iteration.
    pub fn matrix(&self) -> &BlockSparseMatrix<N> {
        &self.matrix
    }

    /// Linear solver wall and CPU time of the last `solve`.
    pub fn linear_run_times(&self) -> RunTimes {
        self.linear_solver.run_times()
    }

    /// Assemble `area_i / (cfl dt_i) I + ∂R/∂u` for the current state.
    fn assemble(&mut self, u: &StateVector<N>, cfl: f64) -> Result<(), MatrixError> {
        if self.matrix.is_assembling() {
            self.matrix.end_assembly()?;
        }
        self.matrix.set_all_zero();
        self.matrix.begin_assembly()?;
        self.space.compute_jacobian(u, &mut self.matrix)?;

        let areas = self.space.mesh().areas();
        for (k, (&area, &dt)) in areas.iter().zip(&self.dt_local).enumerate() {
            let d = block::scaled_identity::<N>(area / (cfl * dt));
            self.matrix.update_diag_block(CellIndex::new(k), &d)?;
        }

        self.matrix.end_assembly()?;
        self.matrix.freeze_pattern();
        Ok(())
    }
}

impl<const N: usize, S: SpatialOperator<N>> SteadySolver<N> for SteadyBackwardEulerSolver<N, S> {
    fn solve(&mut self, u: &mut StateVector<N>) -> Result<SteadyReport, SolverError> {
        check_state(self.space.mesh(), u)?;

        if self.config.max_iter == 0 {
            log::info!("{}: no iterations to be done", Self::NAME);
            return Ok(SteadyReport::not_run());
        }

        self.times = RunTimes::default();
        self.linear_solver.reset_run_times();

        let timer = RunTimer::start();
        let mut monitor = ConvergenceMonitor::start(&self.config)?;
        let ramp = self.config.ramp();
        let mut total_linear_iterations = 0usize;

        while monitor.keep_going() {
            let step = monitor.step();

            self.residual.fill(0.0);
            self.space
                .compute_residual(u, &mut self.residual, true, &mut self.dt_local);

            let RampValues { cfl, lin_max_iter } = ramp.at(step);
            self.assemble(u, cfl)?;

            self.linear_solver.setup_preconditioner(&self.matrix)?;
            self.linear_solver
                .set_params(self.config.lin_tol, lin_max_iter);

            for (b, r) in self.rhs.iter_mut().zip(self.residual.as_slice()) {
                *b = -r;
            }
            self.du.fill(0.0);
            let lin_iters =
                self.linear_solver
                    .solve(&self.matrix, &self.rhs, self.du.as_mut_slice())?;
            total_linear_iterations += lin_iters;

            u.axpy(1.0, &self.du);

            let rel = monitor.record(residual_norm(self.space.mesh().areas(), &self.residual))?;
            if step % PROGRESS_EVERY == 0 {
                log::info!("{}: step {step}, rel residual {rel:e}", Self::NAME);
            }
            log::debug!(
                "{}: step {step}, CFL = {cfl}, lin max iters = {lin_max_iter}, iters used = {lin_iters}",
                Self::NAME
            );
        }

        self.times = timer.elapsed();
        let steps = monitor.step();
        let linear_times = self.linear_solver.run_times();
        let average_iterations = total_linear_iterations as f64 / steps as f64;

        log::info!(
            "{}: linear solver wall time = {:.3}s, CPU time = {:.3}s, average iterations = {:.2}",
            Self::NAME,
            linear_times.wall,
            linear_times.cpu,
            average_iterations
        );

        if let Some(path) = &self.config.log_file {
            let summary = ImplicitRunSummary {
                n_cells: self.space.mesh().n_cells(),
                threads: thread_count(),
                linear: linear_times,
                average_linear_iterations: average_iterations,
                steps,
            };
            append_implicit_summary(path, &summary)?;
        }

        let linear = LinearStats {
            average_iterations,
            wall: linear_times.wall,
            cpu: linear_times.cpu,
        };
        Ok(monitor.finish(Self::NAME, self.times, Some(linear))?)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Wall and CPU time of the last `solve` call.
    fn run_times(&self) -> RunTimes {
        self.times
    }
}
