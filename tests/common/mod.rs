//! Synthetic spatial operators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use fv_march::linalg::block;
use fv_march::{CellIndex, Mesh2D, SpatialOperator, StateVector, SystemMatrix};
use fv_march::linalg::MatrixError;

/// Unit square as a single cell.
pub fn unit_cell() -> Mesh2D {
    Mesh2D::from_cells(
        vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
        vec![vec![0, 1, 2, 3]],
    )
    .unwrap()
}

/// Residual that ignores the state: every cell returns `r`, with `dt`.
pub struct ConstantResidual<const N: usize> {
    pub mesh: Mesh2D,
    pub r: [f64; N],
    pub dt: f64,
}

impl<const N: usize> SpatialOperator<N> for ConstantResidual<N> {
    fn mesh(&self) -> &Mesh2D {
        &self.mesh
    }

    fn compute_residual(
        &self,
        _u: &StateVector<N>,
        residual: &mut StateVector<N>,
        want_time_step: bool,
        dt_local: &mut [f64],
    ) {
        for row in residual.rows_mut() {
            *row = self.r;
        }
        if want_time_step {
            dt_local.fill(self.dt);
        }
    }

    fn compute_jacobian(
        &self,
        _u: &StateVector<N>,
        _matrix: &mut dyn SystemMatrix<N>,
    ) -> Result<(), MatrixError> {
        Ok(())
    }
}

/// Constant residual `r` whose local time step shrinks with the state:
/// `dt_i = dt0 / (1 + 10 |u_i|)`.
pub struct StateDependentStep {
    pub mesh: Mesh2D,
    pub r: f64,
    pub dt0: f64,
}

impl StateDependentStep {
    pub fn time_step(&self, u: f64) -> f64 {
        self.dt0 / (1.0 + 10.0 * u.abs())
    }
}

impl SpatialOperator<1> for StateDependentStep {
    fn mesh(&self) -> &Mesh2D {
        &self.mesh
    }

    fn compute_residual(
        &self,
        u: &StateVector<1>,
        residual: &mut StateVector<1>,
        want_time_step: bool,
        dt_local: &mut [f64],
    ) {
        for k in CellIndex::range(self.mesh.n_cells()) {
            *residual.row_mut(k) = [self.r];
            if want_time_step {
                dt_local[k.get()] = self.time_step(u.row(k)[0]);
            }
        }
    }

    fn compute_jacobian(
        &self,
        _u: &StateVector<1>,
        _matrix: &mut dyn SystemMatrix<1>,
    ) -> Result<(), MatrixError> {
        Ok(())
    }
}

/// Decoupled linear residual `R_i = a_i (u_i - b_i)` on a row of cells.
///
/// Each cell relaxes independently toward `b_i`, so explicit iterations
/// with `cfl * dt_i * a_i / area_i < 1` contract every cell.
pub struct DiagonalLinear<const N: usize> {
    pub mesh: Mesh2D,
    pub a: Vec<f64>,
    pub b: Vec<[f64; N]>,
}

impl<const N: usize> DiagonalLinear<N> {
    pub fn new(n_cells: usize) -> Self {
        let mesh = Mesh2D::uniform_rectangle(0.0, n_cells as f64, 0.0, 1.0, n_cells, 1).unwrap();
        let a = (0..n_cells).map(|i| 1.0 + 0.5 * i as f64).collect();
        let b = (0..n_cells)
            .map(|i| std::array::from_fn(|v| (i + v) as f64 * 0.25 - 1.0))
            .collect();
        Self { mesh, a, b }
    }

    /// The exact steady state.
    pub fn solution(&self) -> StateVector<N> {
        StateVector::from_rows(self.b.clone())
    }
}

impl<const N: usize> SpatialOperator<N> for DiagonalLinear<N> {
    fn mesh(&self) -> &Mesh2D {
        &self.mesh
    }

    fn compute_residual(
        &self,
        u: &StateVector<N>,
        residual: &mut StateVector<N>,
        want_time_step: bool,
        dt_local: &mut [f64],
    ) {
        for k in CellIndex::range(self.mesh.n_cells()) {
            let (uk, bk) = (u.row(k), &self.b[k.get()]);
            let a = self.a[k.get()];
            *residual.row_mut(k) = std::array::from_fn(|v| a * (uk[v] - bk[v]));
            if want_time_step {
                dt_local[k.get()] = self.mesh.area(k) / a;
            }
        }
    }

    fn compute_jacobian(
        &self,
        _u: &StateVector<N>,
        matrix: &mut dyn SystemMatrix<N>,
    ) -> Result<(), MatrixError> {
        for k in CellIndex::range(self.mesh.n_cells()) {
            matrix.add_block(k, k, &block::scaled_identity(self.a[k.get()]))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "diagonal-linear"
    }
}

/// Forwards to an inner operator and counts residual evaluations.
pub struct Counting<S> {
    pub inner: S,
    pub residual_calls: AtomicUsize,
    pub jacobian_calls: AtomicUsize,
}

impl<S> Counting<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            residual_calls: AtomicUsize::new(0),
            jacobian_calls: AtomicUsize::new(0),
        }
    }

    pub fn residual_calls(&self) -> usize {
        self.residual_calls.load(Ordering::SeqCst)
    }

    pub fn jacobian_calls(&self) -> usize {
        self.jacobian_calls.load(Ordering::SeqCst)
    }
}

impl<const N: usize, S: SpatialOperator<N>> SpatialOperator<N> for Counting<S> {
    fn mesh(&self) -> &Mesh2D {
        self.inner.mesh()
    }

    fn compute_residual(
        &self,
        u: &StateVector<N>,
        residual: &mut StateVector<N>,
        want_time_step: bool,
        dt_local: &mut [f64],
    ) {
        self.residual_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .compute_residual(u, residual, want_time_step, dt_local)
    }

    fn compute_jacobian(
        &self,
        u: &StateVector<N>,
        matrix: &mut dyn SystemMatrix<N>,
    ) -> Result<(), MatrixError> {
        self.jacobian_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compute_jacobian(u, matrix)
    }
}

/// Read `step relative_residual` pairs from a convergence log.
pub fn read_convergence_log(path: &std::path::Path) -> Vec<(usize, f64)> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let mut cols = line.split_whitespace();
            let step = cols.next().unwrap().parse().unwrap();
            let rel = cols.next().unwrap().parse().unwrap();
            (step, rel)
        })
        .collect()
}
