//! Spatial discretization interface seen by the drivers.

use crate::linalg::{MatrixError, SystemMatrix};
use crate::mesh::Mesh2D;
use crate::solver::StateVector;

/// A spatial discretization `A du/dt + R(u) = 0` on a finite-volume mesh.
///
/// The drivers own the residual, time-step and matrix buffers and hand them
/// in; an operator must fully overwrite every output it is asked for.
pub trait SpatialOperator<const N: usize>: Send + Sync {
    /// The mesh the operator discretizes on.
    fn mesh(&self) -> &Mesh2D;

    /// Compute the residual `R(u)` (flux balance, outward positive).
    ///
    /// If `want_time_step` is set, also writes the largest stable local
    /// pseudo-time step of every cell into `dt_local`.
    fn compute_residual(
        &self,
        u: &StateVector<N>,
        residual: &mut StateVector<N>,
        want_time_step: bool,
        dt_local: &mut [f64],
    );

    /// Add `∂R/∂u` into `matrix`, which is in an assembly phase.
    fn compute_jacobian(
        &self,
        u: &StateVector<N>,
        matrix: &mut dyn SystemMatrix<N>,
    ) -> Result<(), MatrixError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str {
        "spatial-operator"
    }
}

impl<const N: usize, T: SpatialOperator<N> + ?Sized> SpatialOperator<N> for &T {
    fn mesh(&self) -> &Mesh2D {
        (**self).mesh()
    }

    fn compute_residual(
        &self,
        u: &StateVector<N>,
        residual: &mut StateVector<N>,
        want_time_step: bool,
        dt_local: &mut [f64],
    ) {
        (**self).compute_residual(u, residual, want_time_step, dt_local)
    }

    fn compute_jacobian(
        &self,
        u: &StateVector<N>,
        matrix: &mut dyn SystemMatrix<N>,
    ) -> Result<(), MatrixError> {
        (**self).compute_jacobian(u, matrix)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
