//! First-order cell-centred finite-volume operator with Rusanov fluxes.
//!
//! For cell i with area A_i:
//!
//! ```text
//! R_i   = sum_f F*(u_i, u_f; n_f) len_f
//! dt_i  = A_i / sum_f s_f len_f
//! ```
//!
//! where `u_f` is the neighbour state or the boundary ghost state, `n_f`
//! the outward normal and `s_f` the larger spectral radius of the two
//! sides. The Jacobian freezes `s_f`:
//!
//! ```text
//! ∂R_i/∂u_i += 0.5 (A(u_i)·n + s I) len     ∂R_i/∂u_j += 0.5 (A(u_j)·n - s I) len
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::traits::SpatialOperator;
use crate::flux::{InviscidFlux, rusanov_flux};
use crate::linalg::{MatrixError, SystemMatrix, block};
use crate::mesh::{CellFace, Mesh2D};
use crate::solver::StateVector;
use crate::types::CellIndex;

/// Boundary treatment applied to every boundary face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundaryCondition<const N: usize> {
    /// Fixed exterior state.
    Farfield([f64; N]),
    /// Ghost state equals the interior state (zero gradient).
    Extrapolate,
}

/// First-order finite-volume operator.
#[derive(Clone, Debug)]
pub struct FirstOrderFv<const N: usize, F> {
    mesh: Mesh2D,
    flux: F,
    boundary: BoundaryCondition<N>,
}

impl<const N: usize, F: InviscidFlux<N>> FirstOrderFv<N, F> {
    pub fn new(mesh: Mesh2D, flux: F, boundary: BoundaryCondition<N>) -> Self {
        Self {
            mesh,
            flux,
            boundary,
        }
    }

    /// The physical flux.
    pub fn flux(&self) -> &F {
        &self.flux
    }

    /// The boundary treatment.
    pub fn boundary(&self) -> &BoundaryCondition<N> {
        &self.boundary
    }

    #[inline]
    fn exterior<'a>(&'a self, u: &'a StateVector<N>, u_i: &'a [f64; N], cf: &CellFace) -> &'a [f64; N] {
        match (cf.neighbor, &self.boundary) {
            (Some(j), _) => u.row(j),
            (None, BoundaryCondition::Farfield(ghost)) => ghost,
            (None, BoundaryCondition::Extrapolate) => u_i,
        }
    }

    /// Residual and time step of one cell.
    fn cell_residual(&self, u: &StateVector<N>, k: CellIndex) -> ([f64; N], f64) {
        let u_i = u.row(k);
        let mut r = [0.0; N];
        let mut wave = 0.0;
        for cf in self.mesh.cell_faces(k) {
            let u_o = self.exterior(u, u_i, cf);
            let f = rusanov_flux(&self.flux, u_i, u_o, cf.normal);
            for (rv, fv) in r.iter_mut().zip(f) {
                *rv += fv * cf.length;
            }
            let s = self
                .flux
                .spectral_radius(u_i, cf.normal)
                .max(self.flux.spectral_radius(u_o, cf.normal));
            wave += s * cf.length;
        }
        let dt = if wave > 0.0 {
            self.mesh.area(k) / wave
        } else {
            f64::MAX
        };
        (r, dt)
    }
}

impl<const N: usize, F: InviscidFlux<N>> SpatialOperator<N> for FirstOrderFv<N, F> {
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
        if !want_time_step {
            let kernel = |(k, r): (usize, &mut [f64; N])| {
                *r = self.cell_residual(u, CellIndex::new(k)).0;
            };
            #[cfg(feature = "parallel")]
            residual.rows_mut().par_iter_mut().enumerate().for_each(kernel);
            #[cfg(not(feature = "parallel"))]
            residual.rows_mut().iter_mut().enumerate().for_each(kernel);
            return;
        }

        assert_eq!(
            dt_local.len(),
            residual.n_cells(),
            "dt_local must hold one entry per cell"
        );
        let kernel = |(k, (r, dt)): (usize, (&mut [f64; N], &mut f64))| {
            (*r, *dt) = self.cell_residual(u, CellIndex::new(k));
        };

        #[cfg(feature = "parallel")]
        residual
            .rows_mut()
            .par_iter_mut()
            .zip(dt_local.par_iter_mut())
            .enumerate()
            .for_each(kernel);
        #[cfg(not(feature = "parallel"))]
        residual
            .rows_mut()
            .iter_mut()
            .zip(dt_local.iter_mut())
            .enumerate()
            .for_each(kernel);
    }

    fn compute_jacobian(
        &self,
        u: &StateVector<N>,
        matrix: &mut dyn SystemMatrix<N>,
    ) -> Result<(), MatrixError> {
        for k in CellIndex::range(self.mesh.n_cells()) {
            let u_i = u.row(k);
            for cf in self.mesh.cell_faces(k) {
                let u_o = self.exterior(u, u_i, cf);
                let s = self
                    .flux
                    .spectral_radius(u_i, cf.normal)
                    .max(self.flux.spectral_radius(u_o, cf.normal));
                let half_len = 0.5 * cf.length;

                let a_i = self.flux.flux_jacobian(u_i, cf.normal);
                let mut d = block::scaled_identity::<N>(s);
                block::add_assign(&mut d, &a_i);

                match (cf.neighbor, &self.boundary) {
                    (Some(j), _) => {
                        matrix.add_block(k, k, &block::scaled(&d, half_len))?;
                        let mut o = self.flux.flux_jacobian(u_o, cf.normal);
                        block::sub_assign(&mut o, &block::scaled_identity(s));
                        matrix.add_block(k, j, &block::scaled(&o, half_len))?;
                    }
                    (None, BoundaryCondition::Farfield(_)) => {
                        matrix.add_block(k, k, &block::scaled(&d, half_len))?;
                    }
                    (None, BoundaryCondition::Extrapolate) => {
                        // F*(u_i, u_i) = F(u_i)·n
                        matrix.add_block(k, k, &block::scaled(&a_i, cf.length))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "first-order-fv"
    }
}
