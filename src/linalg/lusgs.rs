//! Matrix-free LU-SGS sweep.
//!
//! Solves the implicit pseudo-time system
//!
//! ```text
//! D_i du_i + sum_j 0.5 len_ij [ (F(u_j + du_j) - F(u_j))·n_ij - s_ij du_j ] = -R_i
//! ```
//!
//! approximately by one symmetric Gauss-Seidel sweep over the cells: a
//! forward pass in ascending cell order, then a backward pass in descending
//! order. Off-diagonal products are replaced by flux differences, so no
//! system matrix is assembled. `n_ij` is the outward normal of cell i and
//! `s_ij` the face spectral radius. Boundary faces contribute nothing.
//!
//! Reference: H. Luo, D. Sharov, J.D. Baum and R. Löhner, "A class of
//! matrix-free implicit methods for compressible flows on unstructured
//! grids", 2001.

use super::block::Block;
use super::dense::gauss_elim;
use super::error::LinearSolverError;
use crate::flux::InviscidFlux;
use crate::mesh::Mesh2D;
use crate::solver::StateVector;
use crate::types::CellIndex;

/// One forward + backward LU-SGS sweep.
///
/// Holds the flux scratch used while visiting one cell's neighbours.
#[derive(Clone, Debug)]
pub struct LuSgsSweep<const N: usize> {
    /// F(u_j + du_j)·n
    f1: [f64; N],
    /// F(u_j)·n
    f2: [f64; N],
    /// u_j + du_j
    u_pdu: [f64; N],
}

impl<const N: usize> Default for LuSgsSweep<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LuSgsSweep<N> {
    pub fn new() -> Self {
        Self {
            f1: [0.0; N],
            f2: [0.0; N],
            u_pdu: [0.0; N],
        }
    }

    /// Run one sweep, updating `du` in place.
    ///
    /// `du` holds the starting correction (usually zero); neighbours always
    /// contribute with their latest available correction. `residual` and
    /// `diag` are read only.
    pub fn sweep<F: InviscidFlux<N> + ?Sized>(
        &mut self,
        mesh: &Mesh2D,
        flux: &F,
        u: &StateVector<N>,
        residual: &StateVector<N>,
        diag: &[Block<N>],
        du: &mut StateVector<N>,
    ) -> Result<(), LinearSolverError> {
        let n = mesh.n_cells();
        for i in CellIndex::range(n) {
            self.relax_cell(mesh, flux, u, residual, diag, du, i)?;
        }
        for i in CellIndex::range(n).rev() {
            self.relax_cell(mesh, flux, u, residual, diag, du, i)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn relax_cell<F: InviscidFlux<N> + ?Sized>(
        &mut self,
        mesh: &Mesh2D,
        flux: &F,
        u: &StateVector<N>,
        residual: &StateVector<N>,
        diag: &[Block<N>],
        du: &mut StateVector<N>,
        i: CellIndex,
    ) -> Result<(), LinearSolverError> {
        let mut rhs = residual.get(i);
        for v in rhs.iter_mut() {
            *v = -*v;
        }

        let u_i = u.row(i);
        for cf in mesh.cell_faces(i) {
            let Some(j) = cf.neighbor else { continue };
            let u_j = u.row(j);
            let du_j = du.row(j);

            for ((up, a), b) in self.u_pdu.iter_mut().zip(u_j).zip(du_j) {
                *up = a + b;
            }
            self.f1 = flux.flux(&self.u_pdu, cf.normal);
            self.f2 = flux.flux(u_j, cf.normal);
            let s = flux
                .spectral_radius(u_i, cf.normal)
                .max(flux.spectral_radius(u_j, cf.normal));

            let half_len = 0.5 * cf.length;
            for k in 0..N {
                rhs[k] -= half_len * (self.f1[k] - self.f2[k] - s * du_j[k]);
            }
        }

        let sol = gauss_elim(diag[i.get()], rhs)
            .map_err(|source| LinearSolverError::SingularBlock {
                row: i.get(),
                source,
            })?;
        du.set(i, sol);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux::{EulerFlux, LinearAdvection};
    use crate::linalg::block::{identity, scaled_identity};

    fn unit_square() -> Mesh2D {
        Mesh2D::from_cells(
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            vec![vec![0, 1, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_isolated_cell_fixed_point() {
        let mesh = unit_square();
        let flux = EulerFlux::default();
        let u = StateVector::from_rows(vec![EulerFlux::conserved_from_primitive(
            1.0, 0.2, 0.1, 1.0, 1.4,
        )]);
        let r = StateVector::from_rows(vec![[0.5, -1.0, 2.0, 0.25]]);
        let diag = vec![identity::<4>()];
        let mut du = StateVector::zeros(1);

        let mut lusgs = LuSgsSweep::new();
        lusgs.sweep(&mesh, &flux, &u, &r, &diag, &mut du).unwrap();
        assert_eq!(du.row(CellIndex::ZERO), &[-0.5, 1.0, -2.0, -0.25]);

        let first = du.clone();
        lusgs.sweep(&mesh, &flux, &u, &r, &diag, &mut du).unwrap();
        assert_eq!(du, first);
    }

    #[test]
    fn test_does_not_touch_inputs() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 3.0, 0.0, 1.0, 3, 1).unwrap();
        let flux = LinearAdvection::new(1.0, 0.0);
        let u = StateVector::from_rows(vec![[1.0], [2.0], [3.0]]);
        let r = StateVector::from_rows(vec![[0.1], [0.2], [0.3]]);
        let diag = vec![scaled_identity::<1>(4.0); 3];
        let (u0, r0, d0) = (u.clone(), r.clone(), diag.clone());

        let mut du = StateVector::zeros(3);
        LuSgsSweep::new()
            .sweep(&mesh, &flux, &u, &r, &diag, &mut du)
            .unwrap();
        assert_eq!(u, u0);
        assert_eq!(r, r0);
        assert_eq!(diag, d0);
        assert!(du.max_abs() > 0.0);
    }

    #[test]
    fn test_upwind_chain_forward_pass() {
        // Advection to the right on a 1D chain: the downwind cell sees the
        // upwind correction, the upwind cell ignores the downwind one.
        let mesh = Mesh2D::uniform_rectangle(0.0, 2.0, 0.0, 1.0, 2, 1).unwrap();
        let flux = LinearAdvection::new(1.0, 0.0);
        let u = StateVector::from_rows(vec![[0.0], [0.0]]);
        let r = StateVector::from_rows(vec![[-1.0], [0.0]]);
        let d = 2.0;
        let diag = vec![scaled_identity::<1>(d); 2];

        let mut du = StateVector::zeros(2);
        LuSgsSweep::new()
            .sweep(&mesh, &flux, &u, &r, &diag, &mut du)
            .unwrap();

        // cell 0: outward normal +x to cell 1, a·n = 1, s = 1:
        //   contribution 0.5 (du_1 - du_1) = 0, so du_0 = 1 / d
        // cell 1: outward normal -x to cell 0, a·n = -1, s = 1:
        //   contribution 0.5 (-du_0 - du_0) = -du_0, so du_1 = du_0 / d
        let du0 = 1.0 / d;
        assert!((du.row(CellIndex::new(0))[0] - du0).abs() < 1e-15);
        assert!((du.row(CellIndex::new(1))[0] - du0 / d).abs() < 1e-15);
    }

    #[test]
    fn test_singular_diagonal() {
        let mesh = unit_square();
        let flux = LinearAdvection::new(1.0, 0.0);
        let u = StateVector::from_rows(vec![[1.0]]);
        let r = StateVector::from_rows(vec![[1.0]]);
        let mut du = StateVector::zeros(1);
        let err = LuSgsSweep::new()
            .sweep(&mesh, &flux, &u, &r, &[[[0.0]]], &mut du)
            .unwrap_err();
        assert!(matches!(err, LinearSolverError::SingularBlock { row: 0, .. }));
    }
}
