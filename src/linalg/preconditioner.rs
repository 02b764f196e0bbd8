//! Block preconditioners for the implicit system.
//!
//! A preconditioner approximates `M⁻¹` for the block-sparse system matrix.
//! It is rebuilt from the current matrix values once per nonlinear
//! iteration through [`Preconditioner::update`] and then applied once or more
//! per Krylov iteration.
//!
//! # Preconditioner types
//!
//! - [`NoPreconditioner`]: identity
//! - [`BlockJacobi`]: inverse of the diagonal blocks
//! - [`BlockSgs`]: one symmetric block Gauss-Seidel sweep, `(D+L) D⁻¹ (D+U)`
//! - [`BlockIlu0`]: block incomplete LU on the matrix pattern

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::block::{self, Block};
use super::block_matrix::BlockSparseMatrix;
use super::dense::invert_block;
use super::error::LinearSolverError;

/// Approximate inverse of the system matrix.
pub trait Preconditioner<const N: usize>: Send + Sync {
    /// Rebuild from the current matrix values.
    fn update(&mut self, matrix: &BlockSparseMatrix<N>) -> Result<(), LinearSolverError>;

    /// z = M⁻¹ r
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), LinearSolverError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}

fn invert_diagonal<const N: usize>(
    matrix: &BlockSparseMatrix<N>,
) -> Result<Vec<Block<N>>, LinearSolverError> {
    (0..matrix.n())
        .map(|i| {
            invert_block(matrix.diag_block(i))
                .map_err(|source| LinearSolverError::SingularBlock { row: i, source })
        })
        .collect()
}

#[inline]
fn check_ready(n_rows: usize, n: usize, len: usize) -> Result<(), LinearSolverError> {
    if n_rows * n != len {
        return Err(LinearSolverError::PreconditionerNotSetUp);
    }
    Ok(())
}

// =============================================================================
// Identity
// =============================================================================

/// No preconditioning: z = r.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPreconditioner;

impl<const N: usize> Preconditioner<N> for NoPreconditioner {
    fn update(&mut self, _matrix: &BlockSparseMatrix<N>) -> Result<(), LinearSolverError> {
        Ok(())
    }

    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), LinearSolverError> {
        z.copy_from_slice(r);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

// =============================================================================
// Block Jacobi
// =============================================================================

/// Block Jacobi: z_i = D_i⁻¹ r_i.
#[derive(Clone, Debug, Default)]
pub struct BlockJacobi<const N: usize> {
    inv_diag: Vec<Block<N>>,
}

impl<const N: usize> BlockJacobi<N> {
    pub fn new() -> Self {
        Self {
            inv_diag: Vec::new(),
        }
    }
}

impl<const N: usize> Preconditioner<N> for BlockJacobi<N> {
    fn update(&mut self, matrix: &BlockSparseMatrix<N>) -> Result<(), LinearSolverError> {
        self.inv_diag = invert_diagonal(matrix)?;
        Ok(())
    }

    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), LinearSolverError> {
        check_ready(self.inv_diag.len(), N, r.len())?;

        let kernel = |(i, zi): (usize, &mut [f64])| {
            let ri = &r[i * N..(i + 1) * N];
            for (zv, drow) in zi.iter_mut().zip(&self.inv_diag[i]) {
                *zv = drow.iter().zip(ri).map(|(a, b)| a * b).sum();
            }
        };
        #[cfg(feature = "parallel")]
        z.par_chunks_mut(N).enumerate().for_each(kernel);
        #[cfg(not(feature = "parallel"))]
        z.chunks_mut(N).enumerate().for_each(kernel);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "block-jacobi"
    }
}

// =============================================================================
// Block symmetric Gauss-Seidel
// =============================================================================

/// Block symmetric Gauss-Seidel.
///
/// Applies `(D+U)⁻¹ D (D+L)⁻¹` as a forward then a backward sweep.
#[derive(Clone, Debug, Default)]
pub struct BlockSgs<const N: usize> {
    matrix: Option<BlockSparseMatrix<N>>,
    inv_diag: Vec<Block<N>>,
}

impl<const N: usize> BlockSgs<N> {
    pub fn new() -> Self {
        Self {
            matrix: None,
            inv_diag: Vec::new(),
        }
    }
}

impl<const N: usize> Preconditioner<N> for BlockSgs<N> {
    fn update(&mut self, matrix: &BlockSparseMatrix<N>) -> Result<(), LinearSolverError> {
        self.inv_diag = invert_diagonal(matrix)?;
        match &mut self.matrix {
            Some(m) if m.nnz_blocks() == matrix.nnz_blocks() => {
                m.blocks_mut().copy_from_slice(matrix.blocks());
            }
            slot => *slot = Some(matrix.clone()),
        }
        Ok(())
    }

    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), LinearSolverError> {
        let a = self
            .matrix
            .as_ref()
            .ok_or(LinearSolverError::PreconditionerNotSetUp)?;
        check_ready(a.n(), N, r.len())?;
        let (cols, blocks, diag) = (a.col_idx(), a.blocks(), a.diag_ptr());

        // forward: (D + L) w = r, stored in z
        for i in 0..a.n() {
            let mut t = [0.0; N];
            t.copy_from_slice(&r[i * N..(i + 1) * N]);
            for p in a.row_range(i).start..diag[i] {
                let j = cols[p];
                block::matvec_sub(&blocks[p], &z[j * N..(j + 1) * N], &mut t);
            }
            z[i * N..(i + 1) * N].copy_from_slice(&block::matvec(&self.inv_diag[i], &t));
        }

        // backward: z_i = w_i - D_i⁻¹ sum_{j>i} A_ij z_j
        for i in (0..a.n()).rev() {
            let mut t = [0.0; N];
            for p in (diag[i] + 1)..a.row_range(i).end {
                let j = cols[p];
                block::matvec_sub(&blocks[p], &z[j * N..(j + 1) * N], &mut t);
            }
            let corr = block::matvec(&self.inv_diag[i], &t);
            for (zv, c) in z[i * N..(i + 1) * N].iter_mut().zip(corr) {
                *zv += c;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "block-sgs"
    }
}

// =============================================================================
// Block ILU(0)
// =============================================================================

/// Block incomplete LU factorization with zero fill-in.
///
/// `L` (unit lower) and `U` share the storage of a copy of the matrix; the
/// inverted diagonal blocks of `U` are kept separately.
#[derive(Clone, Debug, Default)]
pub struct BlockIlu0<const N: usize> {
    factors: Option<BlockSparseMatrix<N>>,
    inv_diag: Vec<Block<N>>,
}

impl<const N: usize> BlockIlu0<N> {
    pub fn new() -> Self {
        Self {
            factors: None,
            inv_diag: Vec::new(),
        }
    }

    fn factorize(f: &mut BlockSparseMatrix<N>) -> Result<Vec<Block<N>>, LinearSolverError> {
        let n = f.n();
        let mut inv_diag: Vec<Block<N>> = Vec::with_capacity(n);

        for i in 0..n {
            let range = f.row_range(i);
            let diag_i = f.diag_ptr()[i];

            for p in range.start..diag_i {
                let k = f.col_idx()[p];
                // L_ik = A_ik U_kk⁻¹
                let l_ik = block::matmul(&f.blocks()[p], &inv_diag[k]);
                f.blocks_mut()[p] = l_ik;

                // A_ij -= L_ik U_kj for j > k within the pattern of row i
                for q in (p + 1)..range.end {
                    let j = f.col_idx()[q];
                    if let Some(kj) = f.find(k, j) {
                        let prod = block::matmul(&l_ik, &f.blocks()[kj]);
                        block::sub_assign(&mut f.blocks_mut()[q], &prod);
                    }
                }
            }

            let inv = invert_block(&f.blocks()[diag_i])
                .map_err(|source| LinearSolverError::SingularBlock { row: i, source })?;
            inv_diag.push(inv);
        }
        Ok(inv_diag)
    }
}

impl<const N: usize> Preconditioner<N> for BlockIlu0<N> {
    fn update(&mut self, matrix: &BlockSparseMatrix<N>) -> Result<(), LinearSolverError> {
        let factors = match &mut self.factors {
            Some(f) if f.nnz_blocks() == matrix.nnz_blocks() => {
                f.blocks_mut().copy_from_slice(matrix.blocks());
                f
            }
            slot => slot.insert(matrix.clone()),
        };
        self.inv_diag = Self::factorize(factors)?;
        Ok(())
    }

    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), LinearSolverError> {
        let f = self
            .factors
            .as_ref()
            .ok_or(LinearSolverError::PreconditionerNotSetUp)?;
        check_ready(f.n(), N, r.len())?;
        let (cols, blocks, diag) = (f.col_idx(), f.blocks(), f.diag_ptr());

        // L y = r (unit diagonal)
        z.copy_from_slice(r);
        for i in 0..f.n() {
            let mut t = [0.0; N];
            t.copy_from_slice(&z[i * N..(i + 1) * N]);
            for p in f.row_range(i).start..diag[i] {
                let j = cols[p];
                block::matvec_sub(&blocks[p], &z[j * N..(j + 1) * N], &mut t);
            }
            z[i * N..(i + 1) * N].copy_from_slice(&t);
        }

        // U z = y
        for i in (0..f.n()).rev() {
            let mut t = [0.0; N];
            t.copy_from_slice(&z[i * N..(i + 1) * N]);
            for p in (diag[i] + 1)..f.row_range(i).end {
                let j = cols[p];
                block::matvec_sub(&blocks[p], &z[j * N..(j + 1) * N], &mut t);
            }
            z[i * N..(i + 1) * N].copy_from_slice(&block::matvec(&self.inv_diag[i], &t));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "block-ilu0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::block_matrix::SystemMatrix;
    use crate::types::CellIndex;

    /// Tridiagonal 1D Laplacian-like matrix with 1x1 blocks: [-1, 4, -1].
    fn tridiag(n: usize) -> BlockSparseMatrix<1> {
        let rows: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                let mut r = Vec::new();
                if i > 0 {
                    r.push(i - 1);
                }
                if i + 1 < n {
                    r.push(i + 1);
                }
                r
            })
            .collect();
        let mut m = BlockSparseMatrix::with_pattern(n, &rows).unwrap();
        m.begin_assembly().unwrap();
        for i in 0..n {
            let c = CellIndex::new(i);
            m.update_diag_block(c, &[[4.0]]).unwrap();
            if i > 0 {
                m.add_block(c, CellIndex::new(i - 1), &[[-1.0]]).unwrap();
            }
            if i + 1 < n {
                m.add_block(c, CellIndex::new(i + 1), &[[-1.0]]).unwrap();
            }
        }
        m.end_assembly().unwrap();
        m
    }

    #[test]
    fn test_no_preconditioner_copies() {
        let m: BlockSparseMatrix<1> = BlockSparseMatrix::diagonal(3);
        let mut p = NoPreconditioner;
        Preconditioner::<1>::update(&mut p, &m).unwrap();
        let mut z = [0.0; 3];
        Preconditioner::<1>::apply(&p, &[1.0, 2.0, 3.0], &mut z).unwrap();
        assert_eq!(z, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_jacobi() {
        let m = tridiag(3);
        let mut p = BlockJacobi::new();
        p.update(&m).unwrap();
        let mut z = [0.0; 3];
        p.apply(&[4.0, 8.0, 12.0], &mut z).unwrap();
        assert_eq!(z, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_jacobi_before_setup() {
        let p: BlockJacobi<1> = BlockJacobi::new();
        let mut z = [0.0; 2];
        assert_eq!(
            p.apply(&[1.0, 1.0], &mut z),
            Err(LinearSolverError::PreconditionerNotSetUp)
        );
    }

    #[test]
    fn test_ilu0_exact_on_tridiagonal() {
        // no fill-in for a tridiagonal matrix, so ILU(0) is the exact LU
        let n = 6;
        let m = tridiag(n);
        let mut p = BlockIlu0::new();
        p.update(&m).unwrap();

        let x_true: Vec<f64> = (0..n).map(|i| i as f64 + 1.0).collect();
        let mut b = vec![0.0; n];
        m.apply(&x_true, &mut b).unwrap();

        let mut x = vec![0.0; n];
        p.apply(&b, &mut x).unwrap();
        for i in 0..n {
            assert!((x[i] - x_true[i]).abs() < 1e-12, "x[{i}] = {}", x[i]);
        }
    }

    #[test]
    fn test_sgs_matches_factored_form() {
        // For a 2x2 matrix [[a, b], [c, d]], (D+L) D⁻¹ (D+U) = [[a, b], [c, d + cb/a]]
        let mut m: BlockSparseMatrix<1> =
            BlockSparseMatrix::with_pattern(2, &[vec![1], vec![0]]).unwrap();
        m.begin_assembly().unwrap();
        m.update_diag_block(CellIndex::new(0), &[[2.0]]).unwrap();
        m.add_block(CellIndex::new(0), CellIndex::new(1), &[[1.0]]).unwrap();
        m.add_block(CellIndex::new(1), CellIndex::new(0), &[[1.0]]).unwrap();
        m.update_diag_block(CellIndex::new(1), &[[3.0]]).unwrap();
        m.end_assembly().unwrap();

        let mut p = BlockSgs::new();
        p.update(&m).unwrap();

        // P = [[2, 1], [1, 3.5]], P x = r with x = [1, 1] gives r = [3, 4.5]
        let mut z = [0.0; 2];
        p.apply(&[3.0, 4.5], &mut z).unwrap();
        assert!((z[0] - 1.0).abs() < 1e-14 && (z[1] - 1.0).abs() < 1e-14, "{z:?}");
    }

    #[test]
    fn test_singular_diagonal_reported() {
        let m: BlockSparseMatrix<2> = BlockSparseMatrix::diagonal(2);
        let mut p = BlockJacobi::new();
        assert!(matches!(
            p.update(&m),
            Err(LinearSolverError::SingularBlock { row: 0, .. })
        ));
    }
}
