//! Block-sparse system matrix.
//!
//! The implicit driver assembles `M = diag(area / (cfl * dt)) + dR/du` into a
//! block compressed-sparse-row (BSR) matrix with N x N blocks. The block
//! pattern comes from mesh adjacency (diagonal + face neighbours).
//!
//! # Assembly protocol
//!
//! ```text
//! set_all_zero -> begin_assembly -> add_block* / update_diag_block* -> end_assembly
//! ```
//!
//! Until [`SystemMatrix::freeze_pattern`] is called, adding a block outside
//! the pattern inserts it. After freezing, the pattern is fixed and such an
//! insertion fails with [`MatrixError::NewNonzero`].

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::block::{self, Block};
use super::error::MatrixError;
use crate::mesh::Mesh2D;
use crate::types::CellIndex;

// =============================================================================
// SystemMatrix trait
// =============================================================================

/// Assembly and product interface of the implicit system matrix.
///
/// Spatial operators write their Jacobian through this trait, so they do not
/// depend on the storage format.
pub trait SystemMatrix<const N: usize>: Send + Sync {
    /// Number of block rows (cells).
    fn n_block_rows(&self) -> usize;

    /// Zero all stored blocks, keeping the pattern.
    fn set_all_zero(&mut self);

    /// Open an assembly phase.
    fn begin_assembly(&mut self) -> Result<(), MatrixError>;

    /// Close the assembly phase; the matrix is usable for products afterwards.
    fn end_assembly(&mut self) -> Result<(), MatrixError>;

    /// Forbid new nonzero blocks from now on.
    fn freeze_pattern(&mut self);

    /// `M[row, col] += block`
    fn add_block(
        &mut self,
        row: CellIndex,
        col: CellIndex,
        block: &Block<N>,
    ) -> Result<(), MatrixError>;

    /// `M[row, row] += block`
    fn update_diag_block(&mut self, row: CellIndex, block: &Block<N>) -> Result<(), MatrixError> {
        self.add_block(row, row, block)
    }

    /// `y = M x` on flat interleaved vectors.
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), MatrixError>;
}

// =============================================================================
// Block CSR storage
// =============================================================================

/// Block compressed-sparse-row matrix with N x N blocks.
///
/// Column indices are sorted within each row and every row stores its
/// diagonal block.
#[derive(Clone, Debug)]
pub struct BlockSparseMatrix<const N: usize> {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    diag_ptr: Vec<usize>,
    blocks: Vec<Block<N>>,
    frozen: bool,
    assembling: bool,
}

impl<const N: usize> BlockSparseMatrix<N> {
    /// Create from per-row column lists. The diagonal is always added.
    pub fn with_pattern(n: usize, rows: &[Vec<usize>]) -> Result<Self, MatrixError> {
        if rows.len() != n {
            return Err(MatrixError::DimensionMismatch {
                expected: n,
                got: rows.len(),
            });
        }

        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);

        for (i, cols) in rows.iter().enumerate() {
            let mut cols = cols.clone();
            if let Some(&bad) = cols.iter().find(|&&c| c >= n) {
                return Err(MatrixError::OutOfBounds { row: i, col: bad, n });
            }
            cols.push(i);
            cols.sort_unstable();
            cols.dedup();
            col_idx.extend_from_slice(&cols);
            row_ptr.push(col_idx.len());
        }

        let blocks = vec![block::zero::<N>(); col_idx.len()];
        let mut m = Self {
            n,
            row_ptr,
            col_idx,
            diag_ptr: Vec::new(),
            blocks,
            frozen: false,
            assembling: false,
        };
        m.rebuild_diag_ptr();
        Ok(m)
    }

    /// Block-diagonal pattern.
    pub fn diagonal(n: usize) -> Self {
        Self {
            n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            diag_ptr: (0..n).collect(),
            blocks: vec![block::zero::<N>(); n],
            frozen: false,
            assembling: false,
        }
    }

    /// Pattern of a first-order cell-centred scheme: each cell couples to
    /// itself and its face neighbours.
    pub fn from_mesh(mesh: &Mesh2D) -> Self {
        let n = mesh.n_cells();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);

        for k in CellIndex::range(n) {
            let mut cols: Vec<usize> = mesh.neighbors(k).map(CellIndex::get).collect();
            cols.push(k.get());
            cols.sort_unstable();
            cols.dedup();
            col_idx.extend_from_slice(&cols);
            row_ptr.push(col_idx.len());
        }

        let blocks = vec![block::zero::<N>(); col_idx.len()];
        let mut m = Self {
            n,
            row_ptr,
            col_idx,
            diag_ptr: Vec::new(),
            blocks,
            frozen: false,
            assembling: false,
        };
        m.rebuild_diag_ptr();
        m
    }

    fn rebuild_diag_ptr(&mut self) {
        self.diag_ptr = (0..self.n)
            .map(|i| {
                let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
                // every row stores its diagonal
                start + self.col_idx[start..end].partition_point(|&c| c < i)
            })
            .collect();
    }

    /// Position of block (row, col) in storage.
    #[inline]
    pub fn find(&self, row: usize, col: usize) -> Option<usize> {
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        self.col_idx[start..end]
            .binary_search(&col)
            .ok()
            .map(|p| start + p)
    }

    /// Insert a zero block at (row, col), shifting later rows.
    fn insert(&mut self, row: usize, col: usize) -> usize {
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        let pos = start + self.col_idx[start..end].partition_point(|&c| c < col);
        self.col_idx.insert(pos, col);
        self.blocks.insert(pos, block::zero::<N>());
        for p in self.row_ptr[(row + 1)..].iter_mut() {
            *p += 1;
        }
        self.rebuild_diag_ptr();
        pos
    }

    /// Number of block rows.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored blocks.
    #[inline]
    pub fn nnz_blocks(&self) -> usize {
        self.col_idx.len()
    }

    /// Whether the pattern is frozen.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether an assembly phase is open.
    #[inline]
    pub fn is_assembling(&self) -> bool {
        self.assembling
    }

    /// Stored block at (row, col), if in the pattern.
    pub fn block(&self, row: CellIndex, col: CellIndex) -> Option<&Block<N>> {
        self.find(row.get(), col.get()).map(|p| &self.blocks[p])
    }

    /// Diagonal block of a row.
    #[inline]
    pub fn diag_block(&self, row: usize) -> &Block<N> {
        &self.blocks[self.diag_ptr[row]]
    }

    /// Storage range of row i.
    #[inline]
    pub(crate) fn row_range(&self, i: usize) -> std::ops::Range<usize> {
        self.row_ptr[i]..self.row_ptr[i + 1]
    }

    #[inline]
    pub(crate) fn diag_ptr(&self) -> &[usize] {
        &self.diag_ptr
    }

    #[inline]
    pub(crate) fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    #[inline]
    pub(crate) fn blocks(&self) -> &[Block<N>] {
        &self.blocks
    }

    #[inline]
    pub(crate) fn blocks_mut(&mut self) -> &mut [Block<N>] {
        &mut self.blocks
    }

    fn check_len(&self, got: usize) -> Result<(), MatrixError> {
        if got != self.n * N {
            return Err(MatrixError::DimensionMismatch {
                expected: self.n * N,
                got,
            });
        }
        Ok(())
    }

    /// Row-block product `sum_j M[i, j] x_j` into `yi`.
    #[inline]
    fn row_product(&self, i: usize, x: &[f64], yi: &mut [f64]) {
        yi.fill(0.0);
        for p in self.row_range(i) {
            let j = self.col_idx[p];
            let xj = &x[j * N..(j + 1) * N];
            for (y, brow) in yi.iter_mut().zip(&self.blocks[p]) {
                *y += brow.iter().zip(xj).map(|(a, b)| a * b).sum::<f64>();
            }
        }
    }
}

impl<const N: usize> SystemMatrix<N> for BlockSparseMatrix<N> {
    fn n_block_rows(&self) -> usize {
        self.n
    }

    fn set_all_zero(&mut self) {
        #[cfg(feature = "parallel")]
        self.blocks
            .par_iter_mut()
            .for_each(|b| *b = block::zero::<N>());
        #[cfg(not(feature = "parallel"))]
        self.blocks.iter_mut().for_each(|b| *b = block::zero::<N>());
    }

    fn begin_assembly(&mut self) -> Result<(), MatrixError> {
        if self.assembling {
            return Err(MatrixError::AlreadyAssembling);
        }
        self.assembling = true;
        Ok(())
    }

    fn end_assembly(&mut self) -> Result<(), MatrixError> {
        if !self.assembling {
            return Err(MatrixError::NotAssembling);
        }
        self.assembling = false;
        Ok(())
    }

    fn freeze_pattern(&mut self) {
        self.frozen = true;
    }

    fn add_block(
        &mut self,
        row: CellIndex,
        col: CellIndex,
        b: &Block<N>,
    ) -> Result<(), MatrixError> {
        let (i, j) = (row.get(), col.get());
        if !self.assembling {
            return Err(MatrixError::NotAssembling);
        }
        if i >= self.n || j >= self.n {
            return Err(MatrixError::OutOfBounds {
                row: i,
                col: j,
                n: self.n,
            });
        }
        let pos = match self.find(i, j) {
            Some(p) => p,
            None if self.frozen => return Err(MatrixError::NewNonzero { row: i, col: j }),
            None => self.insert(i, j),
        };
        block::add_assign(&mut self.blocks[pos], b);
        Ok(())
    }

    fn update_diag_block(&mut self, row: CellIndex, b: &Block<N>) -> Result<(), MatrixError> {
        if !self.assembling {
            return Err(MatrixError::NotAssembling);
        }
        let i = row.get();
        if i >= self.n {
            return Err(MatrixError::OutOfBounds {
                row: i,
                col: i,
                n: self.n,
            });
        }
        let pos = self.diag_ptr[i];
        block::add_assign(&mut self.blocks[pos], b);
        Ok(())
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<(), MatrixError> {
        self.check_len(x.len())?;
        self.check_len(y.len())?;

        #[cfg(feature = "parallel")]
        y.par_chunks_mut(N)
            .enumerate()
            .for_each(|(i, yi)| self.row_product(i, x, yi));
        #[cfg(not(feature = "parallel"))]
        y.chunks_mut(N)
            .enumerate()
            .for_each(|(i, yi)| self.row_product(i, x, yi));
        Ok(())
    }
}
