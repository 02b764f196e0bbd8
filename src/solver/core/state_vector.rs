//! Cell-centred storage for systems of N conservation variables.
//!
//! One row of `N` values per mesh cell. Rows are stored contiguously, so the
//! flat view is interleaved: `as_slice()[k * N + var]` for cell k, variable var.
//! The same type carries the state, the residual and the update vector.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::types::CellIndex;

/// Per-cell state for a system of N conservation laws.
#[derive(Clone, Debug, PartialEq)]
pub struct StateVector<const N: usize> {
    rows: Vec<[f64; N]>,
}

impl<const N: usize> StateVector<N> {
    /// Create a zero-initialized vector with one row per cell.
    pub fn zeros(n_cells: usize) -> Self {
        Self {
            rows: vec![[0.0; N]; n_cells],
        }
    }

    /// Create from explicit rows.
    pub fn from_rows(rows: Vec<[f64; N]>) -> Self {
        Self { rows }
    }

    /// Create by evaluating `f` on every cell.
    pub fn from_fn(n_cells: usize, f: impl FnMut(CellIndex) -> [f64; N]) -> Self {
        Self {
            rows: CellIndex::range(n_cells).map(f).collect(),
        }
    }

    /// Number of cells (rows).
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.rows.len()
    }

    /// Total number of scalar entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len() * N
    }

    /// True if there are no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row of cell k.
    #[inline]
    pub fn row(&self, k: CellIndex) -> &[f64; N] {
        &self.rows[k]
    }

    /// Mutable row of cell k.
    #[inline]
    pub fn row_mut(&mut self, k: CellIndex) -> &mut [f64; N] {
        &mut self.rows[k]
    }

    /// Get a copy of the row of cell k.
    #[inline]
    pub fn get(&self, k: CellIndex) -> [f64; N] {
        self.rows[k]
    }

    /// Overwrite the row of cell k.
    #[inline]
    pub fn set(&mut self, k: CellIndex, values: [f64; N]) {
        self.rows[k] = values;
    }

    /// All rows.
    #[inline]
    pub fn rows(&self) -> &[[f64; N]] {
        &self.rows
    }

    /// All rows, mutable.
    #[inline]
    pub fn rows_mut(&mut self) -> &mut [[f64; N]] {
        &mut self.rows
    }

    /// Flat interleaved view.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.rows.as_flattened()
    }

    /// Flat interleaved view, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.rows.as_flattened_mut()
    }

    /// Values of one variable over all cells.
    pub fn var(&self, var: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[var]).collect()
    }

    /// Fill all values with a constant.
    pub fn fill(&mut self, value: f64) {
        #[cfg(feature = "parallel")]
        self.rows.par_iter_mut().for_each(|r| *r = [value; N]);
        #[cfg(not(feature = "parallel"))]
        self.rows.iter_mut().for_each(|r| *r = [value; N]);
    }

    /// Scale all values by a constant.
    pub fn scale(&mut self, c: f64) {
        for v in self.as_mut_slice() {
            *v *= c;
        }
    }

    /// Add c * other to self (axpy operation).
    pub fn axpy(&mut self, c: f64, other: &Self) {
        assert_eq!(self.rows.len(), other.rows.len());
        let kernel = |(a, b): (&mut [f64; N], &[f64; N])| {
            for (x, y) in a.iter_mut().zip(b) {
                *x += c * y;
            }
        };

        #[cfg(feature = "parallel")]
        self.rows
            .par_iter_mut()
            .zip(other.rows.par_iter())
            .for_each(kernel);
        #[cfg(not(feature = "parallel"))]
        self.rows.iter_mut().zip(other.rows.iter()).for_each(kernel);
    }

    /// Copy from another vector of the same shape.
    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(self.rows.len(), other.rows.len());
        self.rows.copy_from_slice(&other.rows);
    }

    /// Maximum absolute value across all variables.
    pub fn max_abs(&self) -> f64 {
        self.as_slice().iter().map(|x| x.abs()).fold(0.0, f64::max)
    }

    /// True if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.as_slice().iter().all(|x| x.is_finite())
    }
}
