//! Small dense solves.
//!
//! [`gauss_elim`] is the one-shot local solve used inside the LU-SGS sweep,
//! where the system is an N x N cell block and a factorization would not be
//! reused. [`invert_block`] computes explicit block inverses once per
//! preconditioner setup, through an LU factorization with full pivoting.

use faer::{Mat, linalg::solvers::Solve};

use super::block::Block;
use super::error::DenseSolveError;

/// Pivots below this magnitude are treated as zero.
const PIVOT_EPS: f64 = 1e-300;

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
///
/// `a` and `b` are consumed as scratch. Returns `Singular` if a zero pivot
/// is met; NaN inputs are not trapped.
pub fn gauss_elim<const N: usize>(
    mut a: Block<N>,
    mut b: [f64; N],
) -> Result<[f64; N], DenseSolveError> {
    for col in 0..N {
        // partial pivoting
        let mut piv = col;
        let mut max = a[col][col].abs();
        for r in (col + 1)..N {
            if a[r][col].abs() > max {
                max = a[r][col].abs();
                piv = r;
            }
        }
        if max < PIVOT_EPS {
            return Err(DenseSolveError::Singular { column: col });
        }
        if piv != col {
            a.swap(piv, col);
            b.swap(piv, col);
        }

        let pivot_row = a[col];
        for r in (col + 1)..N {
            let factor = a[r][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for (x, p) in a[r][col..].iter_mut().zip(&pivot_row[col..]) {
                *x -= factor * p;
            }
            b[r] -= factor * b[col];
        }
    }

    // back substitution
    let mut x = [0.0; N];
    for i in (0..N).rev() {
        let s: f64 = ((i + 1)..N).map(|j| a[i][j] * x[j]).sum();
        x[i] = (b[i] - s) / a[i][i];
    }
    Ok(x)
}

/// Explicit inverse of an N x N block.
pub fn invert_block<const N: usize>(a: &Block<N>) -> Result<Block<N>, DenseSolveError> {
    let mut m = Mat::zeros(N, N);
    for i in 0..N {
        for j in 0..N {
            m[(i, j)] = a[i][j];
        }
    }

    // a rank-deficient but nonzero block shows up as non-finite entries below
    if N > 0 && a.iter().flatten().all(|&v| v == 0.0) {
        return Err(DenseSolveError::Singular { column: 0 });
    }

    let lu = m.as_ref().full_piv_lu();
    let mut inv = [[0.0; N]; N];

    // Solve A * A_inv = I column by column
    for j in 0..N {
        let mut rhs = Mat::zeros(N, 1);
        rhs[(j, 0)] = 1.0;
        let col = lu.solve(&rhs);
        for (i, row) in inv.iter_mut().enumerate() {
            row[j] = col[(i, 0)];
        }
    }

    if inv.iter().flatten().any(|v| !v.is_finite()) {
        return Err(DenseSolveError::NonFinite);
    }
    Ok(inv)
}
