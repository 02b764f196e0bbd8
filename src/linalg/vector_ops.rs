//! BLAS level-1 style operations on flat vectors.
//!
//! Used by the Krylov solvers on the interleaved view of a state vector.
//! Reductions are plain sums, which rayon may regroup; results are equal
//! up to round-off across thread counts.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Below this length the sequential loop is used even with `parallel`.
#[cfg(feature = "parallel")]
const PAR_THRESHOLD: usize = 4096;

/// Dot product x·y
#[inline]
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    #[cfg(feature = "parallel")]
    if x.len() >= PAR_THRESHOLD {
        return x.par_iter().zip(y.par_iter()).map(|(a, b)| a * b).sum();
    }
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

/// Euclidean norm ||x||₂
#[inline]
pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

/// y = α*x + y
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    #[cfg(feature = "parallel")]
    if x.len() >= PAR_THRESHOLD {
        y.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(yi, xi)| *yi += alpha * xi);
        return;
    }
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// y = x + β*y
#[inline]
pub fn xpay(x: &[f64], beta: f64, y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi = xi + beta * *yi;
    }
}

/// x = α*x
#[inline]
pub fn scale(alpha: f64, x: &mut [f64]) {
    for xi in x.iter_mut() {
        *xi *= alpha;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_norm() {
        let x = [1.0, 2.0, 3.0];
        let y = [4.0, 5.0, 6.0];
        assert_eq!(dot(&x, &y), 32.0);
        assert!((norm2(&x) - 14.0_f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn test_axpy_xpay_scale() {
        let x = [1.0, 2.0, 3.0];
        let mut y = [4.0, 5.0, 6.0];
        axpy(2.0, &x, &mut y);
        assert_eq!(y, [6.0, 9.0, 12.0]);

        xpay(&x, 0.5, &mut y);
        assert_eq!(y, [4.0, 6.5, 9.0]);

        scale(2.0, &mut y);
        assert_eq!(y, [8.0, 13.0, 18.0]);
    }

    #[test]
    fn test_long_dot_matches_closed_form() {
        let n = 10_000;
        let x = vec![1.0; n];
        assert_eq!(dot(&x, &x), n as f64);
    }
}
