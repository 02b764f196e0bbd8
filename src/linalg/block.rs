//! Small fixed-size N x N blocks.
//!
//! Blocks are row-major `[[f64; N]; N]` arrays. They live inline in the
//! block-sparse matrix and are cheap to copy for N up to a handful.

/// A dense N x N block, row-major.
pub type Block<const N: usize> = [[f64; N]; N];

/// Zero block.
#[inline]
pub const fn zero<const N: usize>() -> Block<N> {
    [[0.0; N]; N]
}

/// c * I.
#[inline]
pub fn scaled_identity<const N: usize>(c: f64) -> Block<N> {
    let mut b = zero::<N>();
    for (i, row) in b.iter_mut().enumerate() {
        row[i] = c;
    }
    b
}

/// Identity block.
#[inline]
pub fn identity<const N: usize>() -> Block<N> {
    scaled_identity(1.0)
}

/// a += b
#[inline]
pub fn add_assign<const N: usize>(a: &mut Block<N>, b: &Block<N>) {
    for (ra, rb) in a.iter_mut().zip(b) {
        for (x, y) in ra.iter_mut().zip(rb) {
            *x += *y;
        }
    }
}

/// c * a
#[inline]
pub fn scaled<const N: usize>(a: &Block<N>, c: f64) -> Block<N> {
    let mut out = *a;
    for row in out.iter_mut() {
        for x in row.iter_mut() {
            *x *= c;
        }
    }
    out
}

/// y = A x
#[inline]
pub fn matvec<const N: usize>(a: &Block<N>, x: &[f64; N]) -> [f64; N] {
    let mut y = [0.0; N];
    for (yi, row) in y.iter_mut().zip(a) {
        *yi = row.iter().zip(x).map(|(aij, xj)| aij * xj).sum();
    }
    y
}

/// y -= A x
#[inline]
pub fn matvec_sub<const N: usize>(a: &Block<N>, x: &[f64], y: &mut [f64]) {
    for (yi, row) in y.iter_mut().zip(a) {
        *yi -= row.iter().zip(x).map(|(aij, xj)| aij * xj).sum::<f64>();
    }
}

/// A B
#[inline]
pub fn matmul<const N: usize>(a: &Block<N>, b: &Block<N>) -> Block<N> {
    let mut c = zero::<N>();
    for i in 0..N {
        for k in 0..N {
            let aik = a[i][k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..N {
                c[i][j] += aik * b[k][j];
            }
        }
    }
    c
}

/// a -= b
#[inline]
pub fn sub_assign<const N: usize>(a: &mut Block<N>, b: &Block<N>) {
    for (ra, rb) in a.iter_mut().zip(b) {
        for (x, y) in ra.iter_mut().zip(rb) {
            *x -= *y;
        }
    }
}
