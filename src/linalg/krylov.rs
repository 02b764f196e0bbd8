//! Preconditioned iterative solvers for the implicit system `M du = b`.
//!
//! # Solver types
//!
//! - [`Richardson`]: preconditioned fixed-point iteration `x += P⁻¹ (b - M x)`
//! - [`BiCgStab`]: right-preconditioned BiCGStab
//! - [`Gmres`]: restarted, right-preconditioned GMRES(m) with Givens rotations
//!
//! All solvers stop when `||b - M x|| / ||b|| < tol` or after `max_iters`
//! iterations, and report the number of iterations used. Running out of
//! iterations is not an error: the implicit driver only needs an approximate
//! update. Wall and CPU time spent in preconditioner setup and solves is
//! accumulated until [`LinearSolver::reset_run_times`].

use super::block_matrix::{BlockSparseMatrix, SystemMatrix};
use super::error::LinearSolverError;
use super::preconditioner::Preconditioner;
use super::vector_ops::{axpy, dot, norm2, scale, xpay};
use crate::timing::{RunTimer, RunTimes};

/// Denominators below this are treated as a breakdown.
const BREAKDOWN_EPS: f64 = 1e-300;

/// Iterative linear solver bound to a preconditioner.
pub trait LinearSolver<const N: usize>: Send {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Rebuild the preconditioner from the current matrix.
    fn setup_preconditioner(
        &mut self,
        matrix: &BlockSparseMatrix<N>,
    ) -> Result<(), LinearSolverError>;

    /// Relative tolerance and iteration cap for subsequent solves.
    fn set_params(&mut self, tol: f64, max_iters: usize);

    /// Solve `matrix x = rhs`, starting from the incoming `x`.
    ///
    /// Returns the number of iterations performed.
    fn solve(
        &mut self,
        matrix: &BlockSparseMatrix<N>,
        rhs: &[f64],
        x: &mut [f64],
    ) -> Result<usize, LinearSolverError>;

    /// Zero the accumulated run times.
    fn reset_run_times(&mut self);

    /// Accumulated wall and CPU time.
    fn run_times(&self) -> RunTimes;
}

// =============================================================================
// Shared state
// =============================================================================

/// State common to every solver: preconditioner, parameters, timing.
struct SolverCore<const N: usize> {
    precond: Box<dyn Preconditioner<N>>,
    tol: f64,
    max_iters: usize,
    times: RunTimes,
}

impl<const N: usize> SolverCore<N> {
    fn new(precond: Box<dyn Preconditioner<N>>) -> Self {
        Self {
            precond,
            tol: 1e-6,
            max_iters: 50,
            times: RunTimes::default(),
        }
    }

    fn setup(&mut self, matrix: &BlockSparseMatrix<N>) -> Result<(), LinearSolverError> {
        let timer = RunTimer::start();
        let res = self.precond.update(matrix);
        self.times.accumulate(timer.elapsed());
        res
    }
}

/// r = b - M x
fn residual<const N: usize>(
    matrix: &BlockSparseMatrix<N>,
    b: &[f64],
    x: &[f64],
    r: &mut [f64],
) -> Result<(), LinearSolverError> {
    matrix.apply(x, r)?;
    xpay(b, -1.0, r);
    Ok(())
}

/// Resize a work vector to `n` and zero it.
fn ensure(v: &mut Vec<f64>, n: usize) {
    v.clear();
    v.resize(n, 0.0);
}

macro_rules! impl_common {
    () => {
        fn setup_preconditioner(
            &mut self,
            matrix: &BlockSparseMatrix<N>,
        ) -> Result<(), LinearSolverError> {
            self.core.setup(matrix)
        }

        fn set_params(&mut self, tol: f64, max_iters: usize) {
            self.core.tol = tol;
            self.core.max_iters = max_iters;
        }

        fn reset_run_times(&mut self) {
            self.core.times = RunTimes::default();
        }

        fn run_times(&self) -> RunTimes {
            self.core.times
        }
    };
}

// =============================================================================
// Richardson
// =============================================================================

/// Preconditioned Richardson iteration.
pub struct Richardson<const N: usize> {
    core: SolverCore<N>,
    r: Vec<f64>,
    z: Vec<f64>,
}

impl<const N: usize> Richardson<N> {
    pub fn new(precond: Box<dyn Preconditioner<N>>) -> Self {
        Self {
            core: SolverCore::new(precond),
            r: Vec::new(),
            z: Vec::new(),
        }
    }

    fn iterate(
        &mut self,
        matrix: &BlockSparseMatrix<N>,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<usize, LinearSolverError> {
        let n = b.len();
        ensure(&mut self.r, n);
        ensure(&mut self.z, n);

        let bnorm = norm2(b);
        if bnorm == 0.0 {
            x.fill(0.0);
            return Ok(0);
        }

        let mut iters = 0;
        while iters < self.core.max_iters {
            residual(matrix, b, x, &mut self.r)?;
            if norm2(&self.r) / bnorm < self.core.tol {
                break;
            }
            self.core.precond.apply(&self.r, &mut self.z)?;
            axpy(1.0, &self.z, x);
            iters += 1;
        }
        Ok(iters)
    }
}

impl<const N: usize> LinearSolver<N> for Richardson<N> {
    fn name(&self) -> &'static str {
        "richardson"
    }

    fn solve(
        &mut self,
        matrix: &BlockSparseMatrix<N>,
        rhs: &[f64],
        x: &mut [f64],
    ) -> Result<usize, LinearSolverError> {
        let timer = RunTimer::start();
        let res = self.iterate(matrix, rhs, x);
        self.core.times.accumulate(timer.elapsed());
        res
    }

    impl_common!();
}

// =============================================================================
// BiCGStab
// =============================================================================

/// Right-preconditioned BiCGStab.
pub struct BiCgStab<const N: usize> {
    core: SolverCore<N>,
    r: Vec<f64>,
    /// Shadow residual, fixed for the whole solve
    r0: Vec<f64>,
    p: Vec<f64>,
    v: Vec<f64>,
    s: Vec<f64>,
    t: Vec<f64>,
    p_hat: Vec<f64>,
    s_hat: Vec<f64>,
}

impl<const N: usize> BiCgStab<N> {
    pub fn new(precond: Box<dyn Preconditioner<N>>) -> Self {
        Self {
            core: SolverCore::new(precond),
            r: Vec::new(),
            r0: Vec::new(),
            p: Vec::new(),
            v: Vec::new(),
            s: Vec::new(),
            t: Vec::new(),
            p_hat: Vec::new(),
            s_hat: Vec::new(),
        }
    }

    fn iterate(
        &mut self,
        matrix: &BlockSparseMatrix<N>,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<usize, LinearSolverError> {
        let n = b.len();
        for w in [
            &mut self.r,
            &mut self.r0,
            &mut self.p,
            &mut self.v,
            &mut self.s,
            &mut self.t,
            &mut self.p_hat,
            &mut self.s_hat,
        ] {
            ensure(w, n);
        }

        let bnorm = norm2(b);
        if bnorm == 0.0 {
            x.fill(0.0);
            return Ok(0);
        }
        let tol = self.core.tol;

        residual(matrix, b, x, &mut self.r)?;
        if norm2(&self.r) / bnorm < tol {
            return Ok(0);
        }
        self.r0.copy_from_slice(&self.r);

        let (mut rho, mut alpha, mut omega) = (1.0_f64, 1.0_f64, 1.0_f64);
        let mut iters = 0;

        while iters < self.core.max_iters {
            iters += 1;

            let rho_new = dot(&self.r0, &self.r);
            if rho_new.abs() < BREAKDOWN_EPS || omega.abs() < BREAKDOWN_EPS {
                log::debug!("bicgstab: breakdown at iteration {iters} (rho = {rho_new:e})");
                break;
            }

            // p = r + beta (p - omega v)
            let beta = (rho_new / rho) * (alpha / omega);
            axpy(-omega, &self.v, &mut self.p);
            xpay(&self.r, beta, &mut self.p);

            self.core.precond.apply(&self.p, &mut self.p_hat)?;
            matrix.apply(&self.p_hat, &mut self.v)?;

            let r0v = dot(&self.r0, &self.v);
            if r0v.abs() < BREAKDOWN_EPS {
                log::debug!("bicgstab: breakdown in alpha at iteration {iters}");
                break;
            }
            alpha = rho_new / r0v;

            // s = r - alpha v
            self.s.copy_from_slice(&self.r);
            axpy(-alpha, &self.v, &mut self.s);
            if norm2(&self.s) / bnorm < tol {
                axpy(alpha, &self.p_hat, x);
                break;
            }

            self.core.precond.apply(&self.s, &mut self.s_hat)?;
            matrix.apply(&self.s_hat, &mut self.t)?;

            let tt = dot(&self.t, &self.t);
            omega = if tt > BREAKDOWN_EPS {
                dot(&self.t, &self.s) / tt
            } else {
                0.0
            };

            axpy(alpha, &self.p_hat, x);
            axpy(omega, &self.s_hat, x);

            // r = s - omega t
            self.r.copy_from_slice(&self.s);
            axpy(-omega, &self.t, &mut self.r);

            if norm2(&self.r) / bnorm < tol {
                break;
            }
            rho = rho_new;
        }
        Ok(iters)
    }
}

impl<const N: usize> LinearSolver<N> for BiCgStab<N> {
    fn name(&self) -> &'static str {
        "bicgstab"
    }

    fn solve(
        &mut self,
        matrix: &BlockSparseMatrix<N>,
        rhs: &[f64],
        x: &mut [f64],
    ) -> Result<usize, LinearSolverError> {
        let timer = RunTimer::start();
        let res = self.iterate(matrix, rhs, x);
        self.core.times.accumulate(timer.elapsed());
        res
    }

    impl_common!();
}

// =============================================================================
// GMRES(m)
// =============================================================================

/// Restarted right-preconditioned GMRES.
pub struct Gmres<const N: usize> {
    core: SolverCore<N>,
    restart: usize,
    /// Krylov basis, restart + 1 vectors
    basis: Vec<Vec<f64>>,
    /// Preconditioned basis vectors P⁻¹ v_j
    z: Vec<Vec<f64>>,
    /// Hessenberg matrix, column-major by Arnoldi step: h[j][i]
    h: Vec<Vec<f64>>,
    cs: Vec<f64>,
    sn: Vec<f64>,
    g: Vec<f64>,
    w: Vec<f64>,
}

impl<const N: usize> Gmres<N> {
    pub fn new(precond: Box<dyn Preconditioner<N>>, restart: usize) -> Self {
        let restart = restart.max(1);
        Self {
            core: SolverCore::new(precond),
            restart,
            basis: Vec::new(),
            z: Vec::new(),
            h: vec![vec![0.0; restart + 1]; restart],
            cs: vec![0.0; restart],
            sn: vec![0.0; restart],
            g: vec![0.0; restart + 1],
            w: Vec::new(),
        }
    }

    /// Restart length.
    pub fn restart(&self) -> usize {
        self.restart
    }

    fn iterate(
        &mut self,
        matrix: &BlockSparseMatrix<N>,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<usize, LinearSolverError> {
        let n = b.len();
        let m = self.restart;
        self.basis.resize_with(m + 1, Vec::new);
        self.z.resize_with(m, Vec::new);
        for v in self.basis.iter_mut().chain(self.z.iter_mut()) {
            ensure(v, n);
        }
        ensure(&mut self.w, n);

        let bnorm = norm2(b);
        if bnorm == 0.0 {
            x.fill(0.0);
            return Ok(0);
        }
        let tol = self.core.tol;
        let mut iters = 0;

        loop {
            residual(matrix, b, x, &mut self.basis[0])?;
            let beta = norm2(&self.basis[0]);
            if beta / bnorm < tol || iters >= self.core.max_iters {
                break;
            }
            scale(1.0 / beta, &mut self.basis[0]);
            self.g.fill(0.0);
            self.g[0] = beta;

            let mut k = 0;
            let mut converged = false;
            while k < m && iters < self.core.max_iters {
                let j = k;
                self.core.precond.apply(&self.basis[j], &mut self.z[j])?;
                matrix.apply(&self.z[j], &mut self.w)?;

                // modified Gram-Schmidt
                for i in 0..=j {
                    let hij = dot(&self.w, &self.basis[i]);
                    self.h[j][i] = hij;
                    axpy(-hij, &self.basis[i], &mut self.w);
                }
                let hnext = norm2(&self.w);
                self.h[j][j + 1] = hnext;
                if hnext > BREAKDOWN_EPS {
                    self.basis[j + 1].copy_from_slice(&self.w);
                    scale(1.0 / hnext, &mut self.basis[j + 1]);
                }

                // previous rotations on the new column
                for i in 0..j {
                    let (a, c) = (self.h[j][i], self.h[j][i + 1]);
                    self.h[j][i] = self.cs[i] * a + self.sn[i] * c;
                    self.h[j][i + 1] = -self.sn[i] * a + self.cs[i] * c;
                }

                // new rotation zeroing h[j][j+1]
                let (a, c) = (self.h[j][j], self.h[j][j + 1]);
                let denom = a.hypot(c);
                let (cs, sn) = if denom > BREAKDOWN_EPS {
                    (a / denom, c / denom)
                } else {
                    (1.0, 0.0)
                };
                self.cs[j] = cs;
                self.sn[j] = sn;
                self.h[j][j] = cs * a + sn * c;
                self.h[j][j + 1] = 0.0;
                self.g[j + 1] = -sn * self.g[j];
                self.g[j] *= cs;

                iters += 1;
                k += 1;

                if self.g[j + 1].abs() / bnorm < tol || hnext <= BREAKDOWN_EPS {
                    converged = true;
                    break;
                }
            }

            // back substitution for y, then x += Z y
            let mut y = vec![0.0; k];
            for i in (0..k).rev() {
                let s: f64 = ((i + 1)..k).map(|l| self.h[l][i] * y[l]).sum();
                let hii = self.h[i][i];
                y[i] = if hii.abs() > BREAKDOWN_EPS {
                    (self.g[i] - s) / hii
                } else {
                    0.0
                };
            }
            for (zi, yi) in self.z.iter().zip(&y) {
                axpy(*yi, zi, x);
            }

            if converged || iters >= self.core.max_iters {
                break;
            }
        }
        Ok(iters)
    }
}

impl<const N: usize> LinearSolver<N> for Gmres<N> {
    fn name(&self) -> &'static str {
        "gmres"
    }

    fn solve(
        &mut self,
        matrix: &BlockSparseMatrix<N>,
        rhs: &[f64],
        x: &mut [f64],
    ) -> Result<usize, LinearSolverError> {
        let timer = RunTimer::start();
        let res = self.iterate(matrix, rhs, x);
        self.core.times.accumulate(timer.elapsed());
        res
    }

    impl_common!();
}
