//! Trait-based inviscid flux abstraction.
//!
//! An [`InviscidFlux`] evaluates the physical normal flux `F(u)·n` of a
//! system of N conservation laws at a single state, its maximum wave speed
//! along `n`, and its normal flux Jacobian. The first-order spatial operator
//! and the matrix-free LU-SGS sweep only see the system through this trait.
//!
//! # Example
//! ```
//! use fv_march::flux::{InviscidFlux, LinearAdvection, rusanov_flux};
//!
//! let adv = LinearAdvection::new(1.0, 0.0);
//! let f = adv.flux(&[2.0], (1.0, 0.0));
//! assert_eq!(f, [2.0]);
//!
//! // Upwinding: the interface flux takes the left state for a rightward wind
//! let fs = rusanov_flux(&adv, &[2.0], &[5.0], (1.0, 0.0));
//! assert!((fs[0] - 2.0).abs() < 1e-14);
//! ```

use crate::linalg::Block;

/// Relative perturbation for finite-difference Jacobians.
const FD_EPS: f64 = 1e-7;

/// Physical flux of a system of N conservation laws.
///
/// # Implementation Notes
///
/// - `normal` is a unit vector
/// - `spectral_radius` must bound every eigenvalue of `flux_jacobian` in
///   magnitude; the Rusanov flux and the local time step rely on it
/// - Methods are called per face in hot loops and should not allocate
pub trait InviscidFlux<const N: usize>: Send + Sync {
    /// Normal flux F(u)·n.
    fn flux(&self, u: &[f64; N], normal: (f64, f64)) -> [f64; N];

    /// Largest wave speed magnitude along `normal`.
    fn spectral_radius(&self, u: &[f64; N], normal: (f64, f64)) -> f64;

    /// Normal flux Jacobian ∂(F·n)/∂u.
    ///
    /// The default uses one-sided finite differences.
    fn flux_jacobian(&self, u: &[f64; N], normal: (f64, f64)) -> Block<N> {
        let f0 = self.flux(u, normal);
        let mut jac = [[0.0; N]; N];
        for j in 0..N {
            let h = FD_EPS * u[j].abs().max(1.0);
            let mut up = *u;
            up[j] += h;
            let f1 = self.flux(&up, normal);
            for i in 0..N {
                jac[i][j] = (f1[i] - f0[i]) / h;
            }
        }
        jac
    }

    /// Human-readable name for debugging and logging.
    fn name(&self) -> &'static str;
}

/// Rusanov (local Lax-Friedrichs) interface flux.
///
/// `0.5 (F(u_l) + F(u_r))·n - 0.5 s (u_r - u_l)` with `s` the larger of the
/// two spectral radii. Consistent: `rusanov_flux(f, u, u, n) = F(u)·n`.
pub fn rusanov_flux<const N: usize, F: InviscidFlux<N> + ?Sized>(
    flux: &F,
    u_l: &[f64; N],
    u_r: &[f64; N],
    normal: (f64, f64),
) -> [f64; N] {
    let f_l = flux.flux(u_l, normal);
    let f_r = flux.flux(u_r, normal);
    let s = flux
        .spectral_radius(u_l, normal)
        .max(flux.spectral_radius(u_r, normal));
    let mut out = [0.0; N];
    for i in 0..N {
        out[i] = 0.5 * (f_l[i] + f_r[i]) - 0.5 * s * (u_r[i] - u_l[i]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flux::{EulerFlux, LinearAdvection};

    #[test]
    fn test_rusanov_consistency() {
        let euler = EulerFlux::default();
        let u = EulerFlux::conserved_from_primitive(1.2, 0.3, -0.1, 1.0, euler.gamma);
        let n = (0.6, 0.8);
        let fs = rusanov_flux(&euler, &u, &u, n);
        let f = euler.flux(&u, n);
        for i in 0..4 {
            assert!((fs[i] - f[i]).abs() < 1e-14);
        }
    }

    #[test]
    fn test_rusanov_conservation() {
        // F*(ul, ur; n) = -F*(ur, ul; -n)
        let euler = EulerFlux::default();
        let ul = EulerFlux::conserved_from_primitive(1.0, 0.5, 0.0, 1.0, euler.gamma);
        let ur = EulerFlux::conserved_from_primitive(0.5, 0.1, 0.2, 0.4, euler.gamma);
        let a = rusanov_flux(&euler, &ul, &ur, (1.0, 0.0));
        let b = rusanov_flux(&euler, &ur, &ul, (-1.0, 0.0));
        for i in 0..4 {
            assert!((a[i] + b[i]).abs() < 1e-13);
        }
    }

    #[test]
    fn test_default_jacobian_matches_exact_for_advection() {
        struct FdOnly(LinearAdvection);
        impl InviscidFlux<1> for FdOnly {
            fn flux(&self, u: &[f64; 1], n: (f64, f64)) -> [f64; 1] {
                self.0.flux(u, n)
            }
            fn spectral_radius(&self, u: &[f64; 1], n: (f64, f64)) -> f64 {
                self.0.spectral_radius(u, n)
            }
            fn name(&self) -> &'static str {
                "fd-only"
            }
        }
        let f = FdOnly(LinearAdvection::new(2.0, -1.0));
        let jac = f.flux_jacobian(&[3.0], (0.0, 1.0));
        assert!((jac[0][0] + 1.0).abs() < 1e-6);
    }
}
