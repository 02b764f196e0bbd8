//! 2D compressible Euler equations for an ideal gas.
//!
//! Conserved variables `[ρ, ρu, ρv, E]`, pressure
//! `p = (γ - 1) (E - ½ ρ (u² + v²))`. The last variable (energy) is the one
//! whose residual the steady drivers monitor.

use super::traits::InviscidFlux;
use crate::linalg::Block;

/// Ideal-gas Euler flux.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EulerFlux {
    /// Ratio of specific heats
    pub gamma: f64,
}

impl Default for EulerFlux {
    fn default() -> Self {
        Self { gamma: 1.4 }
    }
}

impl EulerFlux {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    /// Conserved state from density, velocity and pressure.
    pub fn conserved_from_primitive(rho: f64, u: f64, v: f64, p: f64, gamma: f64) -> [f64; 4] {
        [
            rho,
            rho * u,
            rho * v,
            p / (gamma - 1.0) + 0.5 * rho * (u * u + v * v),
        ]
    }

    /// Pressure of a conserved state.
    #[inline]
    pub fn pressure(&self, u: &[f64; 4]) -> f64 {
        let rho = u[0];
        let ke = 0.5 * (u[1] * u[1] + u[2] * u[2]) / rho;
        (self.gamma - 1.0) * (u[3] - ke)
    }

    /// Speed of sound of a conserved state.
    #[inline]
    pub fn sound_speed(&self, u: &[f64; 4]) -> f64 {
        (self.gamma * self.pressure(u) / u[0]).abs().sqrt()
    }
}

impl InviscidFlux<4> for EulerFlux {
    #[inline]
    fn flux(&self, u: &[f64; 4], normal: (f64, f64)) -> [f64; 4] {
        let (nx, ny) = normal;
        let rho = u[0];
        let vx = u[1] / rho;
        let vy = u[2] / rho;
        let p = self.pressure(u);
        let vn = vx * nx + vy * ny;
        [
            rho * vn,
            u[1] * vn + p * nx,
            u[2] * vn + p * ny,
            (u[3] + p) * vn,
        ]
    }

    #[inline]
    fn spectral_radius(&self, u: &[f64; 4], normal: (f64, f64)) -> f64 {
        let vn = (u[1] * normal.0 + u[2] * normal.1) / u[0];
        vn.abs() + self.sound_speed(u)
    }

    fn flux_jacobian(&self, u: &[f64; 4], normal: (f64, f64)) -> Block<4> {
        let (nx, ny) = normal;
        let g = self.gamma;
        let g1 = g - 1.0;
        let rho = u[0];
        let vx = u[1] / rho;
        let vy = u[2] / rho;
        let q = vx * nx + vy * ny;
        let phi2 = 0.5 * g1 * (vx * vx + vy * vy);
        let h = (u[3] + self.pressure(u)) / rho;

        [
            [0.0, nx, ny, 0.0],
            [
                nx * phi2 - vx * q,
                q - (g - 2.0) * vx * nx,
                vx * ny - g1 * vy * nx,
                g1 * nx,
            ],
            [
                ny * phi2 - vy * q,
                vy * nx - g1 * vx * ny,
                q - (g - 2.0) * vy * ny,
                g1 * ny,
            ],
            [
                q * (phi2 - h),
                nx * h - g1 * vx * q,
                ny * h - g1 * vy * q,
                g * q,
            ],
        ]
    }

    fn name(&self) -> &'static str {
        "euler"
    }
}
