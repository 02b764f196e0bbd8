//! Scalar linear advection, `u_t + ∇·(a u) = 0`.

use super::traits::InviscidFlux;
use crate::linalg::Block;

/// Constant-velocity linear advection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearAdvection {
    /// Advection velocity (ax, ay)
    pub velocity: (f64, f64),
}

impl LinearAdvection {
    pub fn new(ax: f64, ay: f64) -> Self {
        Self { velocity: (ax, ay) }
    }

    #[inline]
    fn normal_speed(&self, n: (f64, f64)) -> f64 {
        self.velocity.0 * n.0 + self.velocity.1 * n.1
    }
}

impl InviscidFlux<1> for LinearAdvection {
    #[inline]
    fn flux(&self, u: &[f64; 1], normal: (f64, f64)) -> [f64; 1] {
        [self.normal_speed(normal) * u[0]]
    }

    #[inline]
    fn spectral_radius(&self, _u: &[f64; 1], normal: (f64, f64)) -> f64 {
        self.normal_speed(normal).abs()
    }

    #[inline]
    fn flux_jacobian(&self, _u: &[f64; 1], normal: (f64, f64)) -> Block<1> {
        [[self.normal_speed(normal)]]
    }

    fn name(&self) -> &'static str {
        "linear-advection"
    }
}
