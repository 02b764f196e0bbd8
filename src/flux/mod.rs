//! Inviscid fluxes.
//!
//! Provides the physical fluxes the spatial operator and the LU-SGS sweep
//! are written against:
//! - [`LinearAdvection`]: scalar advection with constant velocity
//! - [`EulerFlux`]: 2D compressible Euler for an ideal gas
//!
//! and the [`rusanov_flux`] interface flux built on any [`InviscidFlux`].

mod advection;
mod euler;
pub mod traits;

pub use advection::LinearAdvection;
pub use euler::EulerFlux;
pub use traits::{InviscidFlux, rusanov_flux};
