//! Spatial discretization.
//!
//! The drivers only see a [`SpatialOperator`]: a map from the cell state to
//! the residual, the local pseudo-time steps and the residual Jacobian.
//! [`FirstOrderFv`] is a complete first-order operator over any
//! [`InviscidFlux`](crate::flux::InviscidFlux).

mod first_order;
mod traits;

pub use first_order::{BoundaryCondition, FirstOrderFv};
pub use traits::SpatialOperator;
