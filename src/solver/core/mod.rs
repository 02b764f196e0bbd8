//! Core solution containers.
//!
//! - [`StateVector`]: per-cell storage of N conservation variables

mod state_vector;

pub use state_vector::StateVector;
