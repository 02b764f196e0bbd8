//! Strongly-typed domain types.
//!
//! Newtypes keep cell indices, face indices and raw counters apart in
//! connectivity tables and matrix addressing.

mod indices;

pub use indices::{CellIndex, FaceIndex};
