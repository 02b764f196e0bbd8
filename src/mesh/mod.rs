//! Mesh representation.
//!
//! Provides the cell-centred finite-volume mesh the drivers march on:
//! cell areas, face normals and lengths, and cell-to-cell adjacency.

mod mesh2d;

pub use mesh2d::{CellFace, Face, Mesh2D, MeshError};
