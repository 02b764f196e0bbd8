//! 2D unstructured finite-volume mesh of polygonal cells.
//!
//! The mesh stores:
//! - Vertex coordinates
//! - Cell-vertex connectivity (counter-clockwise ordering)
//! - Face-based connectivity for interface flux computation
//! - Cell areas and centroids
//!
//! Face convention: each face has a `left` cell and an optional `right`
//! cell. The unit normal points from left to right, so it is outward for
//! the left cell. Boundary faces have no right cell.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{CellIndex, FaceIndex};

/// Errors raised while building a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("cell {cell} has {n_vertices} vertices, need at least 3")]
    TooFewVertices { cell: usize, n_vertices: usize },

    #[error("cell {cell} references vertex {vertex}, but the mesh has {n_vertices} vertices")]
    VertexOutOfRange {
        cell: usize,
        vertex: usize,
        n_vertices: usize,
    },

    #[error("cell {cell} has non-positive area {area} (vertices must be counter-clockwise)")]
    NonPositiveArea { cell: usize, area: f64 },

    #[error("edge ({0}, {1}) is shared by more than two cells")]
    NonManifoldEdge(usize, usize),

    #[error("invalid mesh parameters: {0}")]
    InvalidParameters(String),
}

/// Information about a face (edge) of the mesh.
#[derive(Clone, Debug)]
pub struct Face {
    /// Vertex indices in the left cell's counter-clockwise order
    pub vertices: (usize, usize),
    /// Cell on the side the normal points away from
    pub left: CellIndex,
    /// Cell on the side the normal points into (None for boundary faces)
    pub right: Option<CellIndex>,
    /// Unit normal pointing from left to right
    pub normal: (f64, f64),
    /// Face length
    pub length: f64,
}

impl Face {
    /// Check if this is a boundary face.
    pub fn is_boundary(&self) -> bool {
        self.right.is_none()
    }
}

/// A face as seen from one of its cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellFace {
    /// Global face index
    pub face: FaceIndex,
    /// Neighbouring cell across this face (None on the boundary)
    pub neighbor: Option<CellIndex>,
    /// Outward unit normal for this cell
    pub normal: (f64, f64),
    /// Face length
    pub length: f64,
}

/// 2D mesh of polygonal cells.
#[derive(Clone, Debug)]
pub struct Mesh2D {
    /// Vertex coordinates: vertices[i] = (x, y)
    pub vertices: Vec<(f64, f64)>,
    /// Cell-vertex connectivity, counter-clockwise
    pub cells: Vec<Vec<usize>>,
    /// Face list with connectivity information
    pub faces: Vec<Face>,
    cell_faces: Vec<Vec<CellFace>>,
    areas: Vec<f64>,
    centroids: Vec<(f64, f64)>,
}

impl Mesh2D {
    /// Build a mesh from vertex coordinates and counter-clockwise cell loops.
    pub fn from_cells(
        vertices: Vec<(f64, f64)>,
        cells: Vec<Vec<usize>>,
    ) -> Result<Self, MeshError> {
        let n_vertices = vertices.len();
        let mut areas = Vec::with_capacity(cells.len());
        let mut centroids = Vec::with_capacity(cells.len());

        for (k, cell) in cells.iter().enumerate() {
            if cell.len() < 3 {
                return Err(MeshError::TooFewVertices {
                    cell: k,
                    n_vertices: cell.len(),
                });
            }
            if let Some(&v) = cell.iter().find(|&&v| v >= n_vertices) {
                return Err(MeshError::VertexOutOfRange {
                    cell: k,
                    vertex: v,
                    n_vertices,
                });
            }
            let (area, centroid) = polygon_area_centroid(&vertices, cell);
            if area <= 0.0 || !area.is_finite() {
                return Err(MeshError::NonPositiveArea { cell: k, area });
            }
            areas.push(area);
            centroids.push(centroid);
        }

        // Match edges by their sorted vertex pair
        let mut faces: Vec<Face> = Vec::new();
        let mut edge_map: HashMap<(usize, usize), usize> = HashMap::new();
        let mut cell_face_ids: Vec<Vec<usize>> = vec![Vec::new(); cells.len()];

        for (k, cell) in cells.iter().enumerate() {
            let nv = cell.len();
            for i in 0..nv {
                let a = cell[i];
                let b = cell[(i + 1) % nv];
                let key = (a.min(b), a.max(b));

                match edge_map.get(&key) {
                    Some(&f) => {
                        if faces[f].right.is_some() {
                            return Err(MeshError::NonManifoldEdge(key.0, key.1));
                        }
                        faces[f].right = Some(CellIndex::new(k));
                        cell_face_ids[k].push(f);
                    }
                    None => {
                        let (xa, ya) = vertices[a];
                        let (xb, yb) = vertices[b];
                        let dx = xb - xa;
                        let dy = yb - ya;
                        let length = (dx * dx + dy * dy).sqrt();
                        if length <= 0.0 {
                            return Err(MeshError::InvalidParameters(format!(
                                "zero-length edge ({a}, {b}) in cell {k}"
                            )));
                        }
                        let f = faces.len();
                        faces.push(Face {
                            vertices: (a, b),
                            left: CellIndex::new(k),
                            right: None,
                            normal: (dy / length, -dx / length),
                            length,
                        });
                        edge_map.insert(key, f);
                        cell_face_ids[k].push(f);
                    }
                }
            }
        }

        let cell_faces = cell_face_ids
            .iter()
            .enumerate()
            .map(|(k, ids)| {
                ids.iter()
                    .map(|&f| {
                        let face = &faces[f];
                        let is_left = face.left.get() == k;
                        let (neighbor, normal) = if is_left {
                            (face.right, face.normal)
                        } else {
                            (Some(face.left), (-face.normal.0, -face.normal.1))
                        };
                        CellFace {
                            face: FaceIndex::new(f),
                            neighbor,
                            normal,
                            length: face.length,
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            vertices,
            cells,
            faces,
            cell_faces,
            areas,
            centroids,
        })
    }

    /// Create a uniform rectangular mesh of `nx * ny` quadrilateral cells.
    ///
    /// Cells are numbered row by row, x fastest.
    pub fn uniform_rectangle(
        x0: f64,
        x1: f64,
        y0: f64,
        y1: f64,
        nx: usize,
        ny: usize,
    ) -> Result<Self, MeshError> {
        if nx == 0 || ny == 0 {
            return Err(MeshError::InvalidParameters(format!(
                "need at least one cell per direction, got {nx} x {ny}"
            )));
        }
        if x1 <= x0 || y1 <= y0 {
            return Err(MeshError::InvalidParameters(format!(
                "empty domain [{x0}, {x1}] x [{y0}, {y1}]"
            )));
        }

        let dx = (x1 - x0) / nx as f64;
        let dy = (y1 - y0) / ny as f64;

        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push((x0 + i as f64 * dx, y0 + j as f64 * dy));
            }
        }

        let vid = |i: usize, j: usize| j * (nx + 1) + i;
        let mut cells = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                cells.push(vec![vid(i, j), vid(i + 1, j), vid(i + 1, j + 1), vid(i, j + 1)]);
            }
        }

        Self::from_cells(vertices, cells)
    }

    /// Number of cells.
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of faces.
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// Cell area.
    #[inline]
    pub fn area(&self, cell: CellIndex) -> f64 {
        self.areas[cell]
    }

    /// All cell areas, indexed by cell.
    #[inline]
    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    /// Cell centroid.
    pub fn centroid(&self, cell: CellIndex) -> (f64, f64) {
        self.centroids[cell]
    }

    /// Faces of a cell with outward orientation.
    #[inline]
    pub fn cell_faces(&self, cell: CellIndex) -> &[CellFace] {
        &self.cell_faces[cell]
    }

    /// Face by index.
    #[inline]
    pub fn face(&self, face: FaceIndex) -> &Face {
        &self.faces[face]
    }

    /// Neighbouring cells across interior faces.
    pub fn neighbors(&self, cell: CellIndex) -> impl Iterator<Item = CellIndex> + '_ {
        self.cell_faces[cell].iter().filter_map(|cf| cf.neighbor)
    }

    /// Number of boundary faces.
    pub fn n_boundary_faces(&self) -> usize {
        self.faces.iter().filter(|f| f.is_boundary()).count()
    }

    /// Total mesh area.
    pub fn total_area(&self) -> f64 {
        self.areas.iter().sum()
    }
}

/// Signed area and centroid of a polygon (shoelace formula).
fn polygon_area_centroid(vertices: &[(f64, f64)], cell: &[usize]) -> (f64, (f64, f64)) {
    let nv = cell.len();
    let mut a2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..nv {
        let (x0, y0) = vertices[cell[i]];
        let (x1, y1) = vertices[cell[(i + 1) % nv]];
        let cross = x0 * y1 - x1 * y0;
        a2 += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    let area = 0.5 * a2;
    if area.abs() < f64::MIN_POSITIVE {
        return (area, (0.0, 0.0));
    }
    (area, (cx / (6.0 * area), cy / (6.0 * area)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_rectangle_counts() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 2.0, 0.0, 1.0, 4, 2).unwrap();
        assert_eq!(mesh.n_cells(), 8);
        // horizontal: (nx) * (ny + 1), vertical: (nx + 1) * ny
        assert_eq!(mesh.n_faces(), 4 * 3 + 5 * 2);
        assert_eq!(mesh.n_boundary_faces(), 2 * 4 + 2 * 2);
        assert!((mesh.total_area() - 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_outward_normals_close() {
        // Sum of n * len over a closed cell vanishes
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 3, 3).unwrap();
        for k in CellIndex::range(mesh.n_cells()) {
            let (sx, sy) = mesh
                .cell_faces(k)
                .iter()
                .fold((0.0, 0.0), |(sx, sy), cf| {
                    (sx + cf.normal.0 * cf.length, sy + cf.normal.1 * cf.length)
                });
            assert!(sx.abs() < 1e-14 && sy.abs() < 1e-14, "cell {k}: ({sx}, {sy})");
        }
    }

    #[test]
    fn test_normal_points_left_to_right() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 2.0, 0.0, 1.0, 2, 1).unwrap();
        let shared = mesh
            .faces
            .iter()
            .find(|f| !f.is_boundary())
            .expect("two cells share one face");
        let (xl, _) = mesh.centroid(shared.left);
        let (xr, _) = mesh.centroid(shared.right.unwrap());
        assert!((shared.normal.0 * (xr - xl)) > 0.0);
    }

    #[test]
    fn test_triangle_area_and_centroid() {
        let mesh =
            Mesh2D::from_cells(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], vec![vec![0, 1, 2]])
                .unwrap();
        assert!((mesh.area(CellIndex::ZERO) - 0.5).abs() < 1e-15);
        let (cx, cy) = mesh.centroid(CellIndex::ZERO);
        assert!((cx - 1.0 / 3.0).abs() < 1e-15);
        assert!((cy - 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn test_clockwise_cell_rejected() {
        let err = Mesh2D::from_cells(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 0.0)], vec![vec![0, 1, 2]])
            .unwrap_err();
        assert!(matches!(err, MeshError::NonPositiveArea { cell: 0, .. }));
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        assert!(matches!(
            Mesh2D::from_cells(vec![(0.0, 0.0), (1.0, 0.0)], vec![vec![0, 1]]),
            Err(MeshError::TooFewVertices { .. })
        ));
        assert!(matches!(
            Mesh2D::from_cells(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], vec![vec![0, 1, 5]]),
            Err(MeshError::VertexOutOfRange { vertex: 5, .. })
        ));
        assert!(Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 0, 3).is_err());
    }

    #[test]
    fn test_neighbors() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 3.0, 0.0, 1.0, 3, 1).unwrap();
        let mut n: Vec<usize> = mesh.neighbors(CellIndex::new(1)).map(|c| c.get()).collect();
        n.sort_unstable();
        assert_eq!(n, vec![0, 2]);
        assert_eq!(mesh.neighbors(CellIndex::ZERO).count(), 1);
    }
}
