//! Flat, index-based output mesh.
//!
//! [`Mesh::from_triangulation`] lists vertices in creation order and faces in
//! triangle arena order. Faces keep the counter-clockwise winding of the
//! triangulation (viewed from +Z).

use serde::{Deserialize, Serialize};

use crate::core::collections::VertexSecondaryMap;
use crate::core::config::CoordinateSpace;
use crate::core::error::TinError;
use crate::core::grid::Grid;
use crate::core::triangulation::Triangulation;
use crate::io::writer::{MeshSink, MeshWriteError};

/// Output vertex.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshVertex {
    /// Easting (or column).
    pub x: f64,
    /// Northing (or row).
    pub y: f64,
    /// Elevation.
    pub z: f64,
}

impl MeshVertex {
    /// Creates a vertex.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Triangle as three 0-based vertex indices, counter-clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Face(pub [usize; 3]);

impl Face {
    /// Vertex indices.
    #[must_use]
    pub const fn indices(&self) -> [usize; 3] {
        self.0
    }
}

/// Decomposed TIN ready for serialization.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::config::CoordinateSpace;
/// use terra_tin::core::grid::Grid;
/// use terra_tin::core::mesh::Mesh;
/// use terra_tin::core::triangulation::Triangulation;
/// use terra_tin::geometry::point::GridPoint;
///
/// let grid = Grid::new(2, 2, 10.0, 500.0, 100.0, -9999.0, vec![1.0; 4]).unwrap();
/// let tri = Triangulation::seed(GridPoint::new(0, 0), GridPoint::new(1, 1), [1.0; 4]).unwrap();
///
/// let mesh = Mesh::from_triangulation(&tri, &grid, CoordinateSpace::World).unwrap();
/// assert_eq!(mesh.vertices().len(), 4);
/// assert_eq!(mesh.faces().len(), 2);
/// assert_eq!((mesh.vertices()[2].x, mesh.vertices()[2].y), (510.0, 110.0));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    vertices: Vec<MeshVertex>,
    faces: Vec<Face>,
}

impl Mesh {
    /// Assembles a mesh from parts.
    ///
    /// # Errors
    ///
    /// Returns [`MeshWriteError::IndexOutOfRange`] if a face references a
    /// missing vertex.
    pub fn new(vertices: Vec<MeshVertex>, faces: Vec<Face>) -> Result<Self, MeshWriteError> {
        check_faces(vertices.len(), &faces)?;
        Ok(Self { vertices, faces })
    }

    /// Extracts the mesh of a finished triangulation.
    ///
    /// # Errors
    ///
    /// Returns [`TinError::Internal`] if a triangle references a vertex that
    /// is not in the triangulation.
    pub fn from_triangulation(
        tri: &Triangulation,
        grid: &Grid,
        space: CoordinateSpace,
    ) -> Result<Self, TinError> {
        let mut index = VertexSecondaryMap::with_capacity(tri.number_of_vertices());
        let mut vertices = Vec::with_capacity(tri.number_of_vertices());
        for (key, vertex) in tri.vertices() {
            let point = vertex.point();
            let (x, y) = match space {
                CoordinateSpace::GridLocal => (point.x as f64, point.y as f64),
                CoordinateSpace::World => {
                    let (column, row) = point.to_cell().ok_or_else(|| TinError::Internal {
                        message: format!("vertex {point} has a negative cell index"),
                    })?;
                    grid.world_xy(column, row)
                }
            };
            index.insert(key, vertices.len());
            vertices.push(MeshVertex::new(x, y, vertex.z()));
        }

        let mut faces = Vec::with_capacity(tri.number_of_triangles());
        for (key, triangle) in tri.triangles() {
            let mut face = [0; 3];
            for (slot, vertex) in face.iter_mut().zip(triangle.vertices()) {
                *slot = *index.get(vertex).ok_or_else(|| TinError::Internal {
                    message: format!("triangle {key:?} references missing vertex {vertex:?}"),
                })?;
            }
            faces.push(Face(face));
        }

        Ok(Self { vertices, faces })
    }

    /// Vertices in output order.
    #[must_use]
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    /// Faces in output order.
    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Number of vertices.
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[must_use]
    pub fn number_of_faces(&self) -> usize {
        self.faces.len()
    }

    /// Corner positions of a face, or `None` if `face` is out of range.
    #[must_use]
    pub fn face_vertices(&self, face: usize) -> Option<[MeshVertex; 3]> {
        let [a, b, c] = self.faces.get(face)?.0;
        Some([
            *self.vertices.get(a)?,
            *self.vertices.get(b)?,
            *self.vertices.get(c)?,
        ])
    }

    /// Hands the vertex and face sequences to a writer.
    ///
    /// # Errors
    ///
    /// Propagates the writer's [`MeshWriteError`].
    pub fn write_to<S: MeshSink + ?Sized>(&self, sink: &mut S) -> Result<(), MeshWriteError> {
        sink.write_mesh(&self.vertices, &self.faces)
    }
}

/// Rejects faces that reference a vertex beyond `vertex_count`.
pub(crate) fn check_faces(vertex_count: usize, faces: &[Face]) -> Result<(), MeshWriteError> {
    for (face, Face(indices)) in faces.iter().enumerate() {
        if let Some(&index) = indices.iter().find(|&&i| i >= vertex_count) {
            return Err(MeshWriteError::IndexOutOfRange {
                face,
                index,
                vertex_count,
            });
        }
    }
    Ok(())
}
