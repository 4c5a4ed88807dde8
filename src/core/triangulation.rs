//! Planar triangulation data structure over grid points.
//!
//! [`Triangulation`] stores vertices and triangles in slotmap arenas and links
//! triangles through shared-edge adjacency by key, never by reference, so
//! splits and edge flips can rewire the graph freely.
//!
//! # Topological Invariants
//!
//! - **Winding**: every triangle lists its vertices counter-clockwise.
//! - **Opposite indexing**: `neighbors[i]` is the triangle across the edge
//!   *opposite* `vertices[i]`, i.e. the edge `(vertices[i+1], vertices[i+2])`.
//!   `None` marks an edge of the convex hull.
//! - **Mutual adjacency**: if `t.neighbors[i] == Some(n)` then `n` points back
//!   at `t` across the same (reversed) edge.
//! - **Delaunay property**: no vertex lies strictly inside the circumcircle of
//!   any triangle. Maintained by
//!   [`insert`](crate::core::algorithms::insertion::insert) via edge flips and
//!   checked by [`Triangulation::find_delaunay_violations`].
//!
//! | Invariant | Checked by |
//! |---|---|
//! | Winding | [`Triangulation::validate`] |
//! | Mutual adjacency | [`Triangulation::validate`] |
//! | Delaunay property | [`Triangulation::find_delaunay_violations`] |

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

use crate::core::collections::StorageMap;
use crate::geometry::point::GridPoint;
use crate::geometry::predicates::{InSphere, Orientation, insphere, orientation};

new_key_type! {
    /// Key type for accessing vertices in the storage map.
    ///
    /// Vertices are never removed, so iterating the vertex arena yields them
    /// in creation order.
    pub struct VertexKey;
}

new_key_type! {
    /// Key type for accessing triangles in the storage map.
    ///
    /// A key stops resolving once its triangle is destroyed by a split, even
    /// if the arena later reuses the slot.
    pub struct TriangleKey;
}

/// A triangulation vertex: a grid point lifted to its elevation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    point: GridPoint,
    z: f64,
}

impl Vertex {
    /// Creates a vertex at `point` with elevation `z`.
    #[must_use]
    pub const fn new(point: GridPoint, z: f64) -> Self {
        Self { point, z }
    }

    /// Planar position.
    #[must_use]
    pub const fn point(&self) -> GridPoint {
        self.point
    }

    /// Elevation.
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }
}

/// A counter-clockwise triangle with opposite-indexed neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub(crate) vertices: [VertexKey; 3],
    pub(crate) neighbors: [Option<TriangleKey>; 3],
}

impl Triangle {
    pub(crate) const fn new(vertices: [VertexKey; 3]) -> Self {
        Self {
            vertices,
            neighbors: [None; 3],
        }
    }

    /// Vertex keys in counter-clockwise order.
    #[must_use]
    pub const fn vertices(&self) -> [VertexKey; 3] {
        self.vertices
    }

    /// Neighbor across the edge opposite each vertex.
    #[must_use]
    pub const fn neighbors(&self) -> [Option<TriangleKey>; 3] {
        self.neighbors
    }

    /// Index of `vertex` within this triangle.
    #[must_use]
    pub fn vertex_index(&self, vertex: VertexKey) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    /// Index of the edge shared with `neighbor`.
    #[must_use]
    pub fn neighbor_index(&self, neighbor: TriangleKey) -> Option<usize> {
        self.neighbors.iter().position(|&n| n == Some(neighbor))
    }

    /// The two vertices of the edge opposite `vertices[index]`, in winding order.
    #[must_use]
    pub const fn edge(&self, index: usize) -> (VertexKey, VertexKey) {
        (
            self.vertices[(index + 1) % 3],
            self.vertices[(index + 2) % 3],
        )
    }
}

/// Errors raised while seeding a triangulation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TriangulationConstructionError {
    /// The seed rectangle has zero width or height.
    #[error("Seed rectangle {min} .. {max} is degenerate (width and height must be > 0)")]
    DegenerateRectangle {
        /// Lower-left corner.
        min: GridPoint,
        /// Upper-right corner.
        max: GridPoint,
    },
}

/// Structural or geometric invariant violations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TriangulationValidationError {
    /// A triangle references a vertex that is not in the arena.
    #[error("Triangle {triangle:?} references missing vertex {vertex:?}")]
    MissingVertex {
        /// Offending triangle.
        triangle: TriangleKey,
        /// Missing vertex key.
        vertex: VertexKey,
    },
    /// A triangle is not strictly counter-clockwise.
    #[error("Triangle {triangle:?} has {orientation} orientation, expected POSITIVE")]
    InvalidOrientation {
        /// Offending triangle.
        triangle: TriangleKey,
        /// Observed orientation.
        orientation: Orientation,
    },
    /// Neighbor links are dangling, one-sided, or disagree on the shared edge.
    #[error("Invalid neighbor relationship for triangle {triangle:?}: {message}")]
    InvalidNeighbors {
        /// Offending triangle.
        triangle: TriangleKey,
        /// Details.
        message: String,
    },
    /// A vertex lies strictly inside a triangle's circumcircle.
    #[error("Vertex {vertex:?} lies inside the circumcircle of triangle {triangle:?}")]
    DelaunayViolation {
        /// Offending triangle.
        triangle: TriangleKey,
        /// Vertex inside its circumcircle.
        vertex: VertexKey,
    },
}

/// Incrementally maintained planar Delaunay triangulation.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::triangulation::Triangulation;
/// use terra_tin::geometry::point::GridPoint;
///
/// let tri = Triangulation::seed(GridPoint::new(0, 0), GridPoint::new(4, 3), [0.0; 4]).unwrap();
/// assert_eq!(tri.number_of_vertices(), 4);
/// assert_eq!(tri.number_of_triangles(), 2);
/// assert!(tri.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct Triangulation {
    pub(crate) vertices: StorageMap<VertexKey, Vertex>,
    pub(crate) triangles: StorageMap<TriangleKey, Triangle>,
    /// Most recently created triangle, used as the point-location hint.
    pub(crate) last_triangle: Option<TriangleKey>,
}

impl Triangulation {
    /// Seeds the triangulation with the four corners of the rectangle
    /// `min ..= max`, split along the lower-left → upper-right diagonal.
    ///
    /// `heights` holds the corner elevations in counter-clockwise order
    /// starting at the lower-left corner.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationConstructionError::DegenerateRectangle`] when the
    /// rectangle has zero width or height.
    pub fn seed(
        min: GridPoint,
        max: GridPoint,
        heights: [f64; 4],
    ) -> Result<Self, TriangulationConstructionError> {
        if max.x <= min.x || max.y <= min.y {
            return Err(TriangulationConstructionError::DegenerateRectangle { min, max });
        }

        let mut vertices = StorageMap::with_capacity_and_key(4);
        let corners = [
            min,
            GridPoint::new(max.x, min.y),
            max,
            GridPoint::new(min.x, max.y),
        ];
        let [ll, lr, ur, ul] =
            [0, 1, 2, 3].map(|i| vertices.insert(Vertex::new(corners[i], heights[i])));

        let mut triangles = StorageMap::with_capacity_and_key(2);
        let lower = triangles.insert(Triangle::new([ll, lr, ur]));
        let upper = triangles.insert(Triangle::new([ll, ur, ul]));
        // Shared diagonal (ll, ur): opposite `lr` in the lower triangle and
        // opposite `ul` in the upper one.
        triangles[lower].neighbors[1] = Some(upper);
        triangles[upper].neighbors[2] = Some(lower);

        Ok(Self {
            vertices,
            triangles,
            last_triangle: Some(upper),
        })
    }

    /// Number of vertices.
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live triangles.
    #[must_use]
    pub fn number_of_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Looks up a vertex.
    #[must_use]
    pub fn vertex(&self, key: VertexKey) -> Option<&Vertex> {
        self.vertices.get(key)
    }

    /// Looks up a triangle.
    #[must_use]
    pub fn triangle(&self, key: TriangleKey) -> Option<&Triangle> {
        self.triangles.get(key)
    }

    /// Returns `true` while `key` names a live triangle.
    #[must_use]
    pub fn contains_triangle(&self, key: TriangleKey) -> bool {
        self.triangles.contains_key(key)
    }

    /// Vertices in creation order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex)> {
        self.vertices.iter()
    }

    /// Live triangles in arena order.
    pub fn triangles(&self) -> impl Iterator<Item = (TriangleKey, &Triangle)> {
        self.triangles.iter()
    }

    /// Live triangle keys in arena order.
    pub fn triangle_keys(&self) -> impl Iterator<Item = TriangleKey> + '_ {
        self.triangles.keys()
    }

    /// Planar corner positions of a triangle.
    #[must_use]
    pub fn triangle_points(&self, key: TriangleKey) -> Option<[GridPoint; 3]> {
        let t = self.triangles.get(key)?;
        let [a, b, c] = t.vertices;
        Some([
            self.vertices.get(a)?.point,
            self.vertices.get(b)?.point,
            self.vertices.get(c)?.point,
        ])
    }

    /// Lifted corners (`point`, `z`) of a triangle.
    #[must_use]
    pub fn triangle_vertices(&self, key: TriangleKey) -> Option<[Vertex; 3]> {
        let t = self.triangles.get(key)?;
        let [a, b, c] = t.vertices;
        Some([
            *self.vertices.get(a)?,
            *self.vertices.get(b)?,
            *self.vertices.get(c)?,
        ])
    }

    /// Live neighbors of a triangle (hull edges omitted).
    pub fn neighbors(&self, key: TriangleKey) -> impl Iterator<Item = TriangleKey> + '_ {
        self.triangles
            .get(key)
            .into_iter()
            .flat_map(|t| t.neighbors.into_iter().flatten())
    }

    /// Checks winding and adjacency invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`TriangulationValidationError`] found.
    pub fn validate(&self) -> Result<(), TriangulationValidationError> {
        for (key, triangle) in &self.triangles {
            for vertex in triangle.vertices {
                if !self.vertices.contains_key(vertex) {
                    return Err(TriangulationValidationError::MissingVertex {
                        triangle: key,
                        vertex,
                    });
                }
            }
            let [a, b, c] = triangle.vertices.map(|v| self.vertices[v].point);
            let orient = orientation(a, b, c);
            if orient != Orientation::POSITIVE {
                return Err(TriangulationValidationError::InvalidOrientation {
                    triangle: key,
                    orientation: orient,
                });
            }
            self.validate_neighbors_of(key, triangle)?;
        }
        Ok(())
    }

    fn validate_neighbors_of(
        &self,
        key: TriangleKey,
        triangle: &Triangle,
    ) -> Result<(), TriangulationValidationError> {
        let invalid = |message: String| TriangulationValidationError::InvalidNeighbors {
            triangle: key,
            message,
        };

        for (i, neighbor) in triangle.neighbors.iter().enumerate() {
            let Some(neighbor_key) = *neighbor else {
                continue;
            };
            if neighbor_key == key {
                return Err(invalid(format!("edge {i} is adjacent to itself")));
            }
            let neighbor = self
                .triangles
                .get(neighbor_key)
                .ok_or_else(|| invalid(format!("edge {i} points at missing {neighbor_key:?}")))?;
            let j = neighbor
                .neighbor_index(key)
                .ok_or_else(|| invalid(format!("{neighbor_key:?} does not point back")))?;
            let (a, b) = triangle.edge(i);
            let (c, d) = neighbor.edge(j);
            if (a, b) != (d, c) {
                return Err(invalid(format!(
                    "edge {i} does not match the reversed edge {j} of {neighbor_key:?}"
                )));
            }
            if triangle.neighbors.iter().filter(|&&n| n == Some(neighbor_key)).count() > 1 {
                return Err(invalid(format!("{neighbor_key:?} is adjacent more than once")));
            }
        }
        Ok(())
    }

    /// All `(triangle, vertex)` pairs where the vertex lies strictly inside the
    /// triangle's circumcircle.
    ///
    /// This is an O(T·V) scan intended for tests and debug verification.
    #[must_use]
    pub fn find_delaunay_violations(&self) -> Vec<(TriangleKey, VertexKey)> {
        let mut violations = Vec::new();
        for (key, triangle) in &self.triangles {
            // Dangling corners are reported by `validate`.
            let Some([a, b, c]) = self.triangle_points(key) else {
                continue;
            };
            for (vertex_key, vertex) in &self.vertices {
                if triangle.vertices.contains(&vertex_key) {
                    continue;
                }
                if insphere(a, b, c, vertex.point) == InSphere::INSIDE {
                    violations.push((key, vertex_key));
                }
            }
        }
        violations
    }

    /// Runs [`Triangulation::validate`] and the Delaunay check.
    ///
    /// # Errors
    ///
    /// Returns the first structural error, or the first Delaunay violation.
    pub fn validate_delaunay(&self) -> Result<(), TriangulationValidationError> {
        self.validate()?;
        if let Some(&(triangle, vertex)) = self.find_delaunay_violations().first() {
            return Err(TriangulationValidationError::DelaunayViolation { triangle, vertex });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Crate-internal mutation helpers
    // -------------------------------------------------------------------------

    /// Redirects the back-pointer of `neighbor` from `old` to `new`.
    pub(crate) fn replace_neighbor(
        &mut self,
        neighbor: Option<TriangleKey>,
        old: TriangleKey,
        new: TriangleKey,
    ) -> bool {
        let Some(neighbor_key) = neighbor else {
            return true;
        };
        let Some(triangle) = self.triangles.get_mut(neighbor_key) else {
            return false;
        };
        match triangle.neighbor_index(old) {
            Some(index) => {
                triangle.neighbors[index] = Some(new);
                true
            }
            None => false,
        }
    }
}
