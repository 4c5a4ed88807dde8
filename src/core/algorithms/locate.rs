//! Point location by walking triangle adjacency.
//!
//! Starting from a hint triangle (or an arbitrary one), the walk tests the
//! query point against each edge of the current triangle and crosses the
//! first edge that has the point strictly on its outer side. On a Delaunay
//! triangulation this visibility walk always terminates; a step budget and a
//! visited set still guard against corrupted adjacency.
//!
//! # References
//!
//! - O. Devillers, S. Pion, and M. Teillaud, "Walking in a Triangulation",
//!   International Journal of Foundations of Computer Science, 2001.

use thiserror::Error;

use crate::core::collections::fast_hash_set_with_capacity;
use crate::core::triangulation::{TriangleKey, Triangulation, VertexKey};
use crate::geometry::point::GridPoint;
use crate::geometry::predicates::{Orientation, orientation};

/// Result of a point location query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateResult {
    /// Point is strictly inside the triangle.
    InsideTriangle(TriangleKey),
    /// Point is on the edge opposite `vertices[edge_index]` of the triangle.
    OnEdge(TriangleKey, u8),
    /// Point coincides with an existing vertex.
    OnVertex(VertexKey),
}

/// Error during point location.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LocateError {
    /// Triangulation has no triangles.
    #[error("Cannot locate in empty triangulation")]
    EmptyTriangulation,

    /// A triangle or vertex reference could not be resolved.
    #[error("Invalid triangle reference: {triangle:?}")]
    InvalidTriangle {
        /// The unresolved triangle key.
        triangle: TriangleKey,
    },

    /// The point lies outside the convex hull.
    #[error("Point {point} lies outside the triangulated region")]
    PointOutOfBounds {
        /// Query point.
        point: GridPoint,
    },

    /// The walk revisited a triangle or exceeded its step budget.
    #[error("Cycle detected after {steps} steps while locating {point}")]
    CycleDetected {
        /// Steps taken before giving up.
        steps: usize,
        /// Query point.
        point: GridPoint,
    },
}

/// Locate `point` in the triangulation.
///
/// # Errors
///
/// Returns [`LocateError::PointOutOfBounds`] if the walk leaves the convex
/// hull, and [`LocateError::CycleDetected`] or
/// [`LocateError::InvalidTriangle`] if adjacency is corrupted.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::algorithms::locate::{LocateResult, locate};
/// use terra_tin::core::triangulation::Triangulation;
/// use terra_tin::geometry::point::GridPoint;
///
/// let tri = Triangulation::seed(GridPoint::new(0, 0), GridPoint::new(4, 4), [0.0; 4]).unwrap();
///
/// assert!(matches!(
///     locate(&tri, GridPoint::new(3, 1), None),
///     Ok(LocateResult::InsideTriangle(_))
/// ));
/// // (2, 2) sits on the seed diagonal.
/// assert!(matches!(
///     locate(&tri, GridPoint::new(2, 2), None),
///     Ok(LocateResult::OnEdge(_, _))
/// ));
/// assert!(matches!(
///     locate(&tri, GridPoint::new(0, 4), None),
///     Ok(LocateResult::OnVertex(_))
/// ));
/// assert!(locate(&tri, GridPoint::new(5, 1), None).is_err());
/// ```
pub fn locate(
    tri: &Triangulation,
    point: GridPoint,
    hint: Option<TriangleKey>,
) -> Result<LocateResult, LocateError> {
    let max_steps = tri.number_of_triangles() + 1;

    let mut current = match hint {
        Some(key) if tri.contains_triangle(key) => key,
        _ => tri
            .triangle_keys()
            .next()
            .ok_or(LocateError::EmptyTriangulation)?,
    };

    let mut visited = fast_hash_set_with_capacity(max_steps.min(64));

    for step in 0..max_steps {
        if !visited.insert(current) {
            return Err(LocateError::CycleDetected { steps: step, point });
        }

        let triangle = tri
            .triangle(current)
            .ok_or(LocateError::InvalidTriangle { triangle: current })?;
        let corners = tri
            .triangle_points(current)
            .ok_or(LocateError::InvalidTriangle { triangle: current })?;

        let mut on_edges = [false; 3];
        let mut crossed = None;

        for i in 0..3 {
            let a = corners[(i + 1) % 3];
            let b = corners[(i + 2) % 3];
            match orientation(a, b, point) {
                Orientation::NEGATIVE => {
                    crossed = Some(i);
                    break;
                }
                Orientation::DEGENERATE => on_edges[i] = true,
                Orientation::POSITIVE => {}
            }
        }

        if let Some(i) = crossed {
            match triangle.neighbors[i] {
                Some(next) => {
                    current = next;
                    continue;
                }
                None => return Err(LocateError::PointOutOfBounds { point }),
            }
        }

        return Ok(classify(triangle.vertices(), current, on_edges));
    }

    Err(LocateError::CycleDetected {
        steps: max_steps,
        point,
    })
}

/// Turns the set of edges a point lies on into a [`LocateResult`].
///
/// Two collinear edges meet at the vertex shared by both, i.e. the vertex
/// not opposite either of them.
fn classify(vertices: [VertexKey; 3], triangle: TriangleKey, on_edges: [bool; 3]) -> LocateResult {
    match on_edges {
        [false, false, false] => LocateResult::InsideTriangle(triangle),
        [true, false, false] => LocateResult::OnEdge(triangle, 0),
        [false, true, false] => LocateResult::OnEdge(triangle, 1),
        [false, false, true] => LocateResult::OnEdge(triangle, 2),
        [true, true, _] => LocateResult::OnVertex(vertices[2]),
        [true, false, true] => LocateResult::OnVertex(vertices[1]),
        [false, true, true] => LocateResult::OnVertex(vertices[0]),
    }
}

impl Triangulation {
    /// Locates `point`, starting from the most recently created triangle.
    ///
    /// # Errors
    ///
    /// See [`locate`].
    pub fn locate(&self, point: GridPoint) -> Result<LocateResult, LocateError> {
        locate(self, point, self.last_triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(w: i64, h: i64) -> Triangulation {
        Triangulation::seed(GridPoint::new(0, 0), GridPoint::new(w, h), [0.0; 4]).unwrap()
    }

    #[test]
    fn every_interior_point_is_found_from_every_hint() {
        let tri = seeded(6, 4);
        let hints: Vec<_> = tri.triangle_keys().collect();
        for hint in hints {
            for y in 1..4 {
                for x in 1..6 {
                    let result = locate(&tri, GridPoint::new(x, y), Some(hint)).unwrap();
                    match result {
                        LocateResult::InsideTriangle(t) | LocateResult::OnEdge(t, _) => {
                            let [a, b, c] = tri.triangle_points(t).unwrap();
                            let p = GridPoint::new(x, y);
                            assert_ne!(orientation(a, b, p), Orientation::NEGATIVE);
                            assert_ne!(orientation(b, c, p), Orientation::NEGATIVE);
                            assert_ne!(orientation(c, a, p), Orientation::NEGATIVE);
                        }
                        LocateResult::OnVertex(_) => panic!("interior point matched a vertex"),
                    }
                }
            }
        }
    }

    #[test]
    fn hull_edges_and_corners_are_classified() {
        let tri = seeded(4, 4);
        assert!(matches!(
            tri.locate(GridPoint::new(2, 0)),
            Ok(LocateResult::OnEdge(_, _))
        ));
        for corner in [(0, 0), (4, 0), (4, 4), (0, 4)] {
            let result = tri.locate(GridPoint::new(corner.0, corner.1)).unwrap();
            let LocateResult::OnVertex(v) = result else {
                panic!("corner {corner:?} not matched to a vertex: {result:?}");
            };
            assert_eq!(
                tri.vertex(v).unwrap().point(),
                GridPoint::new(corner.0, corner.1)
            );
        }
    }

    #[test]
    fn points_outside_the_hull_are_rejected() {
        let tri = seeded(4, 4);
        for p in [(-1, 2), (2, -1), (5, 2), (2, 5), (9, 9)] {
            assert_eq!(
                tri.locate(GridPoint::new(p.0, p.1)),
                Err(LocateError::PointOutOfBounds {
                    point: GridPoint::new(p.0, p.1)
                })
            );
        }
    }

    #[test]
    fn stale_hint_falls_back_to_arbitrary_start() {
        let mut tri = seeded(4, 4);
        let stale = tri.triangle_keys().next().unwrap();
        let copy = tri.triangles[stale];
        tri.triangles.remove(stale);
        let replacement = tri.triangles.insert(copy);
        // Re-link the surviving triangle to the replacement key.
        for (_, t) in &mut tri.triangles {
            for n in &mut t.neighbors {
                if *n == Some(stale) {
                    *n = Some(replacement);
                }
            }
        }
        assert!(!tri.contains_triangle(stale));
        assert!(locate(&tri, GridPoint::new(1, 3), Some(stale)).is_ok());
    }
}
