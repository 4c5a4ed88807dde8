//! Incremental vertex insertion with Lawson edge legalization.
//!
//! A new vertex either falls strictly inside a triangle (1 → 3 split), on an
//! interior edge (2 → 4 split) or on a hull edge (1 → 2 split). Every triangle
//! created by the split has the new vertex at index `0`, so the edge opposite
//! it is the only one that may violate the empty-circumcircle property. Those
//! edges are pushed on a work stack and flipped while the opposite vertex of
//! the neighboring triangle lies strictly inside the circumcircle; each flip
//! produces two triangles that again carry the new vertex at index `0`.
//!
//! Flips rewrite both triangles in place and keep their keys, while split
//! triangles are removed from the arena. Callers therefore learn exactly which
//! keys died ([`InsertionOutcome::removed`]) and which live triangles have a
//! new shape ([`InsertionOutcome::changed`]).

use thiserror::Error;

use crate::core::algorithms::locate::{LocateError, LocateResult, locate};
use crate::core::collections::{FastHashSet, SmallBuffer, TriangleKeyBuffer};
use crate::core::triangulation::{Triangle, TriangleKey, Triangulation, Vertex, VertexKey};
use crate::geometry::point::GridPoint;
use crate::geometry::predicates::{InSphere, insphere};

/// Errors that can occur while inserting a vertex.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum InsertionError {
    /// The point coincides with an existing vertex.
    #[error("Degenerate insertion at {point}: duplicate of vertex {existing:?}")]
    DegenerateInsertion {
        /// Rejected point.
        point: GridPoint,
        /// Vertex already occupying the point.
        existing: VertexKey,
    },

    /// Point location failed (outside the hull, or corrupted adjacency).
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Neighbor links disagree with the triangles they connect.
    #[error("Adjacency mismatch at triangle {triangle:?}: {message}")]
    InvalidAdjacency {
        /// Triangle where the mismatch was detected.
        triangle: TriangleKey,
        /// Details.
        message: &'static str,
    },

    /// Legalization did not settle within its flip budget.
    #[error("Edge legalization did not converge after {flips} flips")]
    NonConvergent {
        /// Flips performed before giving up.
        flips: usize,
    },
}

impl InsertionError {
    /// Returns `true` for conditions the caller may recover from by skipping
    /// the point.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateInsertion { .. })
    }
}

/// What an insertion did to the triangulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionOutcome {
    /// Key of the new vertex.
    pub vertex: VertexKey,
    /// Triangles destroyed by the split. These keys no longer resolve.
    pub removed: TriangleKeyBuffer,
    /// Live triangles that were created or reshaped by a flip, in first-touch
    /// order without duplicates.
    pub changed: Vec<TriangleKey>,
    /// Number of edge flips performed during legalization.
    pub flips: usize,
}

/// Inserts `point` with elevation `z` and restores the Delaunay property.
///
/// # Errors
///
/// - [`InsertionError::DegenerateInsertion`] if the point duplicates a vertex;
///   the triangulation is left untouched.
/// - [`InsertionError::Locate`] if the point is outside the hull.
/// - [`InsertionError::InvalidAdjacency`] / [`InsertionError::NonConvergent`]
///   on internal corruption.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::algorithms::insertion::insert;
/// use terra_tin::core::triangulation::Triangulation;
/// use terra_tin::geometry::point::GridPoint;
///
/// let mut tri =
///     Triangulation::seed(GridPoint::new(0, 0), GridPoint::new(4, 4), [0.0; 4]).unwrap();
///
/// // Strictly inside the lower triangle: 1 → 3.
/// let outcome = insert(&mut tri, GridPoint::new(3, 1), 5.0).unwrap();
/// assert_eq!(outcome.removed.len(), 1);
/// assert_eq!(tri.number_of_triangles(), 4);
///
/// // Duplicates are rejected without modifying the mesh.
/// assert!(insert(&mut tri, GridPoint::new(3, 1), 5.0).unwrap_err().is_degenerate());
/// assert_eq!(tri.number_of_vertices(), 5);
/// assert!(tri.validate_delaunay().is_ok());
/// ```
pub fn insert(
    tri: &mut Triangulation,
    point: GridPoint,
    z: f64,
) -> Result<InsertionOutcome, InsertionError> {
    let location = locate(tri, point, tri.last_triangle)?;
    let (vertex, (removed, created)) = match location {
        LocateResult::OnVertex(existing) => {
            return Err(InsertionError::DegenerateInsertion { point, existing });
        }
        LocateResult::InsideTriangle(t) => {
            let vertex = tri.vertices.insert(Vertex::new(point, z));
            (vertex, split_triangle(tri, t, vertex)?)
        }
        LocateResult::OnEdge(t, edge) => {
            let vertex = tri.vertices.insert(Vertex::new(point, z));
            (vertex, split_edge(tri, t, usize::from(edge), vertex)?)
        }
    };

    let mut changed = Vec::with_capacity(created.len() + 4);
    let mut seen = FastHashSet::default();
    for &key in &created {
        if seen.insert(key) {
            changed.push(key);
        }
    }

    let flips = legalize(tri, &created, &mut |key| {
        if seen.insert(key) {
            changed.push(key);
        }
    })?;

    tri.last_triangle = changed.last().copied();

    Ok(InsertionOutcome {
        vertex,
        removed,
        changed,
        flips,
    })
}

type SplitResult = Result<(TriangleKeyBuffer, SmallBuffer<TriangleKey, 4>), InsertionError>;

/// 1 → 3 split of triangle `t` around vertex `p`.
fn split_triangle(tri: &mut Triangulation, t: TriangleKey, p: VertexKey) -> SplitResult {
    let old = tri
        .triangles
        .remove(t)
        .ok_or(InsertionError::InvalidAdjacency {
            triangle: t,
            message: "located triangle vanished",
        })?;
    let [a, b, c] = old.vertices;
    let [na, nb, nc] = old.neighbors;

    let t0 = tri.triangles.insert(Triangle::new([p, b, c]));
    let t1 = tri.triangles.insert(Triangle::new([p, c, a]));
    let t2 = tri.triangles.insert(Triangle::new([p, a, b]));
    tri.triangles[t0].neighbors = [na, Some(t1), Some(t2)];
    tri.triangles[t1].neighbors = [nb, Some(t2), Some(t0)];
    tri.triangles[t2].neighbors = [nc, Some(t0), Some(t1)];

    relink(tri, na, t, t0)?;
    relink(tri, nb, t, t1)?;
    relink(tri, nc, t, t2)?;

    let mut removed = TriangleKeyBuffer::new();
    removed.push(t);
    Ok((removed, SmallBuffer::from_slice(&[t0, t1, t2])))
}

/// Splits the edge opposite `vertices[edge]` of triangle `t` at vertex `p`.
///
/// Interior edges produce four triangles from two; hull edges two from one.
fn split_edge(tri: &mut Triangulation, t: TriangleKey, edge: usize, p: VertexKey) -> SplitResult {
    let old = *tri.triangles.get(t).ok_or(InsertionError::InvalidAdjacency {
        triangle: t,
        message: "located triangle vanished",
    })?;
    // Rotate so the split edge is (b, c), opposite a.
    let a = old.vertices[edge];
    let b = old.vertices[(edge + 1) % 3];
    let c = old.vertices[(edge + 2) % 3];
    let across = old.neighbors[edge];
    let nb = old.neighbors[(edge + 1) % 3];
    let nc = old.neighbors[(edge + 2) % 3];

    let mut removed = TriangleKeyBuffer::new();

    let Some(n) = across else {
        // Hull edge: (a, b, c) → (p, c, a) + (p, a, b).
        tri.triangles.remove(t);
        let t1 = tri.triangles.insert(Triangle::new([p, c, a]));
        let t2 = tri.triangles.insert(Triangle::new([p, a, b]));
        tri.triangles[t1].neighbors = [nb, Some(t2), None];
        tri.triangles[t2].neighbors = [nc, None, Some(t1)];
        relink(tri, nb, t, t1)?;
        relink(tri, nc, t, t2)?;
        removed.push(t);
        return Ok((removed, SmallBuffer::from_slice(&[t1, t2])));
    };

    let opposite = *tri.triangles.get(n).ok_or(InsertionError::InvalidAdjacency {
        triangle: t,
        message: "neighbor across split edge is missing",
    })?;
    let j = opposite
        .neighbor_index(t)
        .ok_or(InsertionError::InvalidAdjacency {
            triangle: n,
            message: "neighbor does not point back across split edge",
        })?;
    if opposite.edge(j) != (c, b) {
        return Err(InsertionError::InvalidAdjacency {
            triangle: n,
            message: "neighbor shares a different edge",
        });
    }
    // The neighbor reads (d, c, b) after rotation.
    let d = opposite.vertices[j];
    let n_bd = opposite.neighbors[(j + 1) % 3];
    let n_dc = opposite.neighbors[(j + 2) % 3];

    tri.triangles.remove(t);
    tri.triangles.remove(n);
    let t1 = tri.triangles.insert(Triangle::new([p, c, a]));
    let t2 = tri.triangles.insert(Triangle::new([p, a, b]));
    let t3 = tri.triangles.insert(Triangle::new([p, b, d]));
    let t4 = tri.triangles.insert(Triangle::new([p, d, c]));
    tri.triangles[t1].neighbors = [nb, Some(t2), Some(t4)];
    tri.triangles[t2].neighbors = [nc, Some(t3), Some(t1)];
    tri.triangles[t3].neighbors = [n_bd, Some(t4), Some(t2)];
    tri.triangles[t4].neighbors = [n_dc, Some(t1), Some(t3)];

    relink(tri, nb, t, t1)?;
    relink(tri, nc, t, t2)?;
    relink(tri, n_bd, n, t3)?;
    relink(tri, n_dc, n, t4)?;

    removed.push(t);
    removed.push(n);
    Ok((removed, SmallBuffer::from_slice(&[t1, t2, t3, t4])))
}

fn relink(
    tri: &mut Triangulation,
    neighbor: Option<TriangleKey>,
    old: TriangleKey,
    new: TriangleKey,
) -> Result<(), InsertionError> {
    if tri.replace_neighbor(neighbor, old, new) {
        Ok(())
    } else {
        Err(InsertionError::InvalidAdjacency {
            triangle: new,
            message: "outer neighbor does not point back at the split triangle",
        })
    }
}

/// Flips edges opposite the new vertex until every one of them is locally
/// Delaunay. `touched` is called for both triangles of each flip.
fn legalize(
    tri: &mut Triangulation,
    created: &[TriangleKey],
    touched: &mut impl FnMut(TriangleKey),
) -> Result<usize, InsertionError> {
    // Each flip increases the new vertex's degree by one, so the total is
    // bounded by the number of triangles.
    let budget = 2 * tri.number_of_triangles() + 16;
    let mut flips = 0;
    let mut stack: Vec<TriangleKey> = created.iter().rev().copied().collect();

    while let Some(t) = stack.pop() {
        let current = *tri.triangles.get(t).ok_or(InsertionError::InvalidAdjacency {
            triangle: t,
            message: "triangle queued for legalization is missing",
        })?;
        let [p, b, c] = current.vertices;
        let Some(n) = current.neighbors[0] else {
            continue;
        };
        let opposite = *tri.triangles.get(n).ok_or(InsertionError::InvalidAdjacency {
            triangle: t,
            message: "neighbor across legalized edge is missing",
        })?;
        let j = opposite
            .neighbor_index(t)
            .ok_or(InsertionError::InvalidAdjacency {
                triangle: n,
                message: "neighbor does not point back across legalized edge",
            })?;
        let d = opposite.vertices[j];

        let [pp, pb, pc, pd] = [p, b, c, d].map(|v| tri.vertices[v].point());
        if insphere(pp, pb, pc, pd) != InSphere::INSIDE {
            continue;
        }

        if flips >= budget {
            return Err(InsertionError::NonConvergent { flips });
        }

        // Quad p, b, d, c (counter-clockwise); swap diagonal (b, c) for (p, d).
        let t_cp = current.neighbors[1];
        let t_pb = current.neighbors[2];
        let n_bd = opposite.neighbors[(j + 1) % 3];
        let n_dc = opposite.neighbors[(j + 2) % 3];

        tri.triangles[t] = Triangle {
            vertices: [p, b, d],
            neighbors: [n_bd, Some(n), t_pb],
        };
        tri.triangles[n] = Triangle {
            vertices: [p, d, c],
            neighbors: [n_dc, t_cp, Some(t)],
        };
        relink(tri, n_bd, n, t)?;
        relink(tri, t_cp, t, n)?;

        flips += 1;
        touched(t);
        touched(n);
        stack.push(n);
        stack.push(t);
    }

    Ok(flips)
}

impl Triangulation {
    /// Inserts a vertex; see [`insert`].
    ///
    /// # Errors
    ///
    /// See [`insert`].
    pub fn insert(&mut self, point: GridPoint, z: f64) -> Result<InsertionOutcome, InsertionError> {
        insert(self, point, z)
    }
}
