//! Exact geometric predicates on grid points.
//!
//! Vertices of the triangulation are raster cell centers with integer
//! coordinates, so orientation and in-circle tests are evaluated with `i128`
//! arithmetic and never misclassify a configuration. Grid sides are capped at
//! [`MAX_GRID_SIDE`](crate::core::grid::MAX_GRID_SIDE), which bounds the
//! lifted in-circle terms well inside the `i128` range.

use crate::geometry::point::GridPoint;
use std::fmt;

/// Represents the position of a point relative to a circumcircle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InSphere {
    /// The point is outside the circumcircle
    OUTSIDE,
    /// The point is on the circumcircle
    BOUNDARY,
    /// The point is inside the circumcircle
    INSIDE,
}

impl fmt::Display for InSphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

/// Represents the orientation of a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Clockwise turn (determinant < 0)
    NEGATIVE,
    /// Collinear points (determinant == 0)
    DEGENERATE,
    /// Counter-clockwise turn (determinant > 0)
    POSITIVE,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

/// Twice the signed area of the triangle `(a, b, c)`.
///
/// Positive when the points turn counter-clockwise.
#[must_use]
pub fn orientation_determinant(a: GridPoint, b: GridPoint, c: GridPoint) -> i128 {
    let abx = i128::from(b.x - a.x);
    let aby = i128::from(b.y - a.y);
    let acx = i128::from(c.x - a.x);
    let acy = i128::from(c.y - a.y);
    abx * acy - aby * acx
}

/// Determine the orientation of the triangle `(a, b, c)`.
///
/// # Examples
///
/// ```rust
/// use terra_tin::geometry::point::GridPoint;
/// use terra_tin::geometry::predicates::{Orientation, orientation};
///
/// let a = GridPoint::new(0, 0);
/// let b = GridPoint::new(4, 0);
/// assert_eq!(orientation(a, b, GridPoint::new(0, 4)), Orientation::POSITIVE);
/// assert_eq!(orientation(a, b, GridPoint::new(0, -4)), Orientation::NEGATIVE);
/// assert_eq!(orientation(a, b, GridPoint::new(2, 0)), Orientation::DEGENERATE);
/// ```
#[must_use]
pub fn orientation(a: GridPoint, b: GridPoint, c: GridPoint) -> Orientation {
    match orientation_determinant(a, b, c).signum() {
        1 => Orientation::POSITIVE,
        -1 => Orientation::NEGATIVE,
        _ => Orientation::DEGENERATE,
    }
}

/// Test `d` against the circumcircle of the counter-clockwise triangle `(a, b, c)`.
///
/// The caller guarantees `(a, b, c)` is counter-clockwise; for a clockwise
/// triangle the result is mirrored.
///
/// # Examples
///
/// ```rust
/// use terra_tin::geometry::point::GridPoint;
/// use terra_tin::geometry::predicates::{InSphere, insphere};
///
/// let a = GridPoint::new(0, 0);
/// let b = GridPoint::new(2, 0);
/// let c = GridPoint::new(0, 2);
/// assert_eq!(insphere(a, b, c, GridPoint::new(1, 1)), InSphere::INSIDE);
/// assert_eq!(insphere(a, b, c, GridPoint::new(2, 2)), InSphere::BOUNDARY);
/// assert_eq!(insphere(a, b, c, GridPoint::new(5, 5)), InSphere::OUTSIDE);
/// ```
#[must_use]
pub fn insphere(a: GridPoint, b: GridPoint, c: GridPoint, d: GridPoint) -> InSphere {
    let lift = |p: GridPoint| {
        let dx = i128::from(p.x - d.x);
        let dy = i128::from(p.y - d.y);
        (dx, dy, dx * dx + dy * dy)
    };
    let (adx, ady, ad) = lift(a);
    let (bdx, bdy, bd) = lift(b);
    let (cdx, cdy, cd) = lift(c);

    let det = adx * (bdy * cd - bd * cdy) - ady * (bdx * cd - bd * cdx) + ad * (bdx * cdy - bdy * cdx);

    match det.signum() {
        1 => InSphere::INSIDE,
        -1 => InSphere::OUTSIDE,
        _ => InSphere::BOUNDARY,
    }
}
