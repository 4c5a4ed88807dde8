//! Integer grid coordinates used by the planar triangulation.
//!
//! Every vertex the greedy refinement inserts is the center of a raster cell,
//! so the triangulation works on `(column, row)` pairs rather than floating-point
//! positions. Keeping coordinates integral lets the predicates in
//! [`crate::geometry::predicates`] evaluate exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raster cell center addressed by column (`x`) and row (`y`).
///
/// Rows increase upward (south to north) and columns increase to the right,
/// matching the axis-normalized [`Grid`](crate::core::grid::Grid) layout.
///
/// # Examples
///
/// ```rust
/// use terra_tin::geometry::point::GridPoint;
///
/// let p = GridPoint::new(3, 7);
/// assert_eq!(p.x, 3);
/// assert_eq!(p.y, 7);
/// assert_eq!(p.to_string(), "(3, 7)");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    /// Column index.
    pub x: i64,
    /// Row index.
    pub y: i64,
}

impl GridPoint {
    /// Creates a grid point from a column and a row.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Creates a grid point from unsigned raster indices.
    #[must_use]
    pub const fn from_cell(column: usize, row: usize) -> Self {
        Self {
            x: column as i64,
            y: row as i64,
        }
    }

    /// Returns the `(column, row)` raster indices, or `None` for negative coordinates.
    #[must_use]
    pub fn to_cell(self) -> Option<(usize, usize)> {
        Some((usize::try_from(self.x).ok()?, usize::try_from(self.y).ok()?))
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(usize, usize)> for GridPoint {
    fn from((column, row): (usize, usize)) -> Self {
        Self::from_cell(column, row)
    }
}
