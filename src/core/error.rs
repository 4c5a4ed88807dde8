//! Errors surfaced by [`build_tin`](crate::core::tin::build_tin).

use thiserror::Error;

use crate::core::algorithms::insertion::InsertionError;
use crate::core::algorithms::locate::LocateError;
use crate::core::grid::GridError;
use crate::core::triangulation::TriangulationValidationError;
use crate::geometry::point::GridPoint;

/// Top-level error for building a TIN.
///
/// Degenerate insertions never appear here: the refinement loop recovers from
/// them by excluding the offending cell. Everything below aborts the build and
/// no partial mesh is returned.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::error::TinError;
///
/// let err = TinError::InvalidParameters {
///     message: "max_error must be >= 0".to_string(),
/// };
/// assert!(err.to_string().contains("max_error"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum TinError {
    /// Bad tolerance, cap, or grid shape; rejected before any work begins.
    #[error("Invalid parameters: {message}")]
    InvalidParameters {
        /// What was wrong.
        message: String,
    },

    /// The grid has no valid (non-no-data) sample.
    #[error("Grid contains no valid elevation samples")]
    EmptyGrid,

    /// A candidate fell outside the triangulated region. This indicates an
    /// internal invariant violation.
    #[error("Point {point} lies outside the triangulated region")]
    PointOutOfBounds {
        /// The offending grid point.
        point: GridPoint,
    },

    /// Adjacency corruption or non-converging legalization.
    #[error("Internal triangulation failure: {message}")]
    Internal {
        /// Underlying failure.
        message: String,
    },

    /// Post-build verification found a broken invariant.
    #[error("Triangulation validation failed: {0}")]
    Validation(#[from] TriangulationValidationError),

    /// Grid construction failed.
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl From<InsertionError> for TinError {
    fn from(err: InsertionError) -> Self {
        match err {
            InsertionError::Locate(LocateError::PointOutOfBounds { point }) => {
                Self::PointOutOfBounds { point }
            }
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triangulation::VertexKey;

    #[test]
    fn out_of_bounds_location_maps_to_point_out_of_bounds() {
        let point = GridPoint::new(9, 9);
        let err: TinError = InsertionError::Locate(LocateError::PointOutOfBounds { point }).into();
        assert_eq!(err, TinError::PointOutOfBounds { point });
    }

    #[test]
    fn other_insertion_failures_are_internal() {
        let err: TinError = InsertionError::NonConvergent { flips: 12 }.into();
        assert!(matches!(err, TinError::Internal { .. }));
        let err: TinError = InsertionError::DegenerateInsertion {
            point: GridPoint::new(1, 1),
            existing: VertexKey::default(),
        }
        .into();
        assert!(err.to_string().contains("Degenerate"));
    }
}
