//! Public entry points: grid in, mesh out.

use crate::core::config::TinOptions;
use crate::core::error::TinError;
use crate::core::grid::Grid;
use crate::core::mesh::Mesh;
use crate::core::scheduler::{GreedyScheduler, RefinementStatistics};

/// Approximates `grid` by a TIN whose vertical error at every unused valid
/// cell is at most `max_error`.
///
/// # Errors
///
/// - [`TinError::InvalidParameters`] if `max_error` is negative or not finite,
///   or the valid samples do not span at least two rows and two columns.
/// - [`TinError::EmptyGrid`] if no sample is valid.
/// - [`TinError::PointOutOfBounds`] / [`TinError::Internal`] on internal
///   invariant violations.
///
/// # Examples
///
/// ```rust
/// use terra_tin::build_tin;
/// use terra_tin::core::grid::Grid;
///
/// let grid = Grid::from_samples(4, 4, vec![10.0; 16]).unwrap();
/// let mesh = build_tin(&grid, 0.01).unwrap();
/// assert_eq!(mesh.number_of_vertices(), 4);
/// assert_eq!(mesh.number_of_faces(), 2);
/// assert!(mesh.vertices().iter().all(|v| v.z == 10.0));
/// ```
pub fn build_tin(grid: &Grid, max_error: f64) -> Result<Mesh, TinError> {
    build_tin_with_options(grid, &TinOptions::new(max_error))
}

/// Like [`build_tin`], with caps, coordinate space and verification taken
/// from `options`.
///
/// # Errors
///
/// As [`build_tin`]. With `verify_delaunay` set, a failed check is returned as
/// [`TinError::Validation`].
pub fn build_tin_with_options(grid: &Grid, options: &TinOptions) -> Result<Mesh, TinError> {
    build_tin_with_statistics(grid, options).map(|(mesh, _)| mesh)
}

/// Like [`build_tin_with_options`], also returning the run counters.
///
/// # Errors
///
/// As [`build_tin_with_options`].
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::config::config_presets;
/// use terra_tin::core::grid::Grid;
/// use terra_tin::core::tin::build_tin_with_statistics;
///
/// let samples: Vec<f64> = (0..36).map(|i| f64::from(i % 7)).collect();
/// let grid = Grid::from_samples(6, 6, samples).unwrap();
/// let (mesh, stats) = build_tin_with_statistics(&grid, &config_presets::lossless()).unwrap();
///
/// assert_eq!(mesh.number_of_vertices(), 4 + stats.insertions);
/// assert_eq!(stats.final_max_error, 0.0);
/// ```
pub fn build_tin_with_statistics(
    grid: &Grid,
    options: &TinOptions,
) -> Result<(Mesh, RefinementStatistics), TinError> {
    let mut scheduler = GreedyScheduler::new(grid, options)?;
    scheduler.run()?;
    let (triangulation, statistics) = scheduler.into_parts();

    if options.verify_delaunay {
        triangulation.validate()?;
        triangulation.validate_delaunay()?;
    }

    let mesh = Mesh::from_triangulation(&triangulation, grid, options.coordinate_space)?;
    Ok((mesh, statistics))
}
