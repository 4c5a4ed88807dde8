//! Candidate evaluation: the worst-approximated grid cell under a triangle.
//!
//! The triangle's three lifted corners define a plane. Every raster cell whose
//! center lies inside the triangle (boundary included) is compared against
//! that plane, one scanline per raster row. Row bounds are computed as exact
//! rationals from the integer corner coordinates, so a cell on a shared edge
//! is seen by both triangles and no cell is ever skipped by rounding.

use serde::{Deserialize, Serialize};

use crate::core::grid::Grid;
use crate::core::triangulation::Vertex;
use crate::geometry::plane::Plane;
use crate::geometry::point::GridPoint;

/// The cell a triangle approximates worst, with its vertical deviation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Cell position.
    pub point: GridPoint,
    /// Sample elevation at the cell.
    pub z: f64,
    /// `|z − plane(point)|`.
    pub error: f64,
}

impl Candidate {
    /// Replaces `best` when `error` is strictly larger, so the first cell in
    /// scan order wins ties.
    fn consider(best: &mut Option<Self>, point: GridPoint, z: f64, error: f64) {
        if best.is_none_or(|b| error > b.error) {
            *best = Some(Self { point, z, error });
        }
    }
}

/// One flag per grid cell marking cells that may no longer become candidates:
/// cells already inserted as vertices, and cells rejected as degenerate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsedCells {
    width: usize,
    height: usize,
    used: Vec<bool>,
    count: usize,
}

impl UsedCells {
    /// All cells unused.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            used: vec![false; width * height],
            count: 0,
        }
    }

    /// Mask sized for `grid`.
    #[must_use]
    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.width(), grid.height())
    }

    fn index(&self, point: GridPoint) -> Option<usize> {
        let (column, row) = point.to_cell()?;
        (column < self.width && row < self.height).then_some(row * self.width + column)
    }

    /// Marks a cell; returns `false` if it was already marked or is out of range.
    pub fn mark(&mut self, point: GridPoint) -> bool {
        let Some(index) = self.index(point) else {
            return false;
        };
        if self.used[index] {
            return false;
        }
        self.used[index] = true;
        self.count += 1;
        true
    }

    /// Returns `true` for marked cells. Out-of-range cells count as used.
    #[must_use]
    pub fn is_used(&self, point: GridPoint) -> bool {
        self.index(point).is_none_or(|index| self.used[index])
    }

    /// Number of marked cells.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

/// `floor(num / den)` for `den > 0`.
const fn floor_div(num: i128, den: i128) -> i128 {
    num.div_euclid(den)
}

/// `ceil(num / den)` for `den > 0`.
const fn ceil_div(num: i128, den: i128) -> i128 {
    -((-num).div_euclid(den))
}

/// X coordinate of segment `a → b` at row `y`, as the rational `(num, den)`.
///
/// Requires `a.y < b.y` and `a.y <= y <= b.y`.
fn edge_x_at(a: GridPoint, b: GridPoint, y: i64) -> (i128, i128) {
    let den = i128::from(b.y - a.y);
    let num = i128::from(a.x) * den + i128::from(y - a.y) * i128::from(b.x - a.x);
    (num, den)
}

/// Scans every unused, valid cell inside the triangle and returns the one
/// with the largest deviation from the triangle's plane.
///
/// Returns `None` when the triangle covers no evaluable cell.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::algorithms::evaluate::{UsedCells, evaluate};
/// use terra_tin::core::grid::Grid;
/// use terra_tin::core::triangulation::Vertex;
/// use terra_tin::geometry::point::GridPoint;
///
/// let mut samples = vec![0.0; 9];
/// samples[4] = 7.0; // cell (1, 1)
/// let grid = Grid::from_samples(3, 3, samples).unwrap();
/// let used = UsedCells::for_grid(&grid);
///
/// let corners = [
///     Vertex::new(GridPoint::new(0, 0), 0.0),
///     Vertex::new(GridPoint::new(2, 0), 0.0),
///     Vertex::new(GridPoint::new(2, 2), 0.0),
/// ];
/// let candidate = evaluate(corners, &grid, &used).unwrap();
/// assert_eq!(candidate.point, GridPoint::new(1, 1));
/// assert_eq!(candidate.error, 7.0);
/// ```
#[must_use]
pub fn evaluate(corners: [Vertex; 3], grid: &Grid, used: &UsedCells) -> Option<Candidate> {
    let plane = Plane::from_points(corners.map(|v| v.point()), corners.map(|v| v.z()))?;

    let mut by_y = corners.map(|v| v.point());
    by_y.sort_by_key(|p| (p.y, p.x));
    let [v0, v1, v2] = by_y;

    let max_column = grid.width() as i128 - 1;
    let row_lo = v0.y.max(0);
    let row_hi = v2.y.min(grid.height() as i64 - 1);

    let mut best: Option<Candidate> = None;

    for y in row_lo..=row_hi {
        let long = edge_x_at(v0, v2, y);
        let short = if y < v1.y {
            edge_x_at(v0, v1, y)
        } else if v2.y > v1.y {
            edge_x_at(v1, v2, y)
        } else {
            // Horizontal top edge (v1, v2): only reached for y == v1.y.
            (i128::from(v1.x), 1)
        };

        let start = ceil_div(long.0, long.1)
            .min(ceil_div(short.0, short.1))
            .max(0);
        let end = floor_div(long.0, long.1)
            .max(floor_div(short.0, short.1))
            .min(max_column);

        let mut x = start;
        while x <= end {
            let point = GridPoint::new(x as i64, y);
            x += 1;
            if used.is_used(point) {
                continue;
            }
            let Some(z) = grid.value(point.x as usize, point.y as usize) else {
                continue;
            };
            let error = (z - plane.eval(point)).abs();
            Candidate::consider(&mut best, point, z, error);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn v(x: i64, y: i64, z: f64) -> Vertex {
        Vertex::new(GridPoint::new(x, y), z)
    }

    #[test]
    fn rational_rounding_is_exact() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(ceil_div(7, 2), 4);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(ceil_div(-7, 2), -3);
        assert_eq!(floor_div(6, 3), 2);
        assert_eq!(ceil_div(6, 3), 2);
    }

    #[test]
    fn scan_covers_exactly_the_closed_triangle() {
        // Marking cells through a deviation: every covered cell gets a distinct
        // error so the scan order and coverage can be observed via `used`.
        let (w, h) = (9_usize, 7_usize);
        let grid = Grid::from_samples(w, h, vec![1.0; w * h]).unwrap();
        let corners = [v(0, 0, 0.0), v(8, 2, 0.0), v(3, 6, 0.0)];
        let mut used = UsedCells::for_grid(&grid);

        let mut covered = Vec::new();
        while let Some(c) = evaluate(corners, &grid, &used) {
            covered.push(c.point);
            used.mark(c.point);
        }

        let [a, b, c] = corners.map(|v| v.point());
        let mut expected = Vec::new();
        for y in 0..h as i64 {
            for x in 0..w as i64 {
                let p = GridPoint::new(x, y);
                let inside = [(a, b), (b, c), (c, a)].iter().all(|&(s, e)| {
                    crate::geometry::predicates::orientation_determinant(s, e, p) >= 0
                });
                if inside {
                    expected.push(p);
                }
            }
        }
        covered.sort();
        expected.sort();
        assert_eq!(covered, expected);
    }

    #[test]
    fn ties_resolve_to_first_cell_in_scan_order() {
        let grid = Grid::from_samples(4, 4, vec![3.0; 16]).unwrap();
        let used = UsedCells::for_grid(&grid);
        let candidate = evaluate([v(0, 0, 0.0), v(3, 0, 0.0), v(3, 3, 0.0)], &grid, &used).unwrap();
        // Every cell deviates by 3; the lowest row, left-most column wins.
        assert_eq!(candidate.point, GridPoint::new(0, 0));
        assert_relative_eq!(candidate.error, 3.0);
    }

    #[test]
    fn used_and_no_data_cells_are_skipped() {
        let mut samples = vec![0.0; 9];
        samples[4] = f64::NAN;
        samples[1] = 5.0; // (1, 0)
        let grid = Grid::from_samples(3, 3, samples).unwrap();
        let mut used = UsedCells::for_grid(&grid);
        let corners = [v(0, 0, 0.0), v(2, 0, 0.0), v(2, 2, 0.0)];

        assert_eq!(evaluate(corners, &grid, &used).unwrap().point, GridPoint::new(1, 0));
        used.mark(GridPoint::new(1, 0));
        let next = evaluate(corners, &grid, &used).unwrap();
        assert_ne!(next.point, GridPoint::new(1, 1));
        assert_relative_eq!(next.error, 0.0);
    }

    #[test]
    fn exhausted_triangle_has_no_candidate() {
        let grid = Grid::from_samples(2, 2, vec![1.0; 4]).unwrap();
        let mut used = UsedCells::for_grid(&grid);
        for p in [(0, 0), (1, 0), (1, 1)] {
            used.mark(GridPoint::new(p.0, p.1));
        }
        assert!(evaluate([v(0, 0, 1.0), v(1, 0, 1.0), v(1, 1, 1.0)], &grid, &used).is_none());
    }

    #[test]
    fn used_cells_tracks_marks() {
        let mut used = UsedCells::new(3, 2);
        assert!(used.mark(GridPoint::new(2, 1)));
        assert!(!used.mark(GridPoint::new(2, 1)));
        assert!(!used.mark(GridPoint::new(3, 0)));
        assert!(used.is_used(GridPoint::new(2, 1)));
        assert!(used.is_used(GridPoint::new(-1, 0)));
        assert!(!used.is_used(GridPoint::new(0, 0)));
        assert_eq!(used.count(), 1);
    }
}
