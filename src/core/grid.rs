//! Elevation grid (heightfield raster) consumed by the refinement.
//!
//! A [`Grid`] is a row-major buffer of `height × width` samples. Row `0` is the
//! southern-most row and column `0` the western-most column, so the sample at
//! `(column, row)` sits at world position
//! `(origin_x + column · cell_size, origin_y + row · cell_size)`.
//!
//! Rasters stored north-up (the usual GeoTIFF layout) can be normalized with
//! [`Grid::from_top_down_rows`] or [`Grid::flip_y`].

use crate::geometry::point::GridPoint;
use thiserror::Error;

/// Largest supported extent along either grid axis.
///
/// Keeps the exact in-circle determinant inside `i128`.
pub const MAX_GRID_SIDE: usize = 1 << 24;

/// Errors raised while constructing or addressing a [`Grid`].
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum GridError {
    /// Width or height is zero or exceeds [`MAX_GRID_SIDE`].
    #[error("Invalid grid dimensions {width}x{height} (each side must be in 1..={max})", max = MAX_GRID_SIDE)]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },
    /// The sample buffer does not hold `width * height` values.
    #[error("Sample buffer holds {actual} values, expected {expected}")]
    BufferLengthMismatch {
        /// Expected sample count.
        expected: usize,
        /// Provided sample count.
        actual: usize,
    },
    /// Cell size is not a positive finite number.
    #[error("Cell size must be positive and finite, got {cell_size}")]
    InvalidCellSize {
        /// Offending cell size.
        cell_size: f64,
    },
    /// A filter or downsampling window is zero, or even where a centered
    /// window is required.
    #[error("Invalid window size {size}")]
    InvalidWindow {
        /// Offending window size.
        size: usize,
    },
    /// A convolution kernel does not hold `size * size` weights.
    #[error("Kernel holds {actual} weights, expected {expected}")]
    InvalidKernel {
        /// Expected weight count.
        expected: usize,
        /// Provided weight count.
        actual: usize,
    },
    /// A cell index lies outside the raster.
    #[error("Cell ({column}, {row}) is outside the {width}x{height} grid")]
    OutOfBounds {
        /// Column index.
        column: usize,
        /// Row index.
        row: usize,
        /// Grid width.
        width: usize,
        /// Grid height.
        height: usize,
    },
}

/// Inclusive cell-index rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellExtent {
    /// Western-most column.
    pub min_column: usize,
    /// Southern-most row.
    pub min_row: usize,
    /// Eastern-most column.
    pub max_column: usize,
    /// Northern-most row.
    pub max_row: usize,
}

impl CellExtent {
    /// Number of columns covered.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.max_column - self.min_column + 1
    }

    /// Number of rows covered.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    /// A rectangle with a single row or column cannot be triangulated.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.min_column == self.max_column || self.min_row == self.max_row
    }

    /// Corners in counter-clockwise order starting at the lower-left cell.
    #[must_use]
    pub const fn corners(&self) -> [GridPoint; 4] {
        [
            GridPoint::from_cell(self.min_column, self.min_row),
            GridPoint::from_cell(self.max_column, self.min_row),
            GridPoint::from_cell(self.max_column, self.max_row),
            GridPoint::from_cell(self.min_column, self.max_row),
        ]
    }
}

/// Axis-aligned 3D bounds in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox3 {
    /// Minimum corner `(x, y, z)`.
    pub min: [f64; 3],
    /// Maximum corner `(x, y, z)`.
    pub max: [f64; 3],
}

/// Axis-normalized elevation raster with a no-data sentinel.
///
/// Non-finite samples are treated as no-data regardless of the sentinel, so
/// every in-bounds query yields either a finite elevation or "no data".
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::grid::Grid;
///
/// let grid = Grid::new(3, 2, 1.0, 100.0, 200.0, -9999.0, vec![
///     1.0, 2.0, 3.0, // row 0 (south)
///     4.0, -9999.0, 6.0, // row 1 (north)
/// ])
/// .unwrap();
///
/// assert_eq!(grid.value(2, 0), Some(3.0));
/// assert_eq!(grid.value(1, 1), None);
/// assert_eq!(grid.valid_count(), 5);
/// assert_eq!(grid.world_xy(2, 1), (102.0, 201.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    cell_size: f64,
    origin_x: f64,
    origin_y: f64,
    no_data_value: f64,
    samples: Vec<f64>,
}

impl Grid {
    /// Creates a grid from a row-major, south-first sample buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the dimensions are zero or too large, the
    /// buffer length does not match, or the cell size is not positive.
    pub fn new(
        width: usize,
        height: usize,
        cell_size: f64,
        origin_x: f64,
        origin_y: f64,
        no_data_value: f64,
        samples: Vec<f64>,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 || width > MAX_GRID_SIDE || height > MAX_GRID_SIDE {
            return Err(GridError::InvalidDimensions { width, height });
        }
        let expected = width * height;
        if samples.len() != expected {
            return Err(GridError::BufferLengthMismatch {
                expected,
                actual: samples.len(),
            });
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GridError::InvalidCellSize { cell_size });
        }
        Ok(Self {
            width,
            height,
            cell_size,
            origin_x,
            origin_y,
            no_data_value,
            samples,
        })
    }

    /// Creates a grid from a north-up buffer (row `0` is the northern-most row).
    ///
    /// `origin_x`/`origin_y` still name the lower-left sample.
    ///
    /// # Errors
    ///
    /// Same as [`Grid::new`].
    pub fn from_top_down_rows(
        width: usize,
        height: usize,
        cell_size: f64,
        origin_x: f64,
        origin_y: f64,
        no_data_value: f64,
        samples: Vec<f64>,
    ) -> Result<Self, GridError> {
        let mut grid = Self::new(
            width,
            height,
            cell_size,
            origin_x,
            origin_y,
            no_data_value,
            samples,
        )?;
        grid.flip_y();
        Ok(grid)
    }

    /// Creates a grid of unit cell size at the origin with a NaN sentinel.
    ///
    /// # Errors
    ///
    /// Same as [`Grid::new`].
    pub fn from_samples(width: usize, height: usize, samples: Vec<f64>) -> Result<Self, GridError> {
        Self::new(width, height, 1.0, 0.0, 0.0, f64::NAN, samples)
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// World units per cell along both axes.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// World X of the lower-left sample.
    #[must_use]
    pub const fn origin_x(&self) -> f64 {
        self.origin_x
    }

    /// World Y of the lower-left sample.
    #[must_use]
    pub const fn origin_y(&self) -> f64 {
        self.origin_y
    }

    /// The no-data sentinel.
    #[must_use]
    pub const fn no_data_value(&self) -> f64 {
        self.no_data_value
    }

    /// Raw samples in row-major, south-first order.
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Returns `true` if `z` should be treated as a missing sample.
    #[must_use]
    pub fn is_no_data(&self, z: f64) -> bool {
        // NaN sentinels never compare equal, so non-finite samples are
        // classified before the equality check.
        !z.is_finite() || z == self.no_data_value
    }

    /// Row-major buffer index of a cell.
    #[must_use]
    pub const fn index(&self, column: usize, row: usize) -> usize {
        row * self.width + column
    }

    /// Returns `true` if `(column, row)` is inside the raster.
    #[must_use]
    pub const fn contains(&self, column: usize, row: usize) -> bool {
        column < self.width && row < self.height
    }

    /// Valid elevation at a cell, or `None` for no-data and out-of-bounds cells.
    #[must_use]
    pub fn value(&self, column: usize, row: usize) -> Option<f64> {
        if !self.contains(column, row) {
            return None;
        }
        let z = self.samples[self.index(column, row)];
        (!self.is_no_data(z)).then_some(z)
    }

    /// Like [`Grid::value`] but distinguishes out-of-bounds access.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] when the cell is outside the raster.
    pub fn try_value(&self, column: usize, row: usize) -> Result<Option<f64>, GridError> {
        if !self.contains(column, row) {
            return Err(GridError::OutOfBounds {
                column,
                row,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.value(column, row))
    }

    /// World `(x, y)` of a cell center.
    #[must_use]
    pub fn world_xy(&self, column: usize, row: usize) -> (f64, f64) {
        (
            (column as f64).mul_add(self.cell_size, self.origin_x),
            (row as f64).mul_add(self.cell_size, self.origin_y),
        )
    }

    /// Number of cells holding a valid elevation.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|&&z| !self.is_no_data(z)).count()
    }

    /// Smallest cell rectangle enclosing every valid sample.
    ///
    /// Returns `None` if the grid holds no valid sample at all.
    #[must_use]
    pub fn valid_extent(&self) -> Option<CellExtent> {
        let mut extent: Option<CellExtent> = None;
        for row in 0..self.height {
            for column in 0..self.width {
                if self.value(column, row).is_none() {
                    continue;
                }
                let e = extent.get_or_insert(CellExtent {
                    min_column: column,
                    min_row: row,
                    max_column: column,
                    max_row: row,
                });
                e.min_column = e.min_column.min(column);
                e.max_column = e.max_column.max(column);
                e.max_row = row;
            }
        }
        extent
    }

    /// Averages the nearest ring of valid samples around `(column, row)`.
    ///
    /// Square rings of growing radius are searched until one contains at least
    /// `min_samples` valid values. A valid sample at the cell itself is
    /// returned unchanged. Returns `None` if the whole grid has fewer valid
    /// samples than requested.
    #[must_use]
    pub fn sample_nearest_valid_avg(
        &self,
        column: usize,
        row: usize,
        min_samples: usize,
    ) -> Option<f64> {
        if let Some(z) = self.value(column, row) {
            return Some(z);
        }
        let min_samples = min_samples.max(1);
        let max_radius = self.width.max(self.height);

        let mut sum = 0.0;
        let mut count = 0_usize;
        for radius in 1..=max_radius {
            let r = radius as i64;
            let (c0, r0) = (column as i64, row as i64);
            for dy in -r..=r {
                for dx in -r..=r {
                    // Only the ring boundary, inner cells were visited already.
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    let (Ok(c), Ok(rw)) = (usize::try_from(c0 + dx), usize::try_from(r0 + dy))
                    else {
                        continue;
                    };
                    if let Some(z) = self.value(c, rw) {
                        sum += z;
                        count += 1;
                    }
                }
            }
            if count >= min_samples {
                return Some(sum / count as f64);
            }
        }
        None
    }

    /// Minimum and maximum valid elevation.
    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.samples
            .iter()
            .copied()
            .filter(|&z| !self.is_no_data(z))
            .fold(None, |acc, z| match acc {
                None => Some((z, z)),
                Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
            })
    }

    /// World-space bounds of the raster footprint and its valid elevations.
    #[must_use]
    pub fn bounding_box_3d(&self) -> Option<BoundingBox3> {
        let (z_min, z_max) = self.min_max()?;
        let (x_max, y_max) = self.world_xy(self.width - 1, self.height - 1);
        Some(BoundingBox3 {
            min: [self.origin_x, self.origin_y, z_min],
            max: [x_max, y_max, z_max],
        })
    }

    /// Averages non-overlapping `window × window` blocks into a coarser grid.
    ///
    /// Blocks on the eastern and northern edges may be partial. A block with
    /// no valid sample becomes no-data. Output cells sit at block centers, so
    /// the origin moves by half a block and the cell size grows by `window`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidWindow`] when `window` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use terra_tin::core::grid::Grid;
    ///
    /// let grid = Grid::from_samples(2, 2, vec![1.0, 2.0, 3.0, 6.0]).unwrap();
    /// let coarse = grid.integer_downsample_mean(2).unwrap();
    /// assert_eq!(coarse.samples(), &[3.0]);
    /// assert_eq!(coarse.cell_size(), 2.0);
    /// assert_eq!(coarse.origin_x(), 0.5);
    /// ```
    pub fn integer_downsample_mean(&self, window: usize) -> Result<Self, GridError> {
        if window == 0 {
            return Err(GridError::InvalidWindow { size: window });
        }
        let width = self.width.div_ceil(window);
        let height = self.height.div_ceil(window);
        let mut samples = Vec::with_capacity(width * height);
        for block_row in 0..height {
            let rows = block_row * window..((block_row + 1) * window).min(self.height);
            for block_column in 0..width {
                let columns = block_column * window..((block_column + 1) * window).min(self.width);
                let (sum, count) = rows
                    .clone()
                    .flat_map(|row| columns.clone().map(move |column| (column, row)))
                    .filter_map(|(column, row)| self.value(column, row))
                    .fold((0.0, 0_usize), |(sum, count), z| (sum + z, count + 1));
                samples.push(if count == 0 {
                    self.no_data_value
                } else {
                    sum / count as f64
                });
            }
        }
        let shift = (window - 1) as f64 * self.cell_size / 2.0;
        Self::new(
            width,
            height,
            self.cell_size * window as f64,
            self.origin_x + shift,
            self.origin_y + shift,
            self.no_data_value,
            samples,
        )
    }

    /// Weighted average over a centered `size × size` window.
    ///
    /// `kernel` is row-major with its first row applied to the southern-most
    /// neighbor row. Neighbors outside the raster or without data are left
    /// out and the remaining weights renormalized. No-data cells stay
    /// no-data; a cell whose usable weights sum to zero keeps its value.
    ///
    /// # Errors
    ///
    /// - [`GridError::InvalidWindow`] when `size` is zero or even.
    /// - [`GridError::InvalidKernel`] when `kernel.len() != size * size`.
    pub fn convolution_filter(&self, kernel: &[f64], size: usize) -> Result<Self, GridError> {
        let radius = Self::window_radius(size)?;
        if kernel.len() != size * size {
            return Err(GridError::InvalidKernel {
                expected: size * size,
                actual: kernel.len(),
            });
        }
        Ok(self.map_windows(radius, |center, window| {
            let (sum, weight) = window
                .iter()
                .fold((0.0, 0.0), |(sum, weight), &(dx, dy, z)| {
                    let w = kernel[dy * size + dx];
                    (w.mul_add(z, sum), weight + w)
                });
            if weight == 0.0 { center } else { sum / weight }
        }))
    }

    /// Replaces every valid cell by the largest valid sample in the centered
    /// `size × size` window around it.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidWindow`] when `size` is zero or even.
    pub fn max_filter(&self, size: usize) -> Result<Self, GridError> {
        let radius = Self::window_radius(size)?;
        Ok(self.map_windows(radius, |center, window| {
            window.iter().fold(center, |max, &(_, _, z)| max.max(z))
        }))
    }

    const fn window_radius(size: usize) -> Result<usize, GridError> {
        if size % 2 == 0 {
            return Err(GridError::InvalidWindow { size });
        }
        Ok(size / 2)
    }

    /// Applies `f` to each valid cell and the valid samples of its clipped
    /// window, given as `(dx, dy, z)` with offsets from the window's
    /// lower-left corner.
    fn map_windows<F>(&self, radius: usize, mut f: F) -> Self
    where
        F: FnMut(f64, &[(usize, usize, f64)]) -> f64,
    {
        let mut samples = self.samples.clone();
        let mut window = Vec::with_capacity((2 * radius + 1).pow(2));
        for row in 0..self.height {
            for column in 0..self.width {
                let Some(center) = self.value(column, row) else {
                    continue;
                };
                window.clear();
                for r in row.saturating_sub(radius)..=(row + radius).min(self.height - 1) {
                    for c in column.saturating_sub(radius)..=(column + radius).min(self.width - 1) {
                        if let Some(z) = self.value(c, r) {
                            window.push((c + radius - column, r + radius - row, z));
                        }
                    }
                }
                samples[self.index(column, row)] = f(center, &window);
            }
        }
        Self {
            width: self.width,
            height: self.height,
            cell_size: self.cell_size,
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            no_data_value: self.no_data_value,
            samples,
        }
    }

    /// Reverses the column order of every row (mirror across the vertical axis).
    pub fn flip_x(&mut self) {
        for row in self.samples.chunks_exact_mut(self.width) {
            row.reverse();
        }
    }

    /// Reverses the row order (mirror across the horizontal axis).
    pub fn flip_y(&mut self) {
        let width = self.width;
        let height = self.height;
        for row in 0..height / 2 {
            let mirror = height - 1 - row;
            let (head, tail) = self.samples.split_at_mut(mirror * width);
            head[row * width..(row + 1) * width].swap_with_slice(&mut tail[..width]);
        }
    }
}
