//! Greedy refinement: repeatedly insert the worst-approximated grid cell.
//!
//! Every live triangle owns at most one [`Candidate`]. Candidates sit in a
//! max-heap keyed by error; entries are never removed from the heap when a
//! triangle is split or re-evaluated. Instead each candidate carries a stamp,
//! and heap entries whose stamp no longer matches the triangle's current
//! candidate are discarded when popped.
//!
//! Equal errors are ordered by stamp, so the candidate evaluated first wins.
//! Together with the scan-order tie-break inside [`evaluate`] this makes a
//! run fully deterministic.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::algorithms::evaluate::{Candidate, UsedCells, evaluate};
use crate::core::collections::TriangleSecondaryMap;
use crate::core::config::TinOptions;
use crate::core::error::TinError;
use crate::core::grid::Grid;
use crate::core::triangulation::{TriangleKey, Triangulation};
use crate::geometry::point::GridPoint;

/// Lifecycle of a [`GreedyScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefinementState {
    /// Two seed triangles exist and have been evaluated.
    Seeded,
    /// At least one refinement step has run.
    Refining,
    /// Terminal; the triangulation is no longer modified.
    Converged,
}

/// Counters collected over a refinement run.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::scheduler::RefinementStatistics;
///
/// let stats = RefinementStatistics::default();
/// assert_eq!(stats.insertions, 0);
/// assert!(!stats.stopped_by_cap);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementStatistics {
    /// Successful vertex insertions (seed corners excluded).
    pub insertions: usize,
    /// Candidates rejected as duplicates and excluded from further use.
    pub degenerate_skips: usize,
    /// Candidate Evaluator runs.
    pub evaluations: usize,
    /// Heap entries discarded because their triangle changed or died.
    pub stale_entries_skipped: usize,
    /// Edge flips performed by legalization.
    pub flips: usize,
    /// Largest candidate error left when refinement stopped (`0.0` when every
    /// triangle is exhausted).
    pub final_max_error: f64,
    /// `true` if an insertion or triangle cap ended the run early.
    pub stopped_by_cap: bool,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    candidate: Candidate,
    stamp: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    error: OrderedFloat<f64>,
    stamp: Reverse<u64>,
    triangle: TriangleKey,
}

/// Drives greedy insertion over one grid.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::config::TinOptions;
/// use terra_tin::core::grid::Grid;
/// use terra_tin::core::scheduler::{GreedyScheduler, RefinementState};
///
/// let mut samples = vec![0.0; 25];
/// samples[12] = 100.0;
/// let grid = Grid::from_samples(5, 5, samples).unwrap();
///
/// let mut scheduler = GreedyScheduler::new(&grid, &TinOptions::new(1.0)).unwrap();
/// assert_eq!(scheduler.state(), RefinementState::Seeded);
///
/// let stats = scheduler.run().unwrap().clone();
/// assert_eq!(scheduler.state(), RefinementState::Converged);
/// assert!(stats.insertions >= 1);
/// assert!(scheduler.max_deviation() <= 1.0);
/// ```
#[derive(Debug)]
pub struct GreedyScheduler<'g> {
    grid: &'g Grid,
    options: TinOptions,
    triangulation: Triangulation,
    used: UsedCells,
    candidates: TriangleSecondaryMap<Slot>,
    queue: BinaryHeap<QueueEntry>,
    next_stamp: u64,
    state: RefinementState,
    statistics: RefinementStatistics,
}

impl<'g> GreedyScheduler<'g> {
    /// Seeds a triangulation over the bounding box of the grid's valid cells
    /// and evaluates both seed triangles.
    ///
    /// Seed corners that hold no data take the average of the nearest ring of
    /// valid samples.
    ///
    /// # Errors
    ///
    /// - [`TinError::InvalidParameters`] for invalid options, or when every
    ///   valid sample lies in a single row or column.
    /// - [`TinError::EmptyGrid`] when the grid has no valid sample.
    pub fn new(grid: &'g Grid, options: &TinOptions) -> Result<Self, TinError> {
        options.validate()?;
        let extent = grid.valid_extent().ok_or(TinError::EmptyGrid)?;
        if extent.is_degenerate() {
            return Err(TinError::InvalidParameters {
                message: format!(
                    "valid samples span {} column(s) by {} row(s); at least 2 x 2 is required",
                    extent.columns(),
                    extent.rows()
                ),
            });
        }

        let corners = extent.corners();
        let heights = corners.map(|corner| corner_height(grid, corner));
        let triangulation = Triangulation::seed(corners[0], corners[2], heights).map_err(|err| {
            TinError::Internal {
                message: err.to_string(),
            }
        })?;

        let mut used = UsedCells::for_grid(grid);
        for corner in corners {
            used.mark(corner);
        }

        let mut scheduler = Self {
            grid,
            options: options.clone(),
            triangulation,
            used,
            candidates: TriangleSecondaryMap::new(),
            queue: BinaryHeap::new(),
            next_stamp: 0,
            state: RefinementState::Seeded,
            statistics: RefinementStatistics::default(),
        };
        let seeds: Vec<TriangleKey> = scheduler.triangulation.triangle_keys().collect();
        for key in seeds {
            scheduler.evaluate_triangle(key);
        }
        Ok(scheduler)
    }

    /// Current triangulation.
    #[must_use]
    pub const fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Cells consumed as vertices or excluded as degenerate.
    #[must_use]
    pub const fn used_cells(&self) -> &UsedCells {
        &self.used
    }

    /// Counters so far.
    #[must_use]
    pub const fn statistics(&self) -> &RefinementStatistics {
        &self.statistics
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RefinementState {
        self.state
    }

    /// Grid being approximated.
    #[must_use]
    pub const fn grid(&self) -> &'g Grid {
        self.grid
    }

    /// Gives up the finished triangulation together with the run counters.
    #[must_use]
    pub fn into_parts(self) -> (Triangulation, RefinementStatistics) {
        (self.triangulation, self.statistics)
    }

    /// Largest deviation between any unused valid cell and the current
    /// piecewise-planar surface.
    #[must_use]
    pub fn max_deviation(&self) -> f64 {
        max_deviation(&self.triangulation, self.grid, &self.used)
    }

    /// Runs until [`RefinementState::Converged`].
    ///
    /// # Errors
    ///
    /// Propagates the first fatal error from [`GreedyScheduler::step`].
    pub fn run(&mut self) -> Result<&RefinementStatistics, TinError> {
        while self.step()? != RefinementState::Converged {}
        Ok(&self.statistics)
    }

    /// Performs one refinement step: inserts (or rejects) the globally worst
    /// candidate, or converges.
    ///
    /// # Errors
    ///
    /// [`TinError::PointOutOfBounds`] or [`TinError::Internal`] when the
    /// triangulation reports a non-recoverable insertion failure.
    pub fn step(&mut self) -> Result<RefinementState, TinError> {
        if self.state == RefinementState::Converged {
            return Ok(self.state);
        }
        self.state = RefinementState::Refining;

        let Some((triangle, stamp, candidate)) = self.pop_live() else {
            self.converge(0.0);
            return Ok(self.state);
        };

        if candidate.error <= self.options.max_error {
            self.converge(candidate.error);
            return Ok(self.state);
        }

        if let Some(reason) = self.cap_reached() {
            tracing::warn!(
                "refinement stopped by {reason} with candidate error {} > max_error {}",
                candidate.error,
                self.options.max_error
            );
            self.statistics.stopped_by_cap = true;
            self.converge(candidate.error);
            return Ok(self.state);
        }

        match self.triangulation.insert(candidate.point, candidate.z) {
            Ok(outcome) => {
                self.used.mark(candidate.point);
                self.statistics.insertions += 1;
                self.statistics.flips += outcome.flips;
                for &key in &outcome.removed {
                    self.candidates.remove(key);
                }
                for &key in &outcome.changed {
                    self.evaluate_triangle(key);
                }
                tracing::debug!(
                    "inserted {} z={} error={} changed={} flips={}",
                    candidate.point,
                    candidate.z,
                    candidate.error,
                    outcome.changed.len(),
                    outcome.flips
                );
            }
            Err(err) if err.is_degenerate() => {
                // Another triangle may still hold this cell as its cached
                // candidate; only the first rejection counts.
                if self.used.mark(candidate.point) {
                    self.statistics.degenerate_skips += 1;
                }
                tracing::debug!("skipping {}: {err}", candidate.point);
            }
            Err(err) => return Err(err.into()),
        }

        // The source triangle survived untouched; its popped candidate must
        // be replaced so the remaining cells stay scheduled.
        if self
            .candidates
            .get(triangle)
            .is_some_and(|slot| slot.stamp == stamp)
        {
            self.evaluate_triangle(triangle);
        }

        Ok(self.state)
    }

    /// Pops heap entries until one matches its triangle's current candidate.
    fn pop_live(&mut self) -> Option<(TriangleKey, u64, Candidate)> {
        while let Some(entry) = self.queue.pop() {
            let Reverse(stamp) = entry.stamp;
            match self.candidates.get(entry.triangle) {
                Some(slot) if slot.stamp == stamp => {
                    return Some((entry.triangle, stamp, slot.candidate));
                }
                _ => self.statistics.stale_entries_skipped += 1,
            }
        }
        None
    }

    fn cap_reached(&self) -> Option<&'static str> {
        if self
            .options
            .max_insertions
            .is_some_and(|cap| self.statistics.insertions >= cap)
        {
            return Some("max_insertions");
        }
        // A split adds at most two triangles.
        if self
            .options
            .max_triangles
            .is_some_and(|cap| self.triangulation.number_of_triangles() + 2 > cap)
        {
            return Some("max_triangles");
        }
        None
    }

    fn converge(&mut self, final_max_error: f64) {
        self.statistics.final_max_error = final_max_error;
        self.state = RefinementState::Converged;
        self.queue.clear();
        tracing::info!(
            "refinement converged: vertices={} triangles={} insertions={} degenerate_skips={} flips={} final_max_error={}",
            self.triangulation.number_of_vertices(),
            self.triangulation.number_of_triangles(),
            self.statistics.insertions,
            self.statistics.degenerate_skips,
            self.statistics.flips,
            final_max_error
        );
    }

    /// Recomputes the candidate of a live triangle and schedules it.
    fn evaluate_triangle(&mut self, key: TriangleKey) {
        let Some(corners) = self.triangulation.triangle_vertices(key) else {
            self.candidates.remove(key);
            return;
        };
        self.statistics.evaluations += 1;
        match evaluate(corners, self.grid, &self.used) {
            Some(candidate) => {
                let stamp = self.next_stamp;
                self.next_stamp += 1;
                self.candidates.insert(key, Slot { candidate, stamp });
                self.queue.push(QueueEntry {
                    error: OrderedFloat(candidate.error),
                    stamp: Reverse(stamp),
                    triangle: key,
                });
            }
            None => {
                self.candidates.remove(key);
            }
        }
    }
}

/// Elevation for a seed corner, repairing no-data corners from neighbors.
fn corner_height(grid: &Grid, corner: GridPoint) -> f64 {
    let Some((column, row)) = corner.to_cell() else {
        return 0.0;
    };
    if let Some(z) = grid.value(column, row) {
        return z;
    }
    let repaired = grid.sample_nearest_valid_avg(column, row, 1);
    tracing::warn!(
        "seed corner {corner} has no data; using {}",
        repaired.map_or_else(|| "0.0".to_string(), |z| z.to_string())
    );
    repaired.unwrap_or(0.0)
}

/// Largest vertical deviation between the surface of `tri` and any valid
/// grid cell not marked in `excluded`.
///
/// # Examples
///
/// ```rust
/// use terra_tin::core::algorithms::evaluate::UsedCells;
/// use terra_tin::core::grid::Grid;
/// use terra_tin::core::scheduler::max_deviation;
/// use terra_tin::core::triangulation::Triangulation;
/// use terra_tin::geometry::point::GridPoint;
///
/// let mut samples = vec![2.0; 9];
/// samples[4] = 5.0;
/// let grid = Grid::from_samples(3, 3, samples).unwrap();
/// let tri = Triangulation::seed(GridPoint::new(0, 0), GridPoint::new(2, 2), [2.0; 4]).unwrap();
///
/// assert_eq!(max_deviation(&tri, &grid, &UsedCells::for_grid(&grid)), 3.0);
/// ```
#[must_use]
pub fn max_deviation(tri: &Triangulation, grid: &Grid, excluded: &UsedCells) -> f64 {
    tri.triangle_keys()
        .filter_map(|key| tri.triangle_vertices(key))
        .filter_map(|corners| evaluate(corners, grid, excluded))
        .map(|candidate| candidate.error)
        .fold(0.0, f64::max)
}
