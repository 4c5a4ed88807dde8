//! Property-based tests for greedy refinement.
//!
//! - Error bound: no unused valid cell deviates by more than `max_error`
//! - Delaunay invariant after every insertion
//! - Vertex/triangle monotonicity per insertion
//! - Termination within the number of valid cells
//! - Tolerance monotonicity and run-to-run determinism

use proptest::prelude::*;
use terra_tin::prelude::*;

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

fn sample() -> impl Strategy<Value = f64> {
    prop_oneof![
        12 => (-40_i32..40).prop_map(f64::from),
        3 => (-40.0..40.0_f64),
        1 => Just(f64::NAN),
    ]
}

fn grid_strategy(max_side: usize) -> impl Strategy<Value = Grid> {
    (2..=max_side, 2..=max_side).prop_flat_map(|(width, height)| {
        prop::collection::vec(sample(), width * height)
            .prop_map(move |samples| Grid::from_samples(width, height, samples).unwrap())
    })
}

fn tolerance() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 0.0..25.0_f64]
}

/// Grids whose valid cells cannot seed a triangulation are rejected up front.
fn expect_rejection(grid: &Grid, err: &TinError) -> Result<(), TestCaseError> {
    match grid.valid_extent() {
        None => prop_assert_eq!(err, &TinError::EmptyGrid),
        Some(extent) => {
            prop_assert!(extent.is_degenerate());
            prop_assert!(
                matches!(err, TinError::InvalidParameters { .. }),
                "unexpected error {:?}",
                err
            );
        }
    }
    Ok(())
}

fn on_seed_boundary(tri: &Triangulation, point: GridPoint) -> bool {
    let corners: Vec<GridPoint> = tri.vertices().take(4).map(|(_, v)| v.point()).collect();
    let (min, max) = (corners[0], corners[2]);
    point.x == min.x || point.x == max.x || point.y == min.y || point.y == max.y
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_error_bound_holds_after_convergence(grid in grid_strategy(9), max_error in tolerance()) {
        let mut scheduler = match GreedyScheduler::new(&grid, &TinOptions::new(max_error)) {
            Ok(s) => s,
            Err(err) => return expect_rejection(&grid, &err),
        };
        let stats = scheduler.run().unwrap().clone();
        prop_assert!(stats.final_max_error <= max_error);
        let deviation = scheduler.max_deviation();
        prop_assert!(
            deviation <= max_error,
            "deviation {} exceeds tolerance {}",
            deviation,
            max_error
        );
    }

    #[test]
    fn prop_every_step_keeps_delaunay_and_counts(grid in grid_strategy(7), max_error in tolerance()) {
        let Ok(mut scheduler) = GreedyScheduler::new(&grid, &TinOptions::new(max_error)) else {
            return Ok(());
        };
        loop {
            let vertices = scheduler.triangulation().number_of_vertices();
            let triangles = scheduler.triangulation().number_of_triangles();
            let insertions = scheduler.statistics().insertions;

            let state = scheduler.step().unwrap();
            let tri = scheduler.triangulation();

            if scheduler.statistics().insertions > insertions {
                prop_assert_eq!(tri.number_of_vertices(), vertices + 1);
                let (_, inserted) = tri.vertices().last().unwrap();
                let added = tri.number_of_triangles() - triangles;
                if on_seed_boundary(tri, inserted.point()) {
                    prop_assert_eq!(added, 1);
                } else {
                    prop_assert_eq!(added, 2);
                }
            } else {
                prop_assert_eq!(tri.number_of_vertices(), vertices);
                prop_assert_eq!(tri.number_of_triangles(), triangles);
            }
            prop_assert!(tri.validate_delaunay().is_ok(), "{:?}", tri.validate_delaunay());

            if state == RefinementState::Converged {
                break;
            }
        }
    }

    #[test]
    fn prop_terminates_within_valid_cell_count(grid in grid_strategy(10)) {
        let Ok(mut scheduler) = GreedyScheduler::new(&grid, &config_presets::lossless()) else {
            return Ok(());
        };
        let stats = scheduler.run().unwrap().clone();
        prop_assert!(stats.insertions + 4 <= grid.width() * grid.height());
        prop_assert!(stats.insertions + stats.degenerate_skips <= grid.valid_count());
        prop_assert!(!stats.stopped_by_cap);
    }

    #[test]
    fn prop_looser_tolerance_never_adds_vertices(
        grid in grid_strategy(8),
        a in tolerance(),
        b in tolerance(),
    ) {
        let (tight, loose) = if a <= b { (a, b) } else { (b, a) };
        let (Ok(tight_mesh), Ok(loose_mesh)) = (build_tin(&grid, tight), build_tin(&grid, loose)) else {
            return Ok(());
        };
        prop_assert!(tight_mesh.number_of_vertices() >= loose_mesh.number_of_vertices());
        prop_assert!(build_tin(&grid, 1000.0).unwrap().number_of_vertices() == 4);
    }

    #[test]
    fn prop_runs_are_deterministic(grid in grid_strategy(8), max_error in tolerance()) {
        let (Ok(first), Ok(second)) = (build_tin(&grid, max_error), build_tin(&grid, max_error)) else {
            return Ok(());
        };
        prop_assert_eq!(first, second);
    }
}

#[cfg(feature = "slow-tests")]
proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_large_lossless_grids_stay_delaunay(grid in grid_strategy(32)) {
        let options = TinOptions {
            verify_delaunay: true,
            ..config_presets::lossless()
        };
        if let Err(err) = build_tin_with_options(&grid, &options) {
            expect_rejection(&grid, &err)?;
        }
    }
}
