//! Greedy refinement throughput on synthetic terrain.
//!
//! ```bash
//! cargo bench --bench greedy_insertion
//! ```

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use terra_tin::prelude::*;

const SIDES: &[usize] = &[32, 64, 128];
const TOLERANCES: &[f64] = &[0.5, 2.0, 8.0];

/// Smooth hills plus seeded noise, so runs are comparable across machines.
fn synthetic_terrain(side: usize, seed: u64) -> Grid {
    let mut rng = StdRng::seed_from_u64(seed);
    let scale = side as f64 / 8.0;
    let samples = (0..side * side)
        .map(|i| {
            let x = (i % side) as f64 / scale;
            let y = (i / side) as f64 / scale;
            let hills = 40.0 * (x.sin() * y.cos()) + 15.0 * (0.5 * x + 0.3 * y).sin();
            hills + rng.random_range(-0.5..0.5)
        })
        .collect();
    Grid::new(side, side, 10.0, 0.0, 0.0, -9999.0, samples)
        .unwrap_or_else(|err| panic!("synthetic grid rejected: {err}"))
}

fn bench_build_tin(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_tin");
    group.sample_size(20);

    for &side in SIDES {
        let grid = synthetic_terrain(side, 0x7e44_a000 + side as u64);
        group.throughput(Throughput::Elements((side * side) as u64));
        for &max_error in TOLERANCES {
            group.bench_with_input(
                BenchmarkId::new(format!("tol_{max_error}"), side),
                &grid,
                |b, grid| {
                    b.iter(|| {
                        let mesh = build_tin(black_box(grid), black_box(max_error))
                            .unwrap_or_else(|err| panic!("build_tin failed: {err}"));
                        black_box(mesh.number_of_faces())
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_seed_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("seed_evaluation");
    for &side in SIDES {
        let grid = synthetic_terrain(side, 17);
        group.bench_with_input(BenchmarkId::from_parameter(side), &grid, |b, grid| {
            b.iter(|| {
                let scheduler = GreedyScheduler::new(black_box(grid), &TinOptions::new(1.0))
                    .unwrap_or_else(|err| panic!("seeding failed: {err}"));
                black_box(scheduler.statistics().evaluations)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_tin, bench_seed_evaluation);
criterion_main!(benches);
