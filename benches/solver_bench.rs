// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use floor_field::shapes::Rectangle;
use floor_field::{
    build_solver, CellGrid, CellTag, EikonalSolver, SolverConfig, SolverKind, UnitTimeCost,
};

/// Square room of side `extent` with an exit in the middle of the top wall
/// and a block of pillars in the centre.
fn room(extent: f64, resolution: f64) -> CellGrid {
    let mut grid = CellGrid::new(extent, extent, resolution).unwrap();
    let exit = extent * 0.1;
    grid.mark_shape(
        &Rectangle::new(0.5 * (extent - exit), extent, exit, 0.0),
        CellTag::Target,
    );
    let pillar = extent * 0.05;
    for i in 1..4 {
        for j in 1..4 {
            let x = extent * (0.2 * i as f64 + 0.05);
            let y = extent * (0.2 * j as f64 + 0.05);
            grid.mark_shape(&Rectangle::new(x, y, pillar, pillar), CellTag::Obstacle);
        }
    }
    grid
}

fn make_solver(kind: SolverKind, cells: usize, threads: Option<usize>) -> Box<dyn EikonalSolver> {
    let config = SolverConfig {
        threads,
        ..SolverConfig::default()
    };
    build_solver(kind, room(cells as f64 * 0.1, 0.1), UnitTimeCost, config).unwrap()
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// All three solvers on the same 256^2 room, single-threaded.
fn bench_solver_kinds(c: &mut Criterion) {
    let mut group = c.benchmark_group("room_256x256");
    for kind in SolverKind::ALL {
        group.bench_function(kind.to_string(), |b| {
            b.iter_with_setup(
                || make_solver(kind, 256, Some(1)),
                |mut solver| {
                    solver.initialize().unwrap();
                    black_box(solver)
                },
            );
        });
    }
    group.finish();
}

/// Fast iterative thread scaling on a 1024^2 room.
fn bench_thread_scaling(c: &mut Criterion) {
    let cpus = num_cpus();
    let mut group = c.benchmark_group("fim_thread_scaling_1024x1024");
    group.sample_size(10);
    for &threads in &[1, 2, 4, 8] {
        if threads <= cpus {
            group.bench_function(format!("{}threads", threads), |b| {
                b.iter_with_setup(
                    || make_solver(SolverKind::FastIterative, 1024, Some(threads)),
                    |mut solver| {
                        solver.initialize().unwrap();
                        black_box(solver)
                    },
                );
            });
        }
    }
    group.finish();
}

/// Fast marching across grid sizes.
fn bench_grid_size_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("fmm_grid_size_scaling");
    for &n in &[128, 256, 512, 1024] {
        group.bench_function(format!("{}x{}", n, n), |b| {
            b.iter_with_setup(
                || make_solver(SolverKind::FastMarching, n, None),
                |mut solver| {
                    solver.initialize().unwrap();
                    black_box(solver)
                },
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_solver_kinds,
    bench_thread_scaling,
    bench_grid_size_scaling,
);
criterion_main!(benches);
