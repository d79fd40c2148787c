// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use floor_field::shapes::{Circle, Rectangle, Shape};
use floor_field::{
    build_solver, CellGrid, CellTag, EikonalSolver, FastIterativeSolver, FastMarchingSolver,
    FastSweepingSolver, FieldError, FnTimeCost, GriddedTimeCost, PotentialField, SolverConfig,
    SolverKind, UnitTimeCost,
};

fn solve(kind: SolverKind, grid: CellGrid, config: SolverConfig) -> Box<dyn EikonalSolver> {
    let mut solver = build_solver(kind, grid, UnitTimeCost, config).unwrap();
    solver.initialize().unwrap();
    solver
}

/// 20 x 20 domain, resolution 0.1, 5 x 5 target with its corner at (7.5, 7.5).
#[test]
fn concrete_scenario() {
    let target = Rectangle::new(7.5, 7.5, 5.0, 5.0);
    for kind in SolverKind::ALL {
        let mut grid = CellGrid::new(20.0, 20.0, 0.1).unwrap();
        assert_eq!(grid.cols(), 201);
        grid.mark_shape(&target, CellTag::Target);

        let solver = solve(kind, grid, SolverConfig::default());
        for query in [[10.0, 10.0], [2.0, 2.0], [19.0, 10.0], [10.0, 0.5], [0.0, 20.0]] {
            let u = solver.potential_at(query).unwrap();
            let expected = target.distance(query);
            assert!(
                (u - expected).abs() <= 0.5,
                "{}: potential at {:?} = {} (expected {})",
                kind,
                query,
                u,
                expected
            );
        }
        assert_eq!(solver.potential_at([10.0, 10.0]).unwrap(), 0.0);
    }
}

/// Unit cost, single convex target: the field is the Euclidean distance.
#[test]
fn exact_distance_to_convex_target() {
    let circle = Circle::new([8.0, 8.0], 2.0);
    for kind in SolverKind::ALL {
        let mut grid = CellGrid::new(16.0, 16.0, 0.2).unwrap();
        grid.mark_shape(&circle, CellTag::Target);
        let config = SolverConfig {
            target_shapes: vec![Box::new(circle)],
            ..SolverConfig::default()
        };
        let solver = solve(kind, grid, config);

        let grid = solver.grid();
        let mut max_err = 0.0_f64;
        for p in grid.points() {
            let coord = grid.point_to_coord(p);
            let err = (grid.cell(p).potential - circle.distance(coord)).abs();
            max_err = max_err.max(err);
        }
        assert!(max_err <= 0.5, "{}: max error {}", kind, max_err);

        // Off-node queries interpolate between nodes.
        let u = solver.potential_at([14.05, 8.13]).unwrap();
        let d = circle.distance([14.05, 8.13]);
        assert!((u - d).abs() <= 0.5, "{}: off-node {} vs {}", kind, u, d);
    }
}

fn obstacle_scene() -> CellGrid {
    let mut grid = CellGrid::new(12.0, 10.0, 0.25).unwrap();
    grid.mark_shape(&Rectangle::new(1.0, 1.0, 1.0, 1.0), CellTag::Target);
    grid.mark_shape(&Circle::new([10.0, 8.0], 0.5), CellTag::Target);
    grid.mark_shape(&Rectangle::new(5.0, 0.0, 0.5, 7.0), CellTag::Obstacle);
    grid.mark_shape(&Circle::new([8.0, 3.0], 1.5), CellTag::Obstacle);
    grid
}

#[test]
fn solvers_agree_on_heterogeneous_cost() {
    let slowness = |[x, y]: [f64; 2]| 1.0 + 0.5 * (0.4 * x).sin().abs() + 0.1 * y;
    let fields: Vec<(SolverKind, CellGrid)> = SolverKind::ALL
        .into_iter()
        .map(|kind| {
            let cost = FnTimeCost::new(slowness);
            let mut solver =
                build_solver(kind, obstacle_scene(), cost, SolverConfig::default()).unwrap();
            solver.initialize().unwrap();
            (kind, solver.into_grid())
        })
        .collect();

    let (ref_kind, reference) = &fields[0];
    for (kind, grid) in &fields[1..] {
        for p in reference.points() {
            let (a, b) = (reference.cell(p).potential, grid.cell(p).potential);
            if a.is_infinite() {
                assert!(b.is_infinite(), "{:?}: {} finite where {} is not", p, kind, ref_kind);
                continue;
            }
            assert!(
                (a - b).abs() <= 1e-2,
                "{:?}: {} {} vs {} {}",
                p,
                ref_kind,
                a,
                kind,
                b
            );
        }
    }
}

#[test]
fn initialize_is_idempotent() {
    for kind in SolverKind::ALL {
        let mut solver = build_solver(kind, obstacle_scene(), UnitTimeCost, SolverConfig::default())
            .unwrap();
        solver.initialize().unwrap();
        let first = solver.snapshot();
        solver.initialize().unwrap();
        assert_eq!(
            first.potentials(),
            solver.grid().potentials(),
            "{}: second run differs",
            kind
        );
        assert_eq!(first.cells(), solver.grid().cells());
    }
}

#[test]
fn obstacles_stay_impassable() {
    for kind in SolverKind::ALL {
        let solver = solve(kind, obstacle_scene(), SolverConfig::default());
        let grid = solver.grid();
        assert!(grid.count_tag(CellTag::Obstacle) > 0);
        for cell in grid.cells() {
            if cell.tag == CellTag::Obstacle {
                assert!(cell.potential.is_infinite(), "{}: obstacle written", kind);
            }
        }

        // Inside the disc obstacle nothing finite is interpolated.
        assert!(solver.potential_at([8.0, 3.0]).unwrap().is_infinite());

        // Behind the wall the field detours over its top end.
        let behind = solver.potential_at([6.0, 1.5]).unwrap();
        let straight = Rectangle::new(1.0, 1.0, 1.0, 1.0).distance([6.0, 1.5]);
        assert!(
            behind > straight + 2.0,
            "{}: {} is not a detour (straight line {})",
            kind,
            behind,
            straight
        );
    }
}

#[test]
fn no_targets_is_a_no_op() {
    for kind in SolverKind::ALL {
        let mut grid = CellGrid::new(4.0, 4.0, 0.5).unwrap();
        grid.mark_shape(&Rectangle::new(1.0, 1.0, 1.0, 1.0), CellTag::Obstacle);
        let before = grid.clone();
        let solver = solve(kind, grid, SolverConfig::default());
        assert_eq!(solver.grid().cells(), before.cells(), "{}", kind);
        assert!(solver.potential_at([3.0, 3.0]).unwrap().is_infinite());
    }
}

#[test]
fn query_outside_domain_is_an_error() {
    let mut grid = CellGrid::new(4.0, 4.0, 0.5).unwrap();
    grid.mark_shape(&Rectangle::new(0.0, 0.0, 0.5, 0.5), CellTag::Target);
    let solver = solve(SolverKind::FastMarching, grid, SolverConfig::default());
    assert!(matches!(
        solver.potential_at([4.5, 1.0]),
        Err(FieldError::OutOfBounds { .. })
    ));
    assert!(matches!(
        solver.potential_at([1.0, -0.1]),
        Err(FieldError::OutOfBounds { .. })
    ));
}

fn corner_target_grid() -> CellGrid {
    let mut grid = CellGrid::new(9.0, 4.0, 0.5).unwrap();
    grid.mark_shape(&Rectangle::new(0.0, 0.0, 0.0, 4.0), CellTag::Target);
    grid
}

/// Stage a doubled cost map, check `requires_update`, update, and compare.
fn check_staged_update<S: EikonalSolver>(
    solver: &mut S,
    stage: impl FnOnce(&mut S, Vec<f64>) -> floor_field::Result<()>,
) {
    solver.initialize().unwrap();
    let before = solver.potential_at([9.0, 2.0]).unwrap();
    assert!((before - 9.0).abs() < 1e-6, "{}: before {}", solver.kind(), before);

    let len = solver.grid().len();
    stage(solver, vec![2.0; len]).unwrap();
    assert!(solver.requires_update());
    // Staged but not applied: the field is unchanged.
    assert_eq!(solver.potential_at([9.0, 2.0]).unwrap(), before);

    solver.update().unwrap();
    assert!(!solver.requires_update());
    let after = solver.potential_at([9.0, 2.0]).unwrap();
    assert!((after - 18.0).abs() < 1e-6, "{}: after {}", solver.kind(), after);
}

#[test]
fn update_recomputes_after_cost_change() {
    let grid = corner_target_grid();
    let cost = GriddedTimeCost::for_grid(&grid, vec![1.0; grid.len()]).unwrap();

    let mut fmm = FastMarchingSolver::new(grid.clone(), cost.clone());
    check_staged_update(&mut fmm, |s, v| s.cost_mut().stage(v));

    let mut fsm = FastSweepingSolver::new(grid.clone(), cost.clone());
    check_staged_update(&mut fsm, |s, v| s.cost_mut().stage(v));

    let mut fim = FastIterativeSolver::new(grid, cost).with_threads(2);
    check_staged_update(&mut fim, |s, v| s.cost_mut().stage(v));
}

#[test]
fn snapshot_serves_readers_during_recompute() {
    let grid = corner_target_grid();
    let cost = GriddedTimeCost::for_grid(&grid, vec![1.0; grid.len()]).unwrap();
    let mut solver = FastMarchingSolver::new(grid, cost);
    solver.initialize().unwrap();

    let snapshot = solver.snapshot();
    let before = snapshot.potential_at([7.0, 1.0]).unwrap();
    let len = snapshot.len();
    solver.cost_mut().stage(vec![3.0; len]).unwrap();

    std::thread::scope(|s| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    for _ in 0..500 {
                        assert_eq!(snapshot.potential_at([7.0, 1.0]).unwrap(), before);
                    }
                })
            })
            .collect();
        solver.update().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    });

    let after = solver.potential_at([7.0, 1.0]).unwrap();
    assert!((after - 3.0 * before).abs() < 1e-9);
    assert_eq!(snapshot.potential_at([7.0, 1.0]).unwrap(), before);
}

#[test]
fn fast_iterative_is_thread_count_independent() {
    let run = |threads: usize| {
        let config = SolverConfig {
            threads: Some(threads),
            ..SolverConfig::default()
        };
        solve(SolverKind::FastIterative, obstacle_scene(), config).into_grid()
    };
    let single = run(1);
    for threads in [2, 4, 8] {
        assert_eq!(
            single.potentials(),
            run(threads).potentials(),
            "{} threads differ from 1",
            threads
        );
    }
}

#[test]
fn boxed_target_shapes_seed_exactly() {
    // A target between nodes: exact seeding follows the true boundary.
    let circle = Circle::new([5.25, 5.25], 0.3);
    let shapes: Vec<Box<dyn Shape>> = vec![Box::new(circle)];
    let mut grid = CellGrid::new(10.0, 10.0, 0.5).unwrap();
    grid.mark_shape(&circle, CellTag::Target);
    let config = SolverConfig {
        target_shapes: shapes,
        ..SolverConfig::default()
    };
    let solver = solve(SolverKind::FastMarching, grid, config);
    let u = solver.potential_at([9.0, 5.25]).unwrap();
    assert!((u - circle.distance([9.0, 5.25])).abs() < 0.25, "potential {}", u);
}
