// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::{CellGrid, CellState, CellTag, GridPoint};
use crate::shapes::{distance_to_nearest, Shape};
use crate::time_cost::TimeCostFunction;

/// Which neighbours along each axis feed the Godunov update.
///
/// `Any` uses the smaller of both neighbours per axis. The four sweep
/// orientations restrict each axis to the neighbour the sweep has already
/// visited: `x - 1` when x increases, `x + 1` when it decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Both neighbours on each axis.
    Any,
    /// Increasing x, increasing y.
    IncXIncY,
    /// Decreasing x, increasing y.
    DecXIncY,
    /// Decreasing x, decreasing y.
    DecXDecY,
    /// Increasing x, decreasing y.
    IncXDecY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
    Both,
}

impl Direction {
    /// The four sweep orders, in the sequence the sweeping solver runs them.
    pub const SWEEPS: [Direction; 4] = [
        Direction::IncXIncY,
        Direction::DecXIncY,
        Direction::DecXDecY,
        Direction::IncXDecY,
    ];

    /// Whether traversal runs backwards along (x, y).
    pub fn reversed(self) -> (bool, bool) {
        match self {
            Direction::Any | Direction::IncXIncY => (false, false),
            Direction::DecXIncY => (true, false),
            Direction::DecXDecY => (true, true),
            Direction::IncXDecY => (false, true),
        }
    }

    fn upwind_sides(self) -> (Side, Side) {
        if self == Direction::Any {
            return (Side::Both, Side::Both);
        }
        let pick = |rev: bool| if rev { Side::Upper } else { Side::Lower };
        let (rev_x, rev_y) = self.reversed();
        (pick(rev_x), pick(rev_y))
    }
}

/// Which neighbour values count as known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admissible {
    /// Only `Reached` and `Target` neighbours (fast marching upwind rule).
    Frozen,
    /// Every non-obstacle neighbour with its current value.
    Any,
}

impl Admissible {
    #[inline]
    fn admits(self, cell: &CellState) -> bool {
        if cell.tag == CellTag::Obstacle {
            return false;
        }
        match self {
            Admissible::Frozen => cell.tag.is_frozen(),
            Admissible::Any => true,
        }
    }
}

/// Solve the 2D Godunov upwind discretization for one node.
///
/// `tx`, `ty` are the smallest known neighbour values along each axis (+inf
/// if none) and `fh` is the local cost times the grid resolution. When both
/// are finite and `|tx - ty| < fh`, returns the larger root of
/// `(u - tx)^2 + (u - ty)^2 = fh^2`; otherwise the 1D update
/// `min(tx, ty) + fh`.
pub fn solve_2d(tx: f64, ty: f64, fh: f64) -> f64 {
    let lo = tx.min(ty);
    if lo.is_infinite() {
        return f64::INFINITY;
    }

    let diff = tx - ty;
    if diff.is_finite() && diff.abs() < fh {
        let disc = 2.0 * fh * fh - diff * diff;
        return (tx + ty + disc.sqrt()) / 2.0;
    }

    lo + fh
}

#[inline]
fn neighbor_value(grid: &CellGrid, point: Option<GridPoint>, admissible: Admissible) -> f64 {
    match point {
        Some(p) => {
            let cell = grid.cell(p);
            if admissible.admits(cell) {
                cell.potential
            } else {
                f64::INFINITY
            }
        }
        None => f64::INFINITY,
    }
}

/// Compute the Godunov estimate for `point` from its current neighbours.
///
/// Reads the axis neighbours selected by `direction`, keeps those that are
/// `admissible`, and calls [`solve_2d`] with the local cost. Never writes to
/// the grid.
pub fn godunov_update<C: TimeCostFunction + ?Sized>(
    grid: &CellGrid,
    point: GridPoint,
    cost: &C,
    direction: Direction,
    admissible: Admissible,
) -> f64 {
    let GridPoint { x, y } = point;
    let (side_x, side_y) = direction.upwind_sides();

    let lower_x = (x > 0).then(|| GridPoint::new(x - 1, y));
    let upper_x = (x + 1 < grid.cols()).then(|| GridPoint::new(x + 1, y));
    let lower_y = (y > 0).then(|| GridPoint::new(x, y - 1));
    let upper_y = (y + 1 < grid.rows()).then(|| GridPoint::new(x, y + 1));

    let pick = |side: Side, lo: Option<GridPoint>, hi: Option<GridPoint>| match side {
        Side::Lower => neighbor_value(grid, lo, admissible),
        Side::Upper => neighbor_value(grid, hi, admissible),
        Side::Both => {
            neighbor_value(grid, lo, admissible).min(neighbor_value(grid, hi, admissible))
        }
    };

    let tx = pick(side_x, lower_x, upper_x);
    let ty = pick(side_y, lower_y, upper_y);
    if tx.is_infinite() && ty.is_infinite() {
        return f64::INFINITY;
    }

    let f = cost.cost_at(grid.point_to_coord(point));
    solve_2d(tx, ty, f * grid.resolution())
}

/// A cell adjacent to the target region with its initial potential.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    /// The seeded cell.
    pub point: GridPoint,
    /// Its initial potential.
    pub potential: f64,
}

/// Initial values for every solvable, non-obstacle neighbour of a `Target`.
///
/// With `target_shapes` the value is the exact distance to the nearest shape
/// times the local cost; without, it is the Godunov estimate from the target
/// cells alone. Seeds come back in row-major order without duplicates.
pub fn boundary_seeds<C: TimeCostFunction + ?Sized>(
    grid: &CellGrid,
    cost: &C,
    target_shapes: &[Box<dyn Shape>],
) -> Vec<Seed> {
    let mut seen = vec![false; grid.len()];
    let mut seeds = Vec::new();

    for target in grid.points_with_tag(CellTag::Target) {
        for n in grid.legit_neumann_neighbors(target) {
            let index = grid.index_of(n);
            if seen[index] || !grid.cell(n).tag.is_solvable() {
                continue;
            }
            seen[index] = true;

            let potential = if target_shapes.is_empty() {
                godunov_update(grid, n, cost, Direction::Any, Admissible::Frozen)
            } else {
                let coord = grid.point_to_coord(n);
                distance_to_nearest(target_shapes, coord) * cost.cost_at(coord)
            };
            seeds.push(Seed {
                point: n,
                potential,
            });
        }
    }

    seeds.sort_by_key(|s| grid.index_of(s.point));
    seeds
}
