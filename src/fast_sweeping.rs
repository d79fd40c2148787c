// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::core::{CellGrid, CellTag, GridPoint};
use crate::error::{FieldError, Result};
use crate::shapes::Shape;
use crate::solver::{EikonalSolver, PotentialField, SolverKind};
use crate::time_cost::TimeCostFunction;
use crate::update_kernels::{boundary_seeds, godunov_update, Admissible, Direction};

/// Default convergence threshold, in units of the grid resolution.
const DEFAULT_TOLERANCE_FACTOR: f64 = 1e-3;

/// Extra iterations allowed on top of `cols + rows` before giving up.
const ITERATION_SLACK: u64 = 8;

/// Fast Sweeping Method solver.
///
/// Runs Gauss-Seidel passes over the whole grid in the four diagonal orders,
/// lowering each cell to its Godunov estimate, until one full iteration
/// changes no value by more than the tolerance. There is no frontier; cells
/// carry no provisional tag and every cell with a finite value ends `Reached`.
pub struct FastSweepingSolver<C> {
    grid: CellGrid,
    cost: C,
    target_shapes: Vec<Box<dyn Shape>>,
    tolerance: Option<f64>,
    max_iterations: Option<u64>,
    directional_stencil: bool,
    iterations: u64,
}

impl<C: TimeCostFunction> FastSweepingSolver<C> {
    /// Create a solver over a grid whose targets and obstacles are already set.
    pub fn new(grid: CellGrid, cost: C) -> Self {
        FastSweepingSolver {
            grid,
            cost,
            target_shapes: Vec::new(),
            tolerance: None,
            max_iterations: None,
            directional_stencil: false,
            iterations: 0,
        }
    }

    /// Seed with exact distances to these target shapes (builder method).
    pub fn with_target_shapes(mut self, shapes: Vec<Box<dyn Shape>>) -> Self {
        self.target_shapes = shapes;
        self
    }

    /// Set the convergence threshold on the largest change per iteration.
    /// Defaults to `1e-3 * resolution`.
    ///
    /// # Errors
    /// Returns `InvalidTolerance` if `tolerance` is not positive and finite.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(FieldError::InvalidTolerance(tolerance));
        }
        self.tolerance = Some(tolerance);
        Ok(self)
    }

    /// Cap the number of iterations (each is four sweeps). Defaults to
    /// `cols + rows + 8`.
    pub fn with_max_iterations(mut self, limit: u64) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    /// Restrict each sweep to the neighbours upwind of its orientation
    /// instead of the smaller neighbour per axis.
    pub fn with_directional_stencil(mut self, enabled: bool) -> Self {
        self.directional_stencil = enabled;
        self
    }

    /// Iterations used by the last `initialize()`.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Mutable access to the time cost function.
    pub fn cost_mut(&mut self) -> &mut C {
        &mut self.cost
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
            .unwrap_or(DEFAULT_TOLERANCE_FACTOR * self.grid.resolution())
    }

    fn iteration_limit(&self) -> u64 {
        self.max_iterations
            .unwrap_or((self.grid.cols() + self.grid.rows()) as u64 + ITERATION_SLACK)
    }

    /// One pass in the traversal order of `direction`. Returns the largest
    /// decrease; a cell going from +inf to a finite value counts as +inf.
    fn sweep(&mut self, direction: Direction) -> f64 {
        let stencil = if self.directional_stencil {
            direction
        } else {
            Direction::Any
        };
        let (rev_x, rev_y) = direction.reversed();
        let (cols, rows) = (self.grid.cols(), self.grid.rows());

        let mut max_change = 0.0_f64;
        for j in 0..rows {
            let y = if rev_y { rows - 1 - j } else { j };
            for i in 0..cols {
                let x = if rev_x { cols - 1 - i } else { i };
                let point = GridPoint::new(x, y);
                if !self.grid.cell(point).tag.is_solvable() {
                    continue;
                }

                let estimate =
                    godunov_update(&self.grid, point, &self.cost, stencil, Admissible::Any);
                let cell = self.grid.cell_mut(point);
                if estimate < cell.potential {
                    let change = if cell.potential.is_finite() {
                        cell.potential - estimate
                    } else {
                        f64::INFINITY
                    };
                    max_change = max_change.max(change);
                    cell.potential = estimate;
                }
            }
        }
        max_change
    }

    fn converge(&mut self) -> Result<u64> {
        let tolerance = self.tolerance();
        let limit = self.iteration_limit();

        let mut iterations = 0;
        loop {
            if iterations >= limit {
                warn!(
                    "fast sweeping: no convergence to {:e} after {} iterations",
                    tolerance, limit
                );
                return Err(FieldError::MaxIterationsExceeded { limit });
            }
            iterations += 1;

            let max_change = Direction::SWEEPS
                .into_iter()
                .map(|direction| self.sweep(direction))
                .fold(0.0_f64, f64::max);
            debug!(
                "fast sweeping: iteration {} max change {:e}",
                iterations, max_change
            );
            if max_change < tolerance {
                return Ok(iterations);
            }
        }
    }

    fn tag_converged(&mut self) -> usize {
        let mut reached = 0;
        for point in self.grid.points() {
            let cell = self.grid.cell_mut(point);
            if cell.tag.is_solvable() && cell.potential.is_finite() {
                cell.tag = CellTag::Reached;
                reached += 1;
            }
        }
        reached
    }
}

impl<C: TimeCostFunction> PotentialField for FastSweepingSolver<C> {
    fn potential_at(&self, coord: [f64; 2]) -> Result<f64> {
        self.grid.potential_at(coord)
    }

    fn requires_update(&self) -> bool {
        self.cost.needs_update()
    }
}

impl<C: TimeCostFunction> EikonalSolver for FastSweepingSolver<C> {
    fn initialize(&mut self) -> Result<()> {
        let start = Instant::now();
        self.grid.reset();
        self.iterations = 0;

        if self.grid.target_count() == 0 {
            error!("fast sweeping: grid has no target cells, field left undefined");
            return Ok(());
        }

        for seed in boundary_seeds(&self.grid, &self.cost, &self.target_shapes) {
            self.grid.cell_mut(seed.point).potential = seed.potential;
        }

        let outcome = self.converge();
        let reached = self.tag_converged();
        self.iterations = outcome?;
        info!(
            "fast sweeping: {} cells reached after {} iterations in {:.3}s",
            reached,
            self.iterations,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        if !self.cost.needs_update() {
            return Ok(());
        }
        self.cost.update();
        self.initialize()
    }

    fn grid(&self) -> &CellGrid {
        &self.grid
    }

    fn into_grid(self: Box<Self>) -> CellGrid {
        self.grid
    }

    fn kind(&self) -> SolverKind {
        SolverKind::FastSweeping
    }
}
