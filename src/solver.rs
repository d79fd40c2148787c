// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use crate::core::CellGrid;
use crate::error::Result;
use crate::fast_iterative::{FastIterativeSolver, ProgressInfo};
use crate::fast_marching::FastMarchingSolver;
use crate::fast_sweeping::FastSweepingSolver;
use crate::shapes::Shape;
use crate::time_cost::TimeCostFunction;

/// Read access to a computed potential field.
pub trait PotentialField {
    /// Potential at a physical coordinate, interpolated from the grid.
    ///
    /// # Errors
    /// Returns `OutOfBounds` for points outside the grid domain.
    fn potential_at(&self, coord: [f64; 2]) -> Result<f64>;

    /// Whether the underlying cost changed and `update()` should run before
    /// the next query.
    fn requires_update(&self) -> bool;
}

impl PotentialField for CellGrid {
    fn potential_at(&self, coord: [f64; 2]) -> Result<f64> {
        CellGrid::potential_at(self, coord)
    }

    fn requires_update(&self) -> bool {
        false
    }
}

/// A solver that owns a grid and fills it with travel times.
pub trait EikonalSolver: PotentialField + Send {
    /// Compute the whole field from the grid's targets. Any previous result
    /// is discarded first, so calling this twice yields the same field.
    ///
    /// # Errors
    /// Returns an error if an iteration limit is exceeded or a thread pool
    /// cannot be created.
    fn initialize(&mut self) -> Result<()>;

    /// Recompute if the cost function reports a change; otherwise a no-op.
    ///
    /// # Errors
    /// See [`EikonalSolver::initialize`].
    fn update(&mut self) -> Result<()>;

    /// The grid being solved.
    fn grid(&self) -> &CellGrid;

    /// Owned copy of the current grid, safe to hand to other threads.
    fn snapshot(&self) -> CellGrid {
        self.grid().clone()
    }

    /// Consume the solver and return its grid.
    fn into_grid(self: Box<Self>) -> CellGrid;

    /// Which algorithm this is.
    fn kind(&self) -> SolverKind;
}

/// The available solving strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    /// Priority-queue single pass.
    FastMarching,
    /// Repeated Gauss-Seidel sweeps in four diagonal orders.
    FastSweeping,
    /// Active-list iteration with parallel compute phases.
    FastIterative,
}

impl SolverKind {
    /// Every kind, in a fixed order.
    pub const ALL: [SolverKind; 3] = [
        SolverKind::FastMarching,
        SolverKind::FastSweeping,
        SolverKind::FastIterative,
    ];
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolverKind::FastMarching => "fast-marching",
            SolverKind::FastSweeping => "fast-sweeping",
            SolverKind::FastIterative => "fast-iterative",
        };
        f.write_str(name)
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fmm" | "fast-marching" => Ok(SolverKind::FastMarching),
            "fsm" | "fast-sweeping" => Ok(SolverKind::FastSweeping),
            "fim" | "fast-iterative" => Ok(SolverKind::FastIterative),
            other => Err(format!(
                "unknown solver '{}': expected fmm, fsm or fim",
                other
            )),
        }
    }
}

/// Options shared by [`build_solver`]. Unset fields keep each solver's
/// defaults; options a solver does not use are ignored.
#[derive(Default)]
pub struct SolverConfig {
    /// Convergence tolerance (sweeping and iterative solvers).
    pub tolerance: Option<f64>,
    /// Worker threads (iterative solver).
    pub threads: Option<usize>,
    /// Iteration limit (sweeping and iterative solvers).
    pub max_iterations: Option<u64>,
    /// Restrict each sweep to its upwind neighbours (sweeping solver).
    pub directional_stencil: bool,
    /// Target shapes for exact boundary seeding.
    pub target_shapes: Vec<Box<dyn Shape>>,
    /// Progress callback (iterative solver).
    pub progress: Option<Box<dyn Fn(ProgressInfo) + Send + Sync>>,
}

impl fmt::Debug for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfig")
            .field("tolerance", &self.tolerance)
            .field("threads", &self.threads)
            .field("max_iterations", &self.max_iterations)
            .field("directional_stencil", &self.directional_stencil)
            .field("target_shapes", &self.target_shapes)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Build a boxed solver of the requested kind.
///
/// # Errors
/// Returns `InvalidTolerance` if a configured tolerance is not positive and
/// finite.
pub fn build_solver<C>(
    kind: SolverKind,
    grid: CellGrid,
    cost: C,
    config: SolverConfig,
) -> Result<Box<dyn EikonalSolver>>
where
    C: TimeCostFunction + 'static,
{
    let solver: Box<dyn EikonalSolver> = match kind {
        SolverKind::FastMarching => {
            Box::new(FastMarchingSolver::new(grid, cost).with_target_shapes(config.target_shapes))
        }
        SolverKind::FastSweeping => {
            let mut solver = FastSweepingSolver::new(grid, cost)
                .with_target_shapes(config.target_shapes)
                .with_directional_stencil(config.directional_stencil);
            if let Some(tolerance) = config.tolerance {
                solver = solver.with_tolerance(tolerance)?;
            }
            if let Some(limit) = config.max_iterations {
                solver = solver.with_max_iterations(limit);
            }
            Box::new(solver)
        }
        SolverKind::FastIterative => {
            let mut solver =
                FastIterativeSolver::new(grid, cost).with_target_shapes(config.target_shapes);
            if let Some(tolerance) = config.tolerance {
                solver = solver.with_tolerance(tolerance)?;
            }
            if let Some(threads) = config.threads {
                solver = solver.with_threads(threads);
            }
            if let Some(limit) = config.max_iterations {
                solver = solver.with_max_iterations(limit);
            }
            if let Some(callback) = config.progress {
                solver = solver.with_progress(callback);
            }
            Box::new(solver)
        }
    };
    Ok(solver)
}
