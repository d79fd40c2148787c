// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::core::{CellGrid, CellState, CellTag};
use crate::error::{FieldError, Result};
use crate::shapes::Shape;
use crate::solver::{EikonalSolver, PotentialField, SolverKind};
use crate::time_cost::TimeCostFunction;
use crate::update_kernels::{boundary_seeds, godunov_update, Admissible, Direction};

const DEFAULT_TOLERANCE: f64 = 1e-6;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Progress information passed to the optional callback.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInfo {
    /// Iterations completed so far.
    pub iterations: u64,
    /// Cells queued for the next iteration.
    pub active_list_size: usize,
    /// Cells currently tagged `Reached`.
    pub cells_reached: usize,
    /// Elapsed time since the solve started.
    pub elapsed: Duration,
}

struct AtomicBitset {
    bits: Box<[AtomicU64]>,
}

impl AtomicBitset {
    fn new(num_bits: usize) -> Self {
        let bits = (0..num_bits.div_ceil(64))
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        AtomicBitset { bits }
    }

    #[inline]
    fn mask(id: usize) -> (usize, u64) {
        (id / 64, 1u64 << (id % 64))
    }

    fn try_set(&self, id: usize) -> bool {
        let (word, bit) = Self::mask(id);
        let prev = self.bits[word].fetch_or(bit, Ordering::AcqRel);
        (prev & bit) == 0
    }

    fn is_set(&self, id: usize) -> bool {
        let (word, bit) = Self::mask(id);
        self.bits[word].load(Ordering::Acquire) & bit != 0
    }

    fn clear(&self, id: usize) {
        let (word, bit) = Self::mask(id);
        self.bits[word].fetch_and(!bit, Ordering::Release);
    }
}

/// Cells waiting for the next iteration. Safe to push from worker threads;
/// the bitset keeps each cell in the queue at most once.
struct ActiveList {
    queue: SegQueue<usize>,
    members: AtomicBitset,
}

impl ActiveList {
    fn new(num_cells: usize) -> Self {
        ActiveList {
            queue: SegQueue::new(),
            members: AtomicBitset::new(num_cells),
        }
    }

    fn push_if_new(&self, index: usize) -> bool {
        if self.members.try_set(index) {
            self.queue.push(index);
            true
        } else {
            false
        }
    }

    fn contains(&self, index: usize) -> bool {
        self.members.is_set(index)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    /// Empty the list. Cells come back sorted so iteration order does not
    /// depend on which thread queued them.
    fn drain_sorted(&self) -> Vec<usize> {
        let mut cells = Vec::with_capacity(self.queue.len());
        while let Some(index) = self.queue.pop() {
            self.members.clear(index);
            cells.push(index);
        }
        cells.sort_unstable();
        cells
    }
}

/// Fast Iterative Method solver.
///
/// Keeps an active list of provisional (`Narrow`) cells and updates all of
/// them at once each iteration, so the Godunov estimates can be computed in
/// parallel on a rayon pool. A cell whose estimate no longer improves by more
/// than the tolerance is frozen and wakes its neighbours; a neighbour that a
/// later update improves is re-activated even if it was already `Reached`.
///
/// Estimates are computed from the grid as it stood at the start of each
/// phase and committed on the calling thread, so the result does not depend
/// on the number of threads.
pub struct FastIterativeSolver<C> {
    grid: CellGrid,
    cost: C,
    target_shapes: Vec<Box<dyn Shape>>,
    tolerance: f64,
    num_threads: Option<usize>,
    max_iterations: Option<u64>,
    progress_callback: Option<Box<dyn Fn(ProgressInfo) + Send + Sync>>,
    progress_interval: Duration,
    iterations: u64,
}

impl<C: TimeCostFunction> FastIterativeSolver<C> {
    /// Create a solver over a grid whose targets and obstacles are already set.
    pub fn new(grid: CellGrid, cost: C) -> Self {
        FastIterativeSolver {
            grid,
            cost,
            target_shapes: Vec::new(),
            tolerance: DEFAULT_TOLERANCE,
            num_threads: None,
            max_iterations: None,
            progress_callback: None,
            progress_interval: PROGRESS_INTERVAL,
            iterations: 0,
        }
    }

    /// Seed with exact distances to these target shapes (builder method).
    pub fn with_target_shapes(mut self, shapes: Vec<Box<dyn Shape>>) -> Self {
        self.target_shapes = shapes;
        self
    }

    /// Set the convergence tolerance (builder method). Default is `1e-6`.
    ///
    /// # Errors
    /// Returns an error if the tolerance is not positive and finite.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(FieldError::InvalidTolerance(tolerance));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    /// Set the number of worker threads (builder method).
    /// If not specified, defaults to the number of available CPU cores.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Set the maximum number of iterations before aborting (builder method).
    /// Default is twice the number of cells.
    pub fn with_max_iterations(mut self, limit: u64) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    /// Set a progress callback that will be invoked periodically during solving (builder method).
    /// The callback receives progress information approximately every 500ms.
    pub fn with_progress(mut self, callback: Box<dyn Fn(ProgressInfo) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Minimum time between two progress callbacks (builder method).
    /// `Duration::ZERO` reports after every iteration.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
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

    fn get_num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    fn run(&mut self) -> Result<()> {
        let start = Instant::now();
        self.grid.reset();
        self.iterations = 0;

        if self.grid.target_count() == 0 {
            error!("fast iterative: grid has no target cells, field left undefined");
            return Ok(());
        }

        let num_threads = self.get_num_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| FieldError::Other(e.to_string()))?;

        let limit = self
            .max_iterations
            .unwrap_or(2 * self.grid.len() as u64);
        let tolerance = self.tolerance;

        let next = ActiveList::new(self.grid.len());
        for seed in boundary_seeds(&self.grid, &self.cost, &self.target_shapes) {
            *self.grid.cell_mut(seed.point) = CellState::new(seed.potential, CellTag::Narrow);
            next.push_if_new(self.grid.index_of(seed.point));
        }
        debug!(
            "fast iterative: {} seeds, {} threads",
            next.len(),
            num_threads
        );

        let mut last_report = Instant::now();
        loop {
            let active = next.drain_sorted();
            if active.is_empty() {
                break;
            }
            if self.iterations >= limit {
                warn!("fast iterative: active list still holds {} cells", active.len());
                return Err(FieldError::MaxIterationsExceeded { limit });
            }
            self.iterations += 1;

            // Compute phase: every active cell against the current field.
            let estimates = pool.install(|| estimate_cells(&self.grid, &self.cost, &active));

            // Commit phase.
            let mut converged = Vec::new();
            for (&index, &q) in active.iter().zip(&estimates) {
                let point = self.grid.point_of(index);
                let cell = self.grid.cell_mut(point);
                let p = cell.potential;
                cell.potential = p.min(q);
                if q >= p - tolerance {
                    cell.tag = CellTag::Reached;
                    converged.push(index);
                } else {
                    cell.tag = CellTag::Narrow;
                    next.push_if_new(index);
                }
            }

            // Wake the neighbours of frozen cells that the new values improve.
            let woken = pool.install(|| {
                improved_neighbors(&self.grid, &self.cost, &converged, &next, tolerance)
            });
            for &(index, q) in &woken {
                let point = self.grid.point_of(index);
                let cell = self.grid.cell_mut(point);
                cell.potential = cell.potential.min(q);
                cell.tag = CellTag::Narrow;
            }

            debug!(
                "fast iterative: iteration {} active {} converged {} woken {}",
                self.iterations,
                active.len(),
                converged.len(),
                woken.len()
            );

            if let Some(cb) = &self.progress_callback {
                if last_report.elapsed() >= self.progress_interval {
                    last_report = Instant::now();
                    cb(ProgressInfo {
                        iterations: self.iterations,
                        active_list_size: next.len(),
                        cells_reached: self.grid.count_tag(CellTag::Reached),
                        elapsed: start.elapsed(),
                    });
                }
            }
        }

        info!(
            "fast iterative: {} cells reached after {} iterations in {:.3}s",
            self.grid.count_tag(CellTag::Reached),
            self.iterations,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

fn estimate_cells<C: TimeCostFunction>(grid: &CellGrid, cost: &C, cells: &[usize]) -> Vec<f64> {
    cells
        .par_iter()
        .map(|&index| {
            godunov_update(grid, grid.point_of(index), cost, Direction::Any, Admissible::Any)
        })
        .collect()
}

/// Neighbours of `converged` that are not queued yet and whose estimate beats
/// their stored value by more than `tolerance`. Each is queued on `next`
/// exactly once; the estimate only depends on the grid, so whichever thread
/// wins the race reports the same value.
fn improved_neighbors<C: TimeCostFunction>(
    grid: &CellGrid,
    cost: &C,
    converged: &[usize],
    next: &ActiveList,
    tolerance: f64,
) -> Vec<(usize, f64)> {
    converged
        .par_iter()
        .flat_map_iter(|&index| {
            grid.neumann_neighbors(grid.point_of(index))
                .filter_map(move |n| {
                    let n_index = grid.index_of(n);
                    let cell = grid.cell(n);
                    if !cell.tag.is_solvable() || next.contains(n_index) {
                        return None;
                    }
                    let q = godunov_update(grid, n, cost, Direction::Any, Admissible::Any);
                    (q < cell.potential - tolerance && next.push_if_new(n_index))
                        .then_some((n_index, q))
                })
        })
        .collect()
}

impl<C: TimeCostFunction> PotentialField for FastIterativeSolver<C> {
    fn potential_at(&self, coord: [f64; 2]) -> Result<f64> {
        self.grid.potential_at(coord)
    }

    fn requires_update(&self) -> bool {
        self.cost.needs_update()
    }
}

impl<C: TimeCostFunction> EikonalSolver for FastIterativeSolver<C> {
    fn initialize(&mut self) -> Result<()> {
        self.run()
    }

    fn update(&mut self) -> Result<()> {
        if !self.cost.needs_update() {
            return Ok(());
        }
        self.cost.update();
        self.run()
    }

    fn grid(&self) -> &CellGrid {
        &self.grid
    }

    fn into_grid(self: Box<Self>) -> CellGrid {
        self.grid
    }

    fn kind(&self) -> SolverKind {
        SolverKind::FastIterative
    }
}
