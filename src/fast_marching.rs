// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Instant;

use tracing::{debug, error, info};

use crate::core::{CellGrid, CellState, CellTag, GridPoint};
use crate::error::Result;
use crate::shapes::Shape;
use crate::solver::{EikonalSolver, PotentialField, SolverKind};
use crate::time_cost::TimeCostFunction;
use crate::update_kernels::{boundary_seeds, godunov_update, Admissible, Direction};

const NOT_QUEUED: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    index: usize,
    key: f64,
}

impl HeapEntry {
    /// Ties are broken by cell index so runs are reproducible.
    #[inline]
    fn precedes(&self, other: &HeapEntry) -> bool {
        self.key < other.key || (self.key == other.key && self.index < other.index)
    }
}

/// Binary min-heap over cell indices with a position map for true
/// decrease-key.
struct FrontierHeap {
    entries: Vec<HeapEntry>,
    slots: Vec<usize>,
}

impl FrontierHeap {
    fn new(num_cells: usize) -> Self {
        FrontierHeap {
            entries: Vec::new(),
            slots: vec![NOT_QUEUED; num_cells],
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, index: usize) -> bool {
        self.slots[index] != NOT_QUEUED
    }

    fn push(&mut self, index: usize, key: f64) {
        assert!(!self.contains(index), "cell {} is already queued", index);
        let pos = self.entries.len();
        self.entries.push(HeapEntry { index, key });
        self.slots[index] = pos;
        self.sift_up(pos);
    }

    fn decrease_key(&mut self, index: usize, key: f64) {
        let pos = self.slots[index];
        assert!(
            pos != NOT_QUEUED,
            "decrease-key on cell {} which is not in the frontier",
            index
        );
        assert!(
            key <= self.entries[pos].key,
            "decrease-key would raise cell {} from {} to {}",
            index,
            self.entries[pos].key,
            key
        );
        self.entries[pos].key = key;
        self.sift_up(pos);
    }

    fn pop(&mut self) -> Option<(usize, f64)> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.swap(0, last);
        let top = self.entries.pop()?;
        self.slots[top.index] = NOT_QUEUED;
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some((top.index, top.key))
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.slots[self.entries[a].index] = a;
        self.slots[self.entries[b].index] = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.entries[pos].precedes(&self.entries[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let n = self.entries.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut best = pos;
            if left < n && self.entries[left].precedes(&self.entries[best]) {
                best = left;
            }
            if right < n && self.entries[right].precedes(&self.entries[best]) {
                best = right;
            }
            if best == pos {
                break;
            }
            self.swap(pos, best);
            pos = best;
        }
    }
}

/// Fast Marching Method solver.
///
/// Propagates the front outwards from the targets in order of increasing
/// potential, freezing one cell per step. Each cell moves through
/// `Undefined -> Reachable -> Reached`; cells that no front reaches stay
/// `Undefined` at +inf.
pub struct FastMarchingSolver<C> {
    grid: CellGrid,
    cost: C,
    target_shapes: Vec<Box<dyn Shape>>,
}

impl<C: TimeCostFunction> FastMarchingSolver<C> {
    /// Create a solver over a grid whose targets and obstacles are already set.
    pub fn new(grid: CellGrid, cost: C) -> Self {
        FastMarchingSolver {
            grid,
            cost,
            target_shapes: Vec::new(),
        }
    }

    /// Seed the cells around the targets with their exact distance to these
    /// shapes instead of a Godunov estimate (builder method).
    pub fn with_target_shapes(mut self, shapes: Vec<Box<dyn Shape>>) -> Self {
        self.target_shapes = shapes;
        self
    }

    /// Mutable access to the time cost function, e.g. to stage a new map.
    pub fn cost_mut(&mut self) -> &mut C {
        &mut self.cost
    }

    fn run(&mut self, on_freeze: impl FnMut(GridPoint, f64)) -> Result<()> {
        let start = Instant::now();
        self.grid.reset();

        if self.grid.target_count() == 0 {
            error!("fast marching: grid has no target cells, field left undefined");
            return Ok(());
        }

        let mut heap = FrontierHeap::new(self.grid.len());
        for seed in boundary_seeds(&self.grid, &self.cost, &self.target_shapes) {
            if !seed.potential.is_finite() {
                continue;
            }
            *self.grid.cell_mut(seed.point) = CellState::new(seed.potential, CellTag::Reachable);
            heap.push(self.grid.index_of(seed.point), seed.potential);
        }
        debug!("fast marching: {} frontier cells seeded", heap.len());

        let reached = self.march(&mut heap, on_freeze);
        info!(
            "fast marching: {} cells reached in {:.3}s",
            reached,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn march(&mut self, heap: &mut FrontierHeap, mut on_freeze: impl FnMut(GridPoint, f64)) -> usize {
        let mut reached = 0;
        while let Some((index, potential)) = heap.pop() {
            let point = self.grid.point_of(index);
            let cell = self.grid.cell_mut(point);
            debug_assert_eq!(cell.tag, CellTag::Reachable);
            cell.tag = CellTag::Reached;
            reached += 1;
            on_freeze(point, potential);

            for n in self.grid.neumann_neighbors(point) {
                let tag = self.grid.cell(n).tag;
                if tag != CellTag::Undefined && tag != CellTag::Reachable {
                    continue;
                }
                let estimate =
                    godunov_update(&self.grid, n, &self.cost, Direction::Any, Admissible::Frozen);
                let n_index = self.grid.index_of(n);
                let cell = self.grid.cell_mut(n);
                if tag == CellTag::Undefined {
                    *cell = CellState::new(estimate, CellTag::Reachable);
                    heap.push(n_index, estimate);
                } else if estimate < cell.potential {
                    cell.potential = estimate;
                    heap.decrease_key(n_index, estimate);
                }
            }
        }
        reached
    }
}

impl<C: TimeCostFunction> PotentialField for FastMarchingSolver<C> {
    fn potential_at(&self, coord: [f64; 2]) -> Result<f64> {
        self.grid.potential_at(coord)
    }

    fn requires_update(&self) -> bool {
        self.cost.needs_update()
    }
}

impl<C: TimeCostFunction> EikonalSolver for FastMarchingSolver<C> {
    fn initialize(&mut self) -> Result<()> {
        self.run(|_, _| {})
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
        SolverKind::FastMarching
    }
}
