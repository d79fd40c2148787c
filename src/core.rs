// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{FieldError, Result};

/// Slack applied before rounding an extent up to a whole number of cells, so
/// that `20.0 / 0.1` does not turn into 201 intervals.
const EXTENT_EPS: f64 = 1e-9;

/// Classification of a grid cell. Doubles as the per-cell state machine the
/// solvers drive: `Undefined -> Reachable/Narrow -> Reached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellTag {
    /// Unknown distance, not an obstacle.
    #[default]
    Undefined,
    /// Provisional value in the fast marching frontier.
    Reachable,
    /// Provisional value in the fast iterative active list.
    Narrow,
    /// Final (converged) value.
    Reached,
    /// Potential fixed by the caller; never updated by a solver.
    Target,
    /// Impassable; potential is always +inf.
    Obstacle,
}

impl CellTag {
    /// `Reached` or `Target`: the value will not change during the current run.
    pub fn is_frozen(self) -> bool {
        matches!(self, CellTag::Reached | CellTag::Target)
    }

    /// `Reachable` or `Narrow`: a provisional value is stored.
    pub fn is_provisional(self) -> bool {
        matches!(self, CellTag::Reachable | CellTag::Narrow)
    }

    /// Tags the solvers may write to.
    pub fn is_solvable(self) -> bool {
        !matches!(self, CellTag::Target | CellTag::Obstacle)
    }
}

/// Potential value and classification of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellState {
    /// Travel time to the nearest target; +inf if unknown or unreachable.
    pub potential: f64,
    /// Classification tag.
    pub tag: CellTag,
}

impl CellState {
    /// Create a cell state.
    pub const fn new(potential: f64, tag: CellTag) -> Self {
        CellState { potential, tag }
    }

    /// A target cell with a fixed potential (usually 0 or the distance to the
    /// target shape).
    pub const fn target(potential: f64) -> Self {
        CellState::new(potential, CellTag::Target)
    }

    /// An obstacle cell.
    pub const fn obstacle() -> Self {
        CellState::new(f64::INFINITY, CellTag::Obstacle)
    }
}

impl Default for CellState {
    fn default() -> Self {
        CellState::new(f64::INFINITY, CellTag::Undefined)
    }
}

/// Integer cell index: `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    /// Column index.
    pub x: usize,
    /// Row index.
    pub y: usize,
}

impl GridPoint {
    /// Create a grid point.
    pub const fn new(x: usize, y: usize) -> Self {
        GridPoint { x, y }
    }
}

/// Node count along one axis, or `None` if it does not fit in a `usize`.
fn nodes_along(extent: f64, resolution: f64) -> Option<usize> {
    let intervals = ((extent / resolution) - EXTENT_EPS).ceil().max(1.0);
    if intervals >= usize::MAX as f64 {
        return None;
    }
    (intervals as usize).checked_add(1)
}

/// A regular 2D grid of cell states covering `[0, width] x [0, height]`.
///
/// Cells sit on the nodes `(x * resolution, y * resolution)`. Storage is
/// row-major (`index = y * cols + x`). Cloning gives an independent snapshot
/// that can be read from other threads while the original is recomputed.
#[derive(Debug, Clone)]
pub struct CellGrid {
    width: f64,
    height: f64,
    resolution: f64,
    cols: usize,
    rows: usize,
    cells: Vec<CellState>,
}

impl CellGrid {
    /// Create a grid with every cell `Undefined` at +inf.
    ///
    /// # Errors
    /// Returns an error if the width, height or resolution is not positive
    /// and finite, or if the resulting node count cannot be allocated.
    pub fn new(width: f64, height: f64, resolution: f64) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(FieldError::InvalidResolution(resolution));
        }
        for (axis, value) in [("width", width), ("height", height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FieldError::InvalidGridExtent { axis, value });
            }
        }

        let too_large = || FieldError::GridTooLarge {
            width,
            height,
            resolution,
        };
        let cols = nodes_along(width, resolution).ok_or_else(too_large)?;
        let rows = nodes_along(height, resolution).ok_or_else(too_large)?;
        let len = cols.checked_mul(rows).ok_or_else(too_large)?;

        let mut cells = Vec::new();
        cells.try_reserve_exact(len).map_err(|_| too_large())?;
        cells.resize(len, CellState::default());

        Ok(CellGrid {
            width,
            height,
            resolution,
            cols,
            rows,
            cells,
        })
    }

    /// Domain width.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Domain height.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Cell edge length.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of nodes along x.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of nodes along y.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a grid has at least 2x2 cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Largest coordinate covered by a node along each axis.
    pub fn max_coord(&self) -> [f64; 2] {
        [
            (self.cols - 1) as f64 * self.resolution,
            (self.rows - 1) as f64 * self.resolution,
        ]
    }

    /// Whether `point` indexes a cell of this grid.
    pub fn contains_point(&self, point: GridPoint) -> bool {
        point.x < self.cols && point.y < self.rows
    }

    /// Flat (row-major) index of a point.
    #[inline]
    pub fn index_of(&self, point: GridPoint) -> usize {
        debug_assert!(
            self.contains_point(point),
            "{:?} outside {}x{} grid",
            point,
            self.cols,
            self.rows
        );
        point.y * self.cols + point.x
    }

    /// Point at a flat (row-major) index.
    #[inline]
    pub fn point_of(&self, index: usize) -> GridPoint {
        GridPoint::new(index % self.cols, index / self.cols)
    }

    /// Bounds-checked read of a cell.
    ///
    /// # Errors
    /// Returns `CellOutOfBounds` if `point` is outside the grid.
    pub fn value_at(&self, point: GridPoint) -> Result<CellState> {
        if !self.contains_point(point) {
            return Err(FieldError::CellOutOfBounds {
                x: point.x,
                y: point.y,
            });
        }
        Ok(self.cells[self.index_of(point)])
    }

    /// Bounds-checked write of a cell.
    ///
    /// # Errors
    /// Returns `CellOutOfBounds` if `point` is outside the grid.
    pub fn set_value(&mut self, point: GridPoint, state: CellState) -> Result<()> {
        if !self.contains_point(point) {
            return Err(FieldError::CellOutOfBounds {
                x: point.x,
                y: point.y,
            });
        }
        let index = self.index_of(point);
        self.cells[index] = state;
        Ok(())
    }

    /// Unchecked-in-release read used by the solvers.
    #[inline]
    pub fn cell(&self, point: GridPoint) -> &CellState {
        &self.cells[self.index_of(point)]
    }

    /// Unchecked-in-release write access used by the solvers.
    #[inline]
    pub fn cell_mut(&mut self, point: GridPoint) -> &mut CellState {
        let index = self.index_of(point);
        &mut self.cells[index]
    }

    /// Physical coordinate of a node.
    pub fn point_to_coord(&self, point: GridPoint) -> [f64; 2] {
        [
            point.x as f64 * self.resolution,
            point.y as f64 * self.resolution,
        ]
    }

    /// Nearest node to a physical coordinate (`index = round(coord / resolution)`).
    ///
    /// # Errors
    /// Returns `OutOfBounds` if the rounded index falls outside the grid.
    pub fn coord_to_point(&self, coord: [f64; 2]) -> Result<GridPoint> {
        let [x, y] = coord;
        let ix = (x / self.resolution).round();
        let iy = (y / self.resolution).round();
        let in_range = |v: f64, n: usize| v.is_finite() && v >= 0.0 && v <= (n - 1) as f64;
        if !in_range(ix, self.cols) || !in_range(iy, self.rows) {
            return Err(FieldError::OutOfBounds { x, y });
        }
        Ok(GridPoint::new(ix as usize, iy as usize))
    }

    /// Up to four axis-aligned neighbours inside the grid, regardless of tag.
    pub fn neumann_neighbors(&self, point: GridPoint) -> impl Iterator<Item = GridPoint> {
        let GridPoint { x, y } = point;
        [
            (x > 0).then(|| GridPoint::new(x - 1, y)),
            (x + 1 < self.cols).then(|| GridPoint::new(x + 1, y)),
            (y > 0).then(|| GridPoint::new(x, y - 1)),
            (y + 1 < self.rows).then(|| GridPoint::new(x, y + 1)),
        ]
        .into_iter()
        .flatten()
    }

    /// Neumann neighbours that are not obstacles.
    pub fn legit_neumann_neighbors(
        &self,
        point: GridPoint,
    ) -> impl Iterator<Item = GridPoint> + '_ {
        self.neumann_neighbors(point)
            .filter(move |&n| self.cell(n).tag != CellTag::Obstacle)
    }

    /// Return every solver-written cell to `Undefined` at +inf. `Target` and
    /// `Obstacle` cells are left alone.
    pub fn reset(&mut self) {
        for cell in self.cells.iter_mut() {
            if cell.tag.is_solvable() {
                *cell = CellState::default();
            }
        }
    }

    /// All cell states in row-major order.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Copy of the potential buffer in row-major order.
    pub fn potentials(&self) -> Vec<f64> {
        self.cells.iter().map(|c| c.potential).collect()
    }

    /// Iterate over every point of the grid in row-major order.
    pub fn points(&self) -> impl Iterator<Item = GridPoint> {
        let cols = self.cols;
        (0..self.cells.len()).map(move |i| GridPoint::new(i % cols, i / cols))
    }

    /// Points carrying `tag`.
    pub fn points_with_tag(&self, tag: CellTag) -> impl Iterator<Item = GridPoint> + '_ {
        self.points().filter(move |&p| self.cell(p).tag == tag)
    }

    /// Number of cells carrying `tag`.
    pub fn count_tag(&self, tag: CellTag) -> usize {
        self.cells.iter().filter(|c| c.tag == tag).count()
    }

    /// Number of `Target` cells.
    pub fn target_count(&self) -> usize {
        self.count_tag(CellTag::Target)
    }

    /// Continuous potential at a physical coordinate.
    ///
    /// Bilinear interpolation over the four nodes of the enclosing cell. Nodes
    /// with an infinite potential (obstacles, unreached cells) are dropped and
    /// the remaining weights renormalised; if every contributing node is
    /// infinite the result is +inf.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if the coordinate is outside the covered domain.
    pub fn potential_at(&self, coord: [f64; 2]) -> Result<f64> {
        let [x, y] = coord;
        let [max_x, max_y] = self.max_coord();
        // Written negated so NaN fails too.
        if !(x >= 0.0 && x <= max_x && y >= 0.0 && y <= max_y) {
            return Err(FieldError::OutOfBounds { x, y });
        }

        let fx = x / self.resolution;
        let fy = y / self.resolution;
        let x0 = (fx.floor() as usize).min(self.cols - 2);
        let y0 = (fy.floor() as usize).min(self.rows - 2);
        let tx = (fx - x0 as f64).clamp(0.0, 1.0);
        let ty = (fy - y0 as f64).clamp(0.0, 1.0);

        let stencil = [
            (GridPoint::new(x0, y0), (1.0 - tx) * (1.0 - ty)),
            (GridPoint::new(x0 + 1, y0), tx * (1.0 - ty)),
            (GridPoint::new(x0, y0 + 1), (1.0 - tx) * ty),
            (GridPoint::new(x0 + 1, y0 + 1), tx * ty),
        ];

        let mut acc = 0.0;
        let mut weight_sum = 0.0;
        for (point, weight) in stencil {
            let u = self.cell(point).potential;
            if weight > 0.0 && u.is_finite() {
                acc += weight * u;
                weight_sum += weight;
            }
        }

        if weight_sum > 0.0 {
            Ok(acc / weight_sum)
        } else {
            Ok(f64::INFINITY)
        }
    }
}
