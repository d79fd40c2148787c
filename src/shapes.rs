// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

use crate::core::{CellGrid, CellState, CellTag, GridPoint};

/// A 2D region that can be rasterised onto a [`CellGrid`].
pub trait Shape: fmt::Debug + Send + Sync {
    /// Whether the point lies inside (or on the boundary of) the shape.
    fn contains(&self, coord: [f64; 2]) -> bool;

    /// Euclidean distance from the point to the shape; 0 inside.
    fn distance(&self, coord: [f64; 2]) -> f64;

    /// Axis-aligned bounding box as `(min, max)` corners.
    fn bounds(&self) -> ([f64; 2], [f64; 2]);
}

/// Axis-aligned rectangle given by its lower-left corner and extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Lower-left x.
    pub x: f64,
    /// Lower-left y.
    pub y: f64,
    /// Extent along x.
    pub width: f64,
    /// Extent along y.
    pub height: f64,
}

impl Rectangle {
    /// Create a rectangle from its lower-left corner and extent.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rectangle {
            x,
            y,
            width,
            height,
        }
    }
}

impl Shape for Rectangle {
    fn contains(&self, coord: [f64; 2]) -> bool {
        let [px, py] = coord;
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    fn distance(&self, coord: [f64; 2]) -> f64 {
        let [px, py] = coord;
        let dx = (self.x - px).max(0.0).max(px - (self.x + self.width));
        let dy = (self.y - py).max(0.0).max(py - (self.y + self.height));
        dx.hypot(dy)
    }

    fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        (
            [self.x, self.y],
            [self.x + self.width, self.y + self.height],
        )
    }
}

/// Disc given by its centre and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Centre coordinate.
    pub center: [f64; 2],
    /// Radius.
    pub radius: f64,
}

impl Circle {
    /// Create a disc.
    pub const fn new(center: [f64; 2], radius: f64) -> Self {
        Circle { center, radius }
    }
}

impl Shape for Circle {
    fn contains(&self, coord: [f64; 2]) -> bool {
        self.distance(coord) == 0.0
    }

    fn distance(&self, coord: [f64; 2]) -> f64 {
        let d = (coord[0] - self.center[0]).hypot(coord[1] - self.center[1]);
        (d - self.radius).max(0.0)
    }

    fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let [cx, cy] = self.center;
        (
            [cx - self.radius, cy - self.radius],
            [cx + self.radius, cy + self.radius],
        )
    }
}

/// Smallest distance from `coord` to any of `shapes` (+inf for none).
pub fn distance_to_nearest(shapes: &[Box<dyn Shape>], coord: [f64; 2]) -> f64 {
    shapes
        .iter()
        .map(|s| s.distance(coord))
        .fold(f64::INFINITY, f64::min)
}

impl CellGrid {
    /// Tag every cell overlapped by `shape`.
    ///
    /// A cell is the square of edge `resolution` centred on its node; it counts
    /// as overlapped when its node lies within half a cell of the shape.
    /// `Target` cells receive the node's distance to the shape as potential (0
    /// inside), `Obstacle` cells +inf. Any other tag is stored with +inf.
    /// Returns the number of cells written.
    pub fn mark_shape(&mut self, shape: &dyn Shape, tag: CellTag) -> usize {
        let h = self.resolution();
        let reach = 0.5 * h;
        let (lo, hi) = shape.bounds();

        let clamp = |v: f64, n: usize| (v.max(0.0) as usize).min(n - 1);
        let x_lo = clamp(((lo[0] - reach) / h).floor(), self.cols());
        let y_lo = clamp(((lo[1] - reach) / h).floor(), self.rows());
        let x_hi = clamp(((hi[0] + reach) / h).ceil(), self.cols());
        let y_hi = clamp(((hi[1] + reach) / h).ceil(), self.rows());

        let mut written = 0;
        for y in y_lo..=y_hi {
            for x in x_lo..=x_hi {
                let point = GridPoint::new(x, y);
                let d = shape.distance(self.point_to_coord(point));
                if d > reach {
                    continue;
                }
                *self.cell_mut(point) = match tag {
                    CellTag::Target => CellState::target(d),
                    CellTag::Obstacle => CellState::obstacle(),
                    other => CellState::new(f64::INFINITY, other),
                };
                written += 1;
            }
        }
        written
    }
}
