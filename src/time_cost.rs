// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Time cost (slowness) functions consumed by the solvers.
//!
//! The cost `F(x) = 1 / speed(x)` is the time needed to traverse one unit of
//! length at `x`. Every implementation must return values that are positive
//! and finite; anything else violates the premise of the Eikonal equation and
//! the resulting field is undefined. Costs are not re-validated at query time.

use crate::core::CellGrid;
use crate::error::{FieldError, Result};

/// Position-dependent time cost, possibly changing between solver updates.
pub trait TimeCostFunction: Send + Sync {
    /// Cost at a physical coordinate. Must be positive and finite.
    fn cost_at(&self, coord: [f64; 2]) -> f64;

    /// Whether the cost has changed since the last [`update`](Self::update).
    fn needs_update(&self) -> bool {
        false
    }

    /// Recompute internal state (e.g. apply a staged cost map).
    fn update(&mut self) {}
}

impl<T: TimeCostFunction + ?Sized> TimeCostFunction for Box<T> {
    fn cost_at(&self, coord: [f64; 2]) -> f64 {
        (**self).cost_at(coord)
    }

    fn needs_update(&self) -> bool {
        (**self).needs_update()
    }

    fn update(&mut self) {
        (**self).update()
    }
}

/// Cost of 1 everywhere; the field becomes the Euclidean distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnitTimeCost;

impl TimeCostFunction for UnitTimeCost {
    fn cost_at(&self, _coord: [f64; 2]) -> f64 {
        1.0
    }
}

/// The same cost everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTimeCost {
    cost: f64,
}

impl ConstantTimeCost {
    /// # Errors
    /// Returns `InvalidCost` if `cost` is not positive and finite.
    pub fn new(cost: f64) -> Result<Self> {
        validate_costs(&[cost])?;
        Ok(ConstantTimeCost { cost })
    }
}

impl TimeCostFunction for ConstantTimeCost {
    fn cost_at(&self, _coord: [f64; 2]) -> f64 {
        self.cost
    }
}

/// Cost given by a closure. The closure is trusted to return positive values.
pub struct FnTimeCost<F> {
    f: F,
}

impl<F> FnTimeCost<F>
where
    F: Fn([f64; 2]) -> f64 + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        FnTimeCost { f }
    }
}

impl<F> TimeCostFunction for FnTimeCost<F>
where
    F: Fn([f64; 2]) -> f64 + Send + Sync,
{
    fn cost_at(&self, coord: [f64; 2]) -> f64 {
        (self.f)(coord)
    }
}

/// Cost sampled on a regular grid, looked up at the nearest sample.
///
/// A replacement map can be staged with [`stage`](Self::stage); it only takes
/// effect after [`TimeCostFunction::update`], and until then
/// `needs_update()` reports true.
#[derive(Debug, Clone)]
pub struct GriddedTimeCost {
    cols: usize,
    rows: usize,
    resolution: f64,
    values: Vec<f64>,
    staged: Option<Vec<f64>>,
}

impl GriddedTimeCost {
    /// Create a cost map of `cols x rows` samples in row-major order, spaced
    /// `resolution` apart starting at the origin.
    ///
    /// # Errors
    /// Returns an error if the resolution is invalid, the value count does not
    /// match the shape, or any value is not positive and finite.
    pub fn new(cols: usize, rows: usize, resolution: f64, values: Vec<f64>) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(FieldError::InvalidResolution(resolution));
        }
        check_shape(rows, cols, &values)?;
        validate_costs(&values)?;
        Ok(GriddedTimeCost {
            cols,
            rows,
            resolution,
            values,
            staged: None,
        })
    }

    /// Create a cost map with one sample per node of `grid`.
    ///
    /// # Errors
    /// See [`GriddedTimeCost::new`].
    pub fn for_grid(grid: &CellGrid, values: Vec<f64>) -> Result<Self> {
        GriddedTimeCost::new(grid.cols(), grid.rows(), grid.resolution(), values)
    }

    /// Stage a replacement map, applied on the next `update()`.
    ///
    /// # Errors
    /// Returns an error if the shape or any value is invalid; the current map
    /// and any previously staged map are kept.
    pub fn stage(&mut self, values: Vec<f64>) -> Result<()> {
        check_shape(self.rows, self.cols, &values)?;
        validate_costs(&values)?;
        self.staged = Some(values);
        Ok(())
    }

    /// Active cost samples in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl TimeCostFunction for GriddedTimeCost {
    fn cost_at(&self, coord: [f64; 2]) -> f64 {
        let nearest = |v: f64, n: usize| ((v / self.resolution).round().max(0.0) as usize).min(n - 1);
        let x = nearest(coord[0], self.cols);
        let y = nearest(coord[1], self.rows);
        self.values[y * self.cols + x]
    }

    fn needs_update(&self) -> bool {
        self.staged.is_some()
    }

    fn update(&mut self) {
        if let Some(values) = self.staged.take() {
            self.values = values;
        }
    }
}

fn check_shape(rows: usize, cols: usize, values: &[f64]) -> Result<()> {
    if rows == 0 || cols == 0 || values.len() != rows * cols {
        return Err(FieldError::ShapeMismatch {
            expected: vec![rows, cols],
            got: vec![values.len()],
        });
    }
    Ok(())
}

/// Check that every value is positive and finite.
///
/// # Errors
/// Returns `InvalidCost` for the first offending value.
pub fn validate_costs(values: &[f64]) -> Result<()> {
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(FieldError::InvalidCost { index, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_and_constant() {
        assert_eq!(UnitTimeCost.cost_at([3.0, 4.0]), 1.0);
        assert!(!UnitTimeCost.needs_update());
        let c = ConstantTimeCost::new(2.5).unwrap();
        assert_eq!(c.cost_at([0.0, 0.0]), 2.5);
        assert!(matches!(
            ConstantTimeCost::new(0.0),
            Err(FieldError::InvalidCost { index: 0, .. })
        ));
    }

    #[test]
    fn closure_cost() {
        let cost = FnTimeCost::new(|[x, _y]: [f64; 2]| 1.0 + x);
        assert_eq!(cost.cost_at([2.0, 7.0]), 3.0);
    }

    #[test]
    fn gridded_nearest_sample() {
        // 3 cols x 2 rows, resolution 0.5
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let cost = GriddedTimeCost::new(3, 2, 0.5, values).unwrap();
        assert_eq!(cost.cost_at([0.0, 0.0]), 1.0);
        assert_eq!(cost.cost_at([0.9, 0.1]), 3.0);
        assert_eq!(cost.cost_at([0.6, 0.4]), 5.0);
        // Clamped outside the sampled area.
        assert_eq!(cost.cost_at([9.0, 9.0]), 6.0);
        assert_eq!(cost.cost_at([-1.0, -1.0]), 1.0);
    }

    #[test]
    fn gridded_rejects_bad_input() {
        assert!(matches!(
            GriddedTimeCost::new(2, 2, 1.0, vec![1.0; 3]),
            Err(FieldError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            GriddedTimeCost::new(2, 2, 1.0, vec![1.0, -1.0, 1.0, 1.0]),
            Err(FieldError::InvalidCost { index: 1, .. })
        ));
        assert!(matches!(
            GriddedTimeCost::new(2, 2, f64::INFINITY, vec![1.0; 4]),
            Err(FieldError::InvalidResolution(_))
        ));
    }

    #[test]
    fn staged_map_applies_on_update() {
        let mut cost = GriddedTimeCost::new(2, 2, 1.0, vec![1.0; 4]).unwrap();
        assert!(!cost.needs_update());

        cost.stage(vec![2.0; 4]).unwrap();
        assert!(cost.needs_update());
        assert_eq!(cost.cost_at([0.0, 0.0]), 1.0);

        cost.update();
        assert!(!cost.needs_update());
        assert_eq!(cost.cost_at([0.0, 0.0]), 2.0);

        assert!(cost.stage(vec![0.0; 4]).is_err());
        assert!(!cost.needs_update());
    }

    #[test]
    fn boxed_cost_delegates() {
        let mut cost: Box<dyn TimeCostFunction> =
            Box::new(GriddedTimeCost::new(2, 2, 1.0, vec![1.0; 4]).unwrap());
        assert_eq!(cost.cost_at([1.0, 1.0]), 1.0);
        assert!(!cost.needs_update());
        cost.update();
    }
}
