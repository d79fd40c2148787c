// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Floor fields for pedestrian navigation via the eikonal equation.
//!
//! This library computes, for every node of a regular 2D grid, the travel time
//! to the nearest target cell by solving |∇T(x)|·F(x) = 1, where F is a
//! position-dependent time cost (inverse speed). Obstacles are impassable.
//! Three solvers share one Godunov upwind update: Fast Marching (priority
//! queue, single pass), Fast Sweeping (repeated diagonal Gauss-Seidel sweeps)
//! and Fast Iterative (active list with parallel compute phases).
//!
//! ```no_run
//! use floor_field::shapes::Rectangle;
//! use floor_field::{build_solver, CellGrid, CellTag, SolverConfig, SolverKind, UnitTimeCost};
//!
//! let mut grid = CellGrid::new(20.0, 20.0, 0.1)?;
//! grid.mark_shape(&Rectangle::new(7.5, 7.5, 5.0, 5.0), CellTag::Target);
//! let mut solver = build_solver(SolverKind::FastMarching, grid, UnitTimeCost, SolverConfig::default())?;
//! solver.initialize()?;
//! println!("time to exit: {}", solver.potential_at([1.0, 1.0])?);
//! # Ok::<(), floor_field::FieldError>(())
//! ```

#![warn(missing_docs)]

/// Grid, cell states and tags.
pub mod core;
/// Error types for the library.
pub mod error;
/// Fast Iterative Method solver.
pub mod fast_iterative;
/// Fast Marching Method solver.
pub mod fast_marching;
/// Fast Sweeping Method solver.
pub mod fast_sweeping;
pub mod io;
/// Target and obstacle shapes and their rasterisation.
pub mod shapes;
/// Solver traits, selection and construction.
pub mod solver;
pub mod time_cost;
/// Godunov update rule and boundary seeding shared by all solvers.
pub mod update_kernels;

pub use crate::core::{CellGrid, CellState, CellTag, GridPoint};
pub use crate::error::{FieldError, Result};
pub use crate::fast_iterative::{FastIterativeSolver, ProgressInfo};
pub use crate::fast_marching::FastMarchingSolver;
pub use crate::fast_sweeping::FastSweepingSolver;
pub use crate::solver::{build_solver, EikonalSolver, PotentialField, SolverConfig, SolverKind};
pub use crate::time_cost::{
    ConstantTimeCost, FnTimeCost, GriddedTimeCost, TimeCostFunction, UnitTimeCost,
};
