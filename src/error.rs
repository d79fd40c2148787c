// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur while building a grid, solving a field, or doing I/O.
#[derive(Debug)]
pub enum FieldError {
    /// A continuous query point lies outside the grid domain.
    OutOfBounds {
        /// The x coordinate of the query.
        x: f64,
        /// The y coordinate of the query.
        y: f64,
    },
    /// A cell index lies outside the grid.
    CellOutOfBounds {
        /// Column index.
        x: usize,
        /// Row index.
        y: usize,
    },
    /// Domain width or height is not positive and finite.
    InvalidGridExtent {
        /// Which extent ("width" or "height").
        axis: &'static str,
        /// The value provided.
        value: f64,
    },
    /// Grid resolution is not positive and finite.
    InvalidResolution(f64),
    /// The node count implied by extent over resolution cannot be allocated.
    GridTooLarge {
        /// Domain width.
        width: f64,
        /// Domain height.
        height: f64,
        /// Cell edge length.
        resolution: f64,
    },
    /// Solver tolerance is not positive and finite.
    InvalidTolerance(f64),
    /// Time cost value is not positive and finite.
    InvalidCost {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Speed value is not positive and finite.
    InvalidSpeed {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Array shape does not match expected shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Unsupported data type in file.
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// Iteration limit exceeded (likely indicates non-convergence).
    MaxIterationsExceeded {
        /// The limit that was set.
        limit: u64,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::OutOfBounds { x, y } => {
                write!(f, "point ({}, {}) is outside the grid domain", x, y)
            }
            FieldError::CellOutOfBounds { x, y } => {
                write!(f, "cell [{}, {}] is outside the grid", x, y)
            }
            FieldError::InvalidGridExtent { axis, value } => {
                write!(
                    f,
                    "invalid grid {}: {} (must be positive and finite)",
                    axis, value
                )
            }
            FieldError::InvalidResolution(h) => {
                write!(
                    f,
                    "invalid grid resolution: {} (must be positive and finite)",
                    h
                )
            }
            FieldError::GridTooLarge {
                width,
                height,
                resolution,
            } => {
                write!(
                    f,
                    "grid {} x {} at resolution {} has too many nodes",
                    width, height, resolution
                )
            }
            FieldError::InvalidTolerance(tol) => {
                write!(
                    f,
                    "invalid tolerance: {} (must be positive and finite)",
                    tol
                )
            }
            FieldError::InvalidCost { index, value } => {
                write!(
                    f,
                    "invalid time cost at index {}: {} (must be positive and finite)",
                    index, value
                )
            }
            FieldError::InvalidSpeed { index, value } => {
                write!(
                    f,
                    "invalid speed at index {}: {} (must be positive and finite)",
                    index, value
                )
            }
            FieldError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            FieldError::UnsupportedDtype(dtype) => {
                write!(f, "unsupported dtype: {}", dtype)
            }
            FieldError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            FieldError::MatVariableNotFound {
                expected,
                available,
            } => {
                write!(
                    f,
                    "MAT variable '{}' not found; available variables: {:?}",
                    expected, available
                )
            }
            FieldError::MaxIterationsExceeded { limit } => {
                write!(f, "max iterations exceeded: limit was {}", limit)
            }
            FieldError::IoError(e) => write!(f, "I/O error: {}", e),
            FieldError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FieldError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FieldError {
    fn from(e: std::io::Error) -> Self {
        FieldError::IoError(e)
    }
}

/// Convenience type alias for Results with FieldError.
pub type Result<T> = std::result::Result<T, FieldError>;
