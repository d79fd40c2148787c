// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Reading cost maps and writing potential fields.
//!
//! Arrays are 2D with shape `[rows, cols]`, so `array[[y, x]]` is the cell at
//! column `x`, row `y`. `.npy` files may be f64 or f32 in either memory
//! order; `.mat` files are MAT-File Level 5 and may store the array as
//! `rows x cols` or transposed.

use std::io::Write;
use std::path::Path;

use ndarray::{Array2, ShapeBuilder};
use tracing::debug;

use crate::core::CellGrid;
use crate::error::{FieldError, Result};
use crate::time_cost::GriddedTimeCost;

/// MAT variable written by [`save_field`].
pub const POTENTIAL_VAR: &str = "potential";
/// MAT variable read by [`load_cost_map`].
pub const COST_VAR: &str = "cost";
/// MAT variable read by [`load_speed_map_as_cost`].
pub const SPEED_VAR: &str = "speed";

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
    Mat,
}

/// Infer file format from extension.
///
/// # Errors
/// Returns `UnsupportedFileFormat` for anything but `.npy` and `.mat`.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(FieldError::UnsupportedFileFormat(ext.to_string())),
        None => Err(FieldError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

fn potential_array(grid: &CellGrid) -> Result<Array2<f64>> {
    Array2::from_shape_vec((grid.rows(), grid.cols()), grid.potentials())
        .map_err(|e| FieldError::Other(format!("shape error: {}", e)))
}

/// Load a `[rows, cols]` array from a .npy file as row-major values.
///
/// # Errors
/// Returns `UnsupportedDtype` if the file holds neither f64 nor f32 data and
/// `ShapeMismatch` if its shape differs from `expected_shape`.
pub fn load_npy_field(path: &Path, expected_shape: [usize; 2]) -> Result<Vec<f64>> {
    let arr: Array2<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: Array2<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| FieldError::UnsupportedDtype(format!("{}", e)))?;
            arr32.mapv(f64::from)
        }
    };

    if arr.shape() != expected_shape {
        return Err(FieldError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: arr.shape().to_vec(),
        });
    }

    // Logical iteration order is row-major whatever the file's memory order.
    Ok(arr.iter().copied().collect())
}

/// Save the grid's potentials to a .npy file with shape `[rows, cols]`.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_npy(grid: &CellGrid, path: &Path) -> Result<()> {
    let arr = potential_array(grid)?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| FieldError::Other(format!("npy write error: {}", e)))
}

/// Load a `[rows, cols]` array stored under `variable_name` in a .mat file.
///
/// # Errors
/// Returns `MatVariableNotFound` if the variable is missing, `UnsupportedDtype`
/// for non-float data, and `ShapeMismatch` unless the stored shape equals
/// `expected_shape` or its transpose.
pub fn load_mat_field(
    path: &Path,
    variable_name: &str,
    expected_shape: [usize; 2],
) -> Result<Vec<f64>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| FieldError::Other(format!("MAT parse error: {}", e)))?;

    let array = mat.find_by_name(variable_name).ok_or_else(|| {
        FieldError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available: mat.arrays().iter().map(|a| a.name().to_string()).collect(),
        }
    })?;

    let data: Vec<f64> = match array.data() {
        matfile::NumericData::Double { real, imag: _ } => real.clone(),
        matfile::NumericData::Single { real, imag: _ } => {
            real.iter().map(|&v| f64::from(v)).collect()
        }
        _ => {
            return Err(FieldError::UnsupportedDtype(
                "MAT file array is not f64 or f32".to_string(),
            ))
        }
    };

    let [rows, cols] = expected_shape;
    let mat_shape = array.size().to_vec();
    let transposed = if mat_shape == [rows, cols] {
        false
    } else if mat_shape == [cols, rows] {
        true
    } else {
        return Err(FieldError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: mat_shape,
        });
    };

    // MAT data is column-major in the stored shape.
    let stored = Array2::from_shape_vec((mat_shape[0], mat_shape[1]).f(), data)
        .map_err(|e| FieldError::Other(format!("shape error: {}", e)))?;
    let values = if transposed {
        stored.t().iter().copied().collect()
    } else {
        stored.iter().copied().collect()
    };
    Ok(values)
}

/// Save the grid's potentials to a .mat file as a `rows x cols` double array.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_mat(grid: &CellGrid, path: &Path, var_name: &str) -> Result<()> {
    let arr = potential_array(grid)?;
    // Column-major: walk the transpose in logical order.
    let col_major: Vec<f64> = arr.t().iter().copied().collect();
    write_mat_level5(path, var_name, [grid.rows(), grid.cols()], &col_major)
}

/// Write one real double matrix as an uncompressed MAT-File Level 5.
///
/// `matfile` only reads, so the writer is done by hand: a 128-byte header
/// and one `miMATRIX` element holding flags, dimensions, name and data
/// sub-elements, each padded to 8 bytes.
fn write_mat_level5(path: &Path, var_name: &str, dims: [usize; 2], data: &[f64]) -> Result<()> {
    const MI_INT8: u32 = 1;
    const MI_INT32: u32 = 5;
    const MI_UINT32: u32 = 6;
    const MI_DOUBLE: u32 = 9;
    const MI_MATRIX: u32 = 14;
    const MX_DOUBLE_CLASS: u32 = 6;

    let padded = |n: u32| n.div_ceil(8) * 8;
    let too_large = || FieldError::Other("array too large for MAT Level 5".to_string());

    let dims_size: u32 = 8;
    let name_size = u32::try_from(var_name.len()).map_err(|_| too_large())?;
    let data_size = u32::try_from(data.len() * 8).map_err(|_| too_large())?;
    let matrix_size = 16 + (8 + padded(dims_size)) + (8 + padded(name_size)) + (8 + padded(data_size));

    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    let mut header = [b' '; 116];
    let desc = b"MATLAB 5.0 MAT-file, created by floor-field";
    header[..desc.len()].copy_from_slice(desc);
    w.write_all(&header)?;
    w.write_all(&[0u8; 8])?; // subsystem offset
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?; // little-endian

    let tag = |w: &mut std::io::BufWriter<std::fs::File>, ty: u32, size: u32| -> Result<()> {
        w.write_all(&ty.to_le_bytes())?;
        w.write_all(&size.to_le_bytes())?;
        Ok(())
    };
    let pad = |w: &mut std::io::BufWriter<std::fs::File>, size: u32| -> Result<()> {
        let n = (padded(size) - size) as usize;
        if n > 0 {
            w.write_all(&vec![0u8; n])?;
        }
        Ok(())
    };

    tag(&mut w, MI_MATRIX, matrix_size)?;

    tag(&mut w, MI_UINT32, 8)?;
    w.write_all(&MX_DOUBLE_CLASS.to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?;

    tag(&mut w, MI_INT32, dims_size)?;
    for d in dims {
        let d = i32::try_from(d).map_err(|_| too_large())?;
        w.write_all(&d.to_le_bytes())?;
    }
    pad(&mut w, dims_size)?;

    tag(&mut w, MI_INT8, name_size)?;
    w.write_all(var_name.as_bytes())?;
    pad(&mut w, name_size)?;

    tag(&mut w, MI_DOUBLE, data_size)?;
    for &v in data {
        w.write_all(&v.to_le_bytes())?;
    }
    pad(&mut w, data_size)?;

    w.flush()?;
    Ok(())
}

/// Save the grid's potentials, choosing the format from the extension.
/// Unreached cells are written as +inf.
///
/// # Errors
/// Returns an error for unknown extensions or write failures.
pub fn save_field(grid: &CellGrid, path: &Path) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy(grid, path)?,
        FileFormat::Mat => save_mat(grid, path, POTENTIAL_VAR)?,
    }
    debug!(
        "wrote {}x{} potential field to {}",
        grid.rows(),
        grid.cols(),
        path.display()
    );
    Ok(())
}

fn load_grid_shaped(path: &Path, var_name: &str, grid: &CellGrid) -> Result<Vec<f64>> {
    let shape = [grid.rows(), grid.cols()];
    match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, shape),
        FileFormat::Mat => load_mat_field(path, var_name, shape),
    }
}

/// Convert speeds to time costs (element-wise `1 / speed`).
///
/// # Errors
/// Returns `InvalidSpeed` for the first value that is not positive and finite.
pub fn speed_to_cost(speed: &[f64]) -> Result<Vec<f64>> {
    speed
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if value.is_finite() && value > 0.0 {
                Ok(1.0 / value)
            } else {
                Err(FieldError::InvalidSpeed { index, value })
            }
        })
        .collect()
}

/// Load a per-node time cost map for `grid` (.mat variable `cost`).
///
/// # Errors
/// Returns an error if the file cannot be read, its shape is not
/// `[rows, cols]`, or a value is not positive and finite.
pub fn load_cost_map(path: &Path, grid: &CellGrid) -> Result<GriddedTimeCost> {
    let values = load_grid_shaped(path, COST_VAR, grid)?;
    GriddedTimeCost::for_grid(grid, values)
}

/// Load a per-node speed map for `grid` (.mat variable `speed`) and convert it
/// to time costs.
///
/// # Errors
/// As [`load_cost_map`], with `InvalidSpeed` for bad speeds.
pub fn load_speed_map_as_cost(path: &Path, grid: &CellGrid) -> Result<GriddedTimeCost> {
    let speed = load_grid_shaped(path, SPEED_VAR, grid)?;
    GriddedTimeCost::for_grid(grid, speed_to_cost(&speed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GridPoint;
    use crate::time_cost::TimeCostFunction;
    use std::path::PathBuf;

    /// 4 cols x 3 rows with potential `10 * y + x`.
    fn make_test_grid() -> CellGrid {
        let mut grid = CellGrid::new(3.0, 2.0, 1.0).unwrap();
        for p in grid.points().collect::<Vec<_>>() {
            grid.cell_mut(p).potential = (10 * p.y + p.x) as f64;
        }
        grid
    }

    fn tmp(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("floor_field_{}_{}", std::process::id(), name))
    }

    #[test]
    fn npy_roundtrip() {
        let grid = make_test_grid();
        let path = tmp("roundtrip.npy");
        save_field(&grid, &path).unwrap();

        let loaded = load_npy_field(&path, [3, 4]).unwrap();
        assert_eq!(loaded, grid.potentials());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn npy_shape_mismatch() {
        let grid = make_test_grid();
        let path = tmp("shape_mismatch.npy");
        save_npy(&grid, &path).unwrap();

        let result = load_npy_field(&path, [4, 3]);
        assert!(matches!(result, Err(FieldError::ShapeMismatch { .. })));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn mat_written_column_major() {
        let grid = make_test_grid();
        let path = tmp("layout.mat");
        save_mat(&grid, &path, POTENTIAL_VAR).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut reader = std::io::BufReader::new(file);
        let mat = matfile::MatFile::parse(&mut reader).unwrap();
        let arr = mat.find_by_name(POTENTIAL_VAR).unwrap();
        assert_eq!(arr.size().to_vec(), vec![3, 4]);
        match arr.data() {
            matfile::NumericData::Double { real, imag: _ } => {
                // First column is x = 0 for y = 0, 1, 2.
                assert_eq!(&real[..4], &[0.0, 10.0, 20.0, 1.0]);
            }
            _ => panic!("expected double data"),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn mat_roundtrip_preserves_cells() {
        let grid = make_test_grid();
        let path = tmp("roundtrip.mat");
        save_field(&grid, &path).unwrap();

        let loaded = load_mat_field(&path, POTENTIAL_VAR, [3, 4]).unwrap();
        assert_eq!(loaded, grid.potentials());
        assert_eq!(loaded[grid.index_of(GridPoint::new(3, 1))], 13.0);

        // Transposed request is accepted and re-laid out.
        let transposed = load_mat_field(&path, POTENTIAL_VAR, [4, 3]).unwrap();
        assert_eq!(transposed[1], 10.0);

        assert!(matches!(
            load_mat_field(&path, "missing", [3, 4]),
            Err(FieldError::MatVariableNotFound { .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn cost_and_speed_maps() {
        let grid = CellGrid::new(1.0, 1.0, 1.0).unwrap();
        let speed = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 4.0, 0.5]).unwrap();
        let path = tmp("speed.npy");
        ndarray_npy::write_npy(&path, &speed).unwrap();

        let cost = load_speed_map_as_cost(&path, &grid).unwrap();
        assert_eq!(cost.values(), &[1.0, 0.5, 0.25, 2.0]);
        assert_eq!(cost.cost_at([1.0, 0.0]), 0.5);

        let as_cost = load_cost_map(&path, &grid).unwrap();
        assert_eq!(as_cost.cost_at([0.0, 1.0]), 4.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn speed_to_cost_rejects_non_positive() {
        assert!(matches!(
            speed_to_cost(&[1.0, 0.0, 2.0]),
            Err(FieldError::InvalidSpeed { index: 1, .. })
        ));
        assert!(matches!(
            speed_to_cost(&[1.0, 2.0, f64::NAN]),
            Err(FieldError::InvalidSpeed { index: 2, .. })
        ));
    }

    #[test]
    fn unsupported_format() {
        assert!(matches!(
            infer_format(Path::new("field.xyz")),
            Err(FieldError::UnsupportedFileFormat(_))
        ));
        assert!(matches!(
            infer_format(Path::new("field")),
            Err(FieldError::UnsupportedFileFormat(_))
        ));
        assert_eq!(infer_format(Path::new("a/b.mat")).unwrap(), FileFormat::Mat);
    }
}
