//! Common utilities for interpolation algorithms.
//!
//! Every lookup in the crate (grid rows, grid columns, boundary-curve
//! vertices) goes through [`bracket`], so an exact hit on an axis point is
//! always treated as the left bound of its interval.

use tracing::error;

use crate::coords::LonConvention;
use crate::error::{RedPlanetError, Result};
use crate::grid::LayerView;

/// Indices of the lower-left corner of the cell enclosing a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Row (latitude) index
    pub i: usize,
    /// Column (longitude) index
    pub j: usize,
    /// Query longitude in the grid's convention
    pub lon: f64,
    pub lat: f64,
}

/// Find `i` such that `axis[i] <= value < axis[i + 1]`
///
/// `axis` must be sorted ascending. Values below the first point, at or
/// beyond the last point, or NaN have no enclosing interval.
pub fn bracket(axis: &[f64], value: f64) -> Result<usize> {
    let insert_at = axis.partition_point(|&a| a <= value);

    if insert_at == 0 || insert_at >= axis.len() {
        let err = RedPlanetError::OutOfBounds {
            message: format!(
                "value {} has no enclosing interval in axis [{}, {}]",
                value,
                axis.first().copied().unwrap_or(f64::NAN),
                axis.last().copied().unwrap_or(f64::NAN)
            ),
        };
        error!(error = %err, "Axis lookup fell outside the padded range");
        return Err(err);
    }

    Ok(insert_at - 1)
}

/// Locate the cell enclosing `(lon, lat)` in a layer
pub fn locate(
    layer: &LayerView<'_>,
    convention: LonConvention,
    lon: f64,
    lat: f64,
) -> Result<Cell> {
    let lon = convention.normalize(lon);
    let j = bracket(layer.lon_axis, lon)?;
    let i = bracket(layer.lat_axis, lat)?;
    Ok(Cell { i, j, lon, lat })
}

/// Batched lookups take equal-length coordinate slices
pub fn check_paired(lons: &[f64], lats: &[f64]) -> Result<()> {
    if lons.len() != lats.len() {
        return Err(RedPlanetError::InvalidParameter {
            param: "lons/lats".to_string(),
            message: format!(
                "Coordinate arrays differ in length: {} longitudes, {} latitudes",
                lons.len(),
                lats.len()
            ),
        });
    }
    Ok(())
}

/// Position of `value` inside `[axis[i], axis[i + 1]]` as a fraction in `[0, 1)`
pub fn cell_fraction(axis: &[f64], i: usize, value: f64) -> f64 {
    (value - axis[i]) / (axis[i + 1] - axis[i])
}

/// Get the weight for linear interpolation
pub fn linear_weight(fraction: f64) -> (f64, f64) {
    (1.0 - fraction, fraction)
}
