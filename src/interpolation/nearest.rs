//! Nearest neighbor interpolation.
//!
//! This method selects the value of the nearest grid point. A query exactly
//! halfway between two points snaps to the higher index.

use super::Interpolator;
use crate::error::Result;
use crate::grid::GridModel;
use crate::interpolation::common;

/// Nearest neighbor interpolator
pub struct NearestInterpolator;

impl Interpolator for NearestInterpolator {
    fn interpolate(&self, model: &GridModel, layer: &str, lon: f64, lat: f64) -> Result<f64> {
        nearest(model, layer, lon, lat)
    }

    fn name(&self) -> &str {
        "nearest"
    }
}

/// Value of the grid point closest to `(lon, lat)`, axis by axis
pub fn nearest(model: &GridModel, layer: &str, lon: f64, lat: f64) -> Result<f64> {
    let view = model.layer(layer)?;
    let cell = common::locate(&view, model.lon_convention(), lon, lat)?;

    let row = snap(view.lat_axis, cell.i, cell.lat);
    let col = snap(view.lon_axis, cell.j, cell.lon);

    Ok(view.values[[row, col]])
}

/// Batched [`nearest`] over paired coordinates
pub fn nearest_many(model: &GridModel, layer: &str, lons: &[f64], lats: &[f64]) -> Result<Vec<f64>> {
    common::check_paired(lons, lats)?;
    lons.iter()
        .zip(lats)
        .map(|(&lon, &lat)| nearest(model, layer, lon, lat))
        .collect()
}

fn snap(axis: &[f64], i: usize, value: f64) -> usize {
    if axis[i + 1] - value <= value - axis[i] {
        i + 1
    } else {
        i
    }
}
