//! Bilinear interpolation.
//!
//! This method performs linear interpolation in two dimensions using
//! the four grid points surrounding the query.

use super::Interpolator;
use crate::error::Result;
use crate::grid::GridModel;
use crate::interpolation::common;

/// Bilinear interpolator
pub struct BilinearInterpolator;

impl Interpolator for BilinearInterpolator {
    fn interpolate(&self, model: &GridModel, layer: &str, lon: f64, lat: f64) -> Result<f64> {
        interpolate(model, layer, lon, lat)
    }

    fn name(&self) -> &str {
        "linear"
    }
}

/// Area-weighted value of `layer` at `(lon, lat)`
///
/// Weights are normalized cell fractions, so a query sitting exactly on a grid
/// point returns the stored value bit-for-bit. If any corner that carries
/// weight holds the sentinel, the result is the sentinel.
pub fn interpolate(model: &GridModel, layer: &str, lon: f64, lat: f64) -> Result<f64> {
    let view = model.layer(layer)?;
    let cell = common::locate(&view, model.lon_convention(), lon, lat)?;
    let (i, j) = (cell.i, cell.j);

    let (w_left, w_right) =
        common::linear_weight(common::cell_fraction(view.lon_axis, j, cell.lon));
    let (w_low, w_high) = common::linear_weight(common::cell_fraction(view.lat_axis, i, cell.lat));

    let corners = [
        (w_left * w_low, view.values[[i, j]]),
        (w_right * w_low, view.values[[i, j + 1]]),
        (w_left * w_high, view.values[[i + 1, j]]),
        (w_right * w_high, view.values[[i + 1, j + 1]]),
    ];

    if corners
        .iter()
        .any(|&(weight, value)| weight != 0.0 && model.is_sentinel(value))
    {
        return Ok(model.nan_sentinel());
    }

    Ok(corners.iter().map(|&(weight, value)| weight * value).sum())
}

/// Batched [`interpolate`] over paired coordinates
pub fn interpolate_many(
    model: &GridModel,
    layer: &str,
    lons: &[f64],
    lats: &[f64],
) -> Result<Vec<f64>> {
    common::check_paired(lons, lats)?;
    lons.iter()
        .zip(lats)
        .map(|(&lon, &lat)| interpolate(model, layer, lon, lat))
        .collect()
}
