//! Public query entry points.
//!
//! A query names a dataset, a quantity in that dataset's vocabulary, and one
//! or more coordinates. The quantity is parsed once, every coordinate is
//! validated against the dataset's declared ranges, and only then is anything
//! evaluated, so a batch either fails as a whole or returns one value per
//! input pair in input order.

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::coords::{validate_coord, validate_coords};
use crate::datasets::heat::HeatParams;
use crate::datasets::{Dataset, DatasetHandle};
use crate::error::{RedPlanetError, Result};
use crate::interpolation::InterpolationMethod;
use crate::state::DatasetRegistry;

/// Per-query knobs shared by every dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub method: InterpolationMethod,
    /// Volatile-free GRS concentrations
    pub normalize: bool,
    pub heat: HeatParams,
}

impl QueryOptions {
    pub fn with_method(method: InterpolationMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }
}

fn point_in<D: Dataset>(
    dataset: &D,
    quantity: &str,
    lon: f64,
    lat: f64,
    options: &QueryOptions,
) -> Result<f64> {
    let quantity: D::Quantity = quantity.parse()?;
    validate_coord(lon, lat, dataset.lon_range(), dataset.lat_range())?;
    dataset.evaluate(quantity, lon, lat, options)
}

fn many_in<D: Dataset>(
    dataset: &D,
    quantity: &str,
    lons: &[f64],
    lats: &[f64],
    options: &QueryOptions,
) -> Result<Vec<f64>> {
    let quantity: D::Quantity = quantity.parse()?;
    validate_coords(lons, lats, dataset.lon_range(), dataset.lat_range())?;
    lons.par_iter()
        .zip(lats.par_iter())
        .map(|(&lon, &lat)| dataset.evaluate(quantity, lon, lat, options))
        .collect()
}

/// Value of `quantity` from dataset `handle` at one coordinate
pub fn get(
    registry: &DatasetRegistry,
    handle: DatasetHandle,
    quantity: &str,
    lon: f64,
    lat: f64,
    options: &QueryOptions,
) -> Result<f64> {
    match handle {
        DatasetHandle::Grs => point_in(&*registry.grs()?, quantity, lon, lat, options),
        DatasetHandle::Crust => point_in(&*registry.crust()?, quantity, lon, lat, options),
        DatasetHandle::Mag => point_in(&*registry.mag()?, quantity, lon, lat, options),
        DatasetHandle::Heat => point_in(&registry.heat()?, quantity, lon, lat, options),
    }
}

/// Values of `quantity` at paired coordinates, in input order
pub fn get_region(
    registry: &DatasetRegistry,
    handle: DatasetHandle,
    quantity: &str,
    lons: &[f64],
    lats: &[f64],
    options: &QueryOptions,
) -> Result<Vec<f64>> {
    let start = Instant::now();
    let values = match handle {
        DatasetHandle::Grs => many_in(&*registry.grs()?, quantity, lons, lats, options),
        DatasetHandle::Crust => many_in(&*registry.crust()?, quantity, lons, lats, options),
        DatasetHandle::Mag => many_in(&*registry.mag()?, quantity, lons, lats, options),
        DatasetHandle::Heat => many_in(&registry.heat()?, quantity, lons, lats, options),
    }?;

    debug!(
        dataset = %handle,
        quantity = %quantity,
        points = values.len(),
        duration_us = start.elapsed().as_micros() as u64,
        "Evaluated batched query"
    );
    Ok(values)
}

/// How the axes of a region grid are chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegionSpec {
    /// Explicit axis values
    Points { lons: Vec<f64>, lats: Vec<f64> },
    /// Evenly spaced from the lower bound, upper bound included when it lands
    /// on the spacing
    Spacing {
        lon_bounds: (f64, f64),
        lat_bounds: (f64, f64),
        spacing: f64,
    },
    /// Fixed number of evenly spaced values, both bounds included
    Count {
        lon_bounds: (f64, f64),
        lat_bounds: (f64, f64),
        lon_count: usize,
        lat_count: usize,
    },
}

impl RegionSpec {
    /// Number of longitudes and latitudes, without building the axes
    pub fn counts(&self) -> Result<(usize, usize)> {
        let (lon_count, lat_count) = match self {
            RegionSpec::Points { lons, lats } => (lons.len(), lats.len()),
            RegionSpec::Spacing {
                lon_bounds,
                lat_bounds,
                spacing,
            } => (
                spacing_count("lon_bounds", *lon_bounds, *spacing)?,
                spacing_count("lat_bounds", *lat_bounds, *spacing)?,
            ),
            RegionSpec::Count {
                lon_bounds,
                lat_bounds,
                lon_count,
                lat_count,
            } => {
                check_bounds("lon_bounds", *lon_bounds)?;
                check_bounds("lat_bounds", *lat_bounds)?;
                (*lon_count, *lat_count)
            }
        };

        if lon_count == 0 || lat_count == 0 {
            return Err(RedPlanetError::InvalidParameter {
                param: "region".to_string(),
                message: "Region needs at least one longitude and one latitude".to_string(),
            });
        }
        Ok((lon_count, lat_count))
    }

    /// Longitude and latitude axes of the region
    ///
    /// Allocates one value per axis point; check [`RegionSpec::counts`]
    /// against a limit first when the region comes from a caller.
    pub fn axes(&self) -> Result<(Vec<f64>, Vec<f64>)> {
        let (lon_count, lat_count) = self.counts()?;
        match self {
            RegionSpec::Points { lons, lats } => Ok((lons.clone(), lats.clone())),
            RegionSpec::Spacing {
                lon_bounds,
                lat_bounds,
                spacing,
            } => Ok((
                arange(lon_bounds.0, *spacing, lon_count),
                arange(lat_bounds.0, *spacing, lat_count),
            )),
            RegionSpec::Count {
                lon_bounds,
                lat_bounds,
                ..
            } => Ok((
                linspace(*lon_bounds, lon_count),
                linspace(*lat_bounds, lat_count),
            )),
        }
    }
}

fn check_bounds(param: &str, (lo, hi): (f64, f64)) -> Result<()> {
    if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
        return Err(RedPlanetError::InvalidParameter {
            param: param.to_string(),
            message: format!("Bounds must be finite with min <= max, got ({}, {})", lo, hi),
        });
    }
    Ok(())
}

/// Points from `lo` to `hi` in steps of `spacing`, upper bound included when it lands
fn spacing_count(param: &str, bounds: (f64, f64), spacing: f64) -> Result<usize> {
    check_bounds(param, bounds)?;
    if !(spacing.is_finite() && spacing > 0.0) {
        return Err(RedPlanetError::InvalidParameter {
            param: "spacing".to_string(),
            message: format!("Spacing must be positive, got {}", spacing),
        });
    }

    let (lo, hi) = bounds;
    // Slack so that an upper bound on the spacing is not lost to rounding
    let steps = ((hi - lo) / spacing + 1e-9).floor();
    if !steps.is_finite() || steps >= usize::MAX as f64 {
        return Err(RedPlanetError::PayloadTooLarge {
            message: format!(
                "Spacing {} over ({}, {}) gives more points than can be addressed",
                spacing, lo, hi
            ),
        });
    }
    Ok(steps as usize + 1)
}

fn arange(lo: f64, spacing: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| lo + i as f64 * spacing).collect()
}

fn linspace((lo, hi): (f64, f64), count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (count - 1) as f64;
    (0..count)
        .map(|i| if i == count - 1 { hi } else { lo + i as f64 * step })
        .collect()
}

/// Values over a longitude/latitude mesh; rows follow latitude
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGrid {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    pub values: Array2<f64>,
}

impl RegionGrid {
    /// Nested rows, one per latitude
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values.rows().into_iter().map(|row| row.to_vec()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Evaluate `quantity` over the mesh described by `spec`
///
/// Fails with `PayloadTooLarge` when the mesh holds more than `max_points`.
pub fn region_grid(
    registry: &DatasetRegistry,
    handle: DatasetHandle,
    quantity: &str,
    spec: &RegionSpec,
    options: &QueryOptions,
    max_points: Option<usize>,
) -> Result<RegionGrid> {
    let (lon_count, lat_count) = spec.counts()?;
    let too_large = |limit: String| RedPlanetError::PayloadTooLarge {
        message: format!(
            "Region of {} x {} points exceeds {}",
            lon_count, lat_count, limit
        ),
    };

    let total = lon_count
        .checked_mul(lat_count)
        .ok_or_else(|| too_large("the addressable size".to_string()))?;
    if let Some(max) = max_points {
        if total > max {
            return Err(too_large(format!("the limit of {}", max)));
        }
    }

    let (lons, lats) = spec.axes()?;
    let shape = (lats.len(), lons.len());

    let mut mesh_lons = Vec::with_capacity(total);
    let mut mesh_lats = Vec::with_capacity(total);
    for &lat in &lats {
        for &lon in &lons {
            mesh_lons.push(lon);
            mesh_lats.push(lat);
        }
    }

    let values = get_region(registry, handle, quantity, &mesh_lons, &mesh_lats, options)?;
    let values = Array2::from_shape_vec(shape, values).map_err(|e| RedPlanetError::Server {
        message: format!("Region values do not fit a {:?} grid: {}", shape, e),
    })?;

    Ok(RegionGrid { lons, lats, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spacing(lon_bounds: (f64, f64), lat_bounds: (f64, f64), spacing: f64) -> RegionSpec {
        RegionSpec::Spacing {
            lon_bounds,
            lat_bounds,
            spacing,
        }
    }

    #[test]
    fn test_spacing_includes_upper_bound() {
        let (lons, lats) = spacing((-180.0, 180.0), (0.0, 1.0), 0.1).axes().unwrap();
        assert_eq!(lons.len(), 3601);
        assert_eq!(lons[0], -180.0);
        assert!((lons[3600] - 180.0).abs() < 1e-9);
        assert_eq!(lats.len(), 11);

        let (lons, _) = spacing((0.0, 1.0), (0.0, 0.0), 0.3).axes().unwrap();
        assert_eq!(lons.len(), 4);
    }

    #[test]
    fn test_spacing_rejects_bad_input() {
        assert!(spacing((0.0, 1.0), (0.0, 1.0), 0.0).counts().is_err());
        assert!(spacing((0.0, 1.0), (0.0, 1.0), -1.0).counts().is_err());
        assert!(spacing((1.0, 0.0), (0.0, 1.0), 0.5).counts().is_err());
    }

    #[test]
    fn test_spacing_count_saturates_to_error() {
        let result = spacing((0.0, 1e300), (0.0, 0.0), 1e-300).counts();
        assert!(matches!(result, Err(RedPlanetError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_linspace_axes() {
        let count = |lon_count| RegionSpec::Count {
            lon_bounds: (0.0, 10.0),
            lat_bounds: (2.0, 10.0),
            lon_count,
            lat_count: 1,
        };
        assert_eq!(count(3).axes().unwrap(), (vec![0.0, 5.0, 10.0], vec![2.0]));
        assert!(count(0).axes().is_err());
    }

    #[test]
    fn test_oversized_region_rejected_before_allocation() {
        let registry = DatasetRegistry::default();
        let options = QueryOptions::default();
        let huge_count = RegionSpec::Count {
            lon_bounds: (0.0, 10.0),
            lat_bounds: (0.0, 0.0),
            lon_count: 1 << 40,
            lat_count: 1,
        };
        let tiny_spacing = spacing((0.0, 10.0), (0.0, 0.0), 1e-12);
        let overflowing = RegionSpec::Count {
            lon_bounds: (0.0, 10.0),
            lat_bounds: (0.0, 10.0),
            lon_count: usize::MAX,
            lat_count: 2,
        };

        for spec in [huge_count, tiny_spacing, overflowing] {
            let result = region_grid(
                &registry,
                DatasetHandle::Crust,
                "topo",
                &spec,
                &options,
                Some(10),
            );
            assert!(
                matches!(result, Err(RedPlanetError::PayloadTooLarge { .. })),
                "{:?} should be too large",
                spec
            );
        }
    }

    #[test]
    fn test_region_spec_axes() {
        let spec = RegionSpec::Count {
            lon_bounds: (-10.0, 10.0),
            lat_bounds: (0.0, 5.0),
            lon_count: 5,
            lat_count: 2,
        };
        let (lons, lats) = spec.axes().unwrap();
        assert_eq!(lons, vec![-10.0, -5.0, 0.0, 5.0, 10.0]);
        assert_eq!(lats, vec![0.0, 5.0]);

        let spec = RegionSpec::Points {
            lons: vec![],
            lats: vec![1.0],
        };
        assert!(spec.axes().is_err());
    }

    #[test]
    fn test_region_spec_deserializes_tagged() {
        let spec: RegionSpec = serde_json::from_str(
            r#"{"kind": "spacing", "lon_bounds": [0, 10], "lat_bounds": [-5, 5], "spacing": 5}"#,
        )
        .unwrap();
        let (lons, lats) = spec.axes().unwrap();
        assert_eq!(lons, vec![0.0, 5.0, 10.0]);
        assert_eq!(lats, vec![-5.0, 0.0, 5.0]);
    }

    #[test]
    fn test_query_options_defaults() {
        let options: QueryOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.method, InterpolationMethod::Linear);
        assert!(!options.normalize);
        assert!(options.heat.normalize);
        assert_eq!(options.heat.k_cr, 2.5);

        let options: QueryOptions = serde_json::from_str(r#"{"method": "nearest"}"#).unwrap();
        assert_eq!(options, QueryOptions::with_method(InterpolationMethod::Nearest));
    }
}
