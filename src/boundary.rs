//! Boundary curve lookup.
//!
//! A [`BoundaryCurve`] is a polyline of `(lon, lat)` vertices that splits the
//! surface in two, such as the crustal dichotomy between the southern
//! highlands and the northern lowlands. Vertices are stored in signed
//! longitude, sorted, with one wrapped vertex at each end so that every signed
//! longitude falls between two vertices.

use serde::Serialize;

use crate::coords::{self, CoordRange, FULL_CYCLE};
use crate::error::{RedPlanetError, Result};
use crate::interpolation::common;

/// Sorted, wrapped polyline in signed longitude
#[derive(Debug, Clone, Serialize)]
pub struct BoundaryCurve {
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl BoundaryCurve {
    /// Build a curve from vertices in either longitude convention
    pub fn new(vertices: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let mut points: Vec<(f64, f64)> = vertices
            .into_iter()
            .map(|(lon, lat)| (coords::to_signed(lon), lat))
            .collect();

        if points.len() < 2 {
            return Err(RedPlanetError::DataShape {
                message: format!("Boundary curve needs at least 2 vertices, got {}", points.len()),
            });
        }

        if let Some(&(lon, lat)) = points
            .iter()
            .find(|&&(lon, lat)| !lon.is_finite() || !CoordRange::LAT.contains(lat))
        {
            return Err(RedPlanetError::DataShape {
                message: format!("Boundary curve vertex ({}, {}) is not a valid coordinate", lon, lat),
            });
        }

        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        if let Some(pair) = points.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(RedPlanetError::DataShape {
                message: format!("Boundary curve has duplicate longitude {}", pair[0].0),
            });
        }

        let first = points[0];
        let last = points[points.len() - 1];

        let mut lons = Vec::with_capacity(points.len() + 2);
        let mut lats = Vec::with_capacity(points.len() + 2);
        lons.push(last.0 - FULL_CYCLE);
        lats.push(last.1);
        for (lon, lat) in points {
            lons.push(lon);
            lats.push(lat);
        }
        lons.push(first.0 + FULL_CYCLE);
        lats.push(first.1);

        Ok(Self { lons, lats })
    }

    /// Latitude of the curve at `lon`, by linear interpolation between vertices
    pub fn latitude_at(&self, lon: f64) -> Result<f64> {
        let lon = coords::to_signed(lon);
        let i = common::bracket(&self.lons, lon)?;
        let (w0, w1) = common::linear_weight(common::cell_fraction(&self.lons, i, lon));
        Ok(w0 * self.lats[i] + w1 * self.lats[i + 1])
    }

    /// Whether `(lon, lat)` lies on or above the curve
    pub fn is_above(&self, lon: f64, lat: f64) -> Result<bool> {
        Ok(lat >= self.latitude_at(lon)?)
    }

    /// Padded vertex longitudes
    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// Padded vertex latitudes
    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Number of vertices as supplied, without the wrapped copies
    pub fn len(&self) -> usize {
        self.lons.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
