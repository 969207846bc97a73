//! Interpolation algorithms for gridded data.
//!
//! This module provides the methods used to read a layer of a
//! [`GridModel`](crate::grid::GridModel) at arbitrary coordinates.

pub mod bilinear;
pub mod common;
pub mod nearest;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RedPlanetError, Result};
use crate::grid::GridModel;

/// Trait for interpolation methods
pub trait Interpolator: Send + Sync {
    /// Interpolate `layer` at a single coordinate
    fn interpolate(&self, model: &GridModel, layer: &str, lon: f64, lat: f64) -> Result<f64>;

    /// Get the name of this interpolation method
    fn name(&self) -> &str;

    /// Interpolate `layer` at paired coordinates
    fn interpolate_many(
        &self,
        model: &GridModel,
        layer: &str,
        lons: &[f64],
        lats: &[f64],
    ) -> Result<Vec<f64>> {
        common::check_paired(lons, lats)?;
        lons.iter()
            .zip(lats)
            .map(|(&lon, &lat)| self.interpolate(model, layer, lon, lat))
            .collect()
    }
}

/// Supported interpolation methods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    Nearest,
    #[default]
    #[serde(alias = "bilinear")]
    Linear,
}

impl InterpolationMethod {
    pub fn interpolator(&self) -> &'static dyn Interpolator {
        match self {
            InterpolationMethod::Nearest => &nearest::NearestInterpolator,
            InterpolationMethod::Linear => &bilinear::BilinearInterpolator,
        }
    }

    /// Interpolate one point with this method
    pub fn interpolate(&self, model: &GridModel, layer: &str, lon: f64, lat: f64) -> Result<f64> {
        match self {
            InterpolationMethod::Nearest => nearest::nearest(model, layer, lon, lat),
            InterpolationMethod::Linear => bilinear::interpolate(model, layer, lon, lat),
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.interpolator().name())
    }
}

impl FromStr for InterpolationMethod {
    type Err = RedPlanetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(InterpolationMethod::Nearest),
            "linear" | "bilinear" => Ok(InterpolationMethod::Linear),
            _ => Err(RedPlanetError::InvalidParameter {
                param: "interpolation".to_string(),
                message: format!("Unknown interpolation method: {}", s),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_method_parsing() {
        assert_eq!(
            "nearest".parse::<InterpolationMethod>().unwrap(),
            InterpolationMethod::Nearest
        );
        assert_eq!(
            "Bilinear".parse::<InterpolationMethod>().unwrap(),
            InterpolationMethod::Linear
        );
        assert!("bicubic".parse::<InterpolationMethod>().is_err());
        assert_eq!(InterpolationMethod::default().to_string(), "linear");
        assert_eq!(InterpolationMethod::Nearest.interpolator().name(), "nearest");
    }

    #[test]
    fn test_interpolate_many_matches_single() {
        let model = GridModel::builder(vec![0.0, 10.0, 20.0], vec![0.0, 10.0])
            .cyclic(false)
            .pad_latitude(false)
            .layer("v", array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]])
            .build()
            .unwrap();

        let lons = [0.0, 2.5, 17.0];
        let lats = [0.0, 7.5, 1.0];
        for method in [InterpolationMethod::Nearest, InterpolationMethod::Linear] {
            let many = method
                .interpolator()
                .interpolate_many(&model, "v", &lons, &lats)
                .unwrap();
            for (k, value) in many.iter().enumerate() {
                let single = method.interpolate(&model, "v", lons[k], lats[k]).unwrap();
                assert_eq!(value.to_bits(), single.to_bits());
            }
        }
    }
}
