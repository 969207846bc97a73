//! Crust topography, moho, thickness and density.
//!
//! Topography and moho depth come from spherical-harmonic models expanded
//! onto a regular grid ahead of time (in km). Crustal thickness is their
//! difference and density is a per-model constant that differs between the
//! two sides of the crustal dichotomy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::{unknown_quantity, Dataset, DatasetHandle, DatasetInfo};
use crate::boundary::BoundaryCurve;
use crate::coords::CoordRange;
use crate::data_loader::RawGrid;
use crate::derived::{self, DerivedQuantityEngine};
use crate::error::{RedPlanetError, Result};
use crate::grid::{AttributeValue, GridModel};
use crate::query::QueryOptions;

pub const TOPO_LAYER: &str = "topo";
pub const MOHO_LAYER: &str = "moho";

pub const QUANTITIES: &[&str] = &["topo", "moho", "crust", "rho"];

/// Crust quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrustQuantity {
    Topo,
    Moho,
    /// `topo - moho`
    Thickness,
    /// Dichotomy-dependent model density
    Density,
}

impl CrustQuantity {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrustQuantity::Topo => "topo",
            CrustQuantity::Moho => "moho",
            CrustQuantity::Thickness => "crust",
            CrustQuantity::Density => "rho",
        }
    }
}

impl fmt::Display for CrustQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrustQuantity {
    type Err = RedPlanetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "topo" | "topography" => Ok(CrustQuantity::Topo),
            "moho" => Ok(CrustQuantity::Moho),
            "crust" | "crustal thickness" | "crthick" | "thick" | "thickness" => {
                Ok(CrustQuantity::Thickness)
            }
            "rho" | "density" | "crustal density" => Ok(CrustQuantity::Density),
            _ => Err(unknown_quantity(DatasetHandle::Crust, s)),
        }
    }
}

/// Parameters identifying a moho model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrustModelParams {
    /// Reference interior model
    #[serde(rename = "RIM")]
    pub rim: String,
    /// Crustal thickness at the InSight landing site, km
    pub insight_thickness: f64,
    /// Crustal density south of the dichotomy, kg/m^3
    pub rho_south: f64,
    /// Crustal density north of the dichotomy, kg/m^3
    pub rho_north: f64,
}

impl CrustModelParams {
    /// `RIM-thickness-rhoS-rhoN`, e.g. `Khan2022-39-2900-2900`
    pub fn model_name(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.rim, self.insight_thickness, self.rho_south, self.rho_north
        )
    }

    /// Read the parameters back from grid attributes
    pub fn from_attributes(attributes: &HashMap<String, AttributeValue>) -> Result<Self> {
        let number = |key: &str| match attributes.get(key) {
            Some(AttributeValue::Number(v)) => Ok(*v),
            _ => Err(RedPlanetError::DataShape {
                message: format!("Crust model attribute '{}' is missing or not a number", key),
            }),
        };
        let rim = match attributes.get("moho_model_RIM") {
            Some(AttributeValue::Text(rim)) => rim.clone(),
            _ => {
                return Err(RedPlanetError::DataShape {
                    message: "Crust model attribute 'moho_model_RIM' is missing or not text"
                        .to_string(),
                })
            }
        };

        Ok(Self {
            rim,
            insight_thickness: number("moho_model_insight_thickness")?,
            rho_south: number("moho_model_rho_south")?,
            rho_north: number("moho_model_rho_north")?,
        })
    }

    fn to_attributes(&self) -> Vec<(&'static str, AttributeValue)> {
        vec![
            ("moho_model_name", self.model_name().into()),
            ("moho_model_RIM", self.rim.clone().into()),
            ("moho_model_insight_thickness", self.insight_thickness.into()),
            ("moho_model_rho_south", self.rho_south.into()),
            ("moho_model_rho_north", self.rho_north.into()),
        ]
    }
}

/// Everything known about the loaded crust model
#[derive(Debug, Clone, Serialize)]
pub struct CrustModelInfo {
    pub name: String,
    #[serde(rename = "RIM")]
    pub rim: String,
    pub insight_thickness: f64,
    pub rho_north: f64,
    pub rho_south: f64,
    pub grid_spacing: Option<f64>,
    pub lmax: Option<u32>,
    pub topo_model: Option<String>,
}

/// Maximum spherical-harmonic degree for a requested grid spacing
///
/// Returns the degree together with the spacing of the grid that degree
/// actually expands to, `180 / (2 * lmax + 2)`.
pub fn lmax_for_spacing(grid_spacing: f64) -> Result<(u32, f64)> {
    if !(grid_spacing > 0.0 && grid_spacing <= 90.0) {
        return Err(RedPlanetError::InvalidParameter {
            param: "grid_spacing".to_string(),
            message: format!("Grid spacing must be in (0, 90] degrees, got {}", grid_spacing),
        });
    }

    let lmax = (90.0 / grid_spacing - 1.0).round().max(0.0) as u32;
    Ok((lmax, spacing_for_lmax(lmax)))
}

/// Grid spacing produced by expanding to degree `lmax`
pub fn spacing_for_lmax(lmax: u32) -> f64 {
    180.0 / (2.0 * lmax as f64 + 2.0)
}

/// Topography and moho grids with their model parameters and dichotomy
#[derive(Debug, Clone)]
pub struct CrustDataset {
    model: Arc<GridModel>,
    params: CrustModelParams,
    dichotomy: Arc<BoundaryCurve>,
}

impl CrustDataset {
    /// Build from raw `topo` and `moho` layers in km
    ///
    /// When `params` is `None` the model parameters are read from the raw
    /// grid's `moho_model_*` attributes.
    pub fn from_raw(
        mut raw: RawGrid,
        params: Option<CrustModelParams>,
        dichotomy: BoundaryCurve,
    ) -> Result<Self> {
        let params = match params {
            Some(params) => params,
            None => CrustModelParams::from_attributes(&raw.attributes)?,
        };

        let topo = raw.take_layer(TOPO_LAYER)?;
        let moho = raw.take_layer(MOHO_LAYER)?;

        let mut builder = GridModel::builder(raw.lon, raw.lat)
            .cyclic(raw.cyclic)
            .attributes(raw.attributes)
            .attribute("units", "km")
            .layer(TOPO_LAYER, topo)
            .layer(MOHO_LAYER, moho);
        for (key, value) in params.to_attributes() {
            builder = builder.attribute(key, value);
        }
        let model = builder.build()?;

        debug!(model = %params.model_name(), "Built crust grid model");
        Ok(Self {
            model: Arc::new(model),
            params,
            dichotomy: Arc::new(dichotomy),
        })
    }

    pub fn model(&self) -> &GridModel {
        &self.model
    }

    pub fn params(&self) -> &CrustModelParams {
        &self.params
    }

    pub fn dichotomy(&self) -> &BoundaryCurve {
        &self.dichotomy
    }

    pub fn model_name(&self) -> String {
        self.params.model_name()
    }

    pub fn model_info(&self) -> CrustModelInfo {
        let grid_spacing = self.model.number_attribute("grid_spacing").ok();
        let lmax = self
            .model
            .number_attribute("lmax")
            .ok()
            .map(|l| l.round() as u32)
            .or_else(|| grid_spacing.and_then(|s| lmax_for_spacing(s).ok()).map(|(l, _)| l));

        CrustModelInfo {
            name: self.params.model_name(),
            rim: self.params.rim.clone(),
            insight_thickness: self.params.insight_thickness,
            rho_north: self.params.rho_north,
            rho_south: self.params.rho_south,
            grid_spacing,
            lmax,
            topo_model: self.model.text_attribute("topo_model").map(str::to_string),
        }
    }

    /// Whether the point lies on or north of the dichotomy
    pub fn is_above_dichotomy(&self, lon: f64, lat: f64) -> Result<bool> {
        self.dichotomy.is_above(lon, lat)
    }
}

impl Dataset for CrustDataset {
    type Quantity = CrustQuantity;

    fn handle(&self) -> DatasetHandle {
        DatasetHandle::Crust
    }

    fn lon_range(&self) -> CoordRange {
        CoordRange::ANY_LON
    }

    fn evaluate(
        &self,
        quantity: CrustQuantity,
        lon: f64,
        lat: f64,
        options: &QueryOptions,
    ) -> Result<f64> {
        let engine = DerivedQuantityEngine::new(Arc::clone(&self.model), options.method);
        match quantity {
            CrustQuantity::Topo => engine.value(TOPO_LAYER, lon, lat),
            CrustQuantity::Moho => engine.value(MOHO_LAYER, lon, lat),
            CrustQuantity::Thickness => engine.difference(TOPO_LAYER, MOHO_LAYER, lon, lat),
            CrustQuantity::Density => derived::hemisphere_constant(
                &self.dichotomy,
                lon,
                lat,
                self.params.rho_north,
                self.params.rho_south,
            ),
        }
    }

    fn info(&self) -> DatasetInfo {
        DatasetInfo {
            dataset: DatasetHandle::Crust,
            quantities: QUANTITIES.to_vec(),
            lon_range: self.lon_range(),
            lat_range: self.lat_range(),
            grid: Some(self.model.summary()),
            model: serde_json::to_value(self.model_info()).ok(),
        }
    }
}
