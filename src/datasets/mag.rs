//! Crustal magnetic field at 150 km altitude.
//!
//! Four layers in nT on a signed-longitude grid: the field magnitude and its
//! longitudinal, latitudinal and radial components.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::{unknown_quantity, Dataset, DatasetHandle, DatasetInfo};
use crate::coords::CoordRange;
use crate::data_loader::RawGrid;
use crate::derived::DerivedQuantityEngine;
use crate::error::{RedPlanetError, Result};
use crate::grid::GridModel;
use crate::query::QueryOptions;

pub const QUANTITIES: &[&str] = &["Bmag", "Blon", "Blat", "Br"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagQuantity {
    /// Field magnitude
    Bmag,
    Blon,
    Blat,
    /// Radial component
    Br,
}

impl MagQuantity {
    pub const ALL: [MagQuantity; 4] = [
        MagQuantity::Bmag,
        MagQuantity::Blon,
        MagQuantity::Blat,
        MagQuantity::Br,
    ];

    /// Layer holding this component
    pub fn layer_name(&self) -> &'static str {
        match self {
            MagQuantity::Bmag => "Bmag",
            MagQuantity::Blon => "Blon",
            MagQuantity::Blat => "Blat",
            MagQuantity::Br => "Br",
        }
    }
}

impl fmt::Display for MagQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.layer_name())
    }
}

impl FromStr for MagQuantity {
    type Err = RedPlanetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bmag" | "b_mag" => Ok(MagQuantity::Bmag),
            "blon" | "b_lon" | "btheta" | "b_theta" => Ok(MagQuantity::Blon),
            "blat" | "b_lat" | "bphi" | "b_phi" => Ok(MagQuantity::Blat),
            "br" | "b_r" => Ok(MagQuantity::Br),
            _ => Err(unknown_quantity(DatasetHandle::Mag, s)),
        }
    }
}

/// Magnetic field component grids
#[derive(Debug, Clone)]
pub struct MagDataset {
    model: Arc<GridModel>,
}

impl MagDataset {
    /// Build from raw layers named `Bmag`, `Blon`, `Blat` and `Br`, all required
    pub fn from_raw(mut raw: RawGrid) -> Result<Self> {
        let mut builder = GridModel::builder(raw.lon.clone(), raw.lat.clone())
            .cyclic(raw.cyclic)
            .attributes(std::mem::take(&mut raw.attributes))
            .attribute("units", "nT");

        for quantity in MagQuantity::ALL {
            let values = raw.take_layer(quantity.layer_name())?;
            builder = builder.layer(quantity.layer_name(), values);
        }

        let model = builder.build()?;
        debug!(
            lon_points = model.lon_axis().len(),
            lat_points = model.lat_axis().len(),
            "Built magnetic field grid model"
        );
        Ok(Self {
            model: Arc::new(model),
        })
    }

    pub fn model(&self) -> &GridModel {
        &self.model
    }
}

impl Dataset for MagDataset {
    type Quantity = MagQuantity;

    fn handle(&self) -> DatasetHandle {
        DatasetHandle::Mag
    }

    fn lon_range(&self) -> CoordRange {
        CoordRange::SIGNED_LON
    }

    fn evaluate(
        &self,
        quantity: MagQuantity,
        lon: f64,
        lat: f64,
        options: &QueryOptions,
    ) -> Result<f64> {
        DerivedQuantityEngine::new(Arc::clone(&self.model), options.method)
            .value(quantity.layer_name(), lon, lat)
    }

    fn info(&self) -> DatasetInfo {
        DatasetInfo {
            dataset: DatasetHandle::Mag,
            quantities: QUANTITIES.to_vec(),
            lon_range: self.lon_range(),
            lat_range: self.lat_range(),
            grid: Some(self.model.summary()),
            model: None,
        }
    }
}
