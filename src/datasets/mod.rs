//! Per-dataset quantity vocabularies.
//!
//! Each dataset exposes a closed quantity enum parsed from strings (with the
//! aliases users are used to) and evaluates a parsed quantity at one
//! coordinate. Coordinates are validated by the caller against
//! [`Dataset::lon_range`] and [`Dataset::lat_range`] before evaluation.

pub mod craters;
pub mod crust;
pub mod grs;
pub mod heat;
pub mod mag;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::coords::CoordRange;
use crate::error::{RedPlanetError, Result};
use crate::grid::GridSummary;
use crate::query::QueryOptions;

/// A queryable dataset
pub trait Dataset: Send + Sync {
    /// Parsed quantity selector
    type Quantity: FromStr<Err = RedPlanetError> + Copy + Send + Sync + fmt::Debug;

    fn handle(&self) -> DatasetHandle;

    /// Accepted longitude range before normalization
    fn lon_range(&self) -> CoordRange;

    fn lat_range(&self) -> CoordRange {
        CoordRange::LAT
    }

    /// Evaluate `quantity` at an already validated coordinate
    fn evaluate(
        &self,
        quantity: Self::Quantity,
        lon: f64,
        lat: f64,
        options: &QueryOptions,
    ) -> Result<f64>;

    /// Static description for the metadata endpoint
    fn info(&self) -> DatasetInfo;
}

/// Names the datasets a query can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetHandle {
    Grs,
    Crust,
    Mag,
    Heat,
}

impl DatasetHandle {
    pub const ALL: [DatasetHandle; 4] = [
        DatasetHandle::Grs,
        DatasetHandle::Crust,
        DatasetHandle::Mag,
        DatasetHandle::Heat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetHandle::Grs => "grs",
            DatasetHandle::Crust => "crust",
            DatasetHandle::Mag => "mag",
            DatasetHandle::Heat => "heat",
        }
    }

    /// Quantity names accepted by this dataset, aliases excluded
    pub fn quantities(&self) -> &'static [&'static str] {
        match self {
            DatasetHandle::Grs => grs::QUANTITIES,
            DatasetHandle::Crust => crust::QUANTITIES,
            DatasetHandle::Mag => mag::QUANTITIES,
            DatasetHandle::Heat => heat::QUANTITIES,
        }
    }
}

impl fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetHandle {
    type Err = RedPlanetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grs" => Ok(DatasetHandle::Grs),
            "crust" => Ok(DatasetHandle::Crust),
            "mag" => Ok(DatasetHandle::Mag),
            "heat" => Ok(DatasetHandle::Heat),
            _ => Err(RedPlanetError::InvalidParameter {
                param: "dataset".to_string(),
                message: format!("Unknown dataset: {}. Options are: grs, crust, mag, heat", s),
            }),
        }
    }
}

/// Description of a loaded dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub dataset: DatasetHandle,
    pub quantities: Vec<&'static str>,
    pub lon_range: CoordRange,
    pub lat_range: CoordRange,
    /// Grid summary, absent for datasets composed from other datasets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridSummary>,
    /// Dataset-specific model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<serde_json::Value>,
}

/// Build the error for a quantity outside a dataset's vocabulary
pub(crate) fn unknown_quantity(handle: DatasetHandle, name: &str) -> RedPlanetError {
    RedPlanetError::UnknownQuantity {
        dataset: handle.to_string(),
        name: name.to_string(),
        options: handle.quantities().join(", "),
    }
}
