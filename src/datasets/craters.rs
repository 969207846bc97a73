//! Impact crater catalogue.
//!
//! A flat table of craters at least 10 km across, with their centre
//! coordinates, diameter, rim-to-floor depth and ejecta layer count. Unlike
//! the gridded datasets there is nothing to interpolate: the table is filtered
//! by diameter or searched by name and ID.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{RedPlanetError, Result};

/// Diameter bounds used when a caller gives none, km
pub const DEFAULT_MIN_DIAMETER_KM: f64 = 0.0;
pub const DEFAULT_MAX_DIAMETER_KM: f64 = 9999.0;

/// One crater record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crater {
    #[serde(alias = "ID")]
    pub id: String,
    /// Most craters are unnamed
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub diameter_km: f64,
    /// Rim-to-floor depth in km, where measured
    #[serde(default)]
    pub depth_rimfloor: Option<f64>,
    #[serde(default, alias = "n_layers")]
    pub num_layers: u32,
}

impl Crater {
    fn check(&self) -> Result<()> {
        let bad = |message: String| {
            Err(RedPlanetError::DataShape {
                message: format!("Crater '{}': {}", self.id, message),
            })
        };

        if self.id.trim().is_empty() {
            return bad("empty ID".to_string());
        }
        if !(self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat)) {
            return bad(format!("latitude {} outside [-90, 90]", self.lat));
        }
        if !(self.lon.is_finite() && (-180.0..=360.0).contains(&self.lon)) {
            return bad(format!("longitude {} outside [-180, 360]", self.lon));
        }
        if !(self.diameter_km.is_finite() && self.diameter_km >= 0.0) {
            return bad(format!("invalid diameter {}", self.diameter_km));
        }
        Ok(())
    }

    fn name_matches(&self, query: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.to_lowercase() == query)
    }
}

/// Summary of the catalogue for the metadata endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraterSummary {
    pub count: usize,
    pub named: usize,
    pub min_diameter_km: Option<f64>,
    pub max_diameter_km: Option<f64>,
}

/// The loaded crater table, in file order
#[derive(Debug, Clone, Default)]
pub struct CraterDatabase {
    craters: Vec<Crater>,
}

impl CraterDatabase {
    /// Check every record and build the table
    ///
    /// IDs must be unique ignoring case, since lookups ignore case.
    pub fn new(craters: Vec<Crater>) -> Result<Self> {
        let mut ids = HashSet::with_capacity(craters.len());
        for crater in &craters {
            crater.check()?;
            if !ids.insert(crater.id.to_lowercase()) {
                return Err(RedPlanetError::DataShape {
                    message: format!("Duplicate crater ID '{}'", crater.id),
                });
            }
        }
        Ok(Self { craters })
    }

    pub fn craters(&self) -> &[Crater] {
        &self.craters
    }

    pub fn len(&self) -> usize {
        self.craters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.craters.is_empty()
    }

    /// Craters with `min_km <= diameter <= max_km`
    ///
    /// An inverted range matches nothing.
    pub fn filter_by_diameter(&self, min_km: f64, max_km: f64) -> Result<Vec<&Crater>> {
        for (param, value) in [("min_diam", min_km), ("max_diam", max_km)] {
            if value.is_nan() {
                return Err(RedPlanetError::InvalidParameter {
                    param: param.to_string(),
                    message: "Diameter bound must be a number".to_string(),
                });
            }
        }

        Ok(self
            .craters
            .iter()
            .filter(|c| min_km <= c.diameter_km && c.diameter_km <= max_km)
            .collect())
    }

    /// Look a crater up by name, then by ID, ignoring case
    pub fn find(&self, name_or_id: &str) -> Result<&Crater> {
        let query = name_or_id.to_lowercase();
        self.craters
            .iter()
            .find(|c| c.name_matches(&query))
            .or_else(|| self.craters.iter().find(|c| c.id.to_lowercase() == query))
            .ok_or_else(|| RedPlanetError::UnknownCrater {
                query: name_or_id.to_string(),
            })
    }

    pub fn summary(&self) -> CraterSummary {
        let diameters = self.craters.iter().map(|c| c.diameter_km);
        CraterSummary {
            count: self.craters.len(),
            named: self.craters.iter().filter(|c| c.name.is_some()).count(),
            min_diameter_km: diameters.clone().reduce(f64::min),
            max_diameter_km: diameters.reduce(f64::max),
        }
    }
}
