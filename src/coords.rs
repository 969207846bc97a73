//! Longitude conventions and coordinate validation.
//!
//! Two longitude conventions are in use across the datasets:
//!
//! - **Signed** longitude in `[-180, 180)`, which puts Arabia Terra at the map center.
//! - **Positive** longitude in `[0, 360)`, which puts Olympus Mons at the map center.
//!
//! The slice forms apply the scalar functions element by element so that a
//! batched query always sees exactly the same value as a single-point query.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RedPlanetError, Result};

/// Full longitude cycle in degrees
pub const FULL_CYCLE: f64 = 360.0;

/// Longitude convention of a grid axis or a curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LonConvention {
    /// `[-180, 180)`
    Signed,
    /// `[0, 360)`
    Positive,
}

impl LonConvention {
    /// Infer the convention of a raw longitude axis
    pub fn infer(axis: &[f64]) -> Self {
        if axis.iter().any(|&lon| lon > 180.0) {
            LonConvention::Positive
        } else {
            LonConvention::Signed
        }
    }

    /// Map a longitude into this convention
    pub fn normalize(&self, lon: f64) -> f64 {
        match self {
            LonConvention::Signed => to_signed(lon),
            LonConvention::Positive => to_positive(lon),
        }
    }
}

impl fmt::Display for LonConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LonConvention::Signed => write!(f, "signed"),
            LonConvention::Positive => write!(f, "positive"),
        }
    }
}

impl FromStr for LonConvention {
    type Err = RedPlanetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "signed" | "lon" => Ok(LonConvention::Signed),
            "positive" | "clon" => Ok(LonConvention::Positive),
            _ => Err(RedPlanetError::InvalidParameter {
                param: "convention".to_string(),
                message: format!("Unknown longitude convention: {}", s),
            }),
        }
    }
}

/// Inclusive coordinate bounds used for validation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordRange {
    pub min: f64,
    pub max: f64,
}

impl CoordRange {
    /// Accepts either longitude convention before normalization
    pub const ANY_LON: CoordRange = CoordRange::new(-180.0, 360.0);
    /// Requires signed longitude
    pub const SIGNED_LON: CoordRange = CoordRange::new(-180.0, 180.0);
    /// Full latitude range
    pub const LAT: CoordRange = CoordRange::new(-90.0, 90.0);

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive membership; NaN is never contained
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for CoordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Map a longitude into `[-180, 180)`
///
/// Values already inside the range come back untouched, so the mapping is
/// idempotent. `180` is an alias of `-180`.
pub fn to_signed(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        return lon;
    }

    let signed = (lon - 180.0).rem_euclid(FULL_CYCLE) - 180.0;

    // rem_euclid can round up to a full cycle for tiny negative inputs
    if signed >= 180.0 {
        -180.0
    } else {
        signed
    }
}

/// Map a longitude into `[0, 360)`
pub fn to_positive(lon: f64) -> f64 {
    if (0.0..FULL_CYCLE).contains(&lon) {
        return lon;
    }

    let positive = lon.rem_euclid(FULL_CYCLE);
    if positive >= FULL_CYCLE {
        0.0
    } else {
        positive
    }
}

/// Element-wise [`to_signed`]
pub fn to_signed_all(lons: &[f64]) -> Vec<f64> {
    lons.iter().map(|&lon| to_signed(lon)).collect()
}

/// Element-wise [`to_positive`]
pub fn to_positive_all(lons: &[f64]) -> Vec<f64> {
    lons.iter().map(|&lon| to_positive(lon)).collect()
}

/// Check that a coordinate lies inside the given inclusive bounds
pub fn validate_coord(lon: f64, lat: f64, lon_range: CoordRange, lat_range: CoordRange) -> Result<()> {
    if !lon_range.contains(lon) {
        return Err(RedPlanetError::Range {
            message: format!(
                "Given longitude coordinate lon={} is out of range {}",
                lon, lon_range
            ),
        });
    }

    if !lat_range.contains(lat) {
        return Err(RedPlanetError::Range {
            message: format!(
                "Given latitude coordinate lat={} is out of range {}",
                lat, lat_range
            ),
        });
    }

    Ok(())
}

/// Element-wise [`validate_coord`], failing on the first bad pair
pub fn validate_coords(
    lons: &[f64],
    lats: &[f64],
    lon_range: CoordRange,
    lat_range: CoordRange,
) -> Result<()> {
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

    lons.iter()
        .zip(lats)
        .try_for_each(|(&lon, &lat)| validate_coord(lon, lat, lon_range, lat_range))
}
