//! Crustal heat production and conductive geotherms.
//!
//! Heat production comes from the decay of U238, U235, Th232 and K40, with
//! thorium and potassium read from the GRS grids and uranium taken as
//! `Th / 3.8`. Temperatures follow a piecewise steady-state conduction
//! profile: radiogenic heating inside the crust, basal heat flow only below
//! the moho, continuous at the crust-mantle boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{trace, warn};

use super::crust::{CrustDataset, CrustQuantity};
use super::grs::{Element, GrsDataset};
use super::{unknown_quantity, Dataset, DatasetHandle, DatasetInfo};
use crate::coords::CoordRange;
use crate::derived::Sentinel;
use crate::error::{RedPlanetError, Result};
use crate::query::QueryOptions;

pub const QUANTITIES: &[&str] = &["H", "heat_flow", "temp_at_depth:<km>", "depth_at_temp:<C>"];

/// Thorium to uranium concentration ratio
pub const TH_U_RATIO: f64 = 3.8;

/// Search interval for [`Geotherm::depth_at_temp`], km
pub const MAX_SEARCH_DEPTH_KM: f64 = 1000.0;

/// Temperature tolerance for [`Geotherm::depth_at_temp`], degrees C
pub const TEMP_TOLERANCE_C: f64 = 1e-2;

const MAX_BISECTIONS: usize = 200;

/// Radiogenic heat producing isotope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hpe {
    pub name: &'static str,
    /// Natural abundance relative to all isotopes of the element
    pub isotopic_fraction: f64,
    /// W/kg
    pub heat_release: f64,
    /// Years
    pub half_life: f64,
}

pub const U238: Hpe = Hpe {
    name: "U238",
    isotopic_fraction: 0.9928,
    heat_release: 9.46e-5,
    half_life: 4.47e9,
};

pub const U235: Hpe = Hpe {
    name: "U235",
    isotopic_fraction: 0.0071,
    heat_release: 5.69e-4,
    half_life: 7.04e8,
};

pub const TH232: Hpe = Hpe {
    name: "Th232",
    isotopic_fraction: 1.00,
    heat_release: 2.64e-5,
    half_life: 1.40e10,
};

pub const K40: Hpe = Hpe {
    name: "K40",
    isotopic_fraction: 1.191e-4,
    heat_release: 2.92e-5,
    half_life: 1.25e9,
};

impl Hpe {
    /// Heat released per kg of rock holding `concentration` of the element,
    /// `t_ga` billion years ago
    pub fn heat(&self, concentration: f64, t_ga: f64) -> f64 {
        let t_yr = t_ga * 1e9;
        self.isotopic_fraction
            * concentration
            * self.heat_release
            * (t_yr * std::f64::consts::LN_2 / self.half_life).exp()
    }
}

/// Parameters of the heat model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatParams {
    /// Billions of years before present
    pub t_ga: f64,
    /// Basal heat flow, mW/m^2
    pub q_b_mw: f64,
    /// Crustal thermal conductivity, W/(m K)
    pub k_cr: f64,
    /// Mantle thermal conductivity, W/(m K)
    pub k_m: f64,
    /// Use volatile-free GRS concentrations
    pub normalize: bool,
}

impl Default for HeatParams {
    fn default() -> Self {
        Self {
            t_ga: 0.0,
            q_b_mw: 0.0,
            k_cr: 2.5,
            k_m: 4.0,
            normalize: true,
        }
    }
}

impl HeatParams {
    pub fn validate(&self) -> Result<()> {
        let positive = [("k_cr", self.k_cr), ("k_m", self.k_m)];
        for (param, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RedPlanetError::InvalidParameter {
                    param: param.to_string(),
                    message: format!("Thermal conductivity must be positive, got {}", value),
                });
            }
        }
        for (param, value) in [("t_ga", self.t_ga), ("q_b_mw", self.q_b_mw)] {
            if !value.is_finite() {
                return Err(RedPlanetError::InvalidParameter {
                    param: param.to_string(),
                    message: format!("Must be finite, got {}", value),
                });
            }
        }
        Ok(())
    }
}

/// Heat quantities
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeatQuantity {
    /// Heat production, W/kg
    H,
    /// Crustal contribution to surface heat flow, mW/m^2
    HeatFlow,
    /// Temperature at a depth in km, degrees C
    TempAtDepth { depth_km: f64 },
    /// Depth in km reaching a temperature in degrees C
    DepthAtTemp { temp_c: f64 },
}

impl fmt::Display for HeatQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatQuantity::H => f.write_str("H"),
            HeatQuantity::HeatFlow => f.write_str("heat_flow"),
            HeatQuantity::TempAtDepth { depth_km } => write!(f, "temp_at_depth:{}", depth_km),
            HeatQuantity::DepthAtTemp { temp_c } => write!(f, "depth_at_temp:{}", temp_c),
        }
    }
}

impl FromStr for HeatQuantity {
    type Err = RedPlanetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        let name = name.trim().to_lowercase().replace(' ', "_");

        match (name.as_str(), arg) {
            ("h", None) => Ok(HeatQuantity::H),
            ("heat_flow" | "heatflow", None) => Ok(HeatQuantity::HeatFlow),
            ("temp_at_depth", Some(arg)) => {
                let depth_km = parse_argument("depth_km", arg)?;
                if depth_km < 0.0 {
                    return Err(RedPlanetError::InvalidParameter {
                        param: "depth_km".to_string(),
                        message: format!("Depth must not be negative, got {}", depth_km),
                    });
                }
                Ok(HeatQuantity::TempAtDepth { depth_km })
            }
            ("depth_at_temp", Some(arg)) => Ok(HeatQuantity::DepthAtTemp {
                temp_c: parse_argument("temp_c", arg)?,
            }),
            _ => Err(unknown_quantity(DatasetHandle::Heat, s)),
        }
    }
}

fn parse_argument(param: &str, arg: &str) -> Result<f64> {
    arg.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RedPlanetError::InvalidParameter {
            param: param.to_string(),
            message: format!("Expected a finite number, got '{}'", arg),
        })
}

/// Radiogenic heat production in W/kg from thorium and potassium fractions
///
/// Undefined if either concentration is the sentinel or negative.
pub fn heat_production(th: f64, k: f64, t_ga: f64, sentinel: Sentinel) -> f64 {
    if sentinel.is(th) || sentinel.is(k) || th < 0.0 || k < 0.0 {
        return sentinel.value();
    }

    let u = th / TH_U_RATIO;
    U238.heat(u, t_ga) + U235.heat(u, t_ga) + TH232.heat(th, t_ga) + K40.heat(k, t_ga)
}

/// Crustal heat flow in mW/m^2 for density `rho`, production `h` and crust
/// thickness in km
pub fn surface_heat_flow(rho: f64, h: f64, crthick_km: f64, sentinel: Sentinel) -> f64 {
    sentinel.guard(&[h, crthick_km], || rho * h * crthick_km * 1e3 * 1e3)
}

/// Steady-state conductive temperature profile at one location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geotherm {
    /// Volumetric heat production `rho * H`, W/m^3
    pub heating: f64,
    /// Crust thickness, m
    pub crthick_m: f64,
    /// Basal heat flow, W/m^2
    pub q_b: f64,
    pub k_cr: f64,
    pub k_m: f64,
}

impl Geotherm {
    pub fn new(rho: f64, h: f64, crthick_km: f64, params: &HeatParams) -> Self {
        Self {
            heating: rho * h,
            crthick_m: crthick_km * 1e3,
            q_b: params.q_b_mw * 1e-3,
            k_cr: params.k_cr,
            k_m: params.k_m,
        }
    }

    fn crust_temp(&self, z_m: f64) -> f64 {
        self.heating * z_m * (self.crthick_m - z_m / 2.0) / self.k_cr + self.q_b * z_m / self.k_cr
    }

    fn mantle_temp(&self, z_m: f64) -> f64 {
        self.heating * self.crthick_m.powi(2) / (2.0 * self.k_m) + self.q_b * z_m / self.k_m
    }

    /// Temperature in degrees C at `depth_km`
    pub fn temp_at(&self, depth_km: f64) -> f64 {
        let depth_m = depth_km * 1e3;
        if depth_m < self.crthick_m {
            self.crust_temp(depth_m)
        } else {
            // Offset keeps the profile continuous at the moho
            let t0 = self.crust_temp(self.crthick_m) - self.mantle_temp(self.crthick_m);
            t0 + self.mantle_temp(depth_m)
        }
    }

    /// Depth in km where the profile reaches `temp_c`
    ///
    /// Bisects over `[0, MAX_SEARCH_DEPTH_KM]` until the temperature is within
    /// [`TEMP_TOLERANCE_C`]. Undefined when the temperature is not strictly
    /// between the surface and bottom temperatures.
    pub fn depth_at_temp(&self, temp_c: f64, sentinel: Sentinel) -> f64 {
        let (mut left, mut right) = (0.0, MAX_SEARCH_DEPTH_KM);
        if temp_c <= self.temp_at(left) || self.temp_at(right) <= temp_c {
            return sentinel.value();
        }

        let mut mid = (left + right) / 2.0;
        let mut t_mid = self.temp_at(mid);
        let mut iterations = 0;
        while (t_mid - temp_c).abs() > TEMP_TOLERANCE_C {
            if iterations == MAX_BISECTIONS {
                warn!(temp_c, depth_km = mid, "Depth search did not converge");
                break;
            }
            if temp_c < t_mid {
                right = mid;
            } else {
                left = mid;
            }
            mid = (left + right) / 2.0;
            t_mid = self.temp_at(mid);
            iterations += 1;
        }

        trace!(temp_c, depth_km = mid, iterations, "Depth search finished");
        mid
    }
}

/// Heat model composed from the GRS and crust datasets
#[derive(Debug, Clone)]
pub struct HeatDataset {
    grs: Arc<GrsDataset>,
    crust: Arc<CrustDataset>,
}

impl HeatDataset {
    pub fn new(grs: Arc<GrsDataset>, crust: Arc<CrustDataset>) -> Self {
        Self { grs, crust }
    }

    fn sentinel(&self) -> Sentinel {
        Sentinel(self.grs.model().nan_sentinel())
    }

    /// Heat production in W/kg
    pub fn heat_production(&self, lon: f64, lat: f64, options: &QueryOptions) -> Result<f64> {
        let params = &options.heat;
        let grs_options = QueryOptions {
            normalize: params.normalize,
            ..*options
        };
        let th = self.grs.concentration(Element::Th, lon, lat, &grs_options)?;
        let k = self.grs.concentration(Element::K, lon, lat, &grs_options)?;
        Ok(heat_production(th, k, params.t_ga, self.sentinel()))
    }

    /// Production, crust thickness in km and density at one location
    fn inputs(&self, lon: f64, lat: f64, options: &QueryOptions) -> Result<(f64, f64, f64)> {
        let h = self.heat_production(lon, lat, options)?;
        let thick = self.crust.evaluate(CrustQuantity::Thickness, lon, lat, options)?;
        let rho = self.crust.evaluate(CrustQuantity::Density, lon, lat, options)?;
        Ok((h, thick, rho))
    }

    /// Conductive profile at one location; `None` where production or thickness is undefined
    fn geotherm(&self, lon: f64, lat: f64, options: &QueryOptions) -> Result<Option<Geotherm>> {
        let sentinel = self.sentinel();
        let (h, thick, rho) = self.inputs(lon, lat, options)?;
        if sentinel.is(h) || sentinel.is(thick) {
            return Ok(None);
        }
        Ok(Some(Geotherm::new(rho, h, thick, &options.heat)))
    }
}

impl Dataset for HeatDataset {
    type Quantity = HeatQuantity;

    fn handle(&self) -> DatasetHandle {
        DatasetHandle::Heat
    }

    fn lon_range(&self) -> CoordRange {
        CoordRange::ANY_LON
    }

    fn evaluate(
        &self,
        quantity: HeatQuantity,
        lon: f64,
        lat: f64,
        options: &QueryOptions,
    ) -> Result<f64> {
        options.heat.validate()?;
        let sentinel = self.sentinel();

        match quantity {
            HeatQuantity::H => self.heat_production(lon, lat, options),
            HeatQuantity::HeatFlow => {
                let (h, thick, rho) = self.inputs(lon, lat, options)?;
                Ok(surface_heat_flow(rho, h, thick, sentinel))
            }
            HeatQuantity::TempAtDepth { depth_km } => Ok(self
                .geotherm(lon, lat, options)?
                .map_or(sentinel.value(), |g| g.temp_at(depth_km))),
            HeatQuantity::DepthAtTemp { temp_c } => Ok(self
                .geotherm(lon, lat, options)?
                .map_or(sentinel.value(), |g| g.depth_at_temp(temp_c, sentinel))),
        }
    }

    fn info(&self) -> DatasetInfo {
        DatasetInfo {
            dataset: DatasetHandle::Heat,
            quantities: QUANTITIES.to_vec(),
            lon_range: self.lon_range(),
            lat_range: self.lat_range(),
            grid: None,
            model: Some(serde_json::json!({
                "crust_model": self.crust.model_name(),
                "defaults": HeatParams::default(),
            })),
        }
    }
}
