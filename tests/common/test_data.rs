//! Test data generation utilities.
//!
//! This module writes small raw grid files with known, mostly constant
//! values so that interpolated results can be checked exactly.

#![allow(dead_code)]

use ndarray::Array2;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use redplanet::data_loader::{write_boundary_curve, write_craters, write_raw_grid, RawGrid};
use redplanet::datasets::craters::Crater;
use redplanet::Config;

pub type Result<T> = redplanet::Result<T>;

/// GRS raw values: thorium in ppm, everything else in weight percent
pub const GRS_TH_PPM: f64 = 2.0;
pub const GRS_K_WT: f64 = 0.4;
pub const GRS_CL_WT: f64 = 0.5;
pub const GRS_H2O_WT: f64 = 3.0;
pub const GRS_S_WT: f64 = 4.5;

/// Crust values, km
pub const TOPO_NORTH: f64 = 2.0;
pub const TOPO_SOUTH: f64 = -3.0;
pub const MOHO: f64 = -50.0;
pub const RHO_NORTH: f64 = 2800.0;
pub const RHO_SOUTH: f64 = 2900.0;

/// Magnetic field constants, nT
pub const BMAG: f64 = 10.0;
pub const BLON: f64 = 1.0;
pub const BLAT: f64 = 2.0;

/// Cell centres from `start` in steps of `step`
pub fn centres(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Fill a `(lat, lon)` array from a function of the coordinates
pub fn layer_from(lons: &[f64], lats: &[f64], f: impl Fn(f64, f64) -> f64) -> Array2<f64> {
    Array2::from_shape_fn((lats.len(), lons.len()), |(i, j)| f(lons[j], lats[i]))
}

/// Writes a 5 degree GRS grid in signed longitude.
///
/// Every element is constant except for the south-westernmost cell, which
/// carries the missing-value marker for all layers.
pub fn create_grs_grid(path: &Path) -> Result<()> {
    let lons = centres(-177.5, 5.0, 72);
    let lats = centres(-87.5, 5.0, 36);
    let missing = |value: f64| {
        move |lon: f64, lat: f64| {
            if lon == -177.5 && lat == -87.5 {
                redplanet::datasets::grs::MISSING_MARKER
            } else {
                value
            }
        }
    };

    let mut raw = RawGrid::new(lons.clone(), lats.clone())
        .with_attribute("title", "GRS test grid")
        .with_layer("th", layer_from(&lons, &lats, missing(GRS_TH_PPM)))
        .with_layer("k", layer_from(&lons, &lats, missing(GRS_K_WT)))
        .with_layer("cl", layer_from(&lons, &lats, missing(GRS_CL_WT)))
        .with_layer("h2o", layer_from(&lons, &lats, missing(GRS_H2O_WT)))
        .with_layer("s", layer_from(&lons, &lats, missing(GRS_S_WT)));
    for (element, value) in [("al", 6.0), ("ca", 5.0), ("fe", 14.0), ("si", 20.0)] {
        raw = raw.with_layer(element, layer_from(&lons, &lats, missing(value)));
    }
    raw = raw.with_layer("th:sigma", layer_from(&lons, &lats, |_, _| 0.1));

    write_raw_grid(path, &raw)
}

/// Writes a 10 degree crust grid in positive longitude.
///
/// Topography is constant in each hemisphere and the moho is flat, so
/// crustal thickness is `TOPO_NORTH - MOHO` north of the equator and
/// `TOPO_SOUTH - MOHO` south of it.
pub fn create_crust_grid(path: &Path) -> Result<()> {
    let lons = centres(5.0, 10.0, 36);
    let lats = centres(-85.0, 10.0, 18);

    let raw = RawGrid::new(lons.clone(), lats.clone())
        .with_attribute("moho_model_RIM", "Khan2022")
        .with_attribute("moho_model_insight_thickness", 40.0)
        .with_attribute("moho_model_rho_south", RHO_SOUTH)
        .with_attribute("moho_model_rho_north", RHO_NORTH)
        .with_layer(
            "topo",
            layer_from(&lons, &lats, |_, lat| {
                if lat > 0.0 {
                    TOPO_NORTH
                } else {
                    TOPO_SOUTH
                }
            }),
        )
        .with_layer("moho", layer_from(&lons, &lats, |_, _| MOHO));

    write_raw_grid(path, &raw)
}

/// Writes a dichotomy that follows the equator
pub fn create_dichotomy(path: &Path) -> Result<()> {
    write_boundary_curve(path, &[(0.0, 0.0), (120.0, 0.0), (240.0, 0.0)])
}

/// Writes a 5 degree magnetic field grid in signed longitude.
///
/// `Br` equals the latitude of the cell, the other components are constant.
pub fn create_mag_grid(path: &Path) -> Result<()> {
    let lons = centres(-177.5, 5.0, 72);
    let lats = centres(-87.5, 5.0, 36);

    let raw = RawGrid::new(lons.clone(), lats.clone())
        .with_attribute("source", "mag test grid")
        .with_layer("Bmag", layer_from(&lons, &lats, |_, _| BMAG))
        .with_layer("Blon", layer_from(&lons, &lats, |_, _| BLON))
        .with_layer("Blat", layer_from(&lons, &lats, |_, _| BLAT))
        .with_layer("Br", layer_from(&lons, &lats, |_, lat| lat));

    write_raw_grid(path, &raw)
}

/// Writes a small crater catalogue; diameters are 10, 45, 154 and 222 km
pub fn create_craters(path: &Path) -> Result<()> {
    let crater = |id: &str, name: Option<&str>, lat: f64, lon: f64, diameter_km: f64| Crater {
        id: id.to_string(),
        name: name.map(str::to_string),
        lat,
        lon,
        diameter_km,
        depth_rimfloor: Some(diameter_km / 50.0),
        num_layers: 0,
    };

    write_craters(
        path,
        &[
            crater("01-000000", Some("Lyot"), 50.5, 29.3, 222.0),
            crater("08-000001", Some("Gale"), -5.4, 137.8, 154.0),
            crater("12-000002", None, 10.0, 350.0, 10.0),
            crater("13-000003", Some("Jezero"), 18.4, 77.5, 45.0),
        ],
    )
}

/// A temporary directory holding one file per dataset
pub struct Fixtures {
    _dir: TempDir,
    pub grs_path: PathBuf,
    pub crust_path: PathBuf,
    pub dichotomy_path: PathBuf,
    pub mag_path: PathBuf,
    pub craters_path: PathBuf,
}

impl Fixtures {
    pub fn create() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let grs_path = dir.path().join("grs.json");
        let crust_path = dir.path().join("crust.json");
        let dichotomy_path = dir.path().join("dichotomy.json");
        let mag_path = dir.path().join("mag.json");
        let craters_path = dir.path().join("craters.json");

        create_grs_grid(&grs_path)?;
        create_crust_grid(&crust_path)?;
        create_dichotomy(&dichotomy_path)?;
        create_mag_grid(&mag_path)?;
        create_craters(&craters_path)?;

        Ok(Self {
            _dir: dir,
            grs_path,
            crust_path,
            dichotomy_path,
            mag_path,
            craters_path,
        })
    }

    /// Configuration pointing at every fixture file
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.data.grs_path = Some(self.grs_path.clone());
        config.data.crust_path = Some(self.crust_path.clone());
        config.data.dichotomy_path = Some(self.dichotomy_path.clone());
        config.data.mag_path = Some(self.mag_path.clone());
        config.data.craters_path = Some(self.craters_path.clone());
        config
    }
}
