//! Raw dataset loading.
//!
//! Datasets arrive already decoded from their source formats as JSON files
//! holding the raw (unpadded) axes and named 2-D layers:
//!
//! ```json
//! { "lon": [...], "lat": [...], "layers": { "topo": [[...], ...] },
//!   "attributes": { "units": "km" }, "cyclic": true }
//! ```
//!
//! Boundary curves are JSON files of the form `{ "vertices": [[lon, lat], ...] }`.
//! The crater catalogue is `{ "craters": [{ "id": .., "name": .., "lat": ..,
//! "lon": .., "diameter_km": .., "depth_rimfloor": .., "num_layers": .. }] }`.
//! Layer rows follow the latitude axis and columns follow the longitude axis.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::boundary::BoundaryCurve;
use crate::datasets::craters::{Crater, CraterDatabase};
use crate::datasets::crust::{CrustDataset, CrustModelParams};
use crate::datasets::grs::GrsDataset;
use crate::datasets::mag::MagDataset;
use crate::error::{RedPlanetError, Result};
use crate::grid::{AttributeValue, GridModel};
use crate::logging::log_dataset_load_stats;

/// On-disk form of a raw grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGridFile {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub layers: BTreeMap<String, Vec<Vec<f64>>>,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
    #[serde(default = "default_cyclic")]
    pub cyclic: bool,
}

/// On-disk form of a boundary curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCurveFile {
    pub vertices: Vec<[f64; 2]>,
}

/// On-disk form of the crater catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCraterFile {
    pub craters: Vec<Crater>,
}

/// Already-parsed raw arrays for one dataset, before padding
#[derive(Debug, Clone)]
pub struct RawGrid {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub layers: HashMap<String, Array2<f64>>,
    pub attributes: HashMap<String, AttributeValue>,
    pub cyclic: bool,
}

impl RawGrid {
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> Self {
        Self {
            lon,
            lat,
            layers: HashMap::new(),
            attributes: HashMap::new(),
            cyclic: true,
        }
    }

    pub fn with_layer(mut self, name: impl Into<String>, values: Array2<f64>) -> Self {
        self.layers.insert(name.into(), values);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Remove and return a layer, failing if it is missing
    pub fn take_layer(&mut self, name: &str) -> Result<Array2<f64>> {
        self.layers
            .remove(name)
            .ok_or_else(|| RedPlanetError::DataShape {
                message: format!("Raw grid is missing layer '{}'", name),
            })
    }

    /// Pad everything into a grid model
    pub fn into_model(self) -> Result<GridModel> {
        self.layers
            .into_iter()
            .fold(
                GridModel::builder(self.lon, self.lat)
                    .cyclic(self.cyclic)
                    .attributes(self.attributes),
                |builder, (name, values)| builder.layer(name, values),
            )
            .build()
    }
}

impl TryFrom<RawGridFile> for RawGrid {
    type Error = RedPlanetError;

    fn try_from(file: RawGridFile) -> Result<Self> {
        let layers = file
            .layers
            .into_iter()
            .map(|(name, rows)| {
                let values = rows_to_array(&name, rows)?;
                Ok((name, values))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            lon: file.lon,
            lat: file.lat,
            layers,
            attributes: file.attributes,
            cyclic: file.cyclic,
        })
    }
}

impl From<&RawGrid> for RawGridFile {
    fn from(raw: &RawGrid) -> Self {
        Self {
            lon: raw.lon.clone(),
            lat: raw.lat.clone(),
            layers: raw
                .layers
                .iter()
                .map(|(name, values)| {
                    let rows = values.rows().into_iter().map(|row| row.to_vec()).collect();
                    (name.clone(), rows)
                })
                .collect(),
            attributes: raw.attributes.clone(),
            cyclic: raw.cyclic,
        }
    }
}

fn default_cyclic() -> bool {
    true
}

/// Convert nested rows into a 2-D array, rejecting ragged input
fn rows_to_array(name: &str, rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);

    if let Some(i) = rows.iter().position(|row| row.len() != n_cols) {
        return Err(RedPlanetError::DataShape {
            message: format!(
                "Layer {} row {} has {} values, expected {}",
                name,
                i,
                rows[i].len(),
                n_cols
            ),
        });
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| RedPlanetError::DataShape {
        message: format!("Layer {} cannot be shaped as ({}, {}): {}", name, n_rows, n_cols, e),
    })
}

fn open_json(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(RedPlanetError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }
    Ok(BufReader::new(File::open(path)?))
}

/// Read a raw grid file
pub fn load_raw_grid(path: &Path) -> Result<RawGrid> {
    let reader = open_json(path)?;
    let file: RawGridFile = serde_json::from_reader(reader)?;

    debug!(
        path = %path.display(),
        lon_points = file.lon.len(),
        lat_points = file.lat.len(),
        layers = file.layers.len(),
        "Parsed raw grid file"
    );

    RawGrid::try_from(file)
}

/// Read a boundary curve file
pub fn load_boundary_curve(path: &Path) -> Result<BoundaryCurve> {
    let reader = open_json(path)?;
    let file: RawCurveFile = serde_json::from_reader(reader)?;

    let curve = BoundaryCurve::new(file.vertices.iter().map(|&[lon, lat]| (lon, lat)))?;
    info!(
        path = %path.display(),
        vertices = curve.len(),
        "Loaded boundary curve"
    );
    Ok(curve)
}

/// Load the GRS element concentration grids
pub fn load_grs(path: &Path) -> Result<GrsDataset> {
    let start = Instant::now();
    let dataset = GrsDataset::from_raw(load_raw_grid(path)?)?;
    log_dataset_load_stats("grs", &path.display().to_string(), dataset.model(), start);
    Ok(dataset)
}

/// Load the crust topography/moho grids and the dichotomy curve
///
/// Model parameters come from the grid's attributes when `params` is `None`.
pub fn load_crust(
    grid_path: &Path,
    dichotomy_path: &Path,
    params: Option<CrustModelParams>,
) -> Result<CrustDataset> {
    let start = Instant::now();
    let dichotomy = load_boundary_curve(dichotomy_path)?;
    let raw = load_raw_grid(grid_path)?;
    let dataset = CrustDataset::from_raw(raw, params, dichotomy)?;
    log_dataset_load_stats(
        "crust",
        &grid_path.display().to_string(),
        dataset.model(),
        start,
    );
    Ok(dataset)
}

/// Load the crustal magnetic field grids
pub fn load_mag(path: &Path) -> Result<MagDataset> {
    let start = Instant::now();
    let raw = load_raw_grid(path)?;
    if !raw.cyclic {
        warn!(path = %path.display(), "Magnetic field grid is not marked cyclic");
    }
    let dataset = MagDataset::from_raw(raw)?;
    log_dataset_load_stats("mag", &path.display().to_string(), dataset.model(), start);
    Ok(dataset)
}

/// Load the crater catalogue
pub fn load_craters(path: &Path) -> Result<CraterDatabase> {
    let start = Instant::now();
    let reader = open_json(path)?;
    let file: RawCraterFile = serde_json::from_reader(reader)?;
    let database = CraterDatabase::new(file.craters)?;

    info!(
        operation = "dataset_load",
        dataset = "craters",
        path = %path.display(),
        craters = database.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Dataset loaded"
    );
    Ok(database)
}

/// Write a raw grid file
pub fn write_raw_grid(path: &Path, raw: &RawGrid) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer(file, &RawGridFile::from(raw))?;
    Ok(())
}

/// Write a boundary curve file
pub fn write_boundary_curve(path: &Path, vertices: &[(f64, f64)]) -> Result<()> {
    let file = File::create(path)?;
    let curve = RawCurveFile {
        vertices: vertices.iter().map(|&(lon, lat)| [lon, lat]).collect(),
    };
    serde_json::to_writer(file, &curve)?;
    Ok(())
}

/// Write a crater catalogue file
pub fn write_craters(path: &Path, craters: &[Crater]) -> Result<()> {
    let file = File::create(path)?;
    let catalogue = RawCraterFile {
        craters: craters.to_vec(),
    };
    serde_json::to_writer(file, &catalogue)?;
    Ok(())
}
