//! Application state management for redplanet.
//!
//! Datasets are built from their configured files on first use and then
//! shared read-only. The GRS and magnetic field grids never change once
//! built; the crust model can be swapped wholesale for one with different
//! model parameters while queries keep reading the previous one.

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{Config, DataConfig};
use crate::data_loader::{load_craters, load_crust, load_grs, load_mag};
use crate::datasets::craters::CraterDatabase;
use crate::datasets::crust::{CrustDataset, CrustModelParams};
use crate::datasets::grs::GrsDataset;
use crate::datasets::heat::HeatDataset;
use crate::datasets::mag::MagDataset;
use crate::datasets::{Dataset, DatasetHandle, DatasetInfo};
use crate::error::{RedPlanetError, Result};
use crate::interpolation::InterpolationMethod;
use crate::logging::{log_error, log_operation_end, log_operation_start, log_timed_operation};

/// Name the crater catalogue goes by in logs and errors
pub const CRATERS: &str = "craters";

/// Where each dataset is loaded from
#[derive(Debug, Clone, Default)]
pub struct DataSources {
    pub grs_path: Option<PathBuf>,
    pub crust_path: Option<PathBuf>,
    pub dichotomy_path: Option<PathBuf>,
    pub mag_path: Option<PathBuf>,
    pub craters_path: Option<PathBuf>,
    pub crust_model: Option<CrustModelParams>,
}

impl From<&DataConfig> for DataSources {
    fn from(data: &DataConfig) -> Self {
        Self {
            grs_path: data.grs_path.clone(),
            crust_path: data.crust_path.clone(),
            dichotomy_path: data.dichotomy_path.clone(),
            mag_path: data.mag_path.clone(),
            craters_path: data.craters_path.clone(),
            crust_model: data.crust_model.clone(),
        }
    }
}

fn require_path<'a>(
    dataset: impl fmt::Display,
    name: &str,
    path: Option<&'a PathBuf>,
) -> Result<&'a Path> {
    path.map(PathBuf::as_path)
        .ok_or_else(|| RedPlanetError::DatasetUnavailable {
            dataset: dataset.to_string(),
            message: format!("no {} configured", name),
        })
}

/// Lazily built, shared datasets
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    sources: DataSources,
    grs: OnceCell<Arc<GrsDataset>>,
    mag: OnceCell<Arc<MagDataset>>,
    craters: OnceCell<Arc<CraterDatabase>>,
    crust: RwLock<Option<Arc<CrustDataset>>>,
    // Serializes crust builds so concurrent first callers load once
    crust_init: Mutex<()>,
}

impl DatasetRegistry {
    pub fn new(sources: DataSources) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn sources(&self) -> &DataSources {
        &self.sources
    }

    /// GRS dataset, loading it on first use
    pub fn grs(&self) -> Result<Arc<GrsDataset>> {
        self.grs
            .get_or_try_init(|| {
                let path = require_path(DatasetHandle::Grs, "grs_path", self.sources.grs_path.as_ref())?;
                load_grs(path).map(Arc::new)
            })
            .map(Arc::clone)
    }

    /// Magnetic field dataset, loading it on first use
    pub fn mag(&self) -> Result<Arc<MagDataset>> {
        self.mag
            .get_or_try_init(|| {
                let path = require_path(DatasetHandle::Mag, "mag_path", self.sources.mag_path.as_ref())?;
                load_mag(path).map(Arc::new)
            })
            .map(Arc::clone)
    }

    /// Crater catalogue, loading it on first use
    pub fn craters(&self) -> Result<Arc<CraterDatabase>> {
        self.craters
            .get_or_try_init(|| {
                let path = require_path(CRATERS, "craters_path", self.sources.craters_path.as_ref())?;
                load_craters(path).map(Arc::new)
            })
            .map(Arc::clone)
    }

    /// Crater catalogue if it is already in memory; never loads
    pub fn loaded_craters(&self) -> Option<Arc<CraterDatabase>> {
        self.craters.get().cloned()
    }

    pub fn craters_loaded(&self) -> bool {
        self.craters.get().is_some()
    }

    pub fn craters_configured(&self) -> bool {
        self.sources.craters_path.is_some() || self.craters_loaded()
    }

    /// Current crust dataset, loading it on first use
    pub fn crust(&self) -> Result<Arc<CrustDataset>> {
        if let Some(crust) = self.crust.read().as_ref() {
            return Ok(Arc::clone(crust));
        }

        let _guard = self.crust_init.lock();
        if let Some(crust) = self.crust.read().as_ref() {
            return Ok(Arc::clone(crust));
        }

        let crust = Arc::new(self.load_crust_from_sources(self.sources.crust_model.clone())?);
        *self.crust.write() = Some(Arc::clone(&crust));
        Ok(crust)
    }

    fn load_crust_from_sources(&self, params: Option<CrustModelParams>) -> Result<CrustDataset> {
        let grid = require_path(DatasetHandle::Crust, "crust_path", self.sources.crust_path.as_ref())?;
        let dichotomy = require_path(
            DatasetHandle::Crust,
            "dichotomy_path",
            self.sources.dichotomy_path.as_ref(),
        )?;
        load_crust(grid, dichotomy, params)
    }

    /// Heat model over the current GRS and crust datasets
    pub fn heat(&self) -> Result<HeatDataset> {
        Ok(HeatDataset::new(self.grs()?, self.crust()?))
    }

    /// Swap in a new crust model, returning the previous one
    ///
    /// Queries already holding the previous model finish against it.
    pub fn replace_crust(&self, crust: CrustDataset) -> Option<Arc<CrustDataset>> {
        let _guard = self.crust_init.lock();
        info!(model = %crust.model_name(), "Replacing crust model");
        self.crust.write().replace(Arc::new(crust))
    }

    /// Reload the crust grids under different model parameters
    pub fn reload_crust(&self, params: CrustModelParams) -> Result<Arc<CrustDataset>> {
        let crust = log_timed_operation("reload_crust", || {
            self.load_crust_from_sources(Some(params))
        })?;
        self.replace_crust(crust);
        self.crust()
    }

    /// Install an already built GRS dataset; fails if one is loaded
    pub fn set_grs(&self, grs: GrsDataset) -> Result<()> {
        self.grs
            .set(Arc::new(grs))
            .map_err(|_| already_loaded(DatasetHandle::Grs))
    }

    /// Install an already built magnetic field dataset; fails if one is loaded
    pub fn set_mag(&self, mag: MagDataset) -> Result<()> {
        self.mag
            .set(Arc::new(mag))
            .map_err(|_| already_loaded(DatasetHandle::Mag))
    }

    /// Install an already built crater catalogue; fails if one is loaded
    pub fn set_craters(&self, craters: CraterDatabase) -> Result<()> {
        self.craters
            .set(Arc::new(craters))
            .map_err(|_| already_loaded(CRATERS))
    }

    pub fn is_loaded(&self, handle: DatasetHandle) -> bool {
        match handle {
            DatasetHandle::Grs => self.grs.get().is_some(),
            DatasetHandle::Crust => self.crust.read().is_some(),
            DatasetHandle::Mag => self.mag.get().is_some(),
            DatasetHandle::Heat => {
                self.is_loaded(DatasetHandle::Grs) && self.is_loaded(DatasetHandle::Crust)
            }
        }
    }

    /// Whether a dataset could be built from the configured sources
    pub fn is_configured(&self, handle: DatasetHandle) -> bool {
        let s = &self.sources;
        match handle {
            DatasetHandle::Grs => s.grs_path.is_some() || self.is_loaded(handle),
            DatasetHandle::Crust => {
                (s.crust_path.is_some() && s.dichotomy_path.is_some()) || self.is_loaded(handle)
            }
            DatasetHandle::Mag => s.mag_path.is_some() || self.is_loaded(handle),
            DatasetHandle::Heat => {
                self.is_configured(DatasetHandle::Grs) && self.is_configured(DatasetHandle::Crust)
            }
        }
    }

    /// Description of a dataset, loading it if needed
    pub fn info(&self, handle: DatasetHandle) -> Result<DatasetInfo> {
        Ok(match handle {
            DatasetHandle::Grs => self.grs()?.info(),
            DatasetHandle::Crust => self.crust()?.info(),
            DatasetHandle::Mag => self.mag()?.info(),
            DatasetHandle::Heat => self.heat()?.info(),
        })
    }

    /// Descriptions of the datasets already in memory
    pub fn loaded_info(&self) -> Vec<DatasetInfo> {
        DatasetHandle::ALL
            .into_iter()
            .filter(|&handle| self.is_loaded(handle))
            .filter_map(|handle| self.info(handle).ok())
            .collect()
    }

    /// Approximate memory held by loaded grids, in bytes
    pub fn memory_usage(&self) -> usize {
        let grs = self.grs.get().map_or(0, |d| d.model().memory_usage());
        let mag = self.mag.get().map_or(0, |d| d.model().memory_usage());
        let crust = self.crust.read().as_ref().map_or(0, |d| d.model().memory_usage());
        grs + mag + crust
    }

    /// Load every configured dataset now, failing on the first error
    ///
    /// Returns the names of the datasets that were loaded.
    pub fn preload(&self) -> Result<Vec<&'static str>> {
        let start = Instant::now();
        log_operation_start("preload", None);

        let steps: [(&'static str, bool, &dyn Fn() -> Result<()>); 4] = [
            (
                DatasetHandle::Grs.as_str(),
                self.is_configured(DatasetHandle::Grs),
                &|| self.grs().map(drop),
            ),
            (
                DatasetHandle::Crust.as_str(),
                self.is_configured(DatasetHandle::Crust),
                &|| self.crust().map(drop),
            ),
            (
                DatasetHandle::Mag.as_str(),
                self.is_configured(DatasetHandle::Mag),
                &|| self.mag().map(drop),
            ),
            (CRATERS, self.craters_configured(), &|| self.craters().map(drop)),
        ];

        let mut loaded = Vec::new();
        for (name, configured, load) in steps {
            if !configured {
                warn!(dataset = name, "No source configured, skipping preload");
                continue;
            }
            if let Err(e) = load() {
                log_error(&e, &format!("preloading {}", name));
                log_operation_end("preload", start, false);
                return Err(e);
            }
            loaded.push(name);
        }

        log_operation_end("preload", start, true);
        Ok(loaded)
    }
}

fn already_loaded(dataset: impl fmt::Display) -> RedPlanetError {
    RedPlanetError::InvalidOperation {
        message: format!("Dataset {} is already loaded", dataset),
    }
}

/// The main application state shared across all handlers
#[derive(Debug)]
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Default interpolation method, parsed from the configuration
    pub default_method: InterpolationMethod,
    pub registry: Arc<DatasetRegistry>,
}

impl AppState {
    /// Create a new AppState with a registry over the configured sources
    pub fn new(config: Config) -> Result<Self> {
        let registry = Arc::new(DatasetRegistry::new(DataSources::from(&config.data)));
        Self::with_registry(config, registry)
    }

    /// Create an AppState over an existing registry
    pub fn with_registry(config: Config, registry: Arc<DatasetRegistry>) -> Result<Self> {
        let default_method = config.interpolation_method()?;
        Ok(Self {
            config,
            default_method,
            registry,
        })
    }

    /// Create a new AppState wrapped in an Arc for shared ownership
    pub fn new_shared(config: Config) -> Result<Arc<Self>> {
        Self::new(config).map(Arc::new)
    }
}
