//! # redplanet
//!
//! Coordinate-indexed queries over Mars raster datasets, held in memory.
//!
//! Raw grids are padded once at load time so that every valid query falls
//! strictly inside the axes, then read through nearest-neighbour or bilinear
//! interpolation. Derived quantities (crustal thickness, density across the
//! dichotomy, volatile-free concentrations, heat production and geotherms) are
//! composed from interpolated base layers.
//!
//! ## Datasets
//!
//! - **GRS**: Gamma Ray Spectrometer element concentrations
//! - **Crust**: topography, moho depth, crustal thickness and density
//! - **Mag**: crustal magnetic field components
//! - **Heat**: heat production and temperature profiles built on GRS and Crust
//! - **Craters**: catalogue of impact craters, filtered by diameter or looked up by name
//!
//! Locations without a measurement evaluate to [`NANVAL`], never to an error.
//!
//! ## Architecture
//!
//! - **Data Layer**: [`data_loader`] reads raw grids, [`grid`] pads them
//! - **Query Layer**: [`query`] validates and dispatches to [`datasets`]
//! - **API Layer**: [`handlers`] exposes queries over HTTP

pub mod boundary;
pub mod config;
pub mod coords;
pub mod data_loader;
pub mod datasets;
pub mod derived;
pub mod error;
pub mod grid;
pub mod handlers;
pub mod interpolation;
pub mod logging;
pub mod query;
pub mod state;

pub use config::Config;
pub use datasets::{Dataset, DatasetHandle, DatasetInfo};
pub use error::{RedPlanetError, Result};
pub use grid::{GridModel, NANVAL};
pub use interpolation::InterpolationMethod;
pub use logging::{
    create_http_trace_layer, generate_request_id, init_tracing, log_dataset_load_stats, log_error,
    log_operation_end, log_operation_start, log_request_error, log_timed_operation,
};
pub use query::{get, get_region, region_grid, QueryOptions, RegionGrid, RegionSpec};
pub use state::{AppState, DataSources, DatasetRegistry};
