//! Metadata endpoint handler.
//!
//! Without parameters, lists every dataset with its vocabulary and whether it
//! is configured and loaded. With `?dataset=<name>` the dataset is loaded if
//! needed and its full description returned.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::error_response;
use crate::coords::CoordRange;
use crate::datasets::craters::CraterSummary;
use crate::datasets::{DatasetHandle, DatasetInfo};
use crate::error::Result;
use crate::grid::NANVAL;
use crate::interpolation::InterpolationMethod;
use crate::logging::generate_request_id;
use crate::state::{AppState, DatasetRegistry};

/// Query parameters for metadata endpoint
#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    pub dataset: Option<String>,
}

/// Catalogue entry for one dataset
#[derive(Debug, Serialize)]
pub struct DatasetEntry {
    pub dataset: DatasetHandle,
    pub quantities: &'static [&'static str],
    pub configured: bool,
    pub loaded: bool,
}

/// Catalogue entry for the crater table, served by `/craters`
#[derive(Debug, Serialize)]
pub struct CraterEntry {
    pub configured: bool,
    pub loaded: bool,
    /// Present once the table is in memory
    pub summary: Option<CraterSummary>,
}

/// Response for the catalogue listing
#[derive(Debug, Serialize)]
pub struct CatalogueResponse {
    pub nan_sentinel: f64,
    pub default_method: InterpolationMethod,
    pub interpolation_methods: [InterpolationMethod; 2],
    pub lat_range: CoordRange,
    pub datasets: Vec<DatasetEntry>,
    pub craters: CraterEntry,
}

fn catalogue(registry: &DatasetRegistry, default_method: InterpolationMethod) -> CatalogueResponse {
    CatalogueResponse {
        nan_sentinel: NANVAL,
        default_method,
        interpolation_methods: [InterpolationMethod::Nearest, InterpolationMethod::Linear],
        lat_range: CoordRange::LAT,
        datasets: DatasetHandle::ALL
            .into_iter()
            .map(|dataset| DatasetEntry {
                dataset,
                quantities: dataset.quantities(),
                configured: registry.is_configured(dataset),
                loaded: registry.is_loaded(dataset),
            })
            .collect(),
        craters: CraterEntry {
            configured: registry.craters_configured(),
            loaded: registry.craters_loaded(),
            summary: registry.loaded_craters().map(|db| db.summary()),
        },
    }
}

/// Handle GET /metadata requests
pub async fn metadata_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetadataQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/metadata",
        request_id = %request_id,
        dataset = ?params.dataset,
        "Processing metadata request"
    );

    let Some(name) = params.dataset else {
        let response = catalogue(&state.registry, state.default_method);
        info!(
            endpoint = "/metadata",
            request_id = %request_id,
            duration_us = start_time.elapsed().as_micros() as u64,
            "Metadata request successful"
        );
        return (StatusCode::OK, Json(response)).into_response();
    };

    let describe = || -> Result<DatasetInfo> {
        let handle: DatasetHandle = name.parse()?;
        state.registry.info(handle)
    };

    match describe() {
        Ok(info) => {
            info!(
                endpoint = "/metadata",
                request_id = %request_id,
                dataset = %info.dataset,
                duration_us = start_time.elapsed().as_micros() as u64,
                "Metadata request successful"
            );
            (StatusCode::OK, Json(info)).into_response()
        }
        Err(error) => error_response(
            error,
            "/metadata",
            &request_id,
            Some(&format!("dataset={}", name)),
        ),
    }
}
