//! Point query endpoint handler.
//!
//! Returns the value of one quantity of one dataset at a single coordinate.

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

use super::{error_response, OptionParams};
use crate::datasets::DatasetHandle;
use crate::error::Result;
use crate::interpolation::InterpolationMethod;
use crate::logging::generate_request_id;
use crate::query;
use crate::state::AppState;

/// Query parameters for point endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PointQuery {
    /// grs, crust, mag or heat
    pub dataset: String,
    /// Quantity in the dataset's vocabulary
    pub quantity: String,
    pub lon: f64,
    pub lat: f64,
    /// Interpolation method (nearest, linear)
    pub method: Option<String>,
    /// Volatile-free GRS concentrations
    pub normalize: Option<bool>,
    pub t_ga: Option<f64>,
    pub q_b_mw: Option<f64>,
    pub k_cr: Option<f64>,
    pub k_m: Option<f64>,
}

impl PointQuery {
    fn option_params(&self) -> OptionParams<'_> {
        OptionParams {
            method: self.method.as_deref(),
            normalize: self.normalize,
            t_ga: self.t_ga,
            q_b_mw: self.q_b_mw,
            k_cr: self.k_cr,
            k_m: self.k_m,
        }
    }
}

/// Response for point query
#[derive(Debug, Serialize, Deserialize)]
pub struct PointResponse {
    pub dataset: DatasetHandle,
    pub quantity: String,
    pub lon: f64,
    pub lat: f64,
    pub method: InterpolationMethod,
    pub value: f64,
    /// The value is the undefined-measurement sentinel
    pub undefined: bool,
}

/// Handle GET /point requests
pub async fn point_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/point",
        request_id = %request_id,
        dataset = %params.dataset,
        quantity = %params.quantity,
        lon = params.lon,
        lat = params.lat,
        "Processing point query"
    );

    match process_point_query(&state, &params) {
        Ok(response) => {
            info!(
                endpoint = "/point",
                request_id = %request_id,
                duration_us = start_time.elapsed().as_micros() as u64,
                undefined = response.undefined,
                "Point query successful"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => error_response(
            error,
            "/point",
            &request_id,
            Some(&format!(
                "dataset={}, quantity={}, lon={}, lat={}",
                params.dataset, params.quantity, params.lon, params.lat
            )),
        ),
    }
}

fn process_point_query(state: &AppState, params: &PointQuery) -> Result<PointResponse> {
    let handle: DatasetHandle = params.dataset.parse()?;
    let options = params.option_params().resolve(state.default_method)?;

    let value = query::get(
        &state.registry,
        handle,
        &params.quantity,
        params.lon,
        params.lat,
        &options,
    )?;

    Ok(PointResponse {
        dataset: handle,
        quantity: params.quantity.clone(),
        lon: params.lon,
        lat: params.lat,
        method: options.method,
        value,
        undefined: value == crate::grid::NANVAL,
    })
}
