//! Crater catalogue endpoint handlers.
//!
//! `GET /craters?min_diam=&max_diam=` lists craters whose diameter falls in
//! the inclusive range. `GET /craters/:name` looks a single crater up by name,
//! falling back to its ID.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::error_response;
use crate::datasets::craters::{Crater, DEFAULT_MAX_DIAMETER_KM, DEFAULT_MIN_DIAMETER_KM};
use crate::error::{RedPlanetError, Result};
use crate::logging::generate_request_id;
use crate::state::AppState;

/// Query parameters for the crater listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CraterQuery {
    /// Smallest diameter to include, km
    pub min_diam: Option<f64>,
    /// Largest diameter to include, km
    pub max_diam: Option<f64>,
}

/// Response for the crater listing
#[derive(Debug, Serialize, Deserialize)]
pub struct CraterListResponse {
    pub min_diam: f64,
    pub max_diam: f64,
    pub count: usize,
    pub craters: Vec<Crater>,
}

/// Handle GET /craters requests
pub async fn craters_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CraterQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/craters",
        request_id = %request_id,
        min_diam = ?params.min_diam,
        max_diam = ?params.max_diam,
        "Processing crater listing"
    );

    // First use reads the catalogue from disk
    let task_state = Arc::clone(&state);
    let task_params = params.clone();
    let result = tokio::task::spawn_blocking(move || list_craters(&task_state, &task_params))
        .await
        .unwrap_or_else(|e| {
            Err(RedPlanetError::Server {
                message: format!("Crater task failed: {}", e),
            })
        });

    match result {
        Ok(response) => {
            info!(
                endpoint = "/craters",
                request_id = %request_id,
                duration_us = start_time.elapsed().as_micros() as u64,
                count = response.count,
                "Crater listing successful"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => error_response(
            error,
            "/craters",
            &request_id,
            Some(&format!(
                "min_diam={:?}, max_diam={:?}",
                params.min_diam, params.max_diam
            )),
        ),
    }
}

/// Handle GET /craters/:name requests
pub async fn crater_lookup_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    let request_id = generate_request_id();

    let lookup = name.clone();
    let result = tokio::task::spawn_blocking(move || find_crater(&state, &lookup))
        .await
        .unwrap_or_else(|e| {
            Err(RedPlanetError::Server {
                message: format!("Crater task failed: {}", e),
            })
        });

    match result {
        Ok(crater) => {
            debug!(
                endpoint = "/craters/:name",
                request_id = %request_id,
                crater = %crater.id,
                "Crater lookup successful"
            );
            (StatusCode::OK, Json(crater)).into_response()
        }
        Err(error) => error_response(
            error,
            "/craters/:name",
            &request_id,
            Some(&format!("name={}", name)),
        ),
    }
}

fn list_craters(state: &AppState, params: &CraterQuery) -> Result<CraterListResponse> {
    let min_diam = params.min_diam.unwrap_or(DEFAULT_MIN_DIAMETER_KM);
    let max_diam = params.max_diam.unwrap_or(DEFAULT_MAX_DIAMETER_KM);

    let database = state.registry.craters()?;
    let craters: Vec<Crater> = database
        .filter_by_diameter(min_diam, max_diam)?
        .into_iter()
        .cloned()
        .collect();

    Ok(CraterListResponse {
        min_diam,
        max_diam,
        count: craters.len(),
        craters,
    })
}

fn find_crater(state: &AppState, name_or_id: &str) -> Result<Crater> {
    state.registry.craters()?.find(name_or_id).cloned()
}
