//! HTTP request handlers for the redplanet API.
//!
//! This module contains all the endpoint handlers for the web server and the
//! router that wires them together.

pub mod craters;
pub mod heartbeat;
pub mod metadata;
pub mod point;
pub mod region;

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::datasets::heat::HeatParams;
use crate::error::{RedPlanetError, Result};
use crate::interpolation::InterpolationMethod;
use crate::logging::{create_http_trace_layer, log_request_error};
use crate::query::QueryOptions;
use crate::state::AppState;

pub use craters::{crater_lookup_handler, craters_handler};
pub use heartbeat::heartbeat_handler;
pub use metadata::metadata_handler;
pub use point::point_handler;
pub use region::region_handler;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/point", get(point_handler))
        .route("/region", get(region_handler))
        .route("/craters", get(craters_handler))
        .route("/craters/:name", get(crater_lookup_handler))
        .route("/metadata", get(metadata_handler))
        .route("/heartbeat", get(heartbeat_handler))
        .layer(create_http_trace_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Query-string knobs shared by the value endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionParams<'a> {
    pub method: Option<&'a str>,
    pub normalize: Option<bool>,
    pub t_ga: Option<f64>,
    pub q_b_mw: Option<f64>,
    pub k_cr: Option<f64>,
    pub k_m: Option<f64>,
}

impl OptionParams<'_> {
    /// Resolve against the server default method
    ///
    /// `normalize` defaults to off for GRS and on for the heat model.
    pub fn resolve(&self, default_method: InterpolationMethod) -> Result<QueryOptions> {
        let method = match self.method {
            Some(name) => name.parse()?,
            None => default_method,
        };

        let defaults = HeatParams::default();
        let heat = HeatParams {
            t_ga: self.t_ga.unwrap_or(defaults.t_ga),
            q_b_mw: self.q_b_mw.unwrap_or(defaults.q_b_mw),
            k_cr: self.k_cr.unwrap_or(defaults.k_cr),
            k_m: self.k_m.unwrap_or(defaults.k_m),
            normalize: self.normalize.unwrap_or(defaults.normalize),
        };
        heat.validate()?;

        Ok(QueryOptions {
            method,
            normalize: self.normalize.unwrap_or(false),
            heat,
        })
    }
}

/// JSON error body with the mapped status, logged against the request
pub(crate) fn error_response(
    error: RedPlanetError,
    endpoint: &str,
    request_id: &str,
    params: Option<&str>,
) -> Response {
    log_request_error(&error, endpoint, request_id, params);

    (
        error.status_code(),
        Json(serde_json::json!({
            "error": error.to_string(),
            "kind": error.kind(),
            "request_id": request_id
        })),
    )
        .into_response()
}
