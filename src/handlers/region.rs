//! Region query endpoint handler.
//!
//! Evaluates one quantity over a longitude/latitude mesh. The mesh comes from
//! explicit comma-separated axes (`lons`, `lats`), from bounds plus a
//! `spacing`, or from bounds plus `lon_count`/`lat_count`.

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
use crate::error::{RedPlanetError, Result};
use crate::grid::NANVAL;
use crate::interpolation::InterpolationMethod;
use crate::logging::generate_request_id;
use crate::query::{self, RegionSpec};
use crate::state::AppState;

/// Query parameters for region endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RegionQuery {
    pub dataset: String,
    pub quantity: String,
    /// Comma-separated longitudes
    pub lons: Option<String>,
    /// Comma-separated latitudes
    pub lats: Option<String>,
    pub lon_min: Option<f64>,
    pub lon_max: Option<f64>,
    pub lat_min: Option<f64>,
    pub lat_max: Option<f64>,
    pub spacing: Option<f64>,
    pub lon_count: Option<usize>,
    pub lat_count: Option<usize>,
    pub method: Option<String>,
    pub normalize: Option<bool>,
    pub t_ga: Option<f64>,
    pub q_b_mw: Option<f64>,
    pub k_cr: Option<f64>,
    pub k_m: Option<f64>,
}

impl RegionQuery {
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

    /// Work out which kind of mesh was asked for
    pub fn region_spec(&self) -> Result<RegionSpec> {
        if let (Some(lons), Some(lats)) = (&self.lons, &self.lats) {
            return Ok(RegionSpec::Points {
                lons: parse_list("lons", lons)?,
                lats: parse_list("lats", lats)?,
            });
        }

        let bounds = |param: &str, lo: Option<f64>, hi: Option<f64>| match (lo, hi) {
            (Some(lo), Some(hi)) => Ok((lo, hi)),
            _ => Err(RedPlanetError::InvalidParameter {
                param: param.to_string(),
                message: format!("Both {0}_min and {0}_max are required", param),
            }),
        };
        let lon_bounds = bounds("lon", self.lon_min, self.lon_max)?;
        let lat_bounds = bounds("lat", self.lat_min, self.lat_max)?;

        match (self.spacing, self.lon_count, self.lat_count) {
            (Some(spacing), None, None) => Ok(RegionSpec::Spacing {
                lon_bounds,
                lat_bounds,
                spacing,
            }),
            (None, Some(lon_count), Some(lat_count)) => Ok(RegionSpec::Count {
                lon_bounds,
                lat_bounds,
                lon_count,
                lat_count,
            }),
            _ => Err(RedPlanetError::InvalidParameter {
                param: "spacing".to_string(),
                message: "Give either spacing, or both lon_count and lat_count".to_string(),
            }),
        }
    }
}

fn parse_list(param: &str, list: &str) -> Result<Vec<f64>> {
    list.split(',')
        .map(|item| {
            item.trim()
                .parse::<f64>()
                .map_err(|_| RedPlanetError::InvalidParameter {
                    param: param.to_string(),
                    message: format!("Invalid number '{}'", item),
                })
        })
        .collect()
}

/// Response for region query
#[derive(Debug, Serialize, Deserialize)]
pub struct RegionResponse {
    pub dataset: DatasetHandle,
    pub quantity: String,
    pub method: InterpolationMethod,
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    /// One row per latitude
    pub values: Vec<Vec<f64>>,
    /// Number of cells holding the undefined-measurement sentinel
    pub undefined_count: usize,
}

/// Handle GET /region requests
pub async fn region_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/region",
        request_id = %request_id,
        dataset = %params.dataset,
        quantity = %params.quantity,
        "Processing region query"
    );

    // Dataset loads and mesh evaluation are blocking work
    let task_params = params.clone();
    let result = tokio::task::spawn_blocking(move || process_region_query(&state, &task_params))
        .await
        .unwrap_or_else(|e| {
            Err(RedPlanetError::Server {
                message: format!("Region task failed: {}", e),
            })
        });

    match result {
        Ok(response) => {
            info!(
                endpoint = "/region",
                request_id = %request_id,
                duration_us = start_time.elapsed().as_micros() as u64,
                lon_points = response.lons.len(),
                lat_points = response.lats.len(),
                undefined_count = response.undefined_count,
                "Region query successful"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => error_response(
            error,
            "/region",
            &request_id,
            Some(&format!(
                "dataset={}, quantity={}",
                params.dataset, params.quantity
            )),
        ),
    }
}

fn process_region_query(state: &AppState, params: &RegionQuery) -> Result<RegionResponse> {
    let handle: DatasetHandle = params.dataset.parse()?;
    let options = params.option_params().resolve(state.default_method)?;
    let spec = params.region_spec()?;

    let grid = query::region_grid(
        &state.registry,
        handle,
        &params.quantity,
        &spec,
        &options,
        Some(state.config.data.max_region_points),
    )?;

    let undefined_count = grid.values.iter().filter(|&&v| v == NANVAL).count();
    Ok(RegionResponse {
        dataset: handle,
        quantity: params.quantity.clone(),
        method: options.method,
        values: grid.rows(),
        lons: grid.lons,
        lats: grid.lats,
        undefined_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::data_loader::RawGrid;
    use crate::datasets::grs::GrsDataset;
    use ndarray::Array2;

    fn query() -> RegionQuery {
        RegionQuery {
            dataset: "grs".to_string(),
            quantity: "th".to_string(),
            lons: None,
            lats: None,
            lon_min: None,
            lon_max: None,
            lat_min: None,
            lat_max: None,
            spacing: None,
            lon_count: None,
            lat_count: None,
            method: None,
            normalize: None,
            t_ga: None,
            q_b_mw: None,
            k_cr: None,
            k_m: None,
        }
    }

    fn state(max_region_points: usize) -> AppState {
        let raw = RawGrid::new(vec![-135.0, -45.0, 45.0, 135.0], vec![-45.0, 45.0])
            .with_layer("th", Array2::from_elem((2, 4), 2.0));
        let mut config = Config::default();
        config.data.max_region_points = max_region_points;
        let state = AppState::new(config).unwrap();
        state.registry.set_grs(GrsDataset::from_raw(raw).unwrap()).unwrap();
        state
    }

    #[test]
    fn test_region_spec_selection() {
        let mut q = query();
        q.lons = Some("0, 10,20".to_string());
        q.lats = Some("5".to_string());
        assert_eq!(
            q.region_spec().unwrap(),
            RegionSpec::Points {
                lons: vec![0.0, 10.0, 20.0],
                lats: vec![5.0]
            }
        );

        let mut q = query();
        q.lon_min = Some(0.0);
        q.lon_max = Some(10.0);
        q.lat_min = Some(0.0);
        q.lat_max = Some(10.0);
        q.spacing = Some(5.0);
        assert!(matches!(q.region_spec().unwrap(), RegionSpec::Spacing { .. }));

        q.lon_count = Some(3);
        assert!(q.region_spec().is_err());

        let mut q = query();
        q.lon_min = Some(0.0);
        q.spacing = Some(1.0);
        assert!(q.region_spec().is_err());
    }

    #[test]
    fn test_parse_list_rejects_garbage() {
        assert!(parse_list("lons", "1,two,3").is_err());
    }

    #[test]
    fn test_region_query() {
        let state = state(100);
        let mut q = query();
        q.lon_min = Some(-10.0);
        q.lon_max = Some(10.0);
        q.lat_min = Some(0.0);
        q.lat_max = Some(5.0);
        q.lon_count = Some(3);
        q.lat_count = Some(2);

        let response = process_region_query(&state, &q).unwrap();
        assert_eq!(response.lons, vec![-10.0, 0.0, 10.0]);
        assert_eq!(response.values.len(), 2);
        assert_eq!(response.values[0].len(), 3);
        assert_eq!(response.undefined_count, 0);
        for row in &response.values {
            for &v in row {
                assert!((v - 2e-6).abs() < 1e-18);
            }
        }
    }

    #[test]
    fn test_region_too_large() {
        let state = state(4);
        let mut q = query();
        q.lons = Some("0,1,2".to_string());
        q.lats = Some("0,1".to_string());
        assert!(matches!(
            process_region_query(&state, &q),
            Err(RedPlanetError::PayloadTooLarge { .. })
        ));
    }
}
