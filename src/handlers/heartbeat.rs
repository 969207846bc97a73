//! Heartbeat endpoint handler.
//!
//! Returns server status information, including uptime, memory usage, and
//! which datasets are currently in memory.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::datasets::DatasetHandle;
use crate::state::AppState;

/// Random ID for this server process
static SERVER_ID: once_cell::sync::Lazy<String> =
    once_cell::sync::Lazy::new(|| Uuid::new_v4().to_string());

/// Server start time
static START_TIME: once_cell::sync::Lazy<SystemTime> = once_cell::sync::Lazy::new(SystemTime::now);

/// Heartbeat response structure
#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    /// Server ID (unique per instance)
    pub server_id: String,
    /// Current timestamp (ISO 8601 format)
    pub timestamp: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Process memory usage in bytes
    pub memory_usage_bytes: Option<u64>,
    /// Available system memory in bytes
    pub available_memory_bytes: Option<u64>,
    /// Approximate memory held by loaded grids in bytes
    pub data_memory_bytes: usize,
    /// Datasets currently in memory
    pub loaded_datasets: Vec<DatasetHandle>,
    /// Datasets that can be loaded from the configured sources
    pub configured_datasets: Vec<DatasetHandle>,
    /// The crater catalogue is in memory
    pub craters_loaded: bool,
    /// Server status
    pub status: String,
}

/// Touch the lazily initialised process statics so uptime counts from startup
pub fn mark_start() {
    once_cell::sync::Lazy::force(&START_TIME);
    once_cell::sync::Lazy::force(&SERVER_ID);
}

/// Handle GET /heartbeat requests
pub async fn heartbeat_handler(State(state): State<Arc<AppState>>) -> Json<HeartbeatResponse> {
    Json(build_heartbeat(&state))
}

fn build_heartbeat(state: &AppState) -> HeartbeatResponse {
    let now = SystemTime::now();
    let timestamp = chrono::DateTime::<chrono::Utc>::from(now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let uptime = now
        .duration_since(*START_TIME)
        .unwrap_or(Duration::from_secs(0));

    let registry = &state.registry;
    let with = |pred: &dyn Fn(DatasetHandle) -> bool| {
        DatasetHandle::ALL
            .into_iter()
            .filter(|&h| pred(h))
            .collect::<Vec<_>>()
    };

    HeartbeatResponse {
        server_id: SERVER_ID.clone(),
        timestamp,
        uptime_seconds: uptime.as_secs(),
        memory_usage_bytes: get_memory_usage(),
        available_memory_bytes: get_available_memory(),
        data_memory_bytes: registry.memory_usage(),
        loaded_datasets: with(&|h| registry.is_loaded(h)),
        configured_datasets: with(&|h| registry.is_configured(h)),
        craters_loaded: registry.craters_loaded(),
        status: "healthy".to_string(),
    }
}

/// Resident set size of this process
#[cfg(target_os = "linux")]
fn get_memory_usage() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    // Second field is RSS in pages
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * 4096)
}

#[cfg(not(target_os = "linux"))]
fn get_memory_usage() -> Option<u64> {
    None
}

/// Available system memory
#[cfg(target_os = "linux")]
fn get_available_memory() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    let line = meminfo.lines().find(|l| l.starts_with("MemAvailable:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(not(target_os = "linux"))]
fn get_available_memory() -> Option<u64> {
    None
}
