//! Structured logging for redplanet.
//!
//! Subscriber setup, the HTTP trace layer, and helpers that keep the field
//! names of recurring events (operations, dataset loads, request failures)
//! consistent so logs can be filtered on them.

use std::time::Instant;
use tracing::{debug, error, info, warn, Level};

use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use uuid::Uuid;

use crate::error::RedPlanetError;
use crate::grid::GridModel;

/// Creates the tracing layer for HTTP request/response logging
pub fn create_http_trace_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    DefaultMakeSpan,
    DefaultOnRequest,
    DefaultOnResponse,
> {
    let on_response = DefaultOnResponse::new()
        .level(Level::DEBUG)
        .latency_unit(LatencyUnit::Micros);

    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(on_response)
}

/// Initialize the global subscriber; `RUST_LOG` wins over `log_level`
///
/// Calling this twice is harmless: the second call is ignored.
pub fn init_tracing(log_level: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();

    if result.is_err() {
        debug!("Tracing subscriber already installed");
    }
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    match details {
        Some(details) => info!(operation, details, "Starting operation"),
        None => info!(operation, "Starting operation"),
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if success {
        info!(operation, duration_ms, "Operation completed successfully");
    } else {
        warn!(operation, duration_ms, "Operation completed with errors");
    }
}

/// Run `f`, logging its duration under a fresh operation id
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let operation_id = Uuid::new_v4();

    debug!(operation, operation_id = %operation_id, "Starting operation");
    let result = f();
    info!(
        operation,
        operation_id = %operation_id,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log what a dataset load produced
pub fn log_dataset_load_stats(dataset: &str, path: &str, model: &GridModel, start: Instant) {
    info!(
        operation = "dataset_load",
        dataset,
        path,
        layers = %model.layer_names().join(", "),
        lon_points = model.lon_axis().len(),
        lat_points = model.lat_axis().len(),
        lon_convention = %model.lon_convention(),
        memory_kb = model.memory_usage() / 1024,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Dataset loaded"
    );
}

/// Log an error with context
pub fn log_error(error: &RedPlanetError, context: &str) {
    error!(
        error = %error,
        context,
        error_kind = error.kind(),
        "Error occurred"
    );
}

/// Log a failed request; caller errors at warn, server errors at error
pub fn log_request_error(
    error: &RedPlanetError,
    endpoint: &str,
    request_id: &str,
    params: Option<&str>,
) {
    let params = params.unwrap_or("none");
    if error.status_code().is_server_error() {
        error!(
            error = %error,
            endpoint,
            request_id,
            params,
            error_kind = error.kind(),
            "Request processing error"
        );
    } else {
        warn!(
            error = %error,
            endpoint,
            request_id,
            params,
            error_kind = error.kind(),
            "Request rejected"
        );
    }
}

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
