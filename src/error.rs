//! Error types for redplanet.
//!
//! One enum covers every failure the library and the HTTP layer can report.
//! "Measurement undefined" is not an error: it travels as the
//! [`NANVAL`](crate::grid::NANVAL) sentinel value instead.

use axum::http::StatusCode;
use thiserror::Error;

/// The main error type for redplanet operations.
#[derive(Error, Debug)]
pub enum RedPlanetError {
    /// Query coordinate outside the dataset's declared domain
    #[error("Coordinate out of range: {message}")]
    Range { message: String },

    /// Layer name not present in the grid model
    #[error("Unknown layer: {name}")]
    UnknownLayer { name: String },

    /// Quantity name not in the dataset's vocabulary
    #[error("Unknown quantity '{name}' for {dataset}. Options are: {options}")]
    UnknownQuantity {
        dataset: String,
        name: String,
        options: String,
    },

    /// No crater has this name or ID
    #[error("No crater found with name or ID '{query}'")]
    UnknownCrater { query: String },

    /// Raw arrays fail the shape or monotonicity invariants
    #[error("Invalid data shape: {message}")]
    DataShape { message: String },

    /// Semantically meaningless request
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Lookup fell outside the padded axes; indicates a construction bug
    #[error("Out of bounds: {message}")]
    OutOfBounds { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Request would produce more values than the server allows
    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    /// Dataset has no configured source or failed to load
    #[error("Dataset {dataset} unavailable: {message}")]
    DatasetUnavailable { dataset: String, message: String },

    /// Server errors
    #[error("Server error: {message}")]
    Server { message: String },
}

impl RedPlanetError {
    /// HTTP status used when this error reaches a handler
    pub fn status_code(&self) -> StatusCode {
        match self {
            RedPlanetError::Range { .. }
            | RedPlanetError::InvalidOperation { .. }
            | RedPlanetError::InvalidParameter { .. }
            | RedPlanetError::Json(_) => StatusCode::BAD_REQUEST,
            RedPlanetError::UnknownLayer { .. }
            | RedPlanetError::UnknownQuantity { .. }
            | RedPlanetError::UnknownCrater { .. } => StatusCode::NOT_FOUND,
            RedPlanetError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RedPlanetError::DatasetUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RedPlanetError::DataShape { .. }
            | RedPlanetError::OutOfBounds { .. }
            | RedPlanetError::Io(_)
            | RedPlanetError::Config { .. }
            | RedPlanetError::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            RedPlanetError::Range { .. } => "range",
            RedPlanetError::UnknownLayer { .. } => "unknown_layer",
            RedPlanetError::UnknownQuantity { .. } => "unknown_quantity",
            RedPlanetError::UnknownCrater { .. } => "unknown_crater",
            RedPlanetError::DataShape { .. } => "data_shape",
            RedPlanetError::InvalidOperation { .. } => "invalid_operation",
            RedPlanetError::OutOfBounds { .. } => "out_of_bounds",
            RedPlanetError::Io(_) => "io",
            RedPlanetError::Json(_) => "json",
            RedPlanetError::Config { .. } => "config",
            RedPlanetError::InvalidParameter { .. } => "invalid_parameter",
            RedPlanetError::PayloadTooLarge { .. } => "payload_too_large",
            RedPlanetError::DatasetUnavailable { .. } => "dataset_unavailable",
            RedPlanetError::Server { .. } => "server",
        }
    }
}

/// Convenience type alias for Results with RedPlanetError
pub type Result<T> = std::result::Result<T, RedPlanetError>;
