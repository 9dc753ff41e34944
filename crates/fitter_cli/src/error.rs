//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the `fitter` binary.
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input file missing.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed bond CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON output failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Instrument or curve rejected.
    #[error("Model error: {0}")]
    Model(#[from] fitter_models::ModelError),

    /// Solver failure.
    #[error("Solver error: {0}")]
    Solver(#[from] fitter_core::SolverError),

    /// Re-fitting service failure.
    #[error("Service error: {0}")]
    Service(#[from] fitter_service::ServiceError),
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
