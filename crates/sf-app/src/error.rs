//! Error types for the sf-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the pipeline crates and
/// provides a unified error interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Trace error: {0}")]
    Trace(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Range error: {0}")]
    Range(String),

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sf-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<sf_trace::TraceError> for AppError {
    fn from(err: sf_trace::TraceError) -> Self {
        AppError::Trace(err.to_string())
    }
}

impl From<sf_model::ModelError> for AppError {
    fn from(err: sf_model::ModelError) -> Self {
        AppError::Model(err.to_string())
    }
}

impl From<sf_model::DependencyError> for AppError {
    fn from(err: sf_model::DependencyError) -> Self {
        AppError::Dependency(err.to_string())
    }
}

impl From<sf_sim::SimError> for AppError {
    fn from(err: sf_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<sf_sim::RangeError> for AppError {
    fn from(err: sf_sim::RangeError) -> Self {
        AppError::Range(err.to_string())
    }
}

impl From<sf_sampler::SampleError> for AppError {
    fn from(err: sf_sampler::SampleError) -> Self {
        AppError::Sampling(err.to_string())
    }
}

impl From<sf_results::ResultsError> for AppError {
    fn from(err: sf_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
