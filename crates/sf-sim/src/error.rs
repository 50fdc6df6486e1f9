//! Error types for simulation and range discovery.

use std::path::PathBuf;

use thiserror::Error;

/// Reference simulation failures (SimulationFailureError).
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Simulation failed: {message}")]
    Failed { message: String },

    #[error("Simulation timed out after {after_s:.1} s")]
    Timeout { after_s: f64 },

    #[error("Failed to read simulation result: {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed simulation result: {reason}")]
    MalformedResult { reason: String },
}

pub type SimResult<T> = Result<T, SimError>;

/// Range discovery failures. These are per equation: another equation's
/// variables may still be discoverable from the same result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("Variable '{name}' is not part of the simulation result")]
    UnknownVariable { name: String },

    #[error("Variable '{name}' has a non-finite value {value} in the simulation result")]
    NonFinite { name: String, value: f64 },

    #[error("Variable '{name}' spans [{min}, {max}], too wide to sample")]
    NonFiniteSpan { name: String, min: f64, max: f64 },

    #[error("Simulation result has no timesteps")]
    EmptyResult,

    #[error("Invalid range margin: {what}")]
    InvalidMargin { what: &'static str },
}

pub type RangeResult<T> = Result<T, RangeError>;
