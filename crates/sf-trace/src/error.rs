//! Trace-specific error types.

use std::path::PathBuf;

use sf_core::EquationId;

pub type TraceResult<T> = Result<T, TraceError>;

/// Errors raised while reading a profiling trace or selecting hotspots.
///
/// Every variant except `InvalidThreshold` means the trace as a whole is
/// unusable (MalformedTraceError).
#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file: {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed trace: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Malformed trace: {reason}")]
    Malformed { reason: String },

    #[error("Malformed trace: equation {id}: {reason}")]
    MalformedBlock { id: EquationId, reason: String },

    #[error("Hotspot threshold must lie in [0, 1], got {threshold}")]
    InvalidThreshold { threshold: f64 },
}

impl TraceError {
    /// True for every failure that makes the trace itself unusable.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, TraceError::InvalidThreshold { .. })
    }
}
