//! Error types for training-data generation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that stop generation for one equation before any sampling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("Invalid sampler configuration: {what}")]
    InvalidConfig { what: String },

    #[error("No range for input variable '{name}'")]
    MissingRange { name: String },

    #[error("Range of '{name}' is empty or too wide to sample")]
    InvalidRange { name: String },

    #[error("Initial guess has {got} values, expected {expected}")]
    GuessMismatch { expected: usize, got: usize },

    #[error("Failed to build worker pool: {message}")]
    WorkerPool { message: String },

    #[error("No evaluator available: {message}")]
    NoEvaluator { message: String },
}

pub type SampleResult<T> = Result<T, SampleError>;

/// Failure of a single evaluator call. Never fatal; counted per class.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// EvaluatorTimeoutError.
    #[error("Evaluation timed out after {after_s:.3} s")]
    Timeout { after_s: f64 },

    #[error("Evaluator process failed: {message}")]
    Process { message: String },

    #[error("Evaluator protocol error: {message}")]
    Protocol { message: String },
}

/// Why a candidate produced no sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// EvaluatorConvergenceFailure.
    NotConverged,
    Timeout,
    /// Wrong output length or non-finite outputs.
    InvalidOutput,
    /// Crash, non-zero exit, or unparsable reply.
    EvaluatorError,
}

impl From<&EvalError> for FailureClass {
    fn from(err: &EvalError) -> Self {
        match err {
            EvalError::Timeout { .. } => FailureClass::Timeout,
            EvalError::Process { .. } | EvalError::Protocol { .. } => FailureClass::EvaluatorError,
        }
    }
}
