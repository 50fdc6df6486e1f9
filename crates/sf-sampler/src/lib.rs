//! Training-data generation for isolated non-linear subsystems.
//!
//! Provides:
//! - The `Evaluator` seam to an externally compiled single-subsystem solver
//! - A process-isolated evaluator speaking a one-line JSON protocol
//! - Deterministic candidate strategies (uniform, Latin hypercube, grid)
//! - The generator: bounded attempts, per-class failure counts, shortfall warnings
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//!
//! use sf_core::{CancelToken, EquationId};
//! use sf_model::ProfilingInfo;
//! use sf_sampler::{Concurrency, FnEvaluator, SamplerConfig, generate};
//! use sf_sim::{RangeSet, VariableRange};
//!
//! let info = ProfilingInfo {
//!     id: EquationId::new(14),
//!     using_vars: vec!["s".into()],
//!     iteration_variables: vec!["y".into()],
//!     inner_equations: BTreeSet::new(),
//!     initial_guess: vec![0.0],
//! };
//! let ranges = RangeSet::new(vec![VariableRange {
//!     name: "s".into(),
//!     min: 1.0,
//!     max: 2.0,
//!     observed_min: 1.0,
//!     observed_max: 2.0,
//! }]);
//! let square = FnEvaluator::new(Concurrency::Reentrant, |inputs: &[f64], _guess: &[f64]| {
//!     Some(vec![inputs[0] * inputs[0]])
//! });
//!
//! let config = SamplerConfig { sample_count: 8, seed: 7, ..SamplerConfig::default() };
//! let dataset = generate(&info, &ranges, &square, &config, &CancelToken::new()).unwrap();
//! assert_eq!(dataset.samples.len(), 8);
//! assert!(dataset.warning.is_none());
//! ```

pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod process;
pub mod strategy;

// Re-exports for public API
pub use dataset::{
    FailureCounts, GenerationStats, InsufficientSamplesWarning, TrainingDataset, TrainingSample,
};
pub use error::{EvalError, FailureClass, SampleError, SampleResult};
pub use evaluator::{
    Concurrency, EvalRequest, EvalStatus, Evaluation, Evaluator, EvaluatorFactory, FnEvaluator,
};
pub use generator::{SamplerConfig, generate};
pub use process::ProcessEvaluator;
pub use strategy::{CandidateStream, SamplingStrategy};
