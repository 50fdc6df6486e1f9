//! Shared application service layer for surroflow.
//!
//! This crate sequences the pipeline stages (hotspot selection, dependency
//! resolution, reference simulation, range discovery, sampling, persistence)
//! behind one interface used by the CLI, and owns the YAML pipeline
//! configuration.

pub mod config;
pub mod error;
pub mod evaluators;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod report;

// Re-export key types for convenience
pub use config::{
    EvaluatorConfig, HotspotConfig, PipelineConfig, SamplingConfig, SimulationConfig, load_config,
};
pub use error::{AppError, AppResult};
pub use evaluators::CommandEvaluatorFactory;
pub use pipeline::{
    PipelineInputs, PipelineOptions, run_from_config, run_from_config_with_progress, run_pipeline,
};
pub use progress::{PipelineProgressEvent, PipelineStage};
pub use query::{
    DatasetSummary, discover_variable_ranges, list_datasets, load_report, profile_trace,
    resolve_hotspots, show_dataset,
};
pub use report::{EquationOutcome, EquationReport, PipelineReport, PipelineTimingSummary, SkipStage};
