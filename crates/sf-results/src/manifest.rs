//! Per-equation dataset manifest (`eq_<id>/manifest.json`).

use serde::{Deserialize, Serialize};
use sf_core::EquationId;
use sf_sampler::{FailureCounts, InsufficientSamplesWarning, SamplingStrategy, TrainingDataset};
use sf_sim::VariableRange;

/// Bumped whenever the artifact layout changes; part of every fingerprint.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetManifest {
    pub format_version: u32,
    pub equation_id: EquationId,
    pub using_vars: Vec<String>,
    pub iteration_variables: Vec<String>,
    /// Aligned with `using_vars`.
    pub ranges: Vec<VariableRange>,
    pub requested: usize,
    pub collected: usize,
    pub attempts: usize,
    pub failures: FailureCounts,
    pub seed: u64,
    pub strategy: SamplingStrategy,
    pub fingerprint: String,
    pub created_at: String,
    #[serde(default)]
    pub eval_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<InsufficientSamplesWarning>,
    #[serde(default)]
    pub cancelled: bool,
}

impl DatasetManifest {
    pub fn from_dataset(dataset: &TrainingDataset, fingerprint: &str) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            equation_id: dataset.equation_id,
            using_vars: dataset.using_vars.clone(),
            iteration_variables: dataset.iteration_variables.clone(),
            ranges: dataset.ranges.clone(),
            requested: dataset.stats.requested,
            collected: dataset.samples.len(),
            attempts: dataset.stats.attempts,
            failures: dataset.stats.failures,
            seed: dataset.seed,
            strategy: dataset.strategy,
            fingerprint: fingerprint.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            eval_seconds: dataset.stats.eval_seconds,
            warning: dataset.warning,
            cancelled: dataset.cancelled,
        }
    }

    /// Sample matrix column names: `using_vars` then `iteration_variables`.
    pub fn columns(&self) -> Vec<String> {
        self.using_vars
            .iter()
            .chain(&self.iteration_variables)
            .cloned()
            .collect()
    }

    /// Whether this artifact can stand in for a fresh run with `fingerprint`.
    /// Cancelled datasets are never reused.
    pub fn is_reusable_for(&self, fingerprint: &str) -> bool {
        self.format_version == FORMAT_VERSION && self.fingerprint == fingerprint && !self.cancelled
    }
}
