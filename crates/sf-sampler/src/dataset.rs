//! Generated training data for one subsystem.

use serde::{Deserialize, Serialize};
use sf_core::EquationId;
use sf_sim::VariableRange;

use crate::error::FailureClass;
use crate::strategy::SamplingStrategy;

/// One converged evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    /// Aligned with `using_vars`.
    pub inputs: Vec<f64>,
    /// Aligned with `iteration_variables`.
    pub outputs: Vec<f64>,
}

impl TrainingSample {
    /// Inputs followed by outputs.
    pub fn row(&self) -> impl Iterator<Item = f64> + '_ {
        self.inputs.iter().chain(&self.outputs).copied()
    }
}

/// Failed candidates per class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCounts {
    pub not_converged: usize,
    pub timeout: usize,
    pub invalid_output: usize,
    pub evaluator_error: usize,
}

impl FailureCounts {
    pub fn record(&mut self, class: FailureClass) {
        match class {
            FailureClass::NotConverged => self.not_converged += 1,
            FailureClass::Timeout => self.timeout += 1,
            FailureClass::InvalidOutput => self.invalid_output += 1,
            FailureClass::EvaluatorError => self.evaluator_error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.not_converged + self.timeout + self.invalid_output + self.evaluator_error
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub requested: usize,
    /// Candidates consumed, converged or not.
    pub attempts: usize,
    pub failures: FailureCounts,
    /// Wall time spent inside the evaluator, summed over calls.
    pub eval_seconds: f64,
    pub elapsed_seconds: f64,
}

/// Dataset returned short of the requested count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientSamplesWarning {
    pub requested: usize,
    pub collected: usize,
    pub attempts: usize,
}

impl std::fmt::Display for InsufficientSamplesWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "collected {} of {} samples after {} attempts",
            self.collected, self.requested, self.attempts
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub equation_id: EquationId,
    pub using_vars: Vec<String>,
    pub iteration_variables: Vec<String>,
    /// Aligned with `using_vars`.
    pub ranges: Vec<VariableRange>,
    pub samples: Vec<TrainingSample>,
    pub stats: GenerationStats,
    pub warning: Option<InsufficientSamplesWarning>,
    pub seed: u64,
    pub strategy: SamplingStrategy,
    /// Generation stopped early on cancellation.
    pub cancelled: bool,
}

impl TrainingDataset {
    /// Column names: `using_vars` then `iteration_variables`.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.using_vars
            .iter()
            .chain(&self.iteration_variables)
            .map(String::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.warning.is_none() && !self.cancelled
    }
}
