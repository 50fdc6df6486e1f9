//! Pipeline report (`report.json`).

use serde::{Deserialize, Serialize};
use sf_core::EquationId;
use sf_sampler::{FailureCounts, InsufficientSamplesWarning};

/// Stage at which an equation was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    Resolve,
    Ranges,
    Sampling,
    Saving,
}

impl std::fmt::Display for SkipStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SkipStage::Resolve => "dependency resolution",
            SkipStage::Ranges => "range discovery",
            SkipStage::Sampling => "sampling",
            SkipStage::Saving => "saving",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EquationOutcome {
    Generated {
        samples: usize,
        requested: usize,
        attempts: usize,
        failures: FailureCounts,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        warning: Option<InsufficientSamplesWarning>,
        #[serde(default)]
        cancelled: bool,
    },
    /// An unchanged dataset from an earlier run was reused.
    Cached { samples: usize, fingerprint: String },
    Skipped { stage: SkipStage, reason: String },
    /// Solved as part of a larger selected subsystem.
    Folded { parent: EquationId },
}

impl EquationOutcome {
    pub fn has_dataset(&self) -> bool {
        matches!(self, EquationOutcome::Generated { .. } | EquationOutcome::Cached { .. })
    }
}

impl std::fmt::Display for EquationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquationOutcome::Generated {
                samples,
                requested,
                attempts,
                cancelled,
                ..
            } => {
                write!(f, "generated {samples}/{requested} samples in {attempts} attempts")?;
                if *cancelled {
                    write!(f, " (cancelled)")?;
                }
                Ok(())
            }
            EquationOutcome::Cached { samples, .. } => write!(f, "cached ({samples} samples)"),
            EquationOutcome::Skipped { stage, reason } => write!(f, "skipped at {stage}: {reason}"),
            EquationOutcome::Folded { parent } => write!(f, "folded into {parent:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationReport {
    pub id: EquationId,
    pub fraction_of_total: f64,
    pub outcome: EquationOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineTimingSummary {
    pub select_time_s: f64,
    pub resolve_time_s: f64,
    pub simulation_time_s: f64,
    pub sampling_time_s: f64,
    /// Evaluator time summed over every equation.
    pub eval_time_s: f64,
    pub total_time_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub model: String,
    pub created_at: String,
    pub threshold: f64,
    /// Per selected equation, in hotspot order.
    pub equations: Vec<EquationReport>,
    pub reference_simulation_runs: usize,
    pub timing: PipelineTimingSummary,
}

impl PipelineReport {
    pub fn outcome(&self, id: EquationId) -> Option<&EquationOutcome> {
        self.equations.iter().find(|e| e.id == id).map(|e| &e.outcome)
    }

    pub fn datasets(&self) -> usize {
        self.equations.iter().filter(|e| e.outcome.has_dataset()).count()
    }

    pub fn skipped(&self) -> usize {
        self.equations
            .iter()
            .filter(|e| matches!(e.outcome, EquationOutcome::Skipped { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_json_is_tagged() {
        let outcome = EquationOutcome::Skipped {
            stage: SkipStage::Resolve,
            reason: "unknown equation".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["stage"], "resolve");

        let folded = serde_json::to_value(EquationOutcome::Folded {
            parent: EquationId::new(14),
        })
        .unwrap();
        assert_eq!(folded["parent"], 14);
    }

    #[test]
    fn outcome_display() {
        let folded = EquationOutcome::Folded {
            parent: EquationId::new(14),
        };
        assert_eq!(folded.to_string(), "folded into E14");
    }
}
