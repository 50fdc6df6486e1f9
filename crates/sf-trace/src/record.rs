//! Equation records extracted from a profiling trace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sf_core::EquationId;

/// How the model compiler solves an equation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EquationKind {
    /// Jointly solved, iterative system. The only kind worth replacing.
    #[default]
    Nonlinear,
    /// Linear system solved directly.
    Linear,
    /// Anything else the profiler reports (assignments, functions, ...).
    Other,
}

/// One profiled equation system.
///
/// Invariant: `fraction` lies in `[0, 1]` and equals `total_time_s /
/// simulation_total_time_s` of the trace it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationRecord {
    pub id: EquationId,
    pub kind: EquationKind,
    /// Cumulative time spent solving this block [s]
    pub total_time_s: f64,
    /// Number of times the block was evaluated
    pub call_count: u64,
    /// Slowest single evaluation [s], when the profiler reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_s: Option<f64>,
    fraction: f64,
}

impl EquationRecord {
    pub(crate) fn new(
        id: EquationId,
        kind: EquationKind,
        total_time_s: f64,
        call_count: u64,
        max_time_s: Option<f64>,
        fraction: f64,
    ) -> Self {
        Self {
            id,
            kind,
            total_time_s,
            call_count,
            max_time_s,
            fraction,
        }
    }

    /// Share of the whole simulation's time spent in this block.
    pub fn fraction_of_total(&self) -> f64 {
        self.fraction
    }

    pub fn is_nonlinear(&self) -> bool {
        self.kind == EquationKind::Nonlinear
    }

    /// Mean time per call [s], zero for never-called blocks.
    pub fn mean_call_time_s(&self) -> f64 {
        if self.call_count == 0 {
            0.0
        } else {
            self.total_time_s / self.call_count as f64
        }
    }
}

/// A fully validated profiling trace for one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTrace {
    /// Model name, when the trace carries it
    pub name: Option<String>,
    /// Total simulation wall time [s]
    pub total_time_s: f64,
    records: BTreeMap<EquationId, EquationRecord>,
}

impl ProfileTrace {
    pub(crate) fn new(
        name: Option<String>,
        total_time_s: f64,
        records: BTreeMap<EquationId, EquationRecord>,
    ) -> Self {
        Self {
            name,
            total_time_s,
            records,
        }
    }

    /// Record for one equation, if it was profiled.
    pub fn get(&self, id: EquationId) -> Option<&EquationRecord> {
        self.records.get(&id)
    }

    /// All records in ascending id order.
    pub fn records(&self) -> impl Iterator<Item = &EquationRecord> {
        self.records.values()
    }

    /// Id to record mapping.
    pub fn as_map(&self) -> &BTreeMap<EquationId, EquationRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_call_time_handles_zero_calls() {
        let record =
            EquationRecord::new(EquationId::new(1), EquationKind::Nonlinear, 0.0, 0, None, 0.0);
        assert_eq!(record.mean_call_time_s(), 0.0);

        let record =
            EquationRecord::new(EquationId::new(1), EquationKind::Nonlinear, 1.0, 4, None, 0.5);
        assert!((record.mean_call_time_s() - 0.25).abs() < 1e-15);
    }

    #[test]
    fn kind_defaults_to_nonlinear() {
        assert_eq!(EquationKind::default(), EquationKind::Nonlinear);
        let kind: EquationKind = serde_json::from_str("\"linear\"").unwrap();
        assert_eq!(kind, EquationKind::Linear);
    }
}
