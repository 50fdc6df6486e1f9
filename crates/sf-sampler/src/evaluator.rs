//! The single-subsystem evaluator seam.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sf_core::EquationId;
use sf_model::ProfilingInfo;

use crate::error::{EvalError, SampleResult};

/// Whether an evaluator may be called from several threads at once.
///
/// Native evaluators are not assumed thread-safe: anything not declared
/// `Reentrant` is called from one thread at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    Reentrant,
    #[default]
    Serialized,
}

/// One solve request: fixed inputs aligned with `using_vars`, and a starting
/// point aligned with `iteration_variables`.
#[derive(Debug, Clone, Copy)]
pub struct EvalRequest<'a> {
    pub equation: EquationId,
    pub inputs: &'a [f64],
    pub initial_guess: &'a [f64],
    /// Hard bound where the evaluator can enforce one.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStatus {
    Converged,
    Failed,
}

/// Evaluator reply. Outputs are only meaningful when converged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: EvalStatus,
    #[serde(default)]
    pub outputs: Vec<f64>,
}

impl Evaluation {
    pub fn converged(outputs: Vec<f64>) -> Self {
        Self {
            status: EvalStatus::Converged,
            outputs,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: EvalStatus::Failed,
            outputs: Vec::new(),
        }
    }
}

pub trait Evaluator: Send + Sync {
    fn concurrency(&self) -> Concurrency {
        Concurrency::Serialized
    }

    fn evaluate(&self, request: &EvalRequest<'_>) -> Result<Evaluation, EvalError>;
}

impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn concurrency(&self) -> Concurrency {
        (**self).concurrency()
    }

    fn evaluate(&self, request: &EvalRequest<'_>) -> Result<Evaluation, EvalError> {
        (**self).evaluate(request)
    }
}

/// Provides an evaluator for each resolved subsystem.
pub trait EvaluatorFactory: Send + Sync {
    fn evaluator_for(&self, info: &ProfilingInfo) -> SampleResult<Arc<dyn Evaluator>>;
}

/// In-process evaluator backed by a closure returning `None` on
/// non-convergence.
pub struct FnEvaluator<F> {
    concurrency: Concurrency,
    solve: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&[f64], &[f64]) -> Option<Vec<f64>> + Send + Sync,
{
    pub fn new(concurrency: Concurrency, solve: F) -> Self {
        Self { concurrency, solve }
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(&[f64], &[f64]) -> Option<Vec<f64>> + Send + Sync,
{
    fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    fn evaluate(&self, request: &EvalRequest<'_>) -> Result<Evaluation, EvalError> {
        Ok(match (self.solve)(request.inputs, request.initial_guess) {
            Some(outputs) => Evaluation::converged(outputs),
            None => Evaluation::failed(),
        })
    }
}
