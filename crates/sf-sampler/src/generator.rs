//! Training-data generator.
//!
//! Candidates are drawn in deterministic batches and their outcomes consumed
//! strictly in draw order, so the dataset for a seed does not depend on worker
//! count or scheduling. Generation stops at `sample_count` converged samples or
//! once `sample_count * attempt_factor` candidates have been consumed.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use sf_core::{AccumulatingTimer, CancelToken};
use sf_model::ProfilingInfo;
use sf_sim::RangeSet;

use crate::dataset::{
    FailureCounts, GenerationStats, InsufficientSamplesWarning, TrainingDataset, TrainingSample,
};
use crate::error::{FailureClass, SampleError, SampleResult};
use crate::evaluator::{Concurrency, EvalRequest, EvalStatus, Evaluator};
use crate::strategy::{CandidateStream, SamplingStrategy};

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub sample_count: usize,
    /// Attempt budget as a multiple of `sample_count`.
    pub attempt_factor: usize,
    pub strategy: SamplingStrategy,
    /// Per-equation seed.
    pub seed: u64,
    /// Concurrent evaluations for reentrant evaluators.
    pub workers: usize,
    pub eval_timeout: Option<Duration>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_count: 1000,
            attempt_factor: 10,
            strategy: SamplingStrategy::Uniform,
            seed: 0,
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            eval_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> SampleResult<()> {
        if self.attempt_factor == 0 {
            return Err(SampleError::InvalidConfig {
                what: "attempt_factor must be >= 1".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(SampleError::InvalidConfig {
                what: "workers must be >= 1".to_string(),
            });
        }
        if self.eval_timeout.is_some_and(|t| t.is_zero()) {
            return Err(SampleError::InvalidConfig {
                what: "eval_timeout must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Total candidates that may be consumed.
    pub fn attempt_budget(&self) -> usize {
        self.sample_count.saturating_mul(self.attempt_factor)
    }
}

/// Outcome of one candidate, in draw order.
enum Outcome {
    Sample(Vec<f64>),
    Failed(FailureClass),
    /// Not started because of cancellation.
    Skipped,
}

/// Generate training data for `info` inside `ranges`.
pub fn generate(
    info: &ProfilingInfo,
    ranges: &RangeSet,
    evaluator: &dyn Evaluator,
    config: &SamplerConfig,
    cancel: &CancelToken,
) -> SampleResult<TrainingDataset> {
    config.validate()?;
    let aligned = ranges
        .aligned(&info.using_vars)
        .map_err(|name| SampleError::MissingRange { name })?;
    if let Some(range) = aligned
        .iter()
        .find(|r| !r.span().is_finite() || r.span() < 0.0)
    {
        return Err(SampleError::InvalidRange {
            name: range.name.clone(),
        });
    }
    if info.initial_guess.len() != info.output_dim() {
        return Err(SampleError::GuessMismatch {
            expected: info.output_dim(),
            got: info.initial_guess.len(),
        });
    }

    let started = Instant::now();
    let concurrency = evaluator.concurrency();
    let pool = match concurrency {
        Concurrency::Reentrant if config.workers > 1 => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .build()
                .map_err(|e| SampleError::WorkerPool {
                    message: e.to_string(),
                })?,
        ),
        _ => None,
    };

    let budget = config.attempt_budget();
    let eval_timer = AccumulatingTimer::new();
    let mut stream = CandidateStream::new(config.strategy, &aligned, config.sample_count, config.seed);
    let mut samples: Vec<TrainingSample> = Vec::with_capacity(config.sample_count);
    let mut failures = FailureCounts::default();
    let mut attempts = 0usize;
    let mut cancelled = false;

    tracing::debug!(
        equation = %info.id,
        sample_count = config.sample_count,
        budget,
        strategy = %config.strategy,
        ?concurrency,
        "sampling started"
    );

    'outer: while samples.len() < config.sample_count && attempts < budget {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let needed = config.sample_count - samples.len();
        let width = match pool {
            Some(_) => needed.max(config.workers),
            None => 1,
        };
        let batch = stream.next_batch(width.min(budget - attempts));

        let evaluate = |inputs: &Vec<f64>| evaluate_one(info, inputs, evaluator, config, cancel, &eval_timer);
        let outcomes: Vec<Outcome> = match &pool {
            Some(pool) => pool.install(|| batch.par_iter().map(evaluate).collect()),
            None => batch.iter().map(evaluate).collect(),
        };

        for (inputs, outcome) in batch.into_iter().zip(outcomes) {
            match outcome {
                Outcome::Skipped => {
                    cancelled = true;
                    break 'outer;
                }
                Outcome::Sample(outputs) => samples.push(TrainingSample { inputs, outputs }),
                Outcome::Failed(class) => failures.record(class),
            }
            attempts += 1;
            if samples.len() == config.sample_count {
                break;
            }
        }
    }

    let warning = (samples.len() < config.sample_count).then(|| InsufficientSamplesWarning {
        requested: config.sample_count,
        collected: samples.len(),
        attempts,
    });
    if let Some(w) = &warning {
        tracing::warn!(equation = %info.id, cancelled, "insufficient samples: {w}");
    }

    let stats = GenerationStats {
        requested: config.sample_count,
        attempts,
        failures,
        eval_seconds: eval_timer.total_seconds(),
        elapsed_seconds: started.elapsed().as_secs_f64(),
    };
    tracing::info!(
        equation = %info.id,
        collected = samples.len(),
        attempts,
        failed = failures.total(),
        "sampling finished"
    );

    Ok(TrainingDataset {
        equation_id: info.id,
        using_vars: info.using_vars.clone(),
        iteration_variables: info.iteration_variables.clone(),
        ranges: aligned,
        samples,
        stats,
        warning,
        seed: config.seed,
        strategy: config.strategy,
        cancelled,
    })
}

fn evaluate_one(
    info: &ProfilingInfo,
    inputs: &[f64],
    evaluator: &dyn Evaluator,
    config: &SamplerConfig,
    cancel: &CancelToken,
    timer: &AccumulatingTimer,
) -> Outcome {
    if cancel.is_cancelled() {
        return Outcome::Skipped;
    }

    let request = EvalRequest {
        equation: info.id,
        inputs,
        initial_guess: &info.initial_guess,
        timeout: config.eval_timeout,
    };
    let started = Instant::now();
    let reply = evaluator.evaluate(&request);
    let elapsed = started.elapsed();
    timer.record(elapsed);

    let evaluation = match reply {
        Ok(evaluation) => evaluation,
        Err(err) => {
            tracing::trace!(equation = %info.id, error = %err, "evaluation failed");
            return Outcome::Failed(FailureClass::from(&err));
        }
    };
    // In-process evaluators cannot be interrupted; late replies still count
    // as timeouts.
    if config.eval_timeout.is_some_and(|limit| elapsed > limit) {
        return Outcome::Failed(FailureClass::Timeout);
    }
    match evaluation.status {
        EvalStatus::Failed => Outcome::Failed(FailureClass::NotConverged),
        EvalStatus::Converged
            if evaluation.outputs.len() != info.output_dim()
                || evaluation.outputs.iter().any(|v| !v.is_finite()) =>
        {
            Outcome::Failed(FailureClass::InvalidOutput)
        }
        EvalStatus::Converged => Outcome::Sample(evaluation.outputs),
    }
}
