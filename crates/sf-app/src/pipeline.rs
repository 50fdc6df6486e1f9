//! Pipeline orchestration.
//!
//! trace → hotspots → (per hotspot) dependencies → ranges → samples → artifact.
//!
//! Trace problems and a failed reference simulation abort the run. Anything
//! that goes wrong for a single equation is recorded in the report and the
//! remaining equations carry on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use rayon::prelude::*;
use sf_core::{CancelToken, EquationId, Timer};
use sf_model::{ModelStructure, ProfilingInfo, fold_nested, resolve_all};
use sf_results::{DatasetStore, FingerprintInput, compute_fingerprint, derive_seed};
use sf_sampler::{EvaluatorFactory, SamplerConfig, generate};
use sf_sim::{
    RangeMargin, ReferenceCache, RetryPolicy, SimulationResult, SimulationSource, VariableRange,
    discover_ranges,
};
use sf_trace::{ProfileTrace, select};

use crate::config::{PipelineConfig, load_config};
use crate::error::{AppError, AppResult};
use crate::progress::{PipelineProgressEvent, PipelineStage};
use crate::report::{
    EquationOutcome, EquationReport, PipelineReport, PipelineTimingSummary, SkipStage,
};

pub type ProgressCallback<'a> = &'a mut (dyn FnMut(PipelineProgressEvent) + Send);

/// Loaded inputs and external collaborators for one pipeline run.
pub struct PipelineInputs<'a> {
    pub model_name: String,
    pub trace: &'a ProfileTrace,
    pub model: &'a ModelStructure,
    pub simulation: &'a dyn SimulationSource,
    pub evaluators: &'a dyn EvaluatorFactory,
    /// Evaluator identity for dataset fingerprints.
    pub evaluator_key: &'a str,
    /// Shared memo of reference simulations; a private one is used if absent.
    pub reference_cache: Option<&'a ReferenceCache>,
}

/// Options for running the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub threshold: f64,
    pub margin: RangeMargin,
    /// Sampler settings; `seed` is the global seed.
    pub sampling: SamplerConfig,
    pub retry: RetryPolicy,
    pub output_dir: PathBuf,
    pub use_cache: bool,
    pub equation_workers: usize,
    pub cancel: CancelToken,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threshold: sf_trace::DEFAULT_THRESHOLD,
            margin: RangeMargin::default(),
            sampling: SamplerConfig::default(),
            retry: RetryPolicy::default(),
            output_dir: PathBuf::from(".surroflow"),
            use_cache: true,
            equation_workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            cancel: CancelToken::new(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &PipelineConfig) -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            threshold: config.hotspots.threshold,
            margin: config.ranges,
            sampling: config.sampler_config()?,
            retry: config.retry_policy()?,
            output_dir: config.output_dir.clone(),
            use_cache: config.use_cache,
            equation_workers: config.equation_workers.unwrap_or(defaults.equation_workers),
            cancel: defaults.cancel,
        })
    }
}

/// Progress sink shared by equation workers.
struct Progress<'a> {
    cb: Mutex<Option<ProgressCallback<'a>>>,
    started: Instant,
}

impl<'a> Progress<'a> {
    fn new(cb: Option<ProgressCallback<'a>>, started: Instant) -> Self {
        Self {
            cb: Mutex::new(cb),
            started,
        }
    }

    fn emit(&self, stage: PipelineStage, message: Option<String>) {
        let mut guard = self.cb.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cb) = guard.as_deref_mut() {
            cb(PipelineProgressEvent::stage(
                stage,
                self.started.elapsed().as_secs_f64(),
                message,
            ));
        }
    }
}

/// Per-equation work shared read-only by all workers.
struct EquationContext<'a, 'p> {
    inputs: &'a PipelineInputs<'a>,
    options: &'a PipelineOptions,
    /// Share of the evaluation budget given to each equation.
    sampling_workers: usize,
    reference: &'a SimulationResult,
    store: &'a DatasetStore,
    progress: &'a Progress<'p>,
}

/// Run the pipeline over already loaded inputs.
pub fn run_pipeline(
    inputs: &PipelineInputs<'_>,
    options: &PipelineOptions,
    progress_cb: Option<ProgressCallback<'_>>,
) -> AppResult<PipelineReport> {
    let started = Instant::now();
    let progress = Progress::new(progress_cb, started);
    let mut timing = PipelineTimingSummary::default();
    let store = DatasetStore::new(options.output_dir.clone())?;

    progress.emit(PipelineStage::SelectingHotspots, None);
    let timer = Timer::start("select");
    let hotspots = select(inputs.trace.records(), options.threshold)?;
    timing.select_time_s = timer.stop();
    tracing::info!(
        model = %inputs.model_name,
        selected = hotspots.len(),
        threshold = options.threshold,
        "hotspots selected"
    );

    progress.emit(
        PipelineStage::ResolvingDependencies,
        Some(format!("{} equations", hotspots.len())),
    );
    let timer = Timer::start("resolve");
    let ids: Vec<EquationId> = hotspots.iter().map(|r| r.id).collect();
    let mut outcomes: BTreeMap<EquationId, EquationOutcome> = BTreeMap::new();
    let mut resolved: Vec<ProfilingInfo> = Vec::with_capacity(ids.len());
    for (id, result) in resolve_all(&ids, inputs.model) {
        match result {
            Ok(info) => resolved.push(info),
            Err(err) => {
                tracing::warn!(equation = %id, error = %err, "skipping equation");
                outcomes.insert(
                    id,
                    EquationOutcome::Skipped {
                        stage: SkipStage::Resolve,
                        reason: err.to_string(),
                    },
                );
            }
        }
    }
    let (kept, folded) = fold_nested(resolved);
    for f in folded {
        outcomes.insert(f.id, EquationOutcome::Folded { parent: f.parent });
    }
    timing.resolve_time_s = timer.stop();

    let local_cache = ReferenceCache::new();
    let cache = inputs.reference_cache.unwrap_or(&local_cache);
    let runs_before = cache.runs();

    if !kept.is_empty() {
        progress.emit(PipelineStage::RunningReferenceSimulation, None);
        let timer = Timer::start("simulate");
        let reference = cache.get_or_run(inputs.simulation, &options.retry)?;
        timing.simulation_time_s = timer.stop();

        let timer = Timer::start("sample");
        let (equation_threads, sampling_workers) =
            split_workers(options.sampling.workers, options.equation_workers, kept.len());
        tracing::debug!(equation_threads, sampling_workers, "evaluation budget split");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(equation_threads)
            .build()
            .map_err(|e| AppError::InvalidInput(format!("failed to build worker pool: {e}")))?;
        let ctx = EquationContext {
            inputs,
            options,
            sampling_workers,
            reference: &reference,
            store: &store,
            progress: &progress,
        };
        let finished: Vec<(EquationId, EquationOutcome, f64)> = pool.install(|| {
            kept.par_iter()
                .map(|info| {
                    let (outcome, eval_s) = process_equation(info, &ctx);
                    (info.id, outcome, eval_s)
                })
                .collect()
        });
        timing.sampling_time_s = timer.stop();

        for (id, outcome, eval_s) in finished {
            timing.eval_time_s += eval_s;
            outcomes.insert(id, outcome);
        }
    }

    let equations: Vec<EquationReport> = hotspots
        .iter()
        .filter_map(|record| {
            outcomes.remove(&record.id).map(|outcome| EquationReport {
                id: record.id,
                fraction_of_total: record.fraction_of_total(),
                outcome,
            })
        })
        .collect();
    for eq in &equations {
        tracing::info!(equation = %eq.id, outcome = %eq.outcome, "equation finished");
    }

    timing.total_time_s = started.elapsed().as_secs_f64();
    let report = PipelineReport {
        model: inputs.model_name.clone(),
        created_at: chrono::Utc::now().to_rfc3339(),
        threshold: options.threshold,
        equations,
        reference_simulation_runs: cache.runs() - runs_before,
        timing,
    };

    progress.emit(PipelineStage::WritingReport, None);
    let path = store.save_report(&report)?;
    tracing::info!(
        datasets = report.datasets(),
        skipped = report.skipped(),
        report = %path.display(),
        "pipeline finished"
    );
    progress.emit(PipelineStage::Completed, None);
    Ok(report)
}

/// Split the evaluation budget (`sampling.workers`) between concurrently
/// processed equations and their sample batches.
///
/// Returns `(equation_threads, workers_per_equation)`; their product never
/// exceeds the budget.
fn split_workers(budget: usize, equation_workers: usize, equations: usize) -> (usize, usize) {
    let budget = budget.max(1);
    let equation_threads = equation_workers.min(equations).clamp(1, budget);
    (equation_threads, budget / equation_threads)
}

fn skipped(id: EquationId, stage: SkipStage, reason: String) -> EquationOutcome {
    tracing::warn!(equation = %id, %stage, %reason, "skipping equation");
    EquationOutcome::Skipped { stage, reason }
}

/// Ranges, cache lookup, sampling and persistence for one equation.
/// Returns the outcome and the evaluator time spent.
fn process_equation(info: &ProfilingInfo, ctx: &EquationContext<'_, '_>) -> (EquationOutcome, f64) {
    let id = info.id;
    let options = ctx.options;
    if options.cancel.is_cancelled() {
        return (
            skipped(id, SkipStage::Sampling, "cancelled before sampling".to_string()),
            0.0,
        );
    }

    let ranges = match discover_ranges(info.using_vars.as_slice(), ctx.reference, &options.margin) {
        Ok(ranges) => ranges,
        Err(err) => return (skipped(id, SkipStage::Ranges, err.to_string()), 0.0),
    };
    let aligned: Vec<VariableRange> = ranges.iter().cloned().collect();

    let config = SamplerConfig {
        seed: derive_seed(options.sampling.seed, id),
        workers: ctx.sampling_workers,
        ..options.sampling.clone()
    };
    let fingerprint = match compute_fingerprint(&FingerprintInput::new(
        info,
        &aligned,
        &config,
        ctx.inputs.evaluator_key,
    )) {
        Ok(fingerprint) => fingerprint,
        Err(err) => return (skipped(id, SkipStage::Saving, err.to_string()), 0.0),
    };

    if options.use_cache {
        ctx.progress.emit(PipelineStage::CheckingCache { id }, None);
        if let Some(manifest) = ctx.store.reusable(id, &fingerprint) {
            tracing::info!(equation = %id, samples = manifest.collected, "reusing cached dataset");
            ctx.progress.emit(PipelineStage::EquationFinished { id }, Some("cached".to_string()));
            return (
                EquationOutcome::Cached {
                    samples: manifest.collected,
                    fingerprint,
                },
                0.0,
            );
        }
    }

    ctx.progress.emit(PipelineStage::Sampling { id }, None);
    let evaluator = match ctx.inputs.evaluators.evaluator_for(info) {
        Ok(evaluator) => evaluator,
        Err(err) => return (skipped(id, SkipStage::Sampling, err.to_string()), 0.0),
    };
    let dataset = match generate(info, &ranges, &*evaluator, &config, &options.cancel) {
        Ok(dataset) => dataset,
        Err(err) => return (skipped(id, SkipStage::Sampling, err.to_string()), 0.0),
    };
    let eval_s = dataset.stats.eval_seconds;

    if let Err(err) = ctx.store.save(&dataset, &fingerprint) {
        return (skipped(id, SkipStage::Saving, err.to_string()), eval_s);
    }

    let outcome = EquationOutcome::Generated {
        samples: dataset.samples.len(),
        requested: dataset.stats.requested,
        attempts: dataset.stats.attempts,
        failures: dataset.stats.failures,
        warning: dataset.warning,
        cancelled: dataset.cancelled,
    };
    ctx.progress
        .emit(PipelineStage::EquationFinished { id }, Some(outcome.to_string()));
    (outcome, eval_s)
}

/// Load a YAML configuration and run the whole pipeline.
pub fn run_from_config(path: &Path) -> AppResult<PipelineReport> {
    run_from_config_with_progress(path, None, None, None)
}

/// Like [`run_from_config`], optionally overriding `use_cache`, observing an
/// external cancellation token, and streaming progress events.
pub fn run_from_config_with_progress(
    path: &Path,
    use_cache: Option<bool>,
    cancel: Option<&CancelToken>,
    mut progress_cb: Option<ProgressCallback<'_>>,
) -> AppResult<PipelineReport> {
    let started = Instant::now();
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(PipelineProgressEvent::stage(PipelineStage::LoadingInputs, 0.0, None));
    }

    let config = load_config(path)?;
    let trace = sf_trace::read_trace(&config.trace)?;
    let model = sf_model::load_model(&config.model)?;
    tracing::info!(
        trace = %config.trace.display(),
        model = %config.model.display(),
        records = trace.len(),
        equations = model.equations().len(),
        load_time_s = started.elapsed().as_secs_f64(),
        "inputs loaded"
    );

    let mut options = PipelineOptions::from_config(&config)?;
    if let Some(use_cache) = use_cache {
        options.use_cache = use_cache;
    }
    if let Some(cancel) = cancel {
        options.cancel = cancel.clone();
    }
    let simulation = config.simulation_source();
    let evaluators = config.evaluator_factory()?;
    let evaluator_key = evaluators.key();

    let inputs = PipelineInputs {
        model_name: config
            .name
            .clone()
            .or_else(|| trace.name.clone())
            .unwrap_or_else(|| config.model_name()),
        trace: &trace,
        model: &model,
        simulation: simulation.as_ref(),
        evaluators: &evaluators,
        evaluator_key: &evaluator_key,
        reference_cache: None,
    };
    run_pipeline(&inputs, &options, progress_cb)
}
