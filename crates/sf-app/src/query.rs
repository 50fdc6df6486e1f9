//! Query helpers behind the inspection commands.

use std::path::Path;

use sf_core::EquationId;
use sf_model::{DependencyResult, ProfilingInfo, resolve_all};
use sf_results::{DatasetManifest, DatasetStore};
use sf_sim::{RangeMargin, RangeSet, discover_ranges, read_result_csv};
use sf_trace::{EquationRecord, read_trace, select};

use crate::error::{AppError, AppResult};
use crate::report::PipelineReport;

/// Hotspots of a trace file.
pub fn profile_trace(trace_path: &Path, threshold: f64) -> AppResult<Vec<EquationRecord>> {
    let trace = read_trace(trace_path)?;
    Ok(select(trace.records(), threshold)?)
}

/// Hotspots of a trace, each resolved against a model structure.
pub fn resolve_hotspots(
    trace_path: &Path,
    model_path: &Path,
    threshold: f64,
) -> AppResult<Vec<(EquationId, DependencyResult<ProfilingInfo>)>> {
    let hotspots = profile_trace(trace_path, threshold)?;
    let model = sf_model::load_model(model_path)?;
    let ids: Vec<EquationId> = hotspots.iter().map(|r| r.id).collect();
    Ok(resolve_all(&ids, &model))
}

/// Ranges of `variables` in an existing result file.
pub fn discover_variable_ranges(
    result_path: &Path,
    variables: &[String],
    margin: &RangeMargin,
) -> AppResult<RangeSet> {
    let result = read_result_csv(result_path)?;
    Ok(discover_ranges(variables, &result, margin)?)
}

/// Summary of one stored dataset.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub manifest: DatasetManifest,
    /// Per column: (name, min, max) over the stored samples.
    pub column_bounds: Vec<(String, f64, f64)>,
}

pub fn list_datasets(output_dir: &Path) -> AppResult<Vec<DatasetManifest>> {
    let store = open_store(output_dir)?;
    Ok(store.list()?)
}

pub fn show_dataset(output_dir: &Path, id: EquationId) -> AppResult<DatasetSummary> {
    let store = open_store(output_dir)?;
    let manifest = store.load_manifest(id)?;
    let dataset = store.load_dataset(id)?;

    let column_bounds = dataset
        .columns()
        .enumerate()
        .map(|(col, name)| {
            let (lo, hi) = dataset
                .samples
                .iter()
                .filter_map(|s| s.row().nth(col))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            (name.to_string(), lo, hi)
        })
        .collect();

    Ok(DatasetSummary {
        manifest,
        column_bounds,
    })
}

pub fn load_report(output_dir: &Path) -> AppResult<PipelineReport> {
    let store = open_store(output_dir)?;
    Ok(store.load_report()?)
}

fn open_store(output_dir: &Path) -> AppResult<DatasetStore> {
    if !output_dir.is_dir() {
        return Err(AppError::InvalidInput(format!(
            "output directory {} does not exist",
            output_dir.display()
        )));
    }
    Ok(DatasetStore::new(output_dir.to_path_buf())?)
}
