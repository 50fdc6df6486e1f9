//! YAML pipeline configuration.
//!
//! ```yaml
//! name: simpleLoop
//! trace: simpleLoop_prof.json
//! model: simpleLoop_info.json
//! simulation:
//!   result: simpleLoop_res.csv
//! evaluator:
//!   command: ["./eval_eq", "{equation}"]
//! sampling:
//!   sample_count: 1000
//!   seed: 42
//! ```
//!
//! Every field except `trace`, `model`, `simulation` and `evaluator` has a
//! default. Relative paths resolve against the configuration file's directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sf_results::DatasetStore;
use sf_sampler::{SamplerConfig, SamplingStrategy};
use sf_sim::{CsvResultFile, RangeMargin, RetryPolicy, SimulationSource, SimulatorCommand};

use crate::error::{AppError, AppResult};
use crate::evaluators::CommandEvaluatorFactory;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub trace: PathBuf,
    pub model: PathBuf,
    pub simulation: SimulationConfig,
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub hotspots: HotspotConfig,
    #[serde(default)]
    pub ranges: RangeMargin,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Equations processed concurrently; defaults to available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equation_workers: Option<usize>,
}

/// Reference simulation: an existing result file, or a simulator command that
/// writes `result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    pub result: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_simulation_timeout_s")]
    pub timeout_s: f64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Program and arguments; `{equation}` is replaced by the equation id.
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotspotConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    #[serde(default = "default_attempt_factor")]
    pub attempt_factor: usize,
    #[serde(default)]
    pub strategy: SamplingStrategy,
    /// Global seed; each equation derives its own from it.
    #[serde(default)]
    pub seed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default = "default_eval_timeout_s")]
    pub eval_timeout_s: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            attempt_factor: default_attempt_factor(),
            strategy: SamplingStrategy::default(),
            seed: 0,
            workers: None,
            eval_timeout_s: default_eval_timeout_s(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".surroflow")
}

fn default_use_cache() -> bool {
    true
}

fn default_simulation_timeout_s() -> f64 {
    600.0
}

fn default_retries() -> u32 {
    2
}

fn default_threshold() -> f64 {
    sf_trace::DEFAULT_THRESHOLD
}

fn default_sample_count() -> usize {
    1000
}

fn default_attempt_factor() -> usize {
    10
}

fn default_eval_timeout_s() -> f64 {
    10.0
}

fn positive_duration(seconds: f64, field: &str) -> AppResult<Duration> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(AppError::Config(format!(
            "{field} must be a finite number of seconds > 0, got {seconds}"
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Load, resolve and validate a pipeline configuration.
pub fn load_config(path: &Path) -> AppResult<PipelineConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config: PipelineConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse pipeline YAML: {}", e)))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    config.validate()?;
    Ok(config)
}

impl PipelineConfig {
    /// Make every relative path absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.trace);
        join(&mut self.model);
        join(&mut self.output_dir);
        if let Some(dir) = &mut self.simulation.working_dir {
            join(dir);
        } else if !self.simulation.command.is_empty() {
            // Simulator commands run next to the configuration by default.
            self.simulation.working_dir = Some(base.to_path_buf());
        }
        match &self.simulation.working_dir {
            Some(dir) if self.simulation.result.is_relative() => {
                self.simulation.result = dir.join(&self.simulation.result);
            }
            _ => join(&mut self.simulation.result),
        }
        if let Some(dir) = &mut self.evaluator.working_dir {
            join(dir);
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=1.0).contains(&self.hotspots.threshold) {
            return Err(AppError::Config(format!(
                "hotspots.threshold must be in [0, 1], got {}",
                self.hotspots.threshold
            )));
        }
        self.ranges.validate()?;
        positive_duration(self.simulation.timeout_s, "simulation.timeout_s")?;
        positive_duration(self.sampling.eval_timeout_s, "sampling.eval_timeout_s")?;
        if self.evaluator.command.is_empty() {
            return Err(AppError::Config("evaluator.command must not be empty".to_string()));
        }
        if self.sampling.attempt_factor == 0 {
            return Err(AppError::Config("sampling.attempt_factor must be >= 1".to_string()));
        }
        if self.sampling.workers == Some(0) || self.equation_workers == Some(0) {
            return Err(AppError::Config("worker counts must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Model name for the report: configured, else the trace file stem.
    pub fn model_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.trace
                .file_stem()
                .map(|s| s.to_string_lossy().trim_end_matches("_prof").to_string())
                .unwrap_or_else(|| "model".to_string())
        })
    }

    pub fn simulation_source(&self) -> Box<dyn SimulationSource> {
        match self.simulation.command.split_first() {
            None => Box::new(CsvResultFile::new(&self.simulation.result)),
            Some((program, args)) => {
                let mut command = SimulatorCommand::new(program, &self.simulation.result);
                for arg in args {
                    command = command.arg(arg);
                }
                if let Some(dir) = &self.simulation.working_dir {
                    command = command.working_dir(dir);
                }
                Box::new(command)
            }
        }
    }

    pub fn retry_policy(&self) -> AppResult<RetryPolicy> {
        Ok(RetryPolicy {
            retries: self.simulation.retries,
            timeout: Some(positive_duration(
                self.simulation.timeout_s,
                "simulation.timeout_s",
            )?),
        })
    }

    /// Sampler settings with the global seed; the pipeline derives the
    /// per-equation seed.
    pub fn sampler_config(&self) -> AppResult<SamplerConfig> {
        let defaults = SamplerConfig::default();
        Ok(SamplerConfig {
            sample_count: self.sampling.sample_count,
            attempt_factor: self.sampling.attempt_factor,
            strategy: self.sampling.strategy,
            seed: self.sampling.seed,
            workers: self.sampling.workers.unwrap_or(defaults.workers),
            eval_timeout: Some(positive_duration(
                self.sampling.eval_timeout_s,
                "sampling.eval_timeout_s",
            )?),
        })
    }

    pub fn evaluator_factory(&self) -> AppResult<CommandEvaluatorFactory> {
        CommandEvaluatorFactory::from_command(
            &self.evaluator.command,
            self.evaluator.working_dir.clone(),
        )
    }

    pub fn store(&self) -> AppResult<DatasetStore> {
        Ok(DatasetStore::new(self.output_dir.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
trace: run/simpleLoop_prof.json
model: run/simpleLoop_info.json
simulation:
  result: run/simpleLoop_res.csv
evaluator:
  command: ["./eval", "{equation}"]
"#;

    #[test]
    fn defaults_fill_optional_fields() {
        let mut config: PipelineConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.resolve_paths(Path::new("/work"));
        config.validate().unwrap();

        assert_eq!(config.trace, PathBuf::from("/work/run/simpleLoop_prof.json"));
        assert_eq!(config.simulation.result, PathBuf::from("/work/run/simpleLoop_res.csv"));
        assert_eq!(config.output_dir, PathBuf::from("/work/.surroflow"));
        assert_eq!(config.hotspots.threshold, 0.03);
        assert_eq!(config.sampling.sample_count, 1000);
        assert_eq!(config.sampling.attempt_factor, 10);
        assert_eq!(config.simulation.retries, 2);
        assert_eq!(config.ranges, RangeMargin::default());
        assert!(config.use_cache);
        assert_eq!(config.model_name(), "simpleLoop");
    }

    #[test]
    fn simulator_result_is_relative_to_working_dir() {
        let yaml = r#"
trace: t.json
model: m.json
simulation:
  result: out_res.csv
  command: ["./simpleLoop", "-override=stopTime=1"]
  working_dir: build
evaluator:
  command: ["./eval"]
"#;
        let mut config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        config.resolve_paths(Path::new("/work"));
        assert_eq!(config.simulation.working_dir, Some(PathBuf::from("/work/build")));
        assert_eq!(config.simulation.result, PathBuf::from("/work/build/out_res.csv"));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config: PipelineConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.hotspots.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config: PipelineConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.sampling.eval_timeout_s = 0.0;
        assert!(config.validate().is_err());

        let mut config: PipelineConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.evaluator.command.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = format!("{MINIMAL}\nsurprise: true\n");
        assert!(serde_yaml::from_str::<PipelineConfig>(&yaml).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/pipeline.yaml")).unwrap_err();
        assert!(matches!(err, AppError::ConfigFileRead { .. }));
    }
}
