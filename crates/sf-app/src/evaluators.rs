//! Evaluators built from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use sf_model::ProfilingInfo;
use sf_sampler::{Evaluator, EvaluatorFactory, ProcessEvaluator, SampleResult};

use crate::error::{AppError, AppResult};

/// One process-isolated evaluator per equation, from a command template whose
/// arguments may contain `{equation}`.
#[derive(Clone, Debug)]
pub struct CommandEvaluatorFactory {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandEvaluatorFactory {
    pub fn from_command(command: &[String], working_dir: Option<PathBuf>) -> AppResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| AppError::Config("evaluator command is empty".to_string()))?;
        Ok(Self {
            program: PathBuf::from(program),
            args: args.to_vec(),
            working_dir,
        })
    }

    /// Identity used in dataset fingerprints.
    pub fn key(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl EvaluatorFactory for CommandEvaluatorFactory {
    fn evaluator_for(&self, _info: &ProfilingInfo) -> SampleResult<Arc<dyn Evaluator>> {
        let mut evaluator = ProcessEvaluator::new(&self.program).args(self.args.iter().cloned());
        if let Some(dir) = &self.working_dir {
            evaluator = evaluator.working_dir(dir);
        }
        Ok(Arc::new(evaluator))
    }
}
