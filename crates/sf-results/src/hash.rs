//! Content-based hashing for seeds and dataset fingerprints.

use serde::Serialize;
use sha2::{Digest, Sha256};
use sf_core::EquationId;
use sf_model::ProfilingInfo;
use sf_sampler::{SamplerConfig, SamplingStrategy};
use sf_sim::VariableRange;

use crate::ResultsResult;
use crate::manifest::FORMAT_VERSION;

/// Per-equation seed: the first 8 bytes of SHA-256(global seed ‖ equation id),
/// little-endian. Independent of scheduling order.
pub fn derive_seed(global_seed: u64, id: EquationId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(id.get().to_le_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Everything that determines a dataset's content.
#[derive(Serialize)]
pub struct FingerprintInput<'a> {
    pub info: &'a ProfilingInfo,
    pub ranges: &'a [VariableRange],
    pub sample_count: usize,
    pub attempt_factor: usize,
    pub strategy: SamplingStrategy,
    pub seed: u64,
    pub eval_timeout_s: Option<f64>,
    /// Identity of the evaluator (command line or name).
    pub evaluator: &'a str,
}

impl<'a> FingerprintInput<'a> {
    pub fn new(
        info: &'a ProfilingInfo,
        ranges: &'a [VariableRange],
        config: &SamplerConfig,
        evaluator: &'a str,
    ) -> Self {
        Self {
            info,
            ranges,
            sample_count: config.sample_count,
            attempt_factor: config.attempt_factor,
            strategy: config.strategy,
            seed: config.seed,
            eval_timeout_s: config.eval_timeout.map(|t| t.as_secs_f64()),
            evaluator,
        }
    }
}

/// Hex SHA-256 of the fingerprint input. Worker count is not hashed:
/// it never changes the generated samples.
pub fn compute_fingerprint(input: &FingerprintInput<'_>) -> ResultsResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(FORMAT_VERSION.to_le_bytes());
    hasher.update(serde_json::to_string(input)?.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
