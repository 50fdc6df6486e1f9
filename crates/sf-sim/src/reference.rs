//! Memoized reference simulation.
//!
//! The full model is simulated at most once per model key, however many
//! hotspot equations need ranges from it. Concurrent callers for the same key
//! wait for the first run instead of starting their own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::{SimError, SimResult};
use crate::result::SimulationResult;
use crate::source::SimulationSource;

/// Retries and time bound for one reference simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            timeout: None,
        }
    }
}

/// Run `source`, retrying failed attempts per `policy`.
///
/// Returns the last error once every attempt has failed.
pub fn run_with_retry(
    source: &dyn SimulationSource,
    policy: &RetryPolicy,
) -> SimResult<SimulationResult> {
    let attempts = policy.retries + 1;
    let mut last_err = SimError::InvalidArg {
        what: "no simulation attempts",
    };
    for attempt in 1..=attempts {
        match source.run(policy.timeout) {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempt, "reference simulation succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) => {
                tracing::warn!(attempt, attempts, error = %err, "reference simulation failed");
                last_err = err;
            }
        }
    }
    Err(last_err)
}

type Slot = Arc<Mutex<Option<Arc<SimulationResult>>>>;

/// Per-model memo of reference simulation results.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    slots: Mutex<HashMap<String, Slot>>,
    runs: AtomicUsize,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result for `source`'s model, simulating only if no earlier call
    /// succeeded. Failures are not memoized.
    pub fn get_or_run(
        &self,
        source: &dyn SimulationSource,
        policy: &RetryPolicy,
    ) -> SimResult<Arc<SimulationResult>> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(source.model_key()).or_default())
        };

        // Holding the slot lock while simulating makes other callers for the
        // same model wait for this run.
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(result) = guard.as_ref() {
            return Ok(Arc::clone(result));
        }

        self.runs.fetch_add(1, Ordering::Relaxed);
        let result = Arc::new(run_with_retry(source, policy)?);
        *guard = Some(Arc::clone(&result));
        Ok(result)
    }

    /// Number of simulations started through this cache.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }
}
