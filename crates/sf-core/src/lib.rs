//! sf-core: stable foundation for surroflow.
//!
//! Contains:
//! - ids (equation identifiers assigned by the model compiler)
//! - numeric (Real + tolerances + float helpers)
//! - timing (stage timers)
//! - cancel (cooperative cancellation shared by pipeline workers)
//! - process (bounded waits on external simulator/evaluator processes)
//! - error (shared error types)

pub mod cancel;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod process;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use cancel::CancelToken;
pub use error::{SfError, SfResult};
pub use ids::*;
pub use numeric::*;
pub use process::{WaitOutcome, kill_process_tree, own_process_group, wait_with_timeout};
pub use timing::{AccumulatingTimer, Timer};
