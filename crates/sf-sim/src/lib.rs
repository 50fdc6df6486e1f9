//! Reference simulation and range discovery for surroflow.
//!
//! Provides:
//! - The `SimulationSource` seam to the external simulator
//! - Result-file (CSV) reader and a bounded simulator command runner
//! - A memoized reference simulation shared by every equation of a model
//! - Range discovery with safety margins for sampling

pub mod error;
pub mod ranges;
pub mod reference;
pub mod result;
pub mod source;

// Re-exports for public API
pub use error::{RangeError, RangeResult, SimError, SimResult};
pub use ranges::{RangeMargin, RangeSet, VariableRange, discover_ranges};
pub use reference::{ReferenceCache, RetryPolicy, run_with_retry};
pub use result::{SimulationResult, parse_result_csv, read_result_csv};
pub use source::{CsvResultFile, SimulationSource, SimulatorCommand};
