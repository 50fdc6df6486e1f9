//! sf-trace: profiling traces and hotspot selection.
//!
//! Provides:
//! - The profiling trace format emitted by the simulator (`*_prof.json`)
//! - A validating reader producing one [`EquationRecord`] per equation system
//! - Hotspot selection by fraction of total simulation time
//!
//! # Example
//!
//! ```
//! use sf_trace::{parse_trace, select};
//!
//! let trace = parse_trace(r#"{
//!     "totalTime": 0.00395,
//!     "profileBlocks": [
//!         { "id": 14, "ncall": 2512, "time": 0.0005925 },
//!         { "id": 20, "ncall": 10, "time": 0.00001 }
//!     ]
//! }"#).unwrap();
//!
//! let hotspots = select(trace.records(), 0.10).unwrap();
//! assert_eq!(hotspots.len(), 1);
//! assert_eq!(hotspots[0].id.get(), 14);
//! ```

pub mod error;
pub mod reader;
pub mod record;
pub mod select;

pub use error::{TraceError, TraceResult};
pub use reader::{parse_trace, read_trace};
pub use record::{EquationKind, EquationRecord, ProfileTrace};
pub use select::{DEFAULT_THRESHOLD, select};
