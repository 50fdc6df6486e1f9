//! sf-model: equation structure of a compiled model and dependency analysis.
//!
//! Provides:
//! - The model structure format emitted by the model compiler (`*_info.json`)
//! - Incremental builder with validation
//! - Stable equation indexing
//! - Dependency resolution: which variables a non-linear system reads and
//!   which it solves for
//!
//! # Example
//!
//! ```
//! use sf_core::EquationId;
//! use sf_model::{BlockKind, ModelBuilder, resolve};
//!
//! let mut builder = ModelBuilder::new("simpleLoop");
//! builder.add_variable("y", Some(0.5));
//! builder
//!     .add_equation(EquationId::new(13), BlockKind::Assignment)
//!     .defines(["x"])
//!     .uses(["r", "s", "y"]);
//! builder
//!     .add_equation(EquationId::new(14), BlockKind::Nonlinear)
//!     .uses(["s", "r", "x", "y"])
//!     .unknowns(["y"])
//!     .inner([EquationId::new(13)]);
//! let model = builder.build().unwrap();
//!
//! let info = resolve(EquationId::new(14), &model).unwrap();
//! assert_eq!(info.using_vars, vec!["s", "r"]);
//! assert_eq!(info.iteration_variables, vec!["y"]);
//! ```

pub mod builder;
pub mod error;
pub mod indexing;
pub mod model;
pub mod resolve;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::{EquationBuilder, ModelBuilder};
pub use error::{DependencyError, DependencyResult, ModelError};
pub use indexing::EquationIndex;
pub use model::{BlockKind, EquationBlock, ModelStructure, VariableDef, load_model, parse_model};
pub use resolve::{FoldedEquation, ProfilingInfo, fold_nested, resolve, resolve_all};
