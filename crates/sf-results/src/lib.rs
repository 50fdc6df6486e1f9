//! sf-results: dataset artifacts, content hashing and seed derivation.

pub mod csv;
pub mod hash;
pub mod manifest;
pub mod store;

pub use hash::{FingerprintInput, compute_fingerprint, derive_seed};
pub use manifest::{DatasetManifest, FORMAT_VERSION};
pub use store::DatasetStore;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataset not found: {id}")]
    DatasetNotFound { id: String },

    #[error("Corrupt dataset {id}: {reason}")]
    Corrupt { id: String, reason: String },
}
