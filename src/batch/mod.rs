//! Batch ingestion: record loading and the parallel driver

mod cancel;
mod driver;
pub mod loader;

pub use cancel::CancellationToken;
pub use driver::{BatchDriver, BatchOptions, BatchOutcome};
pub use loader::{load_path, LoadedRecords};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input path not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no readable input files under {0}")]
    NoReadableInput(String),

    #[error("ingestion worker failed: {0}")]
    Worker(String),
}
