//! Errors raised while writing or reading output files.

use std::path::PathBuf;
use thiserror::Error;

/// Output errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file held data that is not usable.
    #[error("Invalid content in {path}: {reason}")]
    InvalidContent {
        /// File that was read.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result alias for output operations.
pub type Result<T> = std::result::Result<T, Error>;
