//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when using the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read or parse the backing file.
    #[error("Failed to open store at {path}: {reason}")]
    OpenError { path: PathBuf, reason: String },

    /// Failed to serialize or deserialize a value.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to write the backing file.
    #[error("Store write failed: {0}")]
    WriteError(#[from] std::io::Error),

    /// A writer panicked while holding the store lock.
    #[error("Store lock poisoned")]
    Poisoned,
}
