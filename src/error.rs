//! Error types for the I/O edges. The puzzle core itself never fails;
//! these cover the persistence boundary and external level packs.

use thiserror::Error;

/// Errors surfaced by `Storage` implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors loading an external level pack.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("level pack contains no levels")]
    Empty,
}
