//! Shared error types for Murmur.

use thiserror::Error;

/// Top-level error type for Murmur.
#[derive(Error, Debug)]
pub enum MurmurError {
    /// A memory store operation failed.
    #[error("Memory error: {0}")]
    Memory(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The embedding provider failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input (rejected before any I/O).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Alias for Result with MurmurError.
pub type MurmurResult<T> = Result<T, MurmurError>;
