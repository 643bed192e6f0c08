//! Error types for strata-db-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
///
/// Callers are expected to distinguish `NotFound` from true failures:
/// an absent chunk or key is a normal outcome of a lookup, not an error
/// condition in the storage layer itself.
#[derive(Error, Debug)]
pub enum Error {
    /// Chunk absent from the store, or key absent from a map
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored bytes failed to parse, or content hash mismatched on read
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// Underlying store read/write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation was cancelled before completion
    #[error("operation cancelled")]
    Cancelled,

    /// Root commit lost an optimistic-concurrency race
    #[error("root commit failed: expected {expected}, found {actual}")]
    CasFailed { expected: String, actual: String },

    /// Programmer misuse of an internal API
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Operation disallowed on this binary format
    #[error("unsupported format: {0}")]
    FormatUnsupported(String),

    /// Manifest (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a corrupt data error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Error::Corrupt(msg.into())
    }

    /// Create an invariant violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }

    /// Create an unsupported format error
    pub fn format_unsupported(msg: impl Into<String>) -> Self {
        Error::FormatUnsupported(msg.into())
    }

    /// True iff this error is a `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
