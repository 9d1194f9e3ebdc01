//! Error taxonomy for the retrieval pipeline.
//!
//! Validation failures are rejected before any external call; provider
//! failures (embedding gateway or vector index) propagate as a distinct
//! variant so callers can decide on retry policy. Chunking itself never
//! fails and has no error type.

use thiserror::Error;

/// Errors surfaced by ingestion and retrieval.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Malformed input, rejected before any external call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Embedding gateway or vector index failure. Not retried here;
    /// the caller owns retry policy.
    #[error("provider failure: {0}")]
    Provider(#[source] anyhow::Error),

    /// A vector whose length does not match the index dimension.
    /// This is a data-integrity error, not a transient failure.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl QuarryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
