//! Error taxonomy shared by every chatmemory crate.

use thiserror::Error;

/// Errors surfaced by the memory engine.
///
/// Variants map onto the failure domains of the core: message and
/// request validation, vector-store backends, embedding services,
/// summarizers, and construction-time configuration. Indexing and
/// retrieval paths downgrade most of these to a logged warning rather
/// than propagating them; see the crates that own those paths.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Empty content, empty id, invalid role, negative budget, or an
    /// out-of-range similarity threshold.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A vector-store backend failed to read or write.
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An embedding service returned the wrong length, non-finite
    /// values, or failed outright.
    #[error("embedding failure: {0}")]
    Embedding(String),

    /// A summarizer failed or timed out.
    #[error("summarizer failure: {0}")]
    Summarizer(String),

    /// Invalid preset, incompatible embedder/store dimensions, or an
    /// otherwise invalid configuration discovered at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Catch-all for errors from outside the taxonomy above.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl MemoryError {
    /// Shorthand for a [`MemoryError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for a [`MemoryError::Embedding`].
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Shorthand for a [`MemoryError::Summarizer`].
    pub fn summarizer(msg: impl Into<String>) -> Self {
        Self::Summarizer(msg.into())
    }

    /// Shorthand for a [`MemoryError::Configuration`].
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
