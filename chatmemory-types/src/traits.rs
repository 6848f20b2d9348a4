//! Trait contracts implemented by each subsystem crate.
//!
//! These traits are the seams the manager (`chatmemory-manager`) and the
//! conversation surface (`chatmemory`) hold as `Arc<dyn Trait>`, so async
//! methods use `#[async_trait]` boxing rather than RPITIT — the trait
//! objects need to be dyn-compatible.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MemoryError;
use crate::message::Message;
use crate::summary::SummaryInfo;
use crate::vector::{SimilaritySearchResult, VectorEntry};

/// Deterministic token-count estimation for a piece of text.
///
/// Implementations are pure and synchronous. The engine never compares
/// estimates produced by different implementations within the same
/// process — an estimate is only meaningful relative to itself.
pub trait TokenEstimator: Send + Sync {
    /// Estimate the token count of `text`. Returns `0` for empty text.
    fn estimate(&self, text: &str) -> usize;
}

/// Text-to-vector embedding, single and batched.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed one piece of text. Empty/whitespace-only input yields the
    /// zero vector of `dimension()` length.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Embedding`] if the underlying implementation
    /// fails or would return a non-finite value.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    /// Embed a batch of texts, preserving input order and length.
    ///
    /// A per-item failure fails the whole batch. The default
    /// implementation simply calls [`EmbeddingService::embed`] for each
    /// item in turn; implementations backed by a batching API should
    /// override this.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Embedding`] on any per-item failure.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// The fixed length of every vector this service produces.
    fn dimension(&self) -> usize;
}

/// Persistence and cosine top-K search over [`VectorEntry`] records.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or idempotently replace an entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure, or
    /// [`MemoryError::Validation`] if the entry's dimension conflicts with
    /// the store's fixed dimension.
    async fn store(&self, entry: VectorEntry) -> Result<(), MemoryError>;

    /// Insert or replace a batch of entries. Equivalent to calling
    /// [`VectorStore::store`] for each entry, up to internal ordering.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure.
    async fn store_batch(&self, entries: Vec<VectorEntry>) -> Result<(), MemoryError> {
        for entry in entries {
            self.store(entry).await?;
        }
        Ok(())
    }

    /// Look up an entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure.
    async fn get(&self, id: &str) -> Result<Option<VectorEntry>, MemoryError>;

    /// All entries, ordered by timestamp ascending.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure.
    async fn get_all(&self) -> Result<Vec<VectorEntry>, MemoryError>;

    /// Remove an entry by id. Removing an absent id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure.
    async fn delete(&self, id: &str) -> Result<(), MemoryError>;

    /// Remove a batch of entries by id.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure.
    async fn delete_batch(&self, ids: &[String]) -> Result<(), MemoryError> {
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure.
    async fn clear(&self) -> Result<(), MemoryError>;

    /// Number of entries currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure.
    async fn count(&self) -> Result<usize, MemoryError>;

    /// Cosine top-K search, similarity descending. Entries whose
    /// dimension differs from `query`'s are scored `0` rather than
    /// rejected. `metadata_filter`, when present, requires equality on
    /// every key; an entry missing a filtered key does not match.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] on a backend failure.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_similarity: f32,
        metadata_filter: Option<&HashMap<String, Value>>,
    ) -> Result<Vec<SimilaritySearchResult>, MemoryError>;
}

/// Compression of a batch of messages into a short digest.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `messages` (oldest first) using `estimator` for the
    /// before/after token counts.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Summarizer`] if summarization fails; callers
    /// apply their own retry/fallback policy around this call (see
    /// `chatmemory-context`'s circuit breaker).
    async fn summarize(
        &self,
        messages: &[Message],
        estimator: &dyn TokenEstimator,
    ) -> Result<SummaryInfo, MemoryError>;
}

/// Decides the included/excluded/summarized split of a message list under
/// a token budget.
#[async_trait]
pub trait ContextStrategy: Send + Sync {
    /// Partition `messages` (oldest first) under `token_budget`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Summarizer`] only when summarization fails
    /// in a way its own fallback policy could not absorb; strategies are
    /// expected to degrade internally wherever spec'd.
    async fn apply(
        &self,
        messages: &[Message],
        token_budget: i64,
        estimator: &dyn TokenEstimator,
    ) -> Result<crate::strategy::StrategyResult, MemoryError>;
}
