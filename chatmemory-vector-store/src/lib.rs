#![deny(missing_docs)]
//! In-memory [`VectorStore`] implementation: cosine top-K search, a fixed
//! per-store dimension, and optional LRU eviction.
//!
//! Normative for the interface: a persistent backend must reproduce the
//! ordering and equality semantics implemented here for identical inputs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chatmemory_types::{MemoryError, SimilaritySearchResult, VectorEntry, VectorStore};
use serde_json::Value;
use tokio::sync::RwLock;

/// Construction-time knobs for [`InMemoryVectorStore`].
#[derive(Debug, Clone, Default)]
pub struct VectorStoreConfig {
    /// If set, every stored entry must have an embedding of exactly this
    /// length; otherwise the store pins its dimension on first write.
    pub expected_dimension: Option<usize>,
    /// If set, writes beyond this many entries evict the least-recently
    /// used entry (by last access-or-write tick).
    pub max_entries: Option<usize>,
}

struct Entry {
    value: VectorEntry,
    tick: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    dimension: Option<usize>,
}

/// Cosine-search vector store backed by a `HashMap` guarded by a
/// `tokio::sync::RwLock`, mirroring the single-writer/multiple-reader
/// discipline the core's state stores use elsewhere.
pub struct InMemoryVectorStore {
    config: VectorStoreConfig,
    inner: RwLock<Inner>,
    clock: AtomicU64,
}

impl InMemoryVectorStore {
    /// Create a store with no dimension or capacity constraint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(VectorStoreConfig::default())
    }

    /// Create a store with explicit dimension/capacity constraints.
    #[must_use]
    pub fn with_config(config: VectorStoreConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                dimension: None,
            }),
            clock: AtomicU64::new(0),
        }
    }

    fn next_tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn matches_filter(entry: &VectorEntry, filter: &HashMap<String, Value>) -> bool {
        filter
            .iter()
            .all(|(k, v)| entry.metadata.get(k).is_some_and(|ev| ev == v))
    }

    /// Cosine similarity; `0.0` for zero-norm vectors, non-finite inputs,
    /// or a length mismatch.
    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;
        for (&x, &y) in a.iter().zip(b.iter()) {
            if !x.is_finite() || !y.is_finite() {
                return 0.0;
            }
            dot += f64::from(x) * f64::from(y);
            norm_a += f64::from(x) * f64::from(x);
            norm_b += f64::from(y) * f64::from(y);
        }
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
    }

    async fn evict_if_over_capacity(&self, inner: &mut Inner) {
        let Some(max_entries) = self.config.max_entries else {
            return;
        };
        while inner.entries.len() > max_entries {
            let Some(lru_id) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.tick)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            tracing::warn!(id = %lru_id, "evicting least-recently-used vector entry");
            inner.entries.remove(&lru_id);
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn store(&self, entry: VectorEntry) -> Result<(), MemoryError> {
        let mut inner = self.inner.write().await;
        let expected = self.config.expected_dimension.or(inner.dimension);
        if let Some(expected) = expected {
            if entry.embedding.len() != expected {
                return Err(MemoryError::validation(format!(
                    "embedding dimension {} does not match store dimension {expected}",
                    entry.embedding.len()
                )));
            }
        } else {
            inner.dimension = Some(entry.embedding.len());
        }
        let tick = self.next_tick();
        tracing::debug!(id = %entry.id, "storing vector entry");
        inner.entries.insert(entry.id.clone(), Entry { value: entry, tick });
        self.evict_if_over_capacity(&mut inner).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<VectorEntry>, MemoryError> {
        let mut inner = self.inner.write().await;
        let tick = self.next_tick();
        if let Some(entry) = inner.entries.get_mut(id) {
            entry.tick = tick;
            Ok(Some(entry.value.clone()))
        } else {
            Ok(None)
        }
    }

    async fn get_all(&self) -> Result<Vec<VectorEntry>, MemoryError> {
        let inner = self.inner.read().await;
        let mut all: Vec<VectorEntry> = inner.entries.values().map(|e| e.value.clone()).collect();
        all.sort_by_key(|e| e.timestamp);
        Ok(all)
    }

    async fn delete(&self, id: &str) -> Result<(), MemoryError> {
        let mut inner = self.inner.write().await;
        inner.entries.remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.dimension = None;
        Ok(())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        let inner = self.inner.read().await;
        Ok(inner.entries.len())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_similarity: f32,
        metadata_filter: Option<&HashMap<String, Value>>,
    ) -> Result<Vec<SimilaritySearchResult>, MemoryError> {
        let inner = self.inner.read().await;
        let mut results: Vec<SimilaritySearchResult> = inner
            .entries
            .values()
            .filter(|e| {
                metadata_filter
                    .map(|f| Self::matches_filter(&e.value, f))
                    .unwrap_or(true)
            })
            .map(|e| SimilaritySearchResult {
                entry: e.value.clone(),
                similarity: Self::cosine(query, &e.value.embedding),
            })
            .filter(|r| r.similarity >= min_similarity)
            .collect();
        results.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        results.truncate(top_k);
        Ok(results)
    }
}
