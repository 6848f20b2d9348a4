#![deny(missing_docs)]
//! Query-driven top-K semantic retrieval over a [`VectorStore`], isolated
//! from a flaky embedder or store by a circuit breaker.
//!
//! [`SemanticRetriever::retrieve`] never returns an error: every failure
//! mode (disabled, empty query, breaker open, embedder/store failure)
//! degrades to an empty result, per spec §4.7 and §7's propagation
//! policy for semantic retrieval.

mod circuit_breaker;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chatmemory_types::{EmbeddingService, Message, Role, VectorStore};
use serde_json::json;

pub use circuit_breaker::{BreakerState, CircuitBreaker};

/// How many of the tail of `recent_messages` are excluded from semantic
/// results, so the same content isn't surfaced twice.
pub const RECENT_EXCLUSION_WINDOW: usize = 10;

/// Configuration for [`SemanticRetriever`].
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Maximum number of semantic matches returned per query.
    pub semantic_top_k: usize,
    /// Minimum cosine similarity a match must clear.
    pub min_similarity: f32,
    /// Consecutive failures before the breaker opens.
    pub max_failures: u32,
    /// How long the breaker stays open before a probe is allowed.
    pub cooldown: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            semantic_top_k: 5,
            min_similarity: 0.0,
            max_failures: 3,
            cooldown: Duration::from_secs(300),
        }
    }
}

/// Retrieves messages similar to a query from a [`VectorStore`], tagging
/// each hit with `retrievalType = "semantic"` and its similarity score.
pub struct SemanticRetriever {
    config: RetrieverConfig,
    store: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn EmbeddingService>>,
    breaker: CircuitBreaker,
}

impl SemanticRetriever {
    /// Construct a retriever. Passing `None` for either collaborator
    /// disables retrieval entirely (spec's `can_retrieve` capability).
    #[must_use]
    pub fn new(
        store: Option<Arc<dyn VectorStore>>,
        embedder: Option<Arc<dyn EmbeddingService>>,
        config: RetrieverConfig,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.max_failures, config.cooldown);
        Self {
            config,
            store,
            embedder,
            breaker,
        }
    }

    /// The breaker guarding calls to the embedder and store, exposed for
    /// health reporting.
    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Whether this retriever has both an embedder and a store attached.
    #[must_use]
    pub fn can_retrieve(&self) -> bool {
        self.store.is_some() && self.embedder.is_some()
    }

    fn exclusion_set(recent_messages: &[Message]) -> HashSet<String> {
        let mut set = HashSet::new();
        for m in recent_messages.iter().rev().take(RECENT_EXCLUSION_WINDOW) {
            set.insert(m.id.clone());
            set.insert(format!("{}_semantic", m.id));
        }
        set
    }

    fn to_semantic_message(
        entry: chatmemory_types::VectorEntry,
        similarity: f32,
        exclusion: &HashSet<String>,
    ) -> Option<Message> {
        let original_id = entry.id.clone();
        if exclusion.contains(&original_id) {
            return None;
        }
        let role_str = entry
            .metadata
            .get("role")
            .and_then(|v| v.as_str())
            .unwrap_or("user");
        let (role, _recognized) = Role::parse(role_str);

        let mut metadata = entry.metadata;
        metadata.insert("similarity".to_string(), json!(similarity));
        metadata.insert("retrievalType".to_string(), json!("semantic"));
        metadata.insert("originalId".to_string(), json!(original_id));

        let id = chatmemory_types::VectorEntry::semantic_id(&original_id);
        Message::with_id(id, role, entry.content, entry.timestamp, Some(metadata)).ok()
    }

    /// Retrieve up to `semantic_top_k` messages similar to `query`,
    /// excluding anything already present in the tail of
    /// `recent_messages`. Always succeeds; degrades to an empty list.
    pub async fn retrieve(&self, query: &str, recent_messages: &[Message]) -> Vec<Message> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let (Some(store), Some(embedder)) = (&self.store, &self.embedder) else {
            return Vec::new();
        };
        if self.breaker.is_open().await {
            tracing::debug!("semantic retriever breaker open, skipping retrieval");
            return Vec::new();
        }

        let query_vector = match embedder.embed(query).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "embedding failed during semantic retrieval");
                self.breaker.record_failure().await;
                return Vec::new();
            }
        };
        if query_vector.is_empty() || query_vector.iter().any(|x| !x.is_finite()) {
            tracing::warn!("query embedding was empty or non-finite");
            self.breaker.record_failure().await;
            return Vec::new();
        }

        let results = match store
            .search(
                &query_vector,
                self.config.semantic_top_k,
                self.config.min_similarity,
                None,
            )
            .await
        {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "vector store search failed during semantic retrieval");
                self.breaker.record_failure().await;
                return Vec::new();
            }
        };
        self.breaker.record_success().await;

        let exclusion = Self::exclusion_set(recent_messages);
        results
            .into_iter()
            .filter_map(|r| Self::to_semantic_message(r.entry, r.similarity, &exclusion))
            .collect()
    }
}
