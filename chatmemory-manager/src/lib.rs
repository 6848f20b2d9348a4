#![deny(missing_docs)]
//! Orchestrates the context strategy, the semantic retriever, and
//! best-effort vector-store indexing into a single [`MemoryManager`].
//!
//! This is C8 in the engine's component breakdown: it owns no transcript
//! state of its own (that belongs to the conversation manager) and never
//! fails its callers — indexing failures are logged and swallowed, and
//! `get_context` always returns a usable [`ContextResult`].

use std::collections::HashMap;
use std::sync::Arc;

use chatmemory_context::{SlidingWindowConfig, SlidingWindowStrategy, SummarizationConfig, SummarizationStrategy};
use chatmemory_estimator::CharRatioEstimator;
use chatmemory_retriever::{RetrieverConfig, SemanticRetriever};
use chatmemory_types::{
    ContextMetadata, ContextResult, ContextStrategy, EmbeddingService, MemoryError, Message, Role,
    StrategyResult, Summarizer, TokenEstimator, VectorEntry, VectorStore,
};
use serde_json::Value;

/// Fraction of `max_tokens` reserved for the non-semantic strategy pass,
/// leaving headroom for the semantic block the host may append.
const STRATEGY_BUDGET_FRACTION: f64 = 0.8;

/// Construction-time configuration for [`MemoryManager`].
#[derive(Clone)]
pub struct MemoryConfig {
    /// Token budget for assembled context.
    pub max_tokens: i64,
    /// Whether semantic retrieval is enabled at all.
    pub enable_semantic_memory: bool,
    /// Whether the summarization strategy is used; when `false`, the
    /// manager falls back to the sliding-window strategy instead.
    pub enable_summarization: bool,
    /// Maximum semantic matches returned per query.
    pub semantic_top_k: usize,
    /// Minimum cosine similarity a semantic match must clear, in `[0, 1]`.
    pub min_similarity: f32,
    /// Backing vector store. `None` disables indexing and retrieval.
    pub vector_store: Option<Arc<dyn VectorStore>>,
    /// Backing embedding service. `None` disables indexing and retrieval.
    pub embedding_service: Option<Arc<dyn EmbeddingService>>,
    /// Summarizer used by the summarization strategy.
    pub summarizer: Arc<dyn Summarizer>,
}

impl MemoryConfig {
    fn validate(&self) -> Result<(), MemoryError> {
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(MemoryError::configuration(
                "min_similarity must be within [0, 1]",
            ));
        }
        if self.max_tokens <= 0 {
            return Err(MemoryError::configuration("max_tokens must be positive"));
        }
        Ok(())
    }
}

/// Orchestrates context assembly: strategy partitioning, semantic
/// retrieval, and best-effort vector-store indexing.
pub struct MemoryManager {
    config: MemoryConfig,
    estimator: CharRatioEstimator,
    strategy: Arc<dyn ContextStrategy>,
    fallback_strategy: SlidingWindowStrategy,
    retriever: SemanticRetriever,
}

impl MemoryManager {
    /// Construct a manager from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Configuration`] if `min_similarity` is
    /// outside `[0, 1]` or `max_tokens` is not positive.
    pub fn new(config: MemoryConfig) -> Result<Self, MemoryError> {
        config.validate()?;

        let strategy: Arc<dyn ContextStrategy> = if config.enable_summarization {
            Arc::new(SummarizationStrategy::new(
                Arc::clone(&config.summarizer),
                SummarizationConfig {
                    max_tokens: config.max_tokens,
                    ..Default::default()
                },
            ))
        } else {
            Arc::new(SlidingWindowStrategy::new(SlidingWindowConfig {
                max_tokens: config.max_tokens,
                ..Default::default()
            }))
        };

        let retriever_store = if config.enable_semantic_memory {
            config.vector_store.clone()
        } else {
            None
        };
        let retriever_embedder = if config.enable_semantic_memory {
            config.embedding_service.clone()
        } else {
            None
        };
        let retriever = SemanticRetriever::new(
            retriever_store,
            retriever_embedder,
            RetrieverConfig {
                semantic_top_k: config.semantic_top_k,
                min_similarity: config.min_similarity,
                ..Default::default()
            },
        );

        Ok(Self {
            fallback_strategy: SlidingWindowStrategy::new(SlidingWindowConfig {
                max_tokens: config.max_tokens,
                ..Default::default()
            }),
            config,
            estimator: CharRatioEstimator::new(),
            strategy,
            retriever,
        })
    }

    /// The vector store backing indexing and retrieval, if one was
    /// configured. Exposed so a host can clear it alongside its transcript.
    #[must_use]
    pub fn vector_store(&self) -> Option<&Arc<dyn VectorStore>> {
        self.config.vector_store.as_ref()
    }

    /// Index a single message for later semantic retrieval. System and
    /// summary messages are skipped. Never fails: embedding and
    /// vector-store errors are logged and discarded.
    pub async fn store_message(&self, message: &Message) {
        if !matches!(message.role, Role::User | Role::Assistant) {
            return;
        }
        let (Some(embedder), Some(store)) =
            (&self.config.embedding_service, &self.config.vector_store)
        else {
            return;
        };

        let embedding = match embedder.embed(&message.content).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, id = %message.id, "failed to embed message, skipping index");
                return;
            }
        };

        let metadata = Self::entry_metadata(message);
        let entry = match VectorEntry::new(
            message.id.clone(),
            embedding,
            message.content.clone(),
            metadata,
            message.timestamp,
        ) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, id = %message.id, "invalid vector entry, skipping index");
                return;
            }
        };

        if let Err(err) = store.store(entry).await {
            tracing::warn!(error = %err, id = %message.id, "vector store write failed, skipping index");
        }
    }

    /// Index a batch of messages, embedding them in one call. Filters to
    /// user/assistant roles; never fails.
    pub async fn store_message_batch(&self, messages: &[Message]) {
        let (Some(embedder), Some(store)) =
            (&self.config.embedding_service, &self.config.vector_store)
        else {
            return;
        };
        let indexable: Vec<&Message> = messages
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .collect();
        if indexable.is_empty() {
            return;
        }
        let texts: Vec<String> = indexable.iter().map(|m| m.content.clone()).collect();
        let embeddings = match embedder.embed_batch(&texts).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "batch embedding failed, skipping index");
                return;
            }
        };
        let mut entries = Vec::with_capacity(indexable.len());
        for (message, embedding) in indexable.iter().zip(embeddings.into_iter()) {
            match VectorEntry::new(
                message.id.clone(),
                embedding,
                message.content.clone(),
                Self::entry_metadata(message),
                message.timestamp,
            ) {
                Ok(e) => entries.push(e),
                Err(err) => {
                    tracing::warn!(error = %err, id = %message.id, "invalid vector entry, skipping index");
                }
            }
        }
        if let Err(err) = store.store_batch(entries).await {
            tracing::warn!(error = %err, "batch vector store write failed, skipping index");
        }
    }

    fn entry_metadata(message: &Message) -> HashMap<String, Value> {
        let mut metadata = message.metadata.clone().unwrap_or_default();
        metadata.insert(
            "role".to_string(),
            Value::String(message.role.as_str().to_string()),
        );
        metadata
    }

    /// Assemble a token-budgeted context for `all_messages`, optionally
    /// retrieving semantic matches for `query`.
    ///
    /// Always succeeds. On the pre-check path, returns the transcript
    /// verbatim. Otherwise runs the configured strategy (degrading to a
    /// sliding-window inclusion if the strategy itself fails), then the
    /// semantic retriever using the strategy's `included` messages as the
    /// exclusion context.
    pub async fn get_context(&self, all_messages: &[Message], query: Option<&str>) -> ContextResult {
        let total_tokens: usize = all_messages
            .iter()
            .map(|m| self.estimator.estimate(&m.content))
            .sum();

        if total_tokens as i64 <= self.config.max_tokens {
            return ContextResult {
                messages: all_messages.to_vec(),
                summary: None,
                summaries: Vec::new(),
                semantic_messages: Vec::new(),
                estimated_tokens: total_tokens,
                metadata: ContextMetadata {
                    strategy_used: "none".to_string(),
                    summary_count: 0,
                    semantic_count: 0,
                    budget: self.config.max_tokens,
                    pre_check: "withinBudget".to_string(),
                    semantic_error: None,
                },
            };
        }

        let strategy_budget = (self.config.max_tokens as f64 * STRATEGY_BUDGET_FRACTION) as i64;
        let (result, strategy_used) = match self
            .strategy
            .apply(all_messages, strategy_budget, &self.estimator)
            .await
        {
            Ok(r) => {
                let name = r.name.clone();
                (r, name)
            }
            Err(err) => {
                tracing::warn!(error = %err, "context strategy failed outright, degrading to sliding window");
                let degraded = self
                    .fallback_strategy
                    .apply(all_messages, strategy_budget, &self.estimator)
                    .await
                    .unwrap_or(StrategyResult {
                        included: Vec::new(),
                        excluded: all_messages.to_vec(),
                        summaries: Vec::new(),
                        name: "sliding_window_degraded".to_string(),
                    });
                let name = degraded.name.clone();
                (degraded, name)
            }
        };

        let semantic_messages = if self.config.enable_semantic_memory {
            match query {
                Some(q) if !q.trim().is_empty() => {
                    self.retriever.retrieve(q, &result.included).await
                }
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };
        let semantic_error = if self.config.enable_semantic_memory && self.retriever.breaker().is_open().await {
            Some("semantic retriever circuit breaker is open".to_string())
        } else {
            None
        };

        let summary = if result.summaries.is_empty() {
            None
        } else {
            Some(
                result
                    .summaries
                    .iter()
                    .map(|s| s.summary.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            )
        };

        let system_messages: Vec<Message> = result
            .included
            .iter()
            .filter(|m| m.role == Role::System)
            .cloned()
            .collect();
        let rest_messages: Vec<Message> = result
            .included
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect();

        let mut messages = system_messages;
        if let Some(summary_text) = &summary {
            if let Ok(summary_message) =
                Message::create(Role::Summary, summary_text.clone(), None)
            {
                messages.push(summary_message);
            }
        }
        messages.extend(rest_messages);

        let estimated_tokens = self.estimator.estimate(&chatmemory_types::linearize(&messages));
        let summary_count = result.summaries.len();

        ContextResult {
            summaries: result.summaries,
            metadata: ContextMetadata {
                strategy_used,
                summary_count,
                semantic_count: semantic_messages.len(),
                budget: self.config.max_tokens,
                pre_check: "exceeded".to_string(),
                semantic_error,
            },
            messages,
            summary,
            semantic_messages,
            estimated_tokens,
        }
    }
}
