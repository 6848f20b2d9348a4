//! The top-level façade: `ChatMemory::create(preset, max_tokens, options)`
//! plus the three normative presets from spec §6.

use std::collections::HashMap;
use std::sync::Arc;

use chatmemory_context::{SummarizationConfig, SummarizationStrategy, TruncatingSummarizer};
use chatmemory_embeddings::DeterministicEmbedder;
use chatmemory_estimator::CharRatioEstimator;
use chatmemory_manager::MemoryConfig;
use chatmemory_retriever::{RetrieverConfig, SemanticRetriever};
use chatmemory_types::{
    ContextStrategy, EmbeddingService, MemoryError, Message, Role, Summarizer, TokenEstimator,
    VectorStore,
};
use chatmemory_vector_store::{InMemoryVectorStore, VectorStoreConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analytics::ConversationStats;
use crate::callbacks::CallbackRegistry;
use crate::conversation::ConversationManager;

/// Which of the three normative presets to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// In-memory store, reference embedder, summarization on, `max_tokens = 2000`.
    Development,
    /// Durable-capable store, summarization on, `max_tokens = 8000`.
    ///
    /// The reference implementation still wires the in-memory store and
    /// embedder here — no durable backend ships with this crate (spec's
    /// non-goal on external persistence) — but honors the preset's budget
    /// and feature flags, which a host swaps the store/embedder for.
    Production,
    /// No semantic memory, no summarization, `max_tokens = 1000`.
    Minimal,
}

impl Preset {
    fn default_max_tokens(self) -> i64 {
        match self {
            Preset::Development => 2000,
            Preset::Production => 8000,
            Preset::Minimal => 1000,
        }
    }

    fn enable_semantic_memory(self) -> bool {
        !matches!(self, Preset::Minimal)
    }

    fn enable_summarization(self) -> bool {
        !matches!(self, Preset::Minimal)
    }
}

/// Construction-time overrides for [`ChatMemory::create`]. Any field left
/// `None` falls back to the preset's default collaborator.
#[derive(Default)]
pub struct ChatMemoryOptions {
    /// Backing vector store. Defaults to [`InMemoryVectorStore`] when the
    /// preset enables semantic memory.
    pub vector_store: Option<Arc<dyn VectorStore>>,
    /// Backing embedding service. Defaults to [`DeterministicEmbedder`]
    /// when the preset enables semantic memory.
    pub embedding_service: Option<Arc<dyn EmbeddingService>>,
    /// Summarizer used by the summarization strategy. Defaults to
    /// [`TruncatingSummarizer`].
    pub summarizer: Option<Arc<dyn Summarizer>>,
    /// Token estimator used for budgeting and analytics. Defaults to
    /// [`CharRatioEstimator`].
    pub estimator: Option<Arc<dyn TokenEstimator>>,
    /// Maximum semantic matches returned per query. Defaults to `5`.
    pub semantic_top_k: Option<usize>,
    /// Minimum cosine similarity a semantic match must clear. Defaults to `0.0`.
    pub min_similarity: Option<f32>,
}

/// The wire shape for `handle.get_context()`, spec §6's `ContextPayload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPayload {
    /// The linearized prompt text.
    pub prompt_text: String,
    /// Estimator tokens for `prompt_text`.
    pub estimated_tokens: usize,
    /// Number of messages in `prompt_text`.
    pub message_count: usize,
    /// Concatenated summary text, if any.
    pub summary: Option<String>,
    /// Messages surfaced by semantic retrieval.
    pub semantic_messages: Vec<Message>,
}

/// A ready-to-use conversation memory handle: transcript, context
/// assembly, analytics, and raw semantic search behind one type.
pub struct ChatMemory {
    conversation: ConversationManager,
    search_retriever: Option<SemanticRetriever>,
}

impl ChatMemory {
    /// Build a handle from a preset, a token budget, and optional
    /// collaborator overrides.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Configuration`] if `max_tokens` is not
    /// positive or `min_similarity` falls outside `[0, 1]`.
    pub fn create(
        preset: Preset,
        max_tokens: i64,
        options: ChatMemoryOptions,
    ) -> Result<Self, MemoryError> {
        let estimator: Arc<dyn TokenEstimator> = options
            .estimator
            .unwrap_or_else(|| Arc::new(CharRatioEstimator::new()));
        let summarizer: Arc<dyn Summarizer> = options
            .summarizer
            .unwrap_or_else(|| Arc::new(TruncatingSummarizer::new()));

        let enable_semantic_memory = preset.enable_semantic_memory();
        let (vector_store, embedding_service) = if enable_semantic_memory {
            let store = options
                .vector_store
                .unwrap_or_else(|| Arc::new(InMemoryVectorStore::with_config(VectorStoreConfig::default())));
            let embedder = options
                .embedding_service
                .unwrap_or_else(|| Arc::new(DeterministicEmbedder::new(chatmemory_embeddings::DEFAULT_DIMENSION)));
            (Some(store), Some(embedder))
        } else {
            (None, None)
        };

        let config = MemoryConfig {
            max_tokens,
            enable_semantic_memory,
            enable_summarization: preset.enable_summarization(),
            semantic_top_k: options.semantic_top_k.unwrap_or(5),
            min_similarity: options.min_similarity.unwrap_or(0.0),
            vector_store: vector_store.clone(),
            embedding_service: embedding_service.clone(),
            summarizer,
        };

        let conversation = ConversationManager::new(config, estimator)?;

        let search_retriever = match (vector_store, embedding_service) {
            (Some(store), Some(embedder)) => Some(SemanticRetriever::new(
                Some(store),
                Some(embedder),
                RetrieverConfig {
                    semantic_top_k: options.semantic_top_k.unwrap_or(5),
                    min_similarity: options.min_similarity.unwrap_or(0.0),
                    ..Default::default()
                },
            )),
            _ => None,
        };

        Ok(Self {
            conversation,
            search_retriever,
        })
    }

    /// Build a handle using [`Preset::default_max_tokens`] for `preset`.
    ///
    /// # Errors
    ///
    /// See [`ChatMemory::create`].
    pub fn with_preset(preset: Preset, options: ChatMemoryOptions) -> Result<Self, MemoryError> {
        Self::create(preset, preset.default_max_tokens(), options)
    }

    /// Append a message under the given role.
    pub async fn add_message(
        &self,
        content: impl Into<String>,
        role: Role,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Message, MemoryError> {
        match role {
            Role::User => self.conversation.append_user_message(content, metadata).await,
            Role::Assistant => {
                self.conversation
                    .append_assistant_message(content, metadata)
                    .await
            }
            Role::System | Role::Summary => {
                self.conversation.append_system_message(content, metadata).await
            }
        }
    }

    /// Append a user message.
    pub async fn add_user_message(&self, content: impl Into<String>) -> Result<Message, MemoryError> {
        self.conversation.append_user_message(content, None).await
    }

    /// Append an assistant message.
    pub async fn add_assistant_message(
        &self,
        content: impl Into<String>,
    ) -> Result<Message, MemoryError> {
        self.conversation.append_assistant_message(content, None).await
    }

    /// Append a system message.
    pub async fn add_system_message(&self, content: impl Into<String>) -> Result<Message, MemoryError> {
        self.conversation.append_system_message(content, None).await
    }

    /// Assemble a [`ContextPayload`] for the transcript, using
    /// `max_tokens` as a one-off budget override when given, otherwise the
    /// handle's configured budget. The query defaults to the transcript's
    /// last user message.
    ///
    /// # Errors
    ///
    /// Propagates [`ConversationManager::build_prompt`]'s errors.
    pub async fn get_context(&self, max_tokens: Option<i64>) -> Result<ContextPayload, MemoryError> {
        let payload = self.conversation.build_prompt(max_tokens, None).await?;
        Ok(ContextPayload {
            prompt_text: payload.prompt_text,
            estimated_tokens: payload.estimated_tokens,
            message_count: payload.included_messages.len(),
            summary: payload.summary,
            semantic_messages: payload.semantic_messages,
        })
    }

    /// Raw semantic search: messages similar to `query`, each tagged with
    /// `metadata.similarity` in `[0, 1]` (well-formed inputs; cosine is
    /// clamped non-negative by the retriever's tagging). Returns an empty
    /// list when semantic memory is disabled for this preset.
    pub async fn search(&self, query: &str) -> Vec<Message> {
        match &self.search_retriever {
            Some(retriever) => retriever.retrieve(query, &[]).await,
            None => Vec::new(),
        }
    }

    /// Conversation statistics over the current transcript.
    pub async fn stats(&self) -> ConversationStats {
        self.conversation.get_stats().await
    }

    /// Clear the transcript and the backing vector store.
    pub async fn clear(&self) {
        self.conversation.clear().await;
    }

    /// The callback registry, for registering `on_message_stored` /
    /// `on_summary_created` listeners.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        self.conversation.callbacks()
    }
}

/// Build the `SummarizationStrategy`-backed default strategy used by the
/// development/production presets, exposed for hosts that want to embed
/// the strategy directly without going through [`ChatMemory`].
#[must_use]
pub fn default_summarization_strategy(
    summarizer: Arc<dyn Summarizer>,
    max_tokens: i64,
) -> Arc<dyn ContextStrategy> {
    Arc::new(SummarizationStrategy::new(
        summarizer,
        SummarizationConfig {
            max_tokens,
            ..Default::default()
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn minimal_preset_disables_semantic_and_summarization() {
        let chat = ChatMemory::with_preset(Preset::Minimal, ChatMemoryOptions::default()).unwrap();
        for i in 0..20 {
            chat.add_user_message(format!("message_{i}")).await.unwrap();
        }
        let context = chat.get_context(None).await.unwrap();
        assert!(context.semantic_messages.is_empty());
        assert!(chat.search("message_5").await.is_empty());
    }

    #[tokio::test]
    async fn development_preset_uses_default_budget() {
        let chat = ChatMemory::with_preset(Preset::Development, ChatMemoryOptions::default()).unwrap();
        chat.add_system_message("Be concise.").await.unwrap();
        chat.add_user_message("Hi").await.unwrap();
        chat.add_assistant_message("Hello.").await.unwrap();
        let context = chat.get_context(None).await.unwrap();
        assert_eq!(context.message_count, 3);
        assert!(context.summary.is_none());
    }

    #[tokio::test]
    async fn search_surfaces_similar_messages() {
        let chat = ChatMemory::with_preset(Preset::Development, ChatMemoryOptions::default()).unwrap();
        for i in 0..10 {
            chat.add_user_message(format!("message_{i}")).await.unwrap();
        }
        let results = chat.search("message_3").await;
        assert!(!results.is_empty());
        for m in &results {
            let similarity = m.metadata.as_ref().unwrap().get("similarity").unwrap();
            assert!(similarity.as_f64().unwrap() >= -1.0);
        }
    }

    #[tokio::test]
    async fn clear_resets_stats() {
        let chat = ChatMemory::with_preset(Preset::Development, ChatMemoryOptions::default()).unwrap();
        chat.add_user_message("hi").await.unwrap();
        chat.clear().await;
        let stats = chat.stats().await;
        assert_eq!(stats.message_count, 0);
    }

    #[tokio::test]
    async fn create_rejects_non_positive_max_tokens() {
        let err = ChatMemory::create(Preset::Minimal, 0, ChatMemoryOptions::default()).unwrap_err();
        assert!(matches!(err, MemoryError::Configuration(_)));
    }
}
