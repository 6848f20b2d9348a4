//! The conversation surface: an append-only transcript plus
//! token-budgeted prompt assembly, grounded on spec §4.9.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chatmemory_manager::{MemoryConfig, MemoryManager};
use chatmemory_types::{
    ContextResult, InclusionTrace, MemoryError, Message, Role, TokenEstimator, VectorStore,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::analytics::{Analytics, ConversationStats};
use crate::callbacks::CallbackRegistry;

/// The assembled, linearized prompt and its provenance, returned by
/// [`ConversationManager::build_prompt`] and
/// [`ConversationManager::build_enhanced_prompt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPayload {
    /// `"<role>: <content>"` lines, newline-joined, in the order C8
    /// established (system, then summary, then recent messages).
    pub prompt_text: String,
    /// Estimator tokens for `prompt_text`.
    pub estimated_tokens: usize,
    /// The messages `prompt_text` was linearized from.
    pub included_messages: Vec<Message>,
    /// Concatenated summary text, if summarization ran.
    pub summary: Option<String>,
    /// Messages surfaced by semantic retrieval; not concatenated into
    /// `prompt_text` (spec §14 decision 2).
    pub semantic_messages: Vec<Message>,
    /// Which messages were kept/dropped/summarized and why.
    pub trace: InclusionTrace,
}

/// Reason code recorded in [`InclusionTrace::excluded_reasons`] for a
/// transcript message the strategy summarized rather than kept verbatim.
pub const EXCLUDED_REASON_SUMMARIZED: &str = "summarized";
/// Reason code recorded for a message dropped without being summarized
/// (the sliding-window degrade path, or summarization disabled).
pub const EXCLUDED_REASON_EVICTED: &str = "evicted";

/// An append-only transcript with token-budgeted prompt assembly.
///
/// Owns the transcript; delegates context assembly to a [`MemoryManager`]
/// and fires callbacks through an owned [`CallbackRegistry`].
pub struct ConversationManager {
    transcript: RwLock<Vec<Message>>,
    manager: Arc<MemoryManager>,
    config: MemoryConfig,
    callbacks: Arc<CallbackRegistry>,
    analytics: Analytics,
}

impl ConversationManager {
    /// Construct a manager around `config`, using `estimator` for
    /// analytics token counts.
    ///
    /// # Errors
    ///
    /// Propagates [`MemoryError::Configuration`] from [`MemoryManager::new`].
    pub fn new(config: MemoryConfig, estimator: Arc<dyn TokenEstimator>) -> Result<Self, MemoryError> {
        let manager = Arc::new(MemoryManager::new(config.clone())?);
        Ok(Self {
            transcript: RwLock::new(Vec::new()),
            manager,
            config,
            callbacks: Arc::new(CallbackRegistry::new()),
            analytics: Analytics::new(estimator),
        })
    }

    /// The callback registry hosts register `on_message_stored` /
    /// `on_summary_created` listeners on.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    async fn append(
        &self,
        role: Role,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Message, MemoryError> {
        let message = Message::create(role, content, metadata)?;
        self.transcript.write().await.push(message.clone());
        self.manager.store_message(&message).await;
        self.callbacks.fire_message_stored(&message).await;
        Ok(message)
    }

    /// Append a user message: creates it, writes it to the transcript,
    /// asks the memory manager to index it (best-effort), and fires
    /// `on_message_stored`.
    pub async fn append_user_message(
        &self,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Message, MemoryError> {
        self.append(Role::User, content, metadata).await
    }

    /// Append an assistant message. See [`ConversationManager::append_user_message`].
    pub async fn append_assistant_message(
        &self,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Message, MemoryError> {
        self.append(Role::Assistant, content, metadata).await
    }

    /// Append a system message. See [`ConversationManager::append_user_message`].
    pub async fn append_system_message(
        &self,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Message, MemoryError> {
        self.append(Role::System, content, metadata).await
    }

    /// A snapshot of the transcript in append order.
    pub async fn transcript_snapshot(&self) -> Vec<Message> {
        self.transcript.read().await.clone()
    }

    fn last_user_message_content(transcript: &[Message]) -> Option<String> {
        transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
    }

    /// Build a token-budgeted prompt. `query` defaults to the transcript's
    /// last user message when absent. `budget`, when `Some` and different
    /// from this manager's configured `max_tokens`, assembles the context
    /// with a one-off [`MemoryManager`] built from the same collaborators;
    /// otherwise reuses the long-lived manager (preserving circuit-breaker
    /// continuity across calls).
    ///
    /// # Errors
    ///
    /// Only when `budget` requires constructing a one-off manager and that
    /// construction fails validation (e.g. `budget <= 0`).
    pub async fn build_prompt(
        &self,
        budget: Option<i64>,
        query: Option<&str>,
    ) -> Result<PromptPayload, MemoryError> {
        let transcript = self.transcript.read().await.clone();
        let effective_query = query
            .map(str::to_string)
            .or_else(|| Self::last_user_message_content(&transcript));

        let manager = match budget {
            Some(b) if b != self.config.max_tokens => {
                let mut overridden = self.config.clone();
                overridden.max_tokens = b;
                Arc::new(MemoryManager::new(overridden)?)
            }
            _ => Arc::clone(&self.manager),
        };

        let result = manager
            .get_context(&transcript, effective_query.as_deref())
            .await;
        if let Some(summary) = &result.summary {
            self.callbacks.fire_summary_created(summary).await;
        }
        Ok(Self::to_prompt_payload(&transcript, result))
    }

    /// Identical to [`ConversationManager::build_prompt`]; kept as a
    /// separate entry point because hosts that want semantic messages and
    /// metadata (rather than just `prompt_text`) call this one by
    /// convention. Both return the same [`PromptPayload`] shape.
    pub async fn build_enhanced_prompt(
        &self,
        budget: Option<i64>,
        query: Option<&str>,
    ) -> Result<PromptPayload, MemoryError> {
        self.build_prompt(budget, query).await
    }

    fn to_prompt_payload(all_messages: &[Message], result: ContextResult) -> PromptPayload {
        let prompt_text = chatmemory_types::linearize(&result.messages);
        let selected_message_ids: Vec<String> =
            result.messages.iter().map(|m| m.id.clone()).collect();
        let selected_ids: HashSet<&str> =
            result.messages.iter().map(|m| m.id.as_str()).collect();

        let reason = if result.metadata.summary_count > 0 {
            EXCLUDED_REASON_SUMMARIZED
        } else {
            EXCLUDED_REASON_EVICTED
        };
        let mut excluded_reasons = HashMap::new();
        for message in all_messages {
            if !selected_ids.contains(message.id.as_str()) {
                excluded_reasons.insert(message.id.clone(), reason.to_string());
            }
        }

        let trace = InclusionTrace {
            selected_message_ids,
            excluded_reasons,
            summaries: result.summaries.clone(),
            strategy_used: result.metadata.strategy_used.clone(),
            timestamp: Utc::now(),
        };

        PromptPayload {
            prompt_text,
            estimated_tokens: result.estimated_tokens,
            included_messages: result.messages,
            summary: result.summary,
            semantic_messages: result.semantic_messages,
            trace,
        }
    }

    /// Delegate to the analytics engine over the current transcript.
    pub async fn get_stats(&self) -> ConversationStats {
        let transcript = self.transcript.read().await.clone();
        self.analytics.compute(&transcript).await
    }

    /// Clear the transcript and, if configured, the backing vector store.
    pub async fn clear(&self) {
        self.transcript.write().await.clear();
        if let Some(store) = self.manager.vector_store() {
            if let Err(err) = store.clear().await {
                tracing::warn!(error = %err, "failed to clear vector store");
            }
        }
    }

    /// The vector store backing indexing and retrieval, if configured.
    #[must_use]
    pub fn vector_store(&self) -> Option<&Arc<dyn VectorStore>> {
        self.manager.vector_store()
    }

    /// The underlying memory manager, for hosts that need direct access
    /// (e.g. the top-level `ChatMemory` facade's `search`).
    #[must_use]
    pub fn manager(&self) -> &Arc<MemoryManager> {
        &self.manager
    }
}
