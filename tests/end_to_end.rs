//! Workspace-level composability tests: the same call sites, different
//! collaborators swapped in underneath them — mirroring the provider/
//! state/operator swap patterns demonstrated against the lower-level
//! crates directly, the way the teacher's own root test suite exercises
//! its workspace `[dev-dependencies]` rather than any one crate's API.

use std::sync::Arc;

use async_trait::async_trait;
use chatmemory::{ChatMemory, ChatMemoryOptions, Preset};
use chatmemory_manager::{MemoryConfig, MemoryManager};
use chatmemory_types::{MemoryError, Message, Role, Summarizer, SummaryInfo, TokenEstimator};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// A custom Summarizer, swapped directly into MemoryManager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Summarizes a chunk down to just its message count, ignoring content.
/// Stands in for a host-supplied summarizer backed by a real LLM call.
struct CountingSummarizer;

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(
        &self,
        messages: &[Message],
        _estimator: &dyn TokenEstimator,
    ) -> Result<SummaryInfo, MemoryError> {
        Ok(SummaryInfo::new(
            "count-chunk",
            format!("[{} messages elided]", messages.len()),
            messages.len() * 4,
            4,
        ))
    }
}

fn message(id: &str, content: &str) -> Message {
    Message::with_id(id, Role::User, content, chrono::Utc::now(), None).unwrap()
}

#[tokio::test]
async fn custom_summarizer_swaps_into_manager_without_semantic_memory() {
    let manager = MemoryManager::new(MemoryConfig {
        max_tokens: 10,
        enable_semantic_memory: false,
        enable_summarization: true,
        semantic_top_k: 5,
        min_similarity: 0.0,
        vector_store: None,
        embedding_service: None,
        summarizer: Arc::new(CountingSummarizer),
    })
    .unwrap();

    let messages: Vec<Message> = (0..20)
        .map(|i| message(&format!("m{i}"), &format!("message_{i}")))
        .collect();

    let result = manager.get_context(&messages, None).await;
    assert!(result.semantic_messages.is_empty());
    let summary = result.summary.expect("budget forces summarization");
    assert!(summary.contains("messages elided"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Preset swap through the public facade
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn preset_swap_changes_semantic_and_summarization_behavior() {
    async fn fill(chat: &ChatMemory) {
        for i in 0..20 {
            chat.add_user_message(format!("message_{i}")).await.unwrap();
        }
    }

    let development =
        ChatMemory::create(Preset::Development, 10, ChatMemoryOptions::default()).unwrap();
    fill(&development).await;
    let development_context = development.get_context(None).await.unwrap();
    assert!(development_context.summary.is_some());

    let minimal = ChatMemory::with_preset(Preset::Minimal, ChatMemoryOptions::default()).unwrap();
    fill(&minimal).await;
    let minimal_context = minimal.get_context(None).await.unwrap();
    assert!(minimal_context.summary.is_none());
    assert!(minimal_context.semantic_messages.is_empty());
}
