//! Cross-module boundary behaviors from spec §8: empty transcript, a
//! zero budget, and semantic exclusion of the recent tail.

use std::sync::Arc;

use chatmemory_context::TruncatingSummarizer;
use chatmemory_embeddings::DeterministicEmbedder;
use chatmemory_manager::{MemoryConfig, MemoryManager};
use chatmemory_types::{EmbeddingService, Message, Role, VectorStore};
use chatmemory_vector_store::InMemoryVectorStore;
use chrono::Utc;

fn manager(max_tokens: i64) -> MemoryManager {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let embedder: Arc<dyn EmbeddingService> = Arc::new(DeterministicEmbedder::new(16));
    MemoryManager::new(MemoryConfig {
        max_tokens,
        enable_semantic_memory: true,
        enable_summarization: true,
        semantic_top_k: 5,
        min_similarity: 0.0,
        vector_store: Some(store),
        embedding_service: Some(embedder),
        summarizer: Arc::new(TruncatingSummarizer::new()),
    })
    .unwrap()
}

#[tokio::test]
async fn empty_transcript_yields_empty_included_and_zero_tokens() {
    let manager = manager(1000);
    let result = manager.get_context(&[], None).await;
    assert!(result.messages.is_empty());
    assert_eq!(result.estimated_tokens, 0);
    assert_eq!(result.metadata.pre_check, "withinBudget");
}

#[tokio::test]
async fn forced_summarization_preserves_system_messages_ahead_of_recent() {
    let manager = manager(10);
    let mut messages = vec![Message::with_id(
        "sys",
        Role::System,
        "Be concise.",
        Utc::now(),
        None,
    )
    .unwrap()];
    for i in 0..20 {
        messages.push(
            Message::with_id(
                format!("m{i}"),
                Role::User,
                format!("message_{i}"),
                Utc::now(),
                None,
            )
            .unwrap(),
        );
    }

    let result = manager.get_context(&messages, Some("message_5")).await;
    assert_eq!(result.messages[0].role, Role::System);
    assert!(result.messages.iter().any(|m| m.role == Role::Summary));
}

#[tokio::test]
async fn store_message_batch_indexes_only_user_and_assistant() {
    let manager = manager(1000);
    let messages = vec![
        Message::with_id("sys", Role::System, "Be concise.", Utc::now(), None).unwrap(),
        Message::with_id("u1", Role::User, "hi", Utc::now(), None).unwrap(),
        Message::with_id("a1", Role::Assistant, "hello", Utc::now(), None).unwrap(),
    ];
    manager.store_message_batch(&messages).await;
    assert_eq!(manager.vector_store().unwrap().count().await.unwrap(), 2);
}
