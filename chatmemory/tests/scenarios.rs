//! End-to-end scenarios from the engine's testable-properties list:
//! pre-check pass, forced summarization, semantic recall, LRU eviction,
//! summarizer breaker, and callback isolation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chatmemory::{ChatMemory, ChatMemoryOptions, MemoryError, Preset};
use chatmemory_types::{MemoryError as TypesError, Message, Summarizer, SummaryInfo, TokenEstimator};
use chatmemory_vector_store::{InMemoryVectorStore, VectorStoreConfig};

#[tokio::test]
async fn scenario_1_pre_check_pass() {
    let chat = ChatMemory::with_preset(Preset::Development, ChatMemoryOptions::default()).unwrap();
    chat.add_system_message("Be concise.").await.unwrap();
    chat.add_user_message("Hi").await.unwrap();
    chat.add_assistant_message("Hello.").await.unwrap();

    let context = chat.get_context(None).await.unwrap();
    assert_eq!(context.message_count, 3);
    assert!(context.summary.is_none());
    assert!(context.semantic_messages.is_empty());
}

#[tokio::test]
async fn scenario_2_forced_summarization() {
    let chat = ChatMemory::create(Preset::Development, 10, ChatMemoryOptions::default()).unwrap();
    for i in 0..20 {
        chat.add_user_message(format!("message_{i}")).await.unwrap();
    }
    let context = chat.get_context(None).await.unwrap();
    assert!(context.summary.is_some());
    assert!(context.message_count >= 3);
}

#[tokio::test]
async fn scenario_3_semantic_recall() {
    let chat = ChatMemory::create(Preset::Development, 10, ChatMemoryOptions::default()).unwrap();
    for i in 0..40 {
        chat.add_user_message(format!("message_{i}")).await.unwrap();
    }
    let results = chat.search("message_10").await;
    assert!(results.len() <= 5);
    for m in &results {
        let meta = m.metadata.as_ref().unwrap();
        assert_eq!(meta.get("retrievalType").unwrap(), "semantic");
        assert!(meta.get("similarity").unwrap().as_f64().unwrap() >= 0.0);
    }
}

#[tokio::test]
async fn scenario_4_vector_store_lru_eviction() {
    let store = Arc::new(InMemoryVectorStore::with_config(VectorStoreConfig {
        expected_dimension: None,
        max_entries: Some(3),
    }));
    let mut options = ChatMemoryOptions::default();
    options.vector_store = Some(store.clone());
    let chat = ChatMemory::create(Preset::Development, 1000, options).unwrap();

    chat.add_user_message("a").await.unwrap();
    chat.add_user_message("b").await.unwrap();
    chat.add_user_message("c").await.unwrap();
    chat.add_user_message("d").await.unwrap();

    assert_eq!(store.count().await.unwrap(), 3);
}

struct AlwaysFailsSummarizer {
    calls: AtomicU32,
}

#[async_trait::async_trait]
impl Summarizer for AlwaysFailsSummarizer {
    async fn summarize(
        &self,
        _messages: &[Message],
        _estimator: &dyn TokenEstimator,
    ) -> Result<SummaryInfo, TypesError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TypesError::summarizer("always fails"))
    }
}

#[tokio::test]
async fn scenario_5_summarizer_breaker_trips_and_recovers() {
    let summarizer = Arc::new(AlwaysFailsSummarizer {
        calls: AtomicU32::new(0),
    });
    let mut options = ChatMemoryOptions::default();
    options.summarizer = Some(summarizer.clone());
    let chat = ChatMemory::create(Preset::Development, 10, options).unwrap();
    for i in 0..20 {
        chat.add_user_message(format!("message_{i}")).await.unwrap();
    }

    for _ in 0..3 {
        let context = chat.get_context(None).await.unwrap();
        assert!(context.summary.is_some(), "fallback summary must still be produced");
    }
    let calls_before_trip = summarizer.calls.load(Ordering::SeqCst);
    assert!(calls_before_trip > 0);

    chat.get_context(None).await.unwrap();
    assert_eq!(
        summarizer.calls.load(Ordering::SeqCst),
        calls_before_trip,
        "breaker should short-circuit further summarizer calls once open"
    );
}

#[tokio::test]
async fn scenario_6_callback_isolation() {
    let chat = ChatMemory::with_preset(Preset::Development, ChatMemoryOptions::default()).unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    chat.callbacks()
        .on_message_stored(
            "always_fails",
            Arc::new(move |_m| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Err(MemoryError::validation("boom"))
            }),
        )
        .await;

    for i in 0..5 {
        chat.add_user_message(format!("m{i}")).await.unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3, "callback disabled after 3 consecutive failures");
    assert!(chat.callbacks().is_disabled("always_fails").await);
}

#[tokio::test]
async fn empty_transcript_returns_empty_context() {
    let chat = ChatMemory::with_preset(Preset::Development, ChatMemoryOptions::default()).unwrap();
    let context = chat.get_context(None).await.unwrap();
    assert_eq!(context.message_count, 0);
    assert_eq!(context.estimated_tokens, 0);
}
