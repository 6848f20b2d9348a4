//! The normative summarization [`ContextStrategy`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatmemory_types::{
    ContextStrategy, MemoryError, Message, Role, StrategyResult, Summarizer, SummaryInfo,
    TokenEstimator,
};

use crate::circuit_breaker::CircuitBreaker;

/// Conservative token estimate attached to a fallback summary, used when
/// the real summarizer could not be reached.
pub const FALLBACK_TOKEN_ESTIMATE: usize = 50;

/// Configuration for [`SummarizationStrategy`].
#[derive(Debug, Clone)]
pub struct SummarizationConfig {
    /// Token budget used when the caller passes `token_budget <= 0`.
    pub max_tokens: i64,
    /// Minimum number of trailing conversation messages kept verbatim,
    /// even if that pushes the result over budget.
    pub min_recent_messages: usize,
    /// Maximum number of excluded messages summarized per chunk.
    pub max_summary_chunk_size: usize,
    /// Keep system messages outside the eviction budget.
    pub preserve_system_messages: bool,
    /// Keep pre-existing summary messages outside the eviction budget.
    pub preserve_summary_messages: bool,
    /// Consecutive chunk-summarization failures before the breaker opens.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a probe call.
    pub cooldown: Duration,
    /// Retries attempted per chunk before falling back.
    pub max_retries: u32,
    /// Base delay for the retry backoff (`base * 2^attempt`).
    pub retry_base_delay: Duration,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            min_recent_messages: 3,
            max_summary_chunk_size: 10,
            preserve_system_messages: true,
            preserve_summary_messages: true,
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

/// Partitions messages into preserved/recent/summarized under a token
/// budget, summarizing whatever doesn't fit via a circuit-broken
/// [`Summarizer`]. See spec §4.6 for the full procedure.
pub struct SummarizationStrategy {
    config: SummarizationConfig,
    summarizer: Arc<dyn Summarizer>,
    breaker: CircuitBreaker,
}

impl SummarizationStrategy {
    /// Construct a strategy around the given summarizer and configuration.
    #[must_use]
    pub fn new(summarizer: Arc<dyn Summarizer>, config: SummarizationConfig) -> Self {
        let breaker = CircuitBreaker::new(config.failure_threshold, config.cooldown);
        Self {
            config,
            summarizer,
            breaker,
        }
    }

    /// The breaker guarding calls to the underlying summarizer, exposed
    /// for health reporting.
    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn fallback_summary(chunk: &[Message], estimator: &dyn TokenEstimator) -> SummaryInfo {
        let joined: String = chunk
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let before = estimator.estimate(&joined);
        let (first_id, last_id) = match (chunk.first(), chunk.last()) {
            (Some(f), Some(l)) => (f.id.clone(), l.id.clone()),
            _ => (String::new(), String::new()),
        };
        let summary = format!(
            "[unavailable: {} message(s) from {first_id} to {last_id} could not be summarized]",
            chunk.len()
        );
        SummaryInfo::new(
            format!("{first_id}..{last_id}"),
            summary,
            before,
            FALLBACK_TOKEN_ESTIMATE,
        )
    }

    async fn summarize_chunk(
        &self,
        chunk: &[Message],
        estimator: &dyn TokenEstimator,
    ) -> SummaryInfo {
        if self.breaker.is_open().await {
            tracing::warn!("summarizer breaker open, using fallback summary");
            return Self::fallback_summary(chunk, estimator);
        }

        let mut attempt = 0u32;
        loop {
            match self.summarizer.summarize(chunk, estimator).await {
                Ok(info) => {
                    self.breaker.record_success().await;
                    return info;
                }
                Err(err) => {
                    if attempt >= self.config.max_retries {
                        self.breaker.record_failure().await;
                        tracing::warn!(error = %err, "summarizer failed after retries, using fallback summary");
                        return Self::fallback_summary(chunk, estimator);
                    }
                    attempt += 1;
                    let backoff = self.config.retry_base_delay * 2u32.pow(attempt);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait]
impl ContextStrategy for SummarizationStrategy {
    async fn apply(
        &self,
        messages: &[Message],
        token_budget: i64,
        estimator: &dyn TokenEstimator,
    ) -> Result<StrategyResult, MemoryError> {
        let mut system = Vec::new();
        let mut existing_summary = Vec::new();
        let mut conversation = Vec::new();
        for m in messages {
            match m.role {
                Role::System => system.push(m.clone()),
                Role::Summary => existing_summary.push(m.clone()),
                Role::User | Role::Assistant => conversation.push(m.clone()),
            }
        }

        let mut preserved = Vec::new();
        if self.config.preserve_system_messages {
            preserved.extend(system.iter().cloned());
        }
        if self.config.preserve_summary_messages {
            preserved.extend(existing_summary.iter().cloned());
        }
        let reserved_tokens: i64 = preserved
            .iter()
            .map(|m| estimator.estimate(&m.content) as i64)
            .sum();

        let effective_budget = if token_budget > 0 {
            token_budget
        } else {
            self.config.max_tokens
        };
        let available = effective_budget.max(0) - reserved_tokens;

        if available <= 0 {
            return Ok(StrategyResult {
                included: preserved,
                excluded: conversation,
                summaries: Vec::new(),
                name: "summarization".to_string(),
            });
        }

        let mut recent_rev: Vec<Message> = Vec::new();
        let mut used: i64 = 0;
        for msg in conversation.iter().rev() {
            let cost = estimator.estimate(&msg.content) as i64;
            let within_budget = used + cost <= available;
            let below_minimum = recent_rev.len() < self.config.min_recent_messages;
            if within_budget || below_minimum {
                recent_rev.push(msg.clone());
                used += cost;
            } else {
                break;
            }
        }
        let kept_ids: std::collections::HashSet<&str> =
            recent_rev.iter().map(|m| m.id.as_str()).collect();
        let to_summarize: Vec<Message> = conversation
            .iter()
            .filter(|m| !kept_ids.contains(m.id.as_str()))
            .cloned()
            .collect();
        let mut recent = recent_rev;
        recent.reverse();

        let mut summaries = Vec::new();
        if !to_summarize.is_empty() {
            for chunk in to_summarize.chunks(self.config.max_summary_chunk_size.max(1)) {
                summaries.push(self.summarize_chunk(chunk, estimator).await);
            }
        }

        let mut included = preserved;
        included.extend(recent);

        Ok(StrategyResult {
            included,
            excluded: to_summarize,
            summaries,
            name: "summarization".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmemory_estimator::CharRatioEstimator;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct AlwaysFailsSummarizer {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Summarizer for AlwaysFailsSummarizer {
        async fn summarize(
            &self,
            _messages: &[Message],
            _estimator: &dyn TokenEstimator,
        ) -> Result<SummaryInfo, MemoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(MemoryError::summarizer("boom"))
        }
    }

    fn message(id: &str, content: &str, role: Role) -> Message {
        Message::with_id(id, role, content, Utc::now(), None).unwrap()
    }

    fn conversation(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| message(&format!("m{i}"), &format!("message_{i}"), Role::User))
            .collect()
    }

    #[tokio::test]
    async fn pre_check_style_budget_keeps_everything_when_available_is_ample() {
        let strategy = SummarizationStrategy::new(
            Arc::new(crate::summarizer::TruncatingSummarizer::new()),
            SummarizationConfig::default(),
        );
        let estimator = CharRatioEstimator::new();
        let messages = conversation(3);
        let result = strategy.apply(&messages, 1000, &estimator).await.unwrap();
        assert_eq!(result.included.len(), 3);
        assert!(result.excluded.is_empty());
        assert!(result.summaries.is_empty());
    }

    #[tokio::test]
    async fn zero_budget_with_no_preserved_messages_is_empty() {
        let strategy = SummarizationStrategy::new(
            Arc::new(crate::summarizer::TruncatingSummarizer::new()),
            SummarizationConfig {
                min_recent_messages: 0,
                ..Default::default()
            },
        );
        let estimator = CharRatioEstimator::new();
        let messages = conversation(3);
        let result = strategy.apply(&messages, 0, &estimator).await.unwrap();
        assert!(result.included.is_empty());
        assert_eq!(result.excluded.len(), 3);
    }

    #[tokio::test]
    async fn forces_summarization_under_tight_budget() {
        let strategy = SummarizationStrategy::new(
            Arc::new(crate::summarizer::TruncatingSummarizer::new()),
            SummarizationConfig {
                max_tokens: 10,
                min_recent_messages: 3,
                max_summary_chunk_size: 5,
                ..Default::default()
            },
        );
        let estimator = CharRatioEstimator::with_ratio(4);
        let messages = conversation(20);
        let result = strategy.apply(&messages, 10, &estimator).await.unwrap();
        assert!(result.included.len() >= 3);
        assert!(!result.excluded.is_empty());
        assert!(!result.summaries.is_empty());
        let expected_chunks = result.excluded.len().div_ceil(5);
        assert_eq!(result.summaries.len(), expected_chunks);
    }

    #[tokio::test]
    async fn system_and_existing_summary_messages_are_preserved() {
        let strategy = SummarizationStrategy::new(
            Arc::new(crate::summarizer::TruncatingSummarizer::new()),
            SummarizationConfig {
                max_tokens: 5,
                min_recent_messages: 0,
                ..Default::default()
            },
        );
        let estimator = CharRatioEstimator::new();
        let mut messages = vec![message("sys", "be concise", Role::System)];
        messages.extend(conversation(10));
        let result = strategy.apply(&messages, 5, &estimator).await.unwrap();
        assert!(result.included.iter().any(|m| m.role == Role::System));
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_opens_after_repeated_failures_and_fallback_is_used() {
        let summarizer = Arc::new(AlwaysFailsSummarizer {
            calls: AtomicU32::new(0),
        });
        let strategy = SummarizationStrategy::new(
            summarizer.clone(),
            SummarizationConfig {
                max_tokens: 10,
                min_recent_messages: 1,
                max_summary_chunk_size: 20,
                failure_threshold: 1,
                cooldown: Duration::from_secs(3600),
                max_retries: 0,
                retry_base_delay: Duration::from_millis(1),
            },
        );
        let estimator = CharRatioEstimator::with_ratio(4);
        let messages = conversation(20);

        let first = strategy.apply(&messages, 10, &estimator).await.unwrap();
        assert!(!first.summaries.is_empty());
        assert!(first.summaries[0].summary.starts_with("[unavailable"));
        let calls_after_first = summarizer.calls.load(Ordering::SeqCst);
        assert!(calls_after_first >= 1);

        // Breaker is now open; a second call must not reach the summarizer again.
        let _second = strategy.apply(&messages, 10, &estimator).await.unwrap();
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), calls_after_first);
    }
}
