//! The sliding-window [`ContextStrategy`]: newest-first inclusion, no
//! summarization.

use std::collections::HashSet;

use async_trait::async_trait;
use chatmemory_types::{ContextStrategy, MemoryError, Message, StrategyResult, TokenEstimator};

/// Configuration for [`SlidingWindowStrategy`].
#[derive(Debug, Clone)]
pub struct SlidingWindowConfig {
    /// Token budget used when the caller passes `token_budget <= 0`.
    pub max_tokens: i64,
    /// Hard cap on the number of messages kept, regardless of budget.
    pub lookback_messages: usize,
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            lookback_messages: 50,
        }
    }
}

/// Keeps the newest messages until the budget is exhausted or
/// `lookback_messages` is reached. Used as the engine's degrade-to path
/// when the normative summarization strategy fails outright.
pub struct SlidingWindowStrategy {
    config: SlidingWindowConfig,
}

impl SlidingWindowStrategy {
    /// Construct a strategy with the given configuration.
    #[must_use]
    pub fn new(config: SlidingWindowConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ContextStrategy for SlidingWindowStrategy {
    async fn apply(
        &self,
        messages: &[Message],
        token_budget: i64,
        estimator: &dyn TokenEstimator,
    ) -> Result<StrategyResult, MemoryError> {
        let effective_budget = if token_budget > 0 {
            token_budget
        } else {
            self.config.max_tokens
        }
        .max(0);

        let mut kept_rev: Vec<Message> = Vec::new();
        let mut used: i64 = 0;
        for msg in messages.iter().rev() {
            if kept_rev.len() >= self.config.lookback_messages {
                break;
            }
            let cost = estimator.estimate(&msg.content) as i64;
            if !kept_rev.is_empty() && used + cost > effective_budget {
                break;
            }
            kept_rev.push(msg.clone());
            used += cost;
        }

        let kept_ids: HashSet<&str> = kept_rev.iter().map(|m| m.id.as_str()).collect();
        let excluded: Vec<Message> = messages
            .iter()
            .filter(|m| !kept_ids.contains(m.id.as_str()))
            .cloned()
            .collect();

        let mut included = kept_rev;
        included.reverse();

        Ok(StrategyResult {
            included,
            excluded,
            summaries: Vec::new(),
            name: "sliding_window".to_string(),
        })
    }
}
