//! Transcript analytics: role totals, token distributions, and timing.
//!
//! Grounded on spec §4.10. Token estimates are cached per `(id, content
//! length)` pair so repeated `stats()` calls over an unchanged transcript
//! don't re-run the estimator.

use std::collections::HashMap;
use std::sync::Arc;

use chatmemory_types::{Message, Role, TokenEstimator};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Message counts broken down by role.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RoleTotals {
    /// Number of user messages.
    pub user: usize,
    /// Number of assistant messages.
    pub assistant: usize,
    /// Number of system messages.
    pub system: usize,
    /// Number of summary messages.
    pub summary: usize,
}

impl RoleTotals {
    fn record(&mut self, role: Role) {
        match role {
            Role::User => self.user += 1,
            Role::Assistant => self.assistant += 1,
            Role::System => self.system += 1,
            Role::Summary => self.summary += 1,
        }
    }

    fn total(&self) -> usize {
        self.user + self.assistant + self.system + self.summary
    }
}

/// Summary statistics over a set of per-message token estimates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenDistribution {
    /// Smallest per-message token estimate, `0` for an empty transcript.
    pub min: usize,
    /// Largest per-message token estimate, `0` for an empty transcript.
    pub max: usize,
    /// Median per-message token estimate.
    pub median: f64,
    /// Mean per-message token estimate.
    pub average: f64,
}

impl TokenDistribution {
    fn compute(mut estimates: Vec<usize>) -> Self {
        if estimates.is_empty() {
            return Self::default();
        }
        estimates.sort_unstable();
        let len = estimates.len();
        let sum: usize = estimates.iter().sum();
        let median = if len % 2 == 0 {
            (estimates[len / 2 - 1] + estimates[len / 2]) as f64 / 2.0
        } else {
            estimates[len / 2] as f64
        };
        Self {
            min: estimates[0],
            max: estimates[len - 1],
            median,
            average: sum as f64 / len as f64,
        }
    }
}

/// A single `stats()` snapshot of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStats {
    /// Total number of messages.
    pub message_count: usize,
    /// Message counts by role.
    pub role_totals: RoleTotals,
    /// Sum of per-message token estimates.
    pub total_estimated_tokens: usize,
    /// Distribution of per-message token estimates.
    pub token_distribution: TokenDistribution,
    /// Each role's share of `message_count`, as a percentage in `[0, 100]`.
    pub role_percentages: HashMap<String, f64>,
    /// Timestamp of the earliest message, if any.
    pub first_message_at: Option<DateTime<Utc>>,
    /// Timestamp of the latest message, if any.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Span between the earliest and latest message, if there are at
    /// least two.
    pub duration: Option<Duration>,
}

/// Computes [`ConversationStats`] over a transcript, caching per-message
/// token estimates by `(id, content length)`.
pub struct Analytics {
    estimator: Arc<dyn TokenEstimator>,
    cache: Mutex<HashMap<(String, usize), usize>>,
}

impl Analytics {
    /// Construct an analytics engine around the given estimator.
    #[must_use]
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            estimator,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn estimate_cached(&self, message: &Message) -> usize {
        let key = (message.id.clone(), message.content.len());
        let mut cache = self.cache.lock().await;
        if let Some(tokens) = cache.get(&key) {
            return *tokens;
        }
        let tokens = self.estimator.estimate(&message.content);
        cache.insert(key, tokens);
        tokens
    }

    /// Compute statistics over `messages`, given in transcript order.
    pub async fn compute(&self, messages: &[Message]) -> ConversationStats {
        let mut role_totals = RoleTotals::default();
        let mut estimates = Vec::with_capacity(messages.len());
        for message in messages {
            role_totals.record(message.role);
            estimates.push(self.estimate_cached(message).await);
        }

        let total_estimated_tokens: usize = estimates.iter().sum();
        let token_distribution = TokenDistribution::compute(estimates);

        let total = role_totals.total().max(1) as f64;
        let mut role_percentages = HashMap::new();
        role_percentages.insert("user".to_string(), role_totals.user as f64 / total * 100.0);
        role_percentages.insert(
            "assistant".to_string(),
            role_totals.assistant as f64 / total * 100.0,
        );
        role_percentages.insert("system".to_string(), role_totals.system as f64 / total * 100.0);
        role_percentages.insert(
            "summary".to_string(),
            role_totals.summary as f64 / total * 100.0,
        );

        let first_message_at = messages.first().map(|m| m.timestamp);
        let last_message_at = messages.last().map(|m| m.timestamp);
        let duration = match (first_message_at, last_message_at) {
            (Some(first), Some(last)) if messages.len() > 1 => Some(last - first),
            _ => None,
        };

        ConversationStats {
            message_count: messages.len(),
            role_totals,
            total_estimated_tokens,
            token_distribution,
            role_percentages,
            first_message_at,
            last_message_at,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmemory_estimator::CharRatioEstimator;
    use chatmemory_types::Message;
    use chrono::Utc;

    fn message(id: &str, role: Role, content: &str, timestamp: DateTime<Utc>) -> Message {
        Message::with_id(id, role, content, timestamp, None).unwrap()
    }

    #[tokio::test]
    async fn empty_transcript_has_zeroed_stats() {
        let analytics = Analytics::new(Arc::new(CharRatioEstimator::new()));
        let stats = analytics.compute(&[]).await;
        assert_eq!(stats.message_count, 0);
        assert_eq!(stats.total_estimated_tokens, 0);
        assert!(stats.first_message_at.is_none());
        assert!(stats.duration.is_none());
    }

    #[tokio::test]
    async fn role_totals_and_percentages() {
        let analytics = Analytics::new(Arc::new(CharRatioEstimator::new()));
        let now = Utc::now();
        let messages = vec![
            message("s1", Role::System, "be concise", now),
            message("u1", Role::User, "hi", now),
            message("a1", Role::Assistant, "hello", now),
            message("u2", Role::User, "how are you", now),
        ];
        let stats = analytics.compute(&messages).await;
        assert_eq!(stats.role_totals.user, 2);
        assert_eq!(stats.role_totals.assistant, 1);
        assert_eq!(stats.role_totals.system, 1);
        assert_eq!(stats.message_count, 4);
        assert!((stats.role_percentages["user"] - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn duration_spans_first_to_last() {
        let analytics = Analytics::new(Arc::new(CharRatioEstimator::new()));
        let first = Utc::now() - Duration::minutes(10);
        let last = Utc::now();
        let messages = vec![
            message("m1", Role::User, "hi", first),
            message("m2", Role::Assistant, "hello", last),
        ];
        let stats = analytics.compute(&messages).await;
        let duration = stats.duration.unwrap();
        assert!(duration >= Duration::minutes(9));
    }

    #[tokio::test]
    async fn token_estimate_cache_is_reused() {
        let analytics = Analytics::new(Arc::new(CharRatioEstimator::new()));
        let messages = vec![message("m1", Role::User, "hello world", Utc::now())];
        let first = analytics.compute(&messages).await;
        let second = analytics.compute(&messages).await;
        assert_eq!(first.total_estimated_tokens, second.total_estimated_tokens);
        assert_eq!(analytics.cache.lock().await.len(), 1);
    }
}
