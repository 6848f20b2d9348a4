//! Reference [`Summarizer`] implementation.

use async_trait::async_trait;
use chatmemory_types::{MemoryError, Message, Summarizer, SummaryInfo, TokenEstimator};

/// Default separator inserted between concatenated message contents.
pub const DEFAULT_SEPARATOR: &str = " ";

/// Default character cap before truncation kicks in.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Concatenates message contents with a separator and truncates to
/// `max_chars`, appending an ellipsis when truncated.
///
/// Pure with respect to its inputs; never fails on its own (the
/// surrounding strategy's retry/fallback policy exists for summarizers
/// that call out to an external service).
pub struct TruncatingSummarizer {
    separator: String,
    max_chars: usize,
}

impl TruncatingSummarizer {
    /// Create a summarizer with the default separator and character cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_SEPARATOR, DEFAULT_MAX_CHARS)
    }

    /// Create a summarizer with a custom separator and character cap.
    #[must_use]
    pub fn with_config(separator: impl Into<String>, max_chars: usize) -> Self {
        Self {
            separator: separator.into(),
            max_chars: max_chars.max(1),
        }
    }
}

impl Default for TruncatingSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for TruncatingSummarizer {
    async fn summarize(
        &self,
        messages: &[Message],
        estimator: &dyn TokenEstimator,
    ) -> Result<SummaryInfo, MemoryError> {
        let joined = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator);

        let before = estimator.estimate(&joined);

        let summary = if joined.chars().count() > self.max_chars {
            let truncated: String = joined.chars().take(self.max_chars).collect();
            format!("{truncated}...")
        } else {
            joined
        };

        let after = estimator.estimate(&summary);
        let chunk_id = match (messages.first(), messages.last()) {
            (Some(first), Some(last)) => format!("{}..{}", first.id, last.id),
            _ => "empty".to_string(),
        };

        Ok(SummaryInfo::new(chunk_id, summary, before, after))
    }
}
