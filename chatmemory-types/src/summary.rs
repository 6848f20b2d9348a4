//! Summarizer output.

use serde::{Deserialize, Serialize};

/// The result of compressing one chunk of excluded messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryInfo {
    /// Identifies the chunk this summary covers (e.g. a range label).
    pub chunk_id: String,
    /// The digest text.
    pub summary: String,
    /// Token estimate of the chunk's original content.
    pub token_estimate_before: usize,
    /// Token estimate of `summary` itself.
    ///
    /// Well-behaved summarizers keep this `<=` `token_estimate_before`; the
    /// engine does not rely on that and treats a violation as an
    /// observation, not an error.
    pub token_estimate_after: usize,
}

impl SummaryInfo {
    /// Construct a new summary record.
    #[must_use]
    pub fn new(
        chunk_id: impl Into<String>,
        summary: impl Into<String>,
        token_estimate_before: usize,
        token_estimate_after: usize,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            summary: summary.into(),
            token_estimate_before,
            token_estimate_after,
        }
    }
}
