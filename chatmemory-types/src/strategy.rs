//! Results returned by a [`crate::traits::ContextStrategy`] and by the
//! memory manager's context assembly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::summary::SummaryInfo;

/// The kept/dropped/summarized split a context strategy produces for one
/// `apply` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResult {
    /// Messages kept verbatim, oldest first.
    pub included: Vec<Message>,
    /// Messages dropped from `included`, original order preserved.
    pub excluded: Vec<Message>,
    /// Summaries produced for (some prefix of) `excluded`, oldest first.
    pub summaries: Vec<SummaryInfo>,
    /// Name of the strategy that produced this result.
    pub name: String,
}

/// Strategy/pre-check bookkeeping carried alongside a [`ContextResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMetadata {
    /// Name of the strategy used (`"none"` when the pre-check short-circuited).
    pub strategy_used: String,
    /// Number of summaries produced.
    pub summary_count: usize,
    /// Number of semantic messages surfaced.
    pub semantic_count: usize,
    /// The token budget this result was assembled against.
    pub budget: i64,
    /// `"withinBudget"` or `"exceeded"`.
    pub pre_check: String,
    /// Set when semantic retrieval degraded instead of erroring outright.
    pub semantic_error: Option<String>,
}

/// The assembled, token-budgeted context for a single `get_context` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    /// The linear prompt content: preserved messages, an optional
    /// synthesized summary, then recent messages.
    pub messages: Vec<Message>,
    /// Concatenated summary text, if any summaries were produced.
    pub summary: Option<String>,
    /// The individual chunk summaries backing `summary`, for callers that
    /// want the per-chunk token accounting (e.g. an `InclusionTrace`).
    pub summaries: Vec<SummaryInfo>,
    /// Messages surfaced by semantic retrieval, similarity descending.
    /// Exposed separately from `messages` so hosts choose how to place them.
    pub semantic_messages: Vec<Message>,
    /// Estimator tokens for the linearized `messages`.
    pub estimated_tokens: usize,
    /// Strategy/pre-check bookkeeping.
    pub metadata: ContextMetadata,
}

/// A record of which messages were kept, which were dropped (and why),
/// and what was summarized, for a single context-assembly call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InclusionTrace {
    /// Ids of the messages included in the final prompt.
    pub selected_message_ids: Vec<String>,
    /// Id to reason-code for every message excluded from the prompt.
    pub excluded_reasons: HashMap<String, String>,
    /// Summaries produced while assembling this context.
    pub summaries: Vec<SummaryInfo>,
    /// Name of the strategy used.
    pub strategy_used: String,
    /// When this trace was produced.
    pub timestamp: DateTime<Utc>,
}
