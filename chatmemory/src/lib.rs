#![deny(missing_docs)]
//! Token-budgeted conversation memory for LLM applications.
//!
//! Combines recent verbatim messages, a synthesized summary of older
//! ones, and semantically-retrieved relevant history into a single
//! assembled prompt, with failure isolation around the summarizer,
//! embedder, and vector store so a flaky dependency degrades the result
//! rather than the call. [`ChatMemory`] is the entry point most hosts
//! want; [`ConversationManager`] is available directly for hosts that
//! need to supply their own [`chatmemory_manager::MemoryManager`] wiring.

mod analytics;
mod callbacks;
mod chat_memory;
mod conversation;

pub use analytics::{Analytics, ConversationStats, RoleTotals, TokenDistribution};
pub use callbacks::{
    CallbackRegistry, MessageStoredCallback, SummaryCreatedCallback, DEFAULT_FAILURE_THRESHOLD,
};
pub use chat_memory::{
    default_summarization_strategy, ChatMemory, ChatMemoryOptions, ContextPayload, Preset,
};
pub use conversation::{
    ConversationManager, PromptPayload, EXCLUDED_REASON_EVICTED, EXCLUDED_REASON_SUMMARIZED,
};

pub use chatmemory_manager::{MemoryConfig, MemoryManager};
pub use chatmemory_types::{
    InclusionTrace, MemoryError, Message, Role, SummaryInfo, TokenEstimator,
};
