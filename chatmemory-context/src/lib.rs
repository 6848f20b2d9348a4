#![deny(missing_docs)]
//! Context strategies and the deterministic summarizer backing them.
//!
//! [`SummarizationStrategy`] is the normative strategy the memory manager
//! uses; [`SlidingWindowStrategy`] is the simpler fallback the manager
//! degrades to when a strategy fails outright.

mod circuit_breaker;
mod sliding_window;
mod summarization;
mod summarizer;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use sliding_window::{SlidingWindowConfig, SlidingWindowStrategy};
pub use summarization::{SummarizationConfig, SummarizationStrategy, FALLBACK_TOKEN_ESTIMATE};
pub use summarizer::{TruncatingSummarizer, DEFAULT_MAX_CHARS, DEFAULT_SEPARATOR};
