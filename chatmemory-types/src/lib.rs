#![deny(missing_docs)]
//! Core data model, trait contracts, and error taxonomy shared by every
//! chatmemory crate.
//!
//! Nothing here talks to a backend, a model, or a clock beyond
//! `chrono::Utc::now()` for timestamps — this crate is the seam the rest
//! of the workspace implements against.

mod error;
mod linearize;
mod message;
mod strategy;
mod summary;
mod traits;
mod vector;

pub use error::MemoryError;
pub use linearize::linearize;
pub use message::{next_message_id, Message, Role};
pub use strategy::{ContextMetadata, ContextResult, InclusionTrace, StrategyResult};
pub use summary::SummaryInfo;
pub use traits::{ContextStrategy, EmbeddingService, Summarizer, TokenEstimator, VectorStore};
pub use vector::{PersistableVectorEntry, SimilaritySearchResult, VectorEntry};
