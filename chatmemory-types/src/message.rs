//! The role-tagged [`Message`] record and its id generator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MemoryError;

/// A transcript participant.
///
/// `Summary` tags synthesized digests produced by the engine itself so
/// they can be preserved across eviction the same way system messages
/// are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user.
    User,
    /// An AI assistant.
    Assistant,
    /// A system message.
    System,
    /// A synthesized summary of older messages.
    Summary,
}

impl Role {
    /// Render the role as the lowercase word used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Summary => "summary",
        }
    }

    /// Parse a role from a free-form string, defaulting to [`Role::User`]
    /// for anything unrecognized.
    ///
    /// Returns whether the input was recognized, so callers can record
    /// the fallback in metadata for observability rather than silently
    /// losing the original string.
    #[must_use]
    pub fn parse(raw: &str) -> (Role, bool) {
        match raw.to_ascii_lowercase().as_str() {
            "user" => (Role::User, true),
            "assistant" => (Role::Assistant, true),
            "system" => (Role::System, true),
            "summary" => (Role::Summary, true),
            _ => (Role::User, false),
        }
    }
}

/// An immutable, role-tagged transcript entry.
///
/// Created once via [`Message::create`] or [`Message::with_id`] and never
/// mutated afterward; [`Message::copy_with`] produces a new value that
/// keeps the same id, role, and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique id within the owning transcript.
    pub id: String,
    /// Who produced this message.
    pub role: Role,
    /// The message body. Non-empty at creation.
    pub content: String,
    /// UTC creation time.
    pub timestamp: DateTime<Utc>,
    /// Free-form, caller-supplied metadata.
    pub metadata: Option<HashMap<String, Value>>,
}

static MESSAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a process-monotonic message id of the form
/// `msg_<microseconds-since-epoch>_<counter>`.
///
/// The counter is a process-wide atomic so ids stay unique even when two
/// messages are created within the same microsecond.
#[must_use]
pub fn next_message_id() -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0);
    let seq = MESSAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("msg_{micros}_{seq}")
}

/// A created timestamp more than this far in the future is rejected.
const MAX_FUTURE_SKEW: Duration = Duration::minutes(5);

impl Message {
    /// Create a new message, assigning a fresh id and the current UTC
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Validation`] if `content` is empty or
    /// whitespace-only.
    pub fn create(
        role: Role,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Self, MemoryError> {
        let content = content.into();
        Self::validate_content(&content)?;
        Ok(Self {
            id: next_message_id(),
            role,
            content,
            timestamp: Utc::now(),
            metadata,
        })
    }

    /// Construct a message with an explicit id and timestamp, validating
    /// both against the invariants normally enforced by [`Message::create`].
    ///
    /// Used by deserialization paths (e.g. loading a persisted transcript)
    /// where the id and timestamp are already fixed.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Validation`] if `id`/`content` are empty or
    /// `timestamp` is more than five minutes in the future.
    pub fn with_id(
        id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Self, MemoryError> {
        let id = id.into();
        let content = content.into();
        if id.trim().is_empty() {
            return Err(MemoryError::validation("message id must not be empty"));
        }
        Self::validate_content(&content)?;
        if timestamp - Utc::now() > MAX_FUTURE_SKEW {
            return Err(MemoryError::validation(
                "message timestamp is too far in the future",
            ));
        }
        Ok(Self {
            id,
            role,
            content,
            timestamp,
            metadata,
        })
    }

    fn validate_content(content: &str) -> Result<(), MemoryError> {
        if content.trim().is_empty() {
            return Err(MemoryError::validation("message content must not be empty"));
        }
        Ok(())
    }

    /// Derive a copy of this message with new content and/or metadata,
    /// keeping the id, role, and timestamp unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Validation`] if the replacement content is
    /// empty.
    pub fn copy_with(
        &self,
        content: Option<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<Self, MemoryError> {
        let content = content.unwrap_or_else(|| self.content.clone());
        Self::validate_content(&content)?;
        Ok(Self {
            id: self.id.clone(),
            role: self.role,
            content,
            timestamp: self.timestamp,
            metadata: metadata.or_else(|| self.metadata.clone()),
        })
    }

    /// Derive a copy of this message under a new role, assigning a fresh
    /// id. Per the data-model invariant, a role change always produces a
    /// new identity.
    #[must_use]
    pub fn with_role(&self, role: Role) -> Self {
        Self {
            id: next_message_id(),
            role,
            content: self.content.clone(),
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        }
    }
}
