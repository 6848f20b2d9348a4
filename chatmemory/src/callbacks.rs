//! Ordered callback dispatch with per-callback failure isolation.
//!
//! Generalizes spec §4.9's single `on_message_stored` hook into a small
//! registry so a host can register several independent listeners (e.g.
//! `on_message_stored`, `on_summary_created`) without one faulty callback
//! taking down the others, mirroring `neuron-hooks::HookRegistry`'s
//! ordered-dispatch-with-error-swallowing design, extended with the
//! counting/disable behavior spec §4.10 requires.

use std::sync::Arc;

use chatmemory_types::{MemoryError, Message};
use tokio::sync::Mutex;

/// Consecutive failures before a callback is disabled for the lifetime of
/// its [`CallbackRegistry`].
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// A fallible listener invoked with the message that was just stored.
pub type MessageStoredCallback = Arc<dyn Fn(&Message) -> Result<(), MemoryError> + Send + Sync>;

/// A fallible listener invoked with a freshly synthesized summary's text.
pub type SummaryCreatedCallback = Arc<dyn Fn(&str) -> Result<(), MemoryError> + Send + Sync>;

enum Listener {
    MessageStored(MessageStoredCallback),
    SummaryCreated(SummaryCreatedCallback),
}

struct Entry {
    name: String,
    listener: Listener,
    consecutive_failures: u32,
    disabled: bool,
}

/// Registry of named, independently failure-isolated callbacks.
///
/// Each entry tracks its own consecutive-failure count. After
/// `failure_threshold` consecutive throws the entry is disabled for the
/// registry's lifetime and a warning is logged once, at the disable
/// transition. Registering a name that already exists replaces the
/// listener and resets its counter.
pub struct CallbackRegistry {
    entries: Mutex<Vec<Entry>>,
    failure_threshold: u32,
}

impl CallbackRegistry {
    /// Construct a registry using [`DEFAULT_FAILURE_THRESHOLD`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_failure_threshold(DEFAULT_FAILURE_THRESHOLD)
    }

    /// Construct a registry with a custom failure threshold (clamped to
    /// at least `1`).
    #[must_use]
    pub fn with_failure_threshold(failure_threshold: u32) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failure_threshold: failure_threshold.max(1),
        }
    }

    async fn upsert(&self, name: String, listener: Listener) {
        let mut entries = self.entries.lock().await;
        entries.retain(|e| e.name != name);
        entries.push(Entry {
            name,
            listener,
            consecutive_failures: 0,
            disabled: false,
        });
    }

    /// Register (or replace, resetting its counter) an `on_message_stored`
    /// callback under `name`.
    pub async fn on_message_stored(&self, name: impl Into<String>, callback: MessageStoredCallback) {
        self.upsert(name.into(), Listener::MessageStored(callback)).await;
    }

    /// Register (or replace, resetting its counter) an `on_summary_created`
    /// callback under `name`.
    pub async fn on_summary_created(&self, name: impl Into<String>, callback: SummaryCreatedCallback) {
        self.upsert(name.into(), Listener::SummaryCreated(callback)).await;
    }

    /// Whether the named callback is currently disabled.
    pub async fn is_disabled(&self, name: &str) -> bool {
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.name == name)
            .is_some_and(|e| e.disabled)
    }

    fn record(entry: &mut Entry, result: Result<(), MemoryError>, threshold: u32) {
        match result {
            Ok(()) => entry.consecutive_failures = 0,
            Err(err) => {
                entry.consecutive_failures += 1;
                tracing::warn!(
                    callback = %entry.name,
                    error = %err,
                    consecutive_failures = entry.consecutive_failures,
                    "callback failed"
                );
                if entry.consecutive_failures >= threshold {
                    entry.disabled = true;
                    tracing::warn!(callback = %entry.name, "callback disabled after repeated failures");
                }
            }
        }
    }

    /// Dispatch `message` to every enabled `on_message_stored` listener.
    pub async fn fire_message_stored(&self, message: &Message) {
        let mut entries = self.entries.lock().await;
        for entry in entries.iter_mut() {
            if entry.disabled {
                continue;
            }
            let Listener::MessageStored(callback) = &entry.listener else {
                continue;
            };
            let result = callback(message);
            Self::record(entry, result, self.failure_threshold);
        }
    }

    /// Dispatch `summary` to every enabled `on_summary_created` listener.
    pub async fn fire_summary_created(&self, summary: &str) {
        let mut entries = self.entries.lock().await;
        for entry in entries.iter_mut() {
            if entry.disabled {
                continue;
            }
            let Listener::SummaryCreated(callback) = &entry.listener else {
                continue;
            };
            let result = callback(summary);
            Self::record(entry, result, self.failure_threshold);
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
