//! Lazy-transition circuit breaker guarding calls into the embedder and
//! vector store. Kept independent from `chatmemory-context`'s breaker so
//! the retriever has no dependency on the summarization strategy crate;
//! the shape mirrors it exactly (spec §9: breaker state is per-instance).

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// The breaker's externally observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through normally.
    Closed,
    /// Calls are short-circuited until the cooldown elapses.
    Open,
    /// Cooldown elapsed; the next call is a probe.
    HalfOpen,
}

struct Inner {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Opens after `max_failures` consecutive failures, stays open for
/// `cooldown`, then allows a single probe call. Any success closes it.
pub struct CircuitBreaker {
    max_failures: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Construct a breaker with the given threshold and cooldown.
    #[must_use]
    pub fn new(max_failures: u32, cooldown: Duration) -> Self {
        Self {
            max_failures: max_failures.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Current state, resolving `Open` to `HalfOpen` once the cooldown has
    /// elapsed.
    pub async fn state(&self) -> BreakerState {
        let inner = self.inner.lock().await;
        match inner.opened_at {
            Some(since) if since.elapsed() >= self.cooldown => BreakerState::HalfOpen,
            Some(_) => BreakerState::Open,
            None => BreakerState::Closed,
        }
    }

    /// Whether a call should be short-circuited right now.
    pub async fn is_open(&self) -> bool {
        matches!(self.state().await, BreakerState::Open)
    }

    /// A single success closes the breaker.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    /// Record a failure; opens the breaker at the threshold, and a
    /// half-open probe failure re-opens it immediately.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        let was_half_open = matches!(
            inner.opened_at,
            Some(since) if since.elapsed() >= self.cooldown
        );
        inner.consecutive_failures += 1;
        if was_half_open || inner.consecutive_failures >= self.max_failures {
            inner.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_max_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(300));
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);
    }

    #[tokio::test]
    async fn single_success_closes_breaker() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(300));
        breaker.record_failure().await;
        assert!(breaker.is_open().await);
        breaker.record_success().await;
        assert!(!breaker.is_open().await);
    }
}
