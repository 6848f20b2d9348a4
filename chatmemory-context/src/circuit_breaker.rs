//! A small, inspectable circuit breaker shared by the summarization
//! strategy's failure isolation.
//!
//! Transitions are evaluated lazily on call entry rather than with a
//! background timer: `state()` checks the cooldown against the current
//! instant only when asked.

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

/// Failure-isolating breaker: opens after `failure_threshold` consecutive
/// failures, stays open for `cooldown`, then allows one probe call.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Construct a breaker with the given threshold and cooldown.
    #[must_use]
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Current state, resolving `Open` to `HalfOpen` if the cooldown has
    /// elapsed since this call.
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

    /// Record a successful call: resets the failure count and closes the
    /// breaker, regardless of prior state.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    /// Record a failed call. Opens the breaker once
    /// `consecutive_failures` reaches `failure_threshold`. A failure while
    /// half-open immediately re-opens it.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        let was_half_open = matches!(
            inner.opened_at,
            Some(since) if since.elapsed() >= self.cooldown
        );
        inner.consecutive_failures += 1;
        if was_half_open || inner.consecutive_failures >= self.failure_threshold {
            inner.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_until_threshold_reached() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure().await;
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn opens_after_threshold_and_half_opens_after_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);
    }

    #[tokio::test]
    async fn failure_while_half_open_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);
    }
}
