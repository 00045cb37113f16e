//! Per-bidder / per-collaborator circuit breaker.
//!
//! Grounded in the same shape as an exchange-rate session's reconnect
//! backoff: a consecutive-failure counter and a cooldown window measured
//! against `Instant`. Extended with a half-open state that only lets one
//! probe through at a time and needs `SuccessThreshold` consecutive
//! successes before fully closing, per the state machine this breaker
//! protects the partner selector and each bidder endpoint with.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, success_threshold: 2, cooldown: Duration::from_secs(30) }
    }
}

struct Inner {
    consecutive_failures: AtomicU32,
    consecutive_half_open_successes: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
    half_open_probe_in_flight: AtomicU64,
}

/// One breaker per protected collaborator. Cheap to check on the hot path:
/// `allow()` is a single mutex-guarded read in the common (closed) case.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Inner,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Inner {
                consecutive_failures: AtomicU32::new(0),
                consecutive_half_open_successes: AtomicU32::new(0),
                opened_at: Mutex::new(None),
                half_open_probe_in_flight: AtomicU64::new(0),
            },
        }
    }

    pub fn state(&self) -> CircuitState {
        let opened_at = *self.inner.opened_at.lock();
        match opened_at {
            None => CircuitState::Closed,
            Some(at) if at.elapsed() >= self.config.cooldown => CircuitState::HalfOpen,
            Some(_) => CircuitState::Open,
        }
    }

    /// Should the caller attempt a call right now? In the half-open state,
    /// only one concurrent attempt is let through; a second concurrent
    /// attempt is rejected.
    pub fn allow(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                self.inner.half_open_probe_in_flight.compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst).is_ok()
            }
        }
    }

    pub fn record_success(&self) {
        let was_half_open = self.state() == CircuitState::HalfOpen;
        self.inner.half_open_probe_in_flight.store(0, Ordering::SeqCst);

        if was_half_open {
            let successes = self.inner.consecutive_half_open_successes.fetch_add(1, Ordering::SeqCst) + 1;
            if successes >= self.config.success_threshold {
                self.close();
            }
        } else {
            self.close();
        }
    }

    pub fn record_failure(&self) {
        self.inner.half_open_probe_in_flight.store(0, Ordering::SeqCst);
        self.inner.consecutive_half_open_successes.store(0, Ordering::SeqCst);

        let count = self.inner.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= self.config.failure_threshold {
            *self.inner.opened_at.lock() = Some(Instant::now());
        }
    }

    fn close(&self) {
        self.inner.consecutive_failures.store(0, Ordering::SeqCst);
        self.inner.consecutive_half_open_successes.store(0, Ordering::SeqCst);
        *self.inner.opened_at.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig { failure_threshold: 3, success_threshold: 2, cooldown: Duration::from_millis(20) })
    }

    fn trip(cb: &CircuitBreaker) {
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
    }

    #[test]
    fn closed_allows_calls() {
        let cb = breaker();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow());
    }

    #[test]
    fn trips_open_after_threshold_consecutive_failures() {
        let cb = breaker();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow());
    }

    #[test]
    fn success_resets_failure_count() {
        let cb = breaker();
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed, "count should have reset after a closed-state success");
    }

    #[test]
    fn half_open_after_cooldown_allows_single_probe() {
        let cb = breaker();
        trip(&cb);
        assert_eq!(cb.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.allow(), "first caller should win the probe");
        assert!(!cb.allow(), "second concurrent caller should be rejected");
    }

    #[test]
    fn single_half_open_success_is_not_enough_to_close() {
        let cb = breaker();
        trip(&cb);
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.allow());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen, "success_threshold is 2, one success should not close it");
    }

    #[test]
    fn success_threshold_consecutive_successes_close_the_circuit() {
        let cb = breaker();
        trip(&cb);
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.allow());
        cb.record_success();
        assert!(cb.allow());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn failed_probe_reopens_circuit_for_another_full_cooldown() {
        let cb = breaker();
        trip(&cb);
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.allow());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
