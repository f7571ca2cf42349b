use crate::{Error, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CircuitBreakerSnapshot {
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
    pub consecutive_failures: u32,
    /// Remaining open time in ms, if calls are currently being rejected.
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct State {
    consecutive_failures: u32,
    open: bool,
    open_until: Option<Instant>,
}

impl State {
    fn rejecting_at(&self, now: Instant) -> Option<Duration> {
        match (self.open, self.open_until) {
            (true, Some(until)) if now < until => Some(until - now),
            _ => None,
        }
    }
}

/// Consecutive-failure circuit breaker for a single upstream.
///
/// - Closed: calls pass, failures are counted
/// - Open: [`check`](Self::check) fails fast until the cooldown elapses
///
/// There is no half-open probe. Once the cooldown passes, `check` stops
/// rejecting and every caller is let through; the next recorded outcome
/// decides the state. The failure count is not reset by the cooldown, so a
/// single failure after it re-opens the circuit.
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State {
                consecutive_failures: 0,
                open: false,
                open_until: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail fast while the circuit is open. Never mutates state.
    pub fn check(&self) -> Result<()> {
        let st = self.state();
        match st.rejecting_at(Instant::now()) {
            Some(retry_in) => Err(Error::CircuitOpen { retry_in }),
            None => Ok(()),
        }
    }

    /// Full reset, regardless of the current state.
    pub fn record_success(&self) {
        let mut st = self.state();
        if st.open {
            info!(
                previous_failures = st.consecutive_failures,
                "circuit breaker closed after successful call"
            );
        }
        st.consecutive_failures = 0;
        st.open = false;
        st.open_until = None;
    }

    /// Count a failure; opens the circuit once the threshold is reached.
    /// Returns `true` when this call (re)opened the circuit.
    pub fn record_failure(&self) -> bool {
        let mut st = self.state();
        st.consecutive_failures = st.consecutive_failures.saturating_add(1);
        if st.consecutive_failures >= self.cfg.failure_threshold {
            st.open = true;
            st.open_until = Some(Instant::now() + self.cfg.cooldown);
            warn!(
                consecutive_failures = st.consecutive_failures,
                cooldown_ms = self.cfg.cooldown.as_millis() as u64,
                "circuit breaker open"
            );
            return true;
        }
        false
    }

    pub fn is_open(&self) -> bool {
        self.state().rejecting_at(Instant::now()).is_some()
    }

    /// `"open"` while calls are rejected, `"closed"` otherwise.
    pub fn state_label(&self) -> &'static str {
        if self.is_open() {
            "open"
        } else {
            "closed"
        }
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let st = self.state();
        CircuitBreakerSnapshot {
            failure_threshold: self.cfg.failure_threshold,
            cooldown_ms: self.cfg.cooldown.as_millis() as u64,
            consecutive_failures: st.consecutive_failures,
            open_remaining_ms: st
                .rejecting_at(Instant::now())
                .map(|d| d.as_millis() as u64),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the cooldown duration
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Alias for with_cooldown for API consistency
    pub fn with_reset_timeout(self, timeout: Duration) -> Self {
        self.with_cooldown(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_circuit_breaker_config_defaults() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.cooldown, Duration::from_secs(60));
    }

    #[test]
    fn test_circuit_breaker_initial_state() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
        assert!(cb.check().is_ok());
        assert_eq!(cb.state_label(), "closed");

        let snapshot = cb.snapshot();
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.open_remaining_ms.is_none());
    }

    #[test]
    fn test_circuit_breaker_success_resets_failures() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::new().with_failure_threshold(5));

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.snapshot().consecutive_failures, 2);

        cb.record_success();
        assert_eq!(cb.snapshot().consecutive_failures, 0);
    }

    #[test]
    fn test_circuit_breaker_trip_and_recovery() {
        let config = CircuitBreakerConfig::new()
            .with_failure_threshold(3)
            .with_cooldown(Duration::from_millis(50));
        let cb = CircuitBreaker::new(config);

        assert!(!cb.record_failure());
        assert!(!cb.record_failure());
        assert!(cb.check().is_ok());

        assert!(cb.record_failure());
        assert!(matches!(cb.check(), Err(Error::CircuitOpen { .. })));
        assert_eq!(cb.state_label(), "open");

        thread::sleep(Duration::from_millis(70));

        // Cooldown elapsed: calls pass again without any state change.
        assert!(cb.check().is_ok());
        assert_eq!(cb.state_label(), "closed");
        assert_eq!(cb.snapshot().consecutive_failures, 3);

        cb.record_success();
        assert_eq!(cb.snapshot().consecutive_failures, 0);
    }

    #[test]
    fn test_check_does_not_mutate() {
        let cb = CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(1)
                .with_cooldown(Duration::from_millis(10)),
        );
        cb.record_failure();
        thread::sleep(Duration::from_millis(20));
        for _ in 0..5 {
            assert!(cb.check().is_ok());
        }
        assert_eq!(cb.snapshot().consecutive_failures, 1);
    }

    #[test]
    fn test_single_failure_after_cooldown_reopens() {
        let cb = CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(2)
                .with_cooldown(Duration::from_millis(30)),
        );
        cb.record_failure();
        cb.record_failure();
        thread::sleep(Duration::from_millis(40));
        assert!(cb.check().is_ok());

        assert!(cb.record_failure());
        assert!(cb.check().is_err());
    }

    #[test]
    fn test_circuit_breaker_snapshot() {
        let cb = CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(5)
                .with_cooldown(Duration::from_secs(30)),
        );

        cb.record_failure();
        cb.record_failure();

        let snapshot = cb.snapshot();
        assert_eq!(snapshot.failure_threshold, 5);
        assert_eq!(snapshot.cooldown_ms, 30_000);
        assert_eq!(snapshot.consecutive_failures, 2);
        assert!(snapshot.open_remaining_ms.is_none());
    }

    #[test]
    fn test_circuit_breaker_thread_safe() {
        let cb = Arc::new(CircuitBreaker::new(
            CircuitBreakerConfig::new().with_failure_threshold(100),
        ));

        let mut handles = vec![];
        for _ in 0..10 {
            let cb_clone = Arc::clone(&cb);
            handles.push(thread::spawn(move || {
                for _ in 0..5 {
                    cb_clone.record_failure();
                    let _ = cb_clone.check();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(cb.snapshot().consecutive_failures, 50);
    }
}
