use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub rps: f64,
    pub burst: f64,
    pub tokens: f64,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Tokens per second.
    pub rps: f64,
    /// Maximum burst size (tokens).
    pub burst: f64,
}

impl RateLimiterConfig {
    pub fn from_rps(rps: f64) -> Option<Self> {
        if !rps.is_finite() || rps < 0.0 {
            return None;
        }
        Some(Self {
            rps,
            burst: rps.max(1.0), // default burst: 1 second worth, at least 1
        })
    }

    /// Sustained rate expressed per minute, e.g. `5.0` for five requests a minute.
    pub fn per_minute(rpm: f64, burst: u32) -> Option<Self> {
        if !rpm.is_finite() || rpm < 0.0 {
            return None;
        }
        Some(Self {
            rps: rpm / 60.0,
            burst: f64::from(burst.max(1)),
        })
    }

    /// Time for one token to refill.
    pub fn refill_interval(&self) -> Option<Duration> {
        if self.rps > 0.0 {
            Some(Duration::from_secs_f64(1.0 / self.rps))
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct State {
    tokens: f64,
    last: Instant,
    last_used: Instant,
}

/// Non-blocking token bucket.
///
/// Starts full. A zero rate disables limiting.
pub struct TokenBucket {
    cfg: RateLimiterConfig,
    state: Mutex<State>,
}

impl TokenBucket {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self::new_at(cfg, Instant::now())
    }

    pub(crate) fn new_at(cfg: RateLimiterConfig, now: Instant) -> Self {
        let state = Mutex::new(State {
            tokens: cfg.burst,
            last: now,
            last_used: now,
        });
        Self { cfg, state }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refill_locked(cfg: &RateLimiterConfig, st: &mut State, now: Instant) {
        let elapsed = now.saturating_duration_since(st.last).as_secs_f64();
        if elapsed > 0.0 {
            st.tokens = (st.tokens + elapsed * cfg.rps).min(cfg.burst);
            st.last = now;
        }
    }

    /// Try to take one token without waiting.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, now: Instant) -> bool {
        if self.cfg.rps <= 0.0 {
            return true;
        }
        let mut st = self.state();
        Self::refill_locked(&self.cfg, &mut st, now);
        st.last_used = now;
        if st.tokens >= 1.0 {
            st.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whether the bucket has refilled to capacity, i.e. it behaves like a new bucket.
    pub(crate) fn is_idle_at(&self, now: Instant) -> bool {
        let mut st = self.state();
        Self::refill_locked(&self.cfg, &mut st, now);
        st.tokens >= self.cfg.burst
    }

    /// Last time a token was requested.
    pub(crate) fn last_used(&self) -> Instant {
        self.state().last_used
    }

    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let cfg = &self.cfg;
        let mut st = self.state();

        let mut wait_ms = None;
        if cfg.rps > 0.0 {
            Self::refill_locked(cfg, &mut st, Instant::now());
            if st.tokens < 1.0 {
                let missing = 1.0 - st.tokens;
                wait_ms = Some((missing / cfg.rps * 1000.0) as u64);
            }
        }

        RateLimiterSnapshot {
            rps: cfg.rps,
            burst: cfg.burst,
            tokens: st.tokens,
            estimated_wait_ms: wait_ms,
        }
    }
}

impl RateLimiterConfig {
    /// Five requests a minute with a burst of ten.
    pub fn new() -> Self {
        Self {
            rps: 5.0 / 60.0,
            burst: 10.0,
        }
    }

    /// Set the maximum tokens (burst size)
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.burst = tokens as f64;
        self
    }

    /// Set the refill rate (tokens per second)
    pub fn with_refill_rate(mut self, rate: f64) -> Self {
        self.rps = rate;
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_config_from_rps() {
        let config = RateLimiterConfig::from_rps(10.0).unwrap();
        assert_eq!(config.rps, 10.0);
        assert_eq!(config.burst, 10.0);
    }

    #[test]
    fn test_rate_limiter_config_from_rps_invalid() {
        assert!(RateLimiterConfig::from_rps(-1.0).is_none());
        assert!(RateLimiterConfig::from_rps(f64::NAN).is_none());
        assert!(RateLimiterConfig::per_minute(f64::INFINITY, 10).is_none());
    }

    #[test]
    fn test_per_minute_refill_interval() {
        let config = RateLimiterConfig::per_minute(5.0, 10).unwrap();
        assert_eq!(config.burst, 10.0);
        let interval = config.refill_interval().unwrap();
        assert!((interval.as_secs_f64() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_burst_then_reject_then_refill() {
        let config = RateLimiterConfig::per_minute(5.0, 10).unwrap();
        let bucket = TokenBucket::new(config);
        let start = Instant::now();

        for i in 0..10 {
            assert!(bucket.try_acquire_at(start), "call {i} within burst");
        }
        assert!(!bucket.try_acquire_at(start));

        // Just past one refill interval (12s at 5/min) a single call is admitted again.
        let later = start + Duration::from_secs(13);
        assert!(bucket.try_acquire_at(later));
        assert!(!bucket.try_acquire_at(later));
    }

    #[test]
    fn test_zero_rate_is_unlimited() {
        let bucket = TokenBucket::new(RateLimiterConfig::from_rps(0.0).unwrap());
        for _ in 0..100 {
            assert!(bucket.try_acquire());
        }
    }

    #[test]
    fn test_idle_detection() {
        let bucket = TokenBucket::new(
            RateLimiterConfig::new()
                .with_max_tokens(2)
                .with_refill_rate(1.0),
        );
        let start = Instant::now();
        assert!(bucket.is_idle_at(start));
        assert!(bucket.try_acquire_at(start));
        assert!(!bucket.is_idle_at(start));
        assert!(bucket.is_idle_at(start + Duration::from_secs(2)));
    }

    #[test]
    fn test_snapshot_reports_wait() {
        let bucket = TokenBucket::new(
            RateLimiterConfig::new()
                .with_max_tokens(1)
                .with_refill_rate(1.0),
        );
        assert!(bucket.try_acquire());
        let snapshot = bucket.snapshot();
        assert_eq!(snapshot.burst, 1.0);
        assert!(snapshot.estimated_wait_ms.is_some());
    }
}
