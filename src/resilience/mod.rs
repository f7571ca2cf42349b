//! 弹性模式模块：提供熔断器、限流器和并发准入控制等可靠性保障机制。
//!
//! # Resilience Primitives Module
//!
//! Guards that keep a flaky, expensive upstream from turning into an outage
//! for the service that calls it.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`circuit_breaker`] | Consecutive-failure breaker with a fixed cooldown |
//! | [`rate_limiter`] | Non-blocking token bucket |
//! | [`caller_limiter`] | Bounded registry of per-caller token buckets |
//! | [`admission`] | Counting semaphore bounding in-flight upstream calls |
//!
//! ## Circuit Breaker
//!
//! - **Closed**: calls pass, failures are counted
//! - **Open**: calls fail fast until the cooldown elapses
//!
//! After the cooldown every caller is let through and the next outcome decides.
//!
//! ```rust
//! use completion_gateway::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::new()
//!     .with_failure_threshold(5)
//!     .with_reset_timeout(Duration::from_secs(60));
//! let breaker = CircuitBreaker::new(config);
//!
//! if breaker.check().is_ok() {
//!     // Make the upstream call...
//!     breaker.record_success();
//! }
//! ```
//!
//! ## Per-Caller Rate Limiter
//!
//! ```rust
//! use completion_gateway::resilience::caller_limiter::{CallerLimiterConfig, CallerRateLimiter};
//! use completion_gateway::resilience::rate_limiter::RateLimiterConfig;
//!
//! let bucket = RateLimiterConfig::per_minute(5.0, 10).unwrap();
//! let limiter = CallerRateLimiter::new(CallerLimiterConfig::new(bucket));
//!
//! if limiter.allow("203.0.113.7") {
//!     // Proceed with request...
//! }
//! ```

pub mod admission;
pub mod caller_limiter;
pub mod circuit_breaker;
pub mod rate_limiter;
