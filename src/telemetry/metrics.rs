//! Prometheus metrics for the gateway.
//!
//! Provides metrics for:
//! - Cache hits and misses
//! - Request latency by operation and outcome
//! - Errors by failure kind
//! - Circuit breaker state and caller rate-limit rejections
//! - Token usage reported by the upstream

use crate::failure::FailureKind;
use crate::types::Usage;
use crate::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

const NAMESPACE: &str = "gateway";

/// Latency buckets in seconds.
pub const LATENCY_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];

/// Gateway collectors on a private registry.
pub struct GatewayMetrics {
    registry: Registry,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    request_duration: HistogramVec,
    errors_total: IntCounterVec,
    circuit_breaker_state: IntGauge,
    rate_limiter_rejections: IntCounter,
    tokens_total: IntCounterVec,
}

impl GatewayMetrics {
    /// # Errors
    /// Returns error if a collector cannot be registered
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cache_hits = IntCounter::with_opts(
            Opts::new("cache_hits_total", "Text requests served from the response cache")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(cache_hits.clone()))?;

        let cache_misses = IntCounter::with_opts(
            Opts::new("cache_misses_total", "Text requests not found in the response cache")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(cache_misses.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "request_duration_seconds",
                "Gateway call latency in seconds",
            )
            .namespace(NAMESPACE)
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["operation", "status"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Failed gateway calls by failure kind").namespace(NAMESPACE),
            &["error_type"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let circuit_breaker_state = IntGauge::with_opts(
            Opts::new(
                "circuit_breaker_state",
                "Circuit breaker state (0=closed, 1=open)",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let rate_limiter_rejections = IntCounter::with_opts(
            Opts::new(
                "rate_limiter_rejections_total",
                "Calls rejected by the per-caller rate limiter",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(rate_limiter_rejections.clone()))?;

        let tokens_total = IntCounterVec::new(
            Opts::new("tokens_total", "Tokens reported by the upstream").namespace(NAMESPACE),
            &["type"],
        )?;
        registry.register(Box::new(tokens_total.clone()))?;

        Ok(Self {
            registry,
            cache_hits,
            cache_misses,
            request_duration,
            errors_total,
            circuit_breaker_state,
            rate_limiter_rejections,
            tokens_total,
        })
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    /// `status` is `"success"`, `"cache_hit"` or a failure label.
    pub fn observe_request(&self, operation: &str, status: &str, elapsed: Duration) {
        self.request_duration
            .with_label_values(&[operation, status])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_error(&self, kind: FailureKind) {
        self.errors_total.with_label_values(&[kind.label()]).inc();
    }

    pub fn set_circuit_open(&self, open: bool) {
        self.circuit_breaker_state.set(i64::from(open));
    }

    pub fn record_rate_limited(&self) {
        self.rate_limiter_rejections.inc();
    }

    pub fn record_usage(&self, usage: &Usage) {
        self.tokens_total
            .with_label_values(&["prompt"])
            .inc_by(usage.prompt_tokens);
        self.tokens_total
            .with_label_values(&["completion"])
            .inc_by(usage.completion_tokens);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every gateway collector.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
