use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Aggregate counters behind [`StatsSnapshot`].
#[derive(Debug, Default)]
pub struct GatewayStats {
    requests: AtomicU64,
    errors: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_response_us: AtomicU64,
}

/// Point-in-time gateway statistics, shaped for a JSON stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub cache_size: usize,
    /// Percentage of text lookups served from cache (0-100).
    pub cache_hit_rate: f64,
    pub avg_response_time_ms: f64,
    pub request_count: u64,
    pub error_count: u64,
    pub circuit_state: String,
}

impl GatewayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_response_us.fetch_add(us, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, cache_size: usize, circuit_state: &str) -> StatsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let lookups = hits + self.cache_misses.load(Ordering::Relaxed);
        let total_us = self.total_response_us.load(Ordering::Relaxed);

        StatsSnapshot {
            cache_size,
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64 * 100.0
            },
            avg_response_time_ms: if requests == 0 {
                0.0
            } else {
                total_us as f64 / requests as f64 / 1000.0
            },
            request_count: requests,
            error_count: self.errors.load(Ordering::Relaxed),
            circuit_state: circuit_state.to_string(),
        }
    }
}
