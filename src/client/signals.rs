use crate::resilience::admission::InflightSnapshot;
use crate::resilience::circuit_breaker::CircuitBreakerSnapshot;

/// A lightweight snapshot of runtime "signals" for the hosting service.
///
/// This is intentionally *facts only* (no policy). Health checks, dashboards
/// or load shedding can be built on top of these signals.
#[derive(Debug, Clone)]
pub struct SignalsSnapshot {
    pub inflight: InflightSnapshot,
    pub circuit_breaker: CircuitBreakerSnapshot,
    pub tracked_callers: usize,
    pub cache_entries: usize,
}
