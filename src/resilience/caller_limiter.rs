use super::rate_limiter::{RateLimiterConfig, TokenBucket};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CallerLimiterConfig {
    pub bucket: RateLimiterConfig,
    /// Upper bound on the number of tracked callers.
    pub max_tracked_callers: usize,
}

impl Default for CallerLimiterConfig {
    fn default() -> Self {
        Self {
            bucket: RateLimiterConfig::default(),
            max_tracked_callers: 10_000,
        }
    }
}

impl CallerLimiterConfig {
    pub fn new(bucket: RateLimiterConfig) -> Self {
        Self {
            bucket,
            ..Self::default()
        }
    }

    pub fn with_max_tracked_callers(mut self, max: usize) -> Self {
        self.max_tracked_callers = max.max(1);
        self
    }
}

/// Per-caller token buckets, keyed by caller identity (usually the client address).
///
/// Buckets are created on first sight. The registry is bounded: when it is
/// full, buckets that have refilled to capacity are dropped first (a fresh
/// bucket behaves identically), then the least recently active one.
pub struct CallerRateLimiter {
    cfg: CallerLimiterConfig,
    buckets: RwLock<HashMap<String, Arc<TokenBucket>>>,
}

impl CallerRateLimiter {
    pub fn new(cfg: CallerLimiterConfig) -> Self {
        Self {
            cfg,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Non-blocking admission check for one call by `caller`.
    pub fn allow(&self, caller: &str) -> bool {
        self.allow_at(caller, Instant::now())
    }

    pub(crate) fn allow_at(&self, caller: &str, now: Instant) -> bool {
        let allowed = self.bucket_for(caller, now).try_acquire_at(now);
        if !allowed {
            debug!(caller, "caller rate limit exceeded");
        }
        allowed
    }

    fn bucket_for(&self, caller: &str, now: Instant) -> Arc<TokenBucket> {
        {
            let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(bucket) = buckets.get(caller) {
                return Arc::clone(bucket);
            }
        }

        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(bucket) = buckets.get(caller) {
            return Arc::clone(bucket);
        }
        if buckets.len() >= self.cfg.max_tracked_callers {
            self.make_room_locked(&mut buckets, now);
        }
        let bucket = Arc::new(TokenBucket::new_at(self.cfg.bucket.clone(), now));
        buckets.insert(caller.to_string(), Arc::clone(&bucket));
        bucket
    }

    fn make_room_locked(&self, buckets: &mut HashMap<String, Arc<TokenBucket>>, now: Instant) {
        let removed = Self::sweep_idle_locked(buckets, now);
        if removed > 0 {
            debug!(removed, remaining = buckets.len(), "swept idle caller buckets");
        }
        if buckets.len() < self.cfg.max_tracked_callers {
            return;
        }

        let oldest = buckets
            .iter()
            .min_by_key(|(_, b)| b.last_used())
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            buckets.remove(&key);
            warn!(
                evicted = key.as_str(),
                max_tracked_callers = self.cfg.max_tracked_callers,
                "caller registry full, evicted least recently active caller"
            );
        }
    }

    fn sweep_idle_locked(buckets: &mut HashMap<String, Arc<TokenBucket>>, now: Instant) -> usize {
        let before = buckets.len();
        buckets.retain(|_, b| !b.is_idle_at(now));
        before - buckets.len()
    }

    /// Drop every bucket that has refilled to capacity. Returns how many were dropped.
    pub fn sweep_idle(&self) -> usize {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        Self::sweep_idle_locked(&mut buckets, Instant::now())
    }

    /// Number of callers currently tracked.
    pub fn len(&self) -> usize {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CallerRateLimiter {
    fn default() -> Self {
        Self::new(CallerLimiterConfig::default())
    }
}
