//! In-memory response store with TTL expiry and amortized sweeping.

use super::key::fingerprint;
use crate::types::Message;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Lower-cased terms that make the latest user message time-sensitive.
const TIME_SENSITIVE_TERMS: &[&str] = &[
    "random",
    "today",
    "current time",
    "right now",
    "latest news",
    "hoy",
    "aleatorio",
    "hora actual",
];

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    /// Probability of a full expiry sweep after each store.
    pub sweep_probability: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            sweep_probability: 0.05,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_sweep_probability(mut self, p: f64) -> Self {
        self.sweep_probability = p.clamp(0.0, 1.0);
        self
    }
}

#[derive(Clone)]
struct CacheEntry {
    text: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Whether a conversation may be served from or stored into the cache.
///
/// Empty conversations and conversations whose most recent user message
/// mentions a time-sensitive term are never cached.
pub fn is_cacheable(messages: &[Message]) -> bool {
    if messages.is_empty() {
        return false;
    }
    match messages.iter().rev().find(|m| m.is_user()) {
        Some(last_user) => {
            let lowered = last_user.content.to_lowercase();
            !TIME_SENSITIVE_TERMS
                .iter()
                .any(|term| lowered.contains(term))
        }
        None => true,
    }
}

/// Fingerprint-keyed response cache.
///
/// There is no size bound: entries leave only through expiry, either lazily on
/// read or through the probabilistic sweep that follows a store.
pub struct ResponseCache {
    cfg: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(cfg: CacheConfig) -> Self {
        Self {
            cfg,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.cfg.ttl
    }

    /// Look up a cached response. Never returns expired content.
    pub fn get(&self, model: &str, messages: &[Message]) -> Option<String> {
        if !is_cacheable(messages) {
            return None;
        }
        let key = fingerprint(model, messages);
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(&key) {
                None => return None,
                Some(entry) if !entry.is_expired_at(now) => return Some(entry.text.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict under the write lock, re-checking in case a fresh value landed.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(&key)
            .map(|e| e.is_expired_at(Instant::now()))
            .unwrap_or(false)
        {
            entries.remove(&key);
            debug!(key = key.as_str(), "evicted expired cache entry on read");
        }
        None
    }

    /// Store a response with the configured TTL. Non-cacheable conversations are ignored.
    pub fn set(&self, model: &str, messages: &[Message], text: impl Into<String>) {
        if !is_cacheable(messages) {
            return;
        }
        let key = fingerprint(model, messages);
        let entry = CacheEntry {
            text: text.into(),
            expires_at: Instant::now() + self.cfg.ttl,
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, entry);

        if self.cfg.sweep_probability > 0.0 && rand::random::<f64>() < self.cfg.sweep_probability
        {
            let removed = Self::sweep_locked(&mut entries, Instant::now());
            if removed > 0 {
                debug!(removed, remaining = entries.len(), "cache sweep");
            }
        }
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Self::sweep_locked(&mut entries, Instant::now())
    }

    fn sweep_locked(entries: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        before - entries.len()
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| !e.is_expired_at(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[cfg(test)]
    fn raw_len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
