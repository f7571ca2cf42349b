//! 响应缓存模块：按请求指纹缓存补全结果，减少重复的上游调用。
//!
//! # Response Caching Module
//!
//! Caches completion text by request fingerprint so that repeated, identical
//! text requests skip the upstream call entirely.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResponseCache`] | RwLock-guarded map with TTL expiry and probabilistic sweeps |
//! | [`CacheConfig`] | TTL and sweep probability |
//! | [`fingerprint`] | SHA-256 digest of model + ordered messages |
//! | [`is_cacheable`] | Rejects empty and time-sensitive conversations |
//!
//! ## Example
//!
//! ```rust
//! use completion_gateway::cache::{CacheConfig, ResponseCache};
//! use completion_gateway::types::Message;
//! use std::time::Duration;
//!
//! let cache = ResponseCache::new(CacheConfig::new().with_ttl(Duration::from_secs(900)));
//! let messages = vec![Message::user("¿Qué es un APU?")];
//! cache.set("qwen-3-32b", &messages, "Análisis de precios unitarios.");
//! assert!(cache.get("qwen-3-32b", &messages).is_some());
//! ```
//!
//! Vision requests never touch this cache.

mod key;
mod store;

pub use key::fingerprint;
pub use store::{is_cacheable, CacheConfig, ResponseCache};
