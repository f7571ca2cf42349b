//! 网关配置：默认值、环境变量、YAML 文件与校验。
//!
//! Gateway configuration.
//!
//! Every field has a default, so an empty YAML document or an empty
//! environment yields a working (if unauthenticated) configuration.
//!
//! | Source | Constructor |
//! |--------|-------------|
//! | Defaults | [`GatewayConfig::default`] |
//! | Environment | [`GatewayConfig::from_env`] |
//! | YAML | [`GatewayConfig::from_yaml_str`], [`GatewayConfig::from_yaml_file`] |

use crate::error::ErrorContext;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.cerebras.ai/v1/chat/completions";
pub const DEFAULT_TEXT_MODEL: &str = "qwen-3-32b";
pub const DEFAULT_VISION_MODEL: &str = "qwen-2.5-vision";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub endpoint_url: String,
    pub api_key: Option<String>,
    pub text_model: String,
    pub vision_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub cache_ttl_secs: u64,
    pub cache_sweep_probability: f64,
    /// Total upstream attempts per call, the first one included.
    pub max_attempts: u32,
    pub retry_min_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Deadline for one gateway call: admission wait plus every attempt.
    pub request_timeout_secs: u64,
    pub max_concurrent: usize,
    pub breaker_threshold: u32,
    pub breaker_cooldown_secs: u64,
    pub rate_per_minute: f64,
    pub rate_burst: u32,
    pub max_tracked_callers: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            cache_ttl_secs: 15 * 60,
            cache_sweep_probability: 0.05,
            max_attempts: 3,
            retry_min_delay_ms: 1000,
            retry_max_delay_ms: 5000,
            request_timeout_secs: 30,
            max_concurrent: 10,
            breaker_threshold: 5,
            breaker_cooldown_secs: 60,
            rate_per_minute: 5.0,
            rate_burst: 10,
            max_tracked_callers: 10_000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl GatewayConfig {
    /// Defaults overridden by environment variables. Unparsable values keep the default.
    ///
    /// - `CEREBRAS_API_URL`, `CEREBRAS_API_KEY` (empty counts as absent)
    /// - `GATEWAY_TEXT_MODEL`, `GATEWAY_VISION_MODEL`
    /// - `GATEWAY_TEMPERATURE`, `GATEWAY_MAX_TOKENS`
    /// - `GATEWAY_CACHE_TTL_SECS`, `GATEWAY_CACHE_SWEEP_PROBABILITY`
    /// - `GATEWAY_MAX_RETRIES`, `GATEWAY_RETRY_MIN_DELAY_MS`, `GATEWAY_RETRY_MAX_DELAY_MS`
    /// - `GATEWAY_TIMEOUT_SECS`, `GATEWAY_MAX_CONCURRENT`
    /// - `GATEWAY_BREAKER_THRESHOLD`, `GATEWAY_BREAKER_COOLDOWN_SECS`
    /// - `GATEWAY_RATE_PER_MINUTE`, `GATEWAY_RATE_BURST`, `GATEWAY_MAX_TRACKED_CALLERS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Overlay environment variables on top of the current values.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_string("CEREBRAS_API_URL") {
            self.endpoint_url = v;
        }
        if let Some(v) = env_string("CEREBRAS_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = env_string("GATEWAY_TEXT_MODEL") {
            self.text_model = v;
        }
        if let Some(v) = env_string("GATEWAY_VISION_MODEL") {
            self.vision_model = v;
        }
        self.temperature = env_parse("GATEWAY_TEMPERATURE").unwrap_or(self.temperature);
        self.max_tokens = env_parse("GATEWAY_MAX_TOKENS").unwrap_or(self.max_tokens);
        self.cache_ttl_secs = env_parse("GATEWAY_CACHE_TTL_SECS").unwrap_or(self.cache_ttl_secs);
        self.cache_sweep_probability = env_parse("GATEWAY_CACHE_SWEEP_PROBABILITY")
            .unwrap_or(self.cache_sweep_probability);
        self.max_attempts = env_parse("GATEWAY_MAX_RETRIES").unwrap_or(self.max_attempts);
        self.retry_min_delay_ms =
            env_parse("GATEWAY_RETRY_MIN_DELAY_MS").unwrap_or(self.retry_min_delay_ms);
        self.retry_max_delay_ms =
            env_parse("GATEWAY_RETRY_MAX_DELAY_MS").unwrap_or(self.retry_max_delay_ms);
        self.request_timeout_secs =
            env_parse("GATEWAY_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs);
        self.max_concurrent = env_parse("GATEWAY_MAX_CONCURRENT").unwrap_or(self.max_concurrent);
        self.breaker_threshold =
            env_parse("GATEWAY_BREAKER_THRESHOLD").unwrap_or(self.breaker_threshold);
        self.breaker_cooldown_secs =
            env_parse("GATEWAY_BREAKER_COOLDOWN_SECS").unwrap_or(self.breaker_cooldown_secs);
        self.rate_per_minute = env_parse("GATEWAY_RATE_PER_MINUTE").unwrap_or(self.rate_per_minute);
        self.rate_burst = env_parse("GATEWAY_RATE_BURST").unwrap_or(self.rate_burst);
        self.max_tracked_callers =
            env_parse("GATEWAY_MAX_TRACKED_CALLERS").unwrap_or(self.max_tracked_callers);
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut cfg: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "invalid gateway configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("yaml_loader"),
            )
        })?;
        if cfg.api_key.as_deref().map(str::trim) == Some("") {
            cfg.api_key = None;
        }
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read {}", path.display()),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("yaml_loader"),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }

    pub fn retry_min_delay(&self) -> Duration {
        Duration::from_millis(self.retry_min_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, message: &str, details: String| {
            Err(Error::configuration_with_context(
                message,
                ErrorContext::new()
                    .with_field_path(field)
                    .with_details(details)
                    .with_source("config_validator"),
            ))
        };

        match url::Url::parse(&self.endpoint_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(u) => {
                return invalid(
                    "endpoint_url",
                    "endpoint must use http or https",
                    format!("scheme: {}", u.scheme()),
                )
            }
            Err(e) => return invalid("endpoint_url", "endpoint is not a valid URL", e.to_string()),
        }

        if self.max_concurrent == 0 {
            return invalid("max_concurrent", "must be at least 1", "got 0".into());
        }
        if self.breaker_threshold == 0 {
            return invalid("breaker_threshold", "must be at least 1", "got 0".into());
        }
        if self.max_attempts == 0 {
            return invalid("max_attempts", "must be at least 1", "got 0".into());
        }
        if self.rate_burst == 0 {
            return invalid("rate_burst", "must be at least 1", "got 0".into());
        }
        if self.max_tracked_callers == 0 {
            return invalid("max_tracked_callers", "must be at least 1", "got 0".into());
        }
        if !self.rate_per_minute.is_finite() || self.rate_per_minute <= 0.0 {
            return invalid(
                "rate_per_minute",
                "must be a positive number",
                format!("got {}", self.rate_per_minute),
            );
        }
        if self.retry_min_delay_ms > self.retry_max_delay_ms {
            return invalid(
                "retry_min_delay_ms",
                "minimum retry delay exceeds maximum",
                format!("{} > {}", self.retry_min_delay_ms, self.retry_max_delay_ms),
            );
        }
        if !(0.0..=1.0).contains(&self.cache_sweep_probability) {
            return invalid(
                "cache_sweep_probability",
                "must be within [0, 1]",
                format!("got {}", self.cache_sweep_probability),
            );
        }
        if self.request_timeout_secs == 0 {
            return invalid("request_timeout_secs", "must be at least 1", "got 0".into());
        }
        Ok(())
    }
}
