use crate::cache::{CacheConfig, ResponseCache};
use crate::client::core::GatewayClient;
use crate::config::GatewayConfig;
use crate::error::ErrorContext;
use crate::resilience::admission::Admission;
use crate::resilience::caller_limiter::{CallerLimiterConfig, CallerRateLimiter};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::resilience::rate_limiter::RateLimiterConfig;
use crate::telemetry::{GatewayMetrics, GatewayStats};
use crate::transport::{ChatTransport, HttpTransport, RetryConfig, RetryingTransport};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Builder for a [`GatewayClient`].
///
/// Keep this surface area small and predictable: everything tunable lives in
/// [`GatewayConfig`], the builder only adds overrides that are awkward to put
/// in a config file.
pub struct GatewayClientBuilder {
    config: GatewayConfig,
    transport: Option<Arc<dyn ChatTransport>>,
}

impl GatewayClientBuilder {
    pub fn new() -> Self {
        Self::from_config(GatewayConfig::default())
    }

    /// Start from [`GatewayConfig::from_env`].
    pub fn from_env() -> Self {
        Self::from_config(GatewayConfig::from_env())
    }

    pub fn from_config(config: GatewayConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Override the chat-completion endpoint (primarily for testing with mock servers).
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint_url = url.into();
        self
    }

    /// Limit maximum number of in-flight upstream calls.
    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config.max_concurrent = n.max(1);
        self
    }

    /// Replace the HTTP transport. Retries, admission and the breaker still apply.
    pub fn with_transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<GatewayClient> {
        let cfg = self.config;
        cfg.validate()?;

        let inner: Arc<dyn ChatTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(
                cfg.endpoint_url.clone(),
                cfg.api_key.clone(),
                cfg.request_timeout(),
            )?),
        };
        let transport = RetryingTransport::new(
            inner,
            RetryConfig::new()
                .with_max_attempts(cfg.max_attempts)
                .with_delays(cfg.retry_min_delay(), cfg.retry_max_delay()),
        );

        let cache = ResponseCache::new(
            CacheConfig::new()
                .with_ttl(cfg.cache_ttl())
                .with_sweep_probability(cfg.cache_sweep_probability),
        );

        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(cfg.breaker_threshold)
                .with_cooldown(cfg.breaker_cooldown()),
        );

        let bucket = RateLimiterConfig::per_minute(cfg.rate_per_minute, cfg.rate_burst)
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "invalid caller rate",
                    ErrorContext::new()
                        .with_field_path("rate_per_minute")
                        .with_source("gateway_builder"),
                )
            })?;
        let callers = CallerRateLimiter::new(
            CallerLimiterConfig::new(bucket).with_max_tracked_callers(cfg.max_tracked_callers),
        );

        let admission = Admission::new(cfg.max_concurrent);
        let metrics = GatewayMetrics::new()?;

        if cfg.has_credential() {
            info!(
                endpoint = cfg.endpoint_url.as_str(),
                text_model = cfg.text_model.as_str(),
                max_concurrent = cfg.max_concurrent,
                "completion gateway ready"
            );
        } else {
            info!("completion gateway built without credential, calls will degrade");
        }

        Ok(GatewayClient {
            cfg,
            transport,
            cache,
            breaker,
            callers,
            admission,
            metrics,
            stats: GatewayStats::new(),
        })
    }
}

impl Default for GatewayClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_invalid_config() {
        let err = GatewayClientBuilder::new()
            .endpoint("ftp://nowhere")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn build_from_defaults() {
        let client = GatewayClientBuilder::new().build().unwrap();
        assert_eq!(client.api_status(), "degraded");
        assert_eq!(client.circuit_state(), "closed");
        assert_eq!(client.cache_size(), 0);
    }

    #[test]
    fn overrides_apply() {
        let client = GatewayClientBuilder::new()
            .api_key("sk-test")
            .max_concurrent(3)
            .build()
            .unwrap();
        assert_eq!(client.api_status(), "ok");
        assert_eq!(client.signals().inflight.max, 3);
    }
}
