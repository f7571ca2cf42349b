//! Bounded retry around a [`ChatTransport`].
//!
//! Retries cover failures to get a response and transient 5xx statuses. Any
//! other received status goes straight back to the caller for mapping.

use super::{ChatTransport, UpstreamReply};
use crate::failure::FailureKind;
use crate::types::ChatCompletionRequest;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            retry_on_status: vec![500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_delays(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max.max(min);
        self
    }

    /// Delay before retry number `retry` (0-based): `min * 2^retry`, capped at `max`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let base = self.min_delay.as_millis() as u64;
        let cap = self.max_delay.as_millis() as u64;

        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let delay = base.saturating_mul(factor).min(cap);
        Duration::from_millis(delay)
    }

    fn retries_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }
}

pub struct RetryingTransport {
    inner: Arc<dyn ChatTransport>,
    cfg: RetryConfig,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn ChatTransport>, cfg: RetryConfig) -> Self {
        Self { inner, cfg }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.cfg
    }

    /// Send with retries. Every attempt and every backoff sleep is bounded by
    /// `deadline`; cancellation stops the call at once and is never retried.
    pub async fn send(
        &self,
        request: &ChatCompletionRequest,
        request_id: &str,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<UpstreamReply> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                res = tokio::time::timeout_at(deadline, self.inner.post_chat(request, request_id)) => match res {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::transport(FailureKind::Timeout, "call deadline exceeded")),
                },
            };

            let reason = match &outcome {
                Ok(reply) if self.cfg.retries_status(reply.status) => format!("status {}", reply.status),
                Err(e) if e.is_retryable_transport() => e.failure_kind().label().to_string(),
                _ => return outcome,
            };

            if attempt >= self.cfg.max_attempts {
                debug!(request_id, attempt, reason = reason.as_str(), "retries exhausted");
                return outcome;
            }

            let delay = self.cfg.backoff(attempt - 1);
            if Instant::now() + delay >= deadline {
                debug!(
                    request_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "next retry would cross the call deadline"
                );
                return outcome;
            }

            warn!(
                request_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = reason.as_str(),
                "retrying upstream call"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
