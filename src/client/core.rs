use crate::cache::ResponseCache;
use crate::client::response::{
    body_excerpt, concise_answer, parse_completion, split_concise_directive, Completion,
};
use crate::client::signals::SignalsSnapshot;
use crate::client::vision;
use crate::config::GatewayConfig;
use crate::failure::{self, FailureKind};
use crate::resilience::admission::Admission;
use crate::resilience::caller_limiter::CallerRateLimiter;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::telemetry::{GatewayMetrics, GatewayStats, StatsSnapshot};
use crate::transport::RetryingTransport;
use crate::types::{conversation_with_query, ChatCompletionRequest, Message};
use crate::{Error, Result};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Text,
    Vision,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::Text => "generate_text",
            Operation::Vision => "generate_vision",
        }
    }
}

/// Outcome label for a call that produced text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Served {
    Upstream,
    Cache,
}

impl Served {
    fn label(self) -> &'static str {
        match self {
            Served::Upstream => "success",
            Served::Cache => "cache_hit",
        }
    }
}

/// Cut a successful answer down to its concise line. The cache keeps the full text.
fn shorten_if(concise: bool, outcome: Result<(String, Served)>) -> Result<(String, Served)> {
    if !concise {
        return outcome;
    }
    outcome.map(|(text, served)| (concise_answer(&text), served))
}

/// Outbound gateway to the chat-completion service.
///
/// Built once with [`GatewayClientBuilder`](crate::GatewayClientBuilder) and
/// shared by handle (`Arc<GatewayClient>`). All state (cache, breaker, caller
/// buckets, metrics) lives in the instance.
pub struct GatewayClient {
    pub(crate) cfg: GatewayConfig,
    pub(crate) transport: RetryingTransport,
    pub(crate) cache: ResponseCache,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) callers: CallerRateLimiter,
    pub(crate) admission: Admission,
    pub(crate) metrics: GatewayMetrics,
    pub(crate) stats: GatewayStats,
}

impl GatewayClient {
    /// Per-caller admission gate. Run it before `generate_*`; a rejected caller
    /// must not proceed.
    pub fn admit(&self, caller_id: &str) -> Result<()> {
        let started = Instant::now();
        if self.callers.allow(caller_id) {
            return Ok(());
        }
        self.metrics.record_rate_limited();
        self.metrics.record_error(FailureKind::CallerRateLimited);
        self.stats.record_request(started.elapsed());
        self.stats.record_error();
        info!(caller = caller_id, "caller rejected by rate limiter");
        Err(Error::CallerRateLimited {
            caller: caller_id.to_string(),
        })
    }

    /// Text completion. `model` defaults to the configured text model.
    ///
    /// A query starting with `/no_think` is sent without that prefix and the
    /// answer is reduced with [`concise_answer`](crate::client::concise_answer).
    ///
    /// Without a configured credential this returns the localized
    /// "unavailable" notice as a successful result.
    pub async fn generate_text(
        &self,
        query: &str,
        model: Option<&str>,
        context: &[Message],
    ) -> Result<String> {
        self.generate_text_with_cancel(query, model, context, &CancellationToken::new())
            .await
    }

    pub async fn generate_text_with_cancel(
        &self,
        query: &str,
        model: Option<&str>,
        context: &[Message],
        cancel: &CancellationToken,
    ) -> Result<String> {
        if !self.cfg.has_credential() {
            warn!("no upstream credential configured, returning unavailable notice");
            return Ok(failure::SERVICE_UNCONFIGURED.to_string());
        }
        let started = Instant::now();
        let (concise, query) = split_concise_directive(query);
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.cfg.text_model.as_str());
        let messages = conversation_with_query(context, query);

        let outcome = self.text_inner(model, &messages, cancel).await;
        self.finish(Operation::Text, started, shorten_if(concise, outcome))
    }

    async fn text_inner(
        &self,
        model: &str,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<(String, Served)> {
        self.check_circuit_breaker()?;

        if let Some(text) = self.cache.get(model, messages) {
            self.metrics.record_cache_hit();
            self.stats.record_cache_hit();
            debug!(model, "served from cache");
            return Ok((text, Served::Cache));
        }
        self.metrics.record_cache_miss();
        self.stats.record_cache_miss();

        let request = ChatCompletionRequest::from_messages(
            model,
            messages,
            self.cfg.temperature,
            self.cfg.max_tokens,
        );
        let completion = self.call_upstream(Operation::Text, &request, cancel).await?;
        self.cache.set(model, messages, completion.text.clone());
        Ok((completion.text, Served::Upstream))
    }

    /// Vision completion over a base64 image (bare or as a `data:` URI).
    /// Never cached.
    pub async fn generate_vision(
        &self,
        query: &str,
        image_base64: &str,
        context: &[Message],
    ) -> Result<String> {
        self.generate_vision_with_cancel(query, image_base64, context, &CancellationToken::new())
            .await
    }

    pub async fn generate_vision_with_cancel(
        &self,
        query: &str,
        image_base64: &str,
        context: &[Message],
        cancel: &CancellationToken,
    ) -> Result<String> {
        if !self.cfg.has_credential() {
            warn!("no upstream credential configured, returning unavailable notice");
            return Ok(failure::SERVICE_UNCONFIGURED.to_string());
        }
        let started = Instant::now();
        let (concise, query) = split_concise_directive(query);
        let outcome = self
            .vision_inner(query, image_base64, context, cancel)
            .await;
        self.finish(Operation::Vision, started, shorten_if(concise, outcome))
    }

    async fn vision_inner(
        &self,
        query: &str,
        image_base64: &str,
        context: &[Message],
        cancel: &CancellationToken,
    ) -> Result<(String, Served)> {
        vision::check_image(image_base64)?;
        self.check_circuit_breaker()?;

        let request = vision::vision_request(
            &self.cfg.vision_model,
            context,
            query,
            image_base64,
            self.cfg.temperature,
            self.cfg.max_tokens,
        );
        let completion = self.call_upstream(Operation::Vision, &request, cancel).await?;
        Ok((completion.text, Served::Upstream))
    }

    /// Admission slot, retried transport call, parsing and breaker bookkeeping.
    async fn call_upstream(
        &self,
        op: Operation,
        request: &ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let deadline = tokio::time::Instant::now() + self.cfg.request_timeout();
        let request_id = Uuid::new_v4().to_string();

        let permit = self.admission.acquire(deadline, cancel).await?;
        let sent = self
            .transport
            .send(request, &request_id, deadline, cancel)
            .await;
        drop(permit);

        let outcome = sent.and_then(|reply| {
            if reply.is_success() {
                parse_completion(&reply.body)
            } else {
                Err(Error::upstream(reply.status, reply.body))
            }
        });

        match &outcome {
            Ok(completion) => {
                self.record_success();
                if let Some(usage) = &completion.usage {
                    self.metrics.record_usage(usage);
                }
                debug!(
                    request_id = request_id.as_str(),
                    operation = op.label(),
                    model = request.model.as_str(),
                    "upstream call succeeded"
                );
            }
            Err(e) if e.counts_as_upstream_failure() => {
                match e {
                    Error::Upstream { status, body, .. } => warn!(
                        request_id = request_id.as_str(),
                        operation = op.label(),
                        status,
                        failure = %e.failure_kind(),
                        body = body_excerpt(body, 200),
                        "upstream returned error status"
                    ),
                    Error::Transport { detail, .. } | Error::MalformedResponse { detail } => warn!(
                        request_id = request_id.as_str(),
                        operation = op.label(),
                        failure = %e.failure_kind(),
                        detail = detail.as_str(),
                        "upstream call failed"
                    ),
                    _ => {}
                }
                self.record_failure();
            }
            Err(e) => {
                debug!(
                    request_id = request_id.as_str(),
                    operation = op.label(),
                    failure = %e.failure_kind(),
                    "upstream call abandoned"
                );
            }
        }
        outcome
    }

    fn finish(
        &self,
        op: Operation,
        started: Instant,
        outcome: Result<(String, Served)>,
    ) -> Result<String> {
        let elapsed = started.elapsed();
        self.stats.record_request(elapsed);
        match outcome {
            Ok((text, served)) => {
                self.metrics
                    .observe_request(op.label(), served.label(), elapsed);
                Ok(text)
            }
            Err(e) => {
                let kind = e.failure_kind();
                self.metrics.observe_request(op.label(), kind.label(), elapsed);
                self.metrics.record_error(kind);
                self.stats.record_error();
                if kind.is_admission_rejection() {
                    info!(operation = op.label(), failure = %kind, "call rejected before upstream");
                }
                Err(e)
            }
        }
    }

    /// Fail fast while the breaker is open. Does not change breaker state.
    pub fn check_circuit_breaker(&self) -> Result<()> {
        let res = self.breaker.check();
        self.metrics.set_circuit_open(res.is_err());
        res
    }

    pub fn record_success(&self) {
        self.breaker.record_success();
        self.metrics.set_circuit_open(false);
    }

    pub fn record_failure(&self) {
        self.breaker.record_failure();
        self.metrics.set_circuit_open(self.breaker.is_open());
    }

    /// Live cache entries.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// `"open"` while calls are being rejected, `"closed"` otherwise.
    pub fn circuit_state(&self) -> &'static str {
        self.refresh_circuit_gauge();
        self.breaker.state_label()
    }

    /// The breaker closes on its own once the cool-down passes; keep the gauge in step.
    fn refresh_circuit_gauge(&self) {
        self.metrics.set_circuit_open(self.breaker.is_open());
    }

    /// `"ok"` with a credential configured, `"degraded"` without.
    pub fn api_status(&self) -> &'static str {
        if self.cfg.has_credential() {
            "ok"
        } else {
            "degraded"
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.cache_size(), self.circuit_state())
    }

    /// Snapshot current runtime signals (facts only).
    pub fn signals(&self) -> SignalsSnapshot {
        self.refresh_circuit_gauge();
        SignalsSnapshot {
            inflight: self.admission.snapshot(),
            circuit_breaker: self.breaker.snapshot(),
            tracked_callers: self.callers.len(),
            cache_entries: self.cache_size(),
        }
    }

    /// Drop caller buckets that have fully refilled. Returns how many were dropped.
    pub fn sweep_idle_callers(&self) -> usize {
        let removed = self.callers.sweep_idle();
        if removed > 0 {
            debug!(removed, "swept idle caller buckets");
        }
        removed
    }

    /// Metrics handle. The breaker gauge is brought up to date first.
    pub fn metrics(&self) -> &GatewayMetrics {
        self.refresh_circuit_gauge();
        &self.metrics
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.cfg
    }
}
