use super::{ChatTransport, UpstreamReply};
use crate::error::ErrorContext;
use crate::failure::FailureKind;
use crate::types::ChatCompletionRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// `timeout` bounds a single attempt; the overall call deadline is enforced by the caller.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    "failed to build HTTP client",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("http_transport"),
                )
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(e: &reqwest::Error) -> FailureKind {
        if e.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Network
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post_chat(
        &self,
        request: &ChatCompletionRequest,
        request_id: &str,
    ) -> Result<UpstreamReply> {
        let mut req = self
            .client
            .post(&self.endpoint)
            .json(request)
            .header("x-request-id", request_id);

        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::transport(Self::classify(&e), e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::transport(Self::classify(&e), e.to_string()))?;

        debug!(request_id, status, bytes = body.len(), "upstream responded");
        Ok(UpstreamReply { status, body })
    }
}
