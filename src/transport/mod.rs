//! 传输层模块：向上游聊天补全服务发送请求，并提供有界重试。
//!
//! # Transport Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ChatTransport`] | One POST to the chat-completion endpoint, no policy |
//! | [`HttpTransport`] | `reqwest` implementation with bearer auth |
//! | [`RetryingTransport`] | Bounded retries with capped exponential backoff |
//!
//! A received HTTP response is never an error at this layer; status handling
//! belongs to the caller. Only failures to get a response at all surface as
//! [`Error::Transport`](crate::Error::Transport).

pub mod http;
pub mod retry;

pub use http::HttpTransport;
pub use retry::{RetryConfig, RetryingTransport};

use crate::types::ChatCompletionRequest;
use crate::Result;
use async_trait::async_trait;

/// Raw upstream answer: status code plus the unparsed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_chat(
        &self,
        request: &ChatCompletionRequest,
        request_id: &str,
    ) -> Result<UpstreamReply>;
}
