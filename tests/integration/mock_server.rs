//! Mock HTTP server setup for integration tests

use completion_gateway::{GatewayClient, GatewayClientBuilder, GatewayConfig};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

pub const CHAT_PATH: &str = "/v1/chat/completions";
pub const TEST_KEY: &str = "sk-test";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub endpoint: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let endpoint = format!("{}{}", server.url(), CHAT_PATH);
        Self { server, endpoint }
    }

    /// Gateway config pointed at the mock server, with short retry delays.
    pub fn config(&self) -> GatewayConfig {
        GatewayConfig {
            endpoint_url: self.endpoint.clone(),
            api_key: Some(TEST_KEY.to_string()),
            retry_min_delay_ms: 10,
            retry_max_delay_ms: 40,
            request_timeout_secs: 5,
            ..GatewayConfig::default()
        }
    }

    pub fn client(&self) -> GatewayClient {
        self.client_with(self.config())
    }

    pub fn client_with(&self, config: GatewayConfig) -> GatewayClient {
        GatewayClientBuilder::from_config(config)
            .build()
            .expect("gateway should build")
    }

    /// Successful completion answered exactly `hits` times.
    pub async fn mock_completion(&mut self, content: &str, hits: usize) -> Mock {
        self.server
            .mock("POST", CHAT_PATH)
            .match_header("authorization", format!("Bearer {}", TEST_KEY).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(content))
            .expect(hits)
            .create_async()
            .await
    }

    /// Successful completion, only for requests whose body contains `partial`.
    pub async fn mock_completion_matching(
        &mut self,
        partial: Matcher,
        content: &str,
        hits: usize,
    ) -> Mock {
        self.server
            .mock("POST", CHAT_PATH)
            .match_body(partial)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(content))
            .expect(hits)
            .create_async()
            .await
    }

    /// Create a mock for an error response
    pub async fn mock_status(&mut self, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("POST", CHAT_PATH)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}

pub fn completion_body(content: &str) -> String {
    json!({
        "id": "chatcmpl-test",
        "model": "qwen-3-32b",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 21, "completion_tokens": 9, "total_tokens": 30}
    })
    .to_string()
}
