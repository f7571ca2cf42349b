//! Status mapping, retries and circuit breaking against a failing upstream.

use super::mock_server::MockServerFixture;
use completion_gateway::failure::{self, FailureKind};
use completion_gateway::{Error, GatewayConfig};

#[tokio::test]
async fn unauthorized_maps_to_auth_message_without_retry() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_status(401, r#"{"error":{"message":"invalid api key sk-test"}}"#, 1)
        .await;
    let client = fixture.client();

    let err = client.generate_text("hola", None, &[]).await.unwrap_err();

    assert_eq!(err.failure_kind(), FailureKind::Authentication);
    assert_eq!(err.to_string(), FailureKind::Authentication.user_message());
    assert!(!err.to_string().contains("sk-test"));
    mock.assert_async().await;
}

#[tokio::test]
async fn too_many_requests_maps_to_traffic_message() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_status(429, r#"{"error":"rate limited"}"#, 1).await;
    let client = fixture.client();

    let err = client.generate_text("hola", None, &[]).await.unwrap_err();

    assert_eq!(err.failure_kind(), FailureKind::UpstreamRateLimited);
    assert_eq!(err.to_string(), FailureKind::UpstreamRateLimited.user_message());
    mock.assert_async().await;
}

#[tokio::test]
async fn forbidden_and_payload_too_large_have_their_own_messages() {
    for (status, kind) in [
        (403, FailureKind::PermissionDenied),
        (413, FailureKind::PayloadTooLarge),
        (418, FailureKind::UpstreamStatus),
    ] {
        let mut fixture = MockServerFixture::new().await;
        let _mock = fixture.mock_status(status, "{}", 1).await;
        let client = fixture.client();

        let err = client.generate_text("hola", None, &[]).await.unwrap_err();
        assert_eq!(err.failure_kind(), kind, "status {status}");
        assert_eq!(err.to_string(), kind.user_message());
    }
}

#[tokio::test]
async fn server_errors_are_retried_until_attempts_run_out() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_status(500, r#"{"error":"internal"}"#, 3).await;
    let client = fixture.client();

    let err = client.generate_text("hola", None, &[]).await.unwrap_err();

    assert!(matches!(err, Error::Upstream { status: 500, .. }));
    assert_eq!(err.to_string(), FailureKind::UpstreamStatus.user_message());
    mock.assert_async().await;
    // One gateway call, one breaker failure, however many attempts it took.
    assert_eq!(client.signals().circuit_breaker.consecutive_failures, 1);
}

#[tokio::test]
async fn persistent_503_maps_to_outage_message() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_status(503, "unavailable", 3).await;
    let client = fixture.client();

    let err = client.generate_text("hola", None, &[]).await.unwrap_err();

    assert_eq!(err.failure_kind(), FailureKind::ServiceUnavailable);
    assert_eq!(err.to_string(), FailureKind::ServiceUnavailable.user_message());
    mock.assert_async().await;
}

#[tokio::test]
async fn malformed_success_body_is_an_error() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_status(200, "<html>gateway</html>", 1).await;
    let client = fixture.client();

    let err = client.generate_text("hola", None, &[]).await.unwrap_err();

    assert!(matches!(err, Error::MalformedResponse { .. }));
    mock.assert_async().await;
    assert_eq!(client.cache_size(), 0);
}

#[tokio::test]
async fn breaker_trips_and_stops_contacting_upstream() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_status(502, "bad gateway", 2).await;
    let client = fixture.client_with(GatewayConfig {
        max_attempts: 1,
        breaker_threshold: 2,
        ..fixture.config()
    });

    for q in ["uno", "dos"] {
        let err = client.generate_text(q, None, &[]).await.unwrap_err();
        assert!(err.counts_as_upstream_failure());
    }
    assert_eq!(client.circuit_state(), "open");

    let err = client.generate_text("tres", None, &[]).await.unwrap_err();
    assert!(matches!(err, Error::CircuitOpen { .. }));
    assert_eq!(err.to_string(), failure::CIRCUIT_OPEN);

    mock.assert_async().await;
    let stats = client.stats();
    assert_eq!(stats.error_count, 3);
    assert_eq!(stats.circuit_state, "open");
    let metrics = client.metrics().render().unwrap();
    assert!(metrics.contains("gateway_errors_total{error_type=\"circuit_open\"} 1"));
    assert!(metrics.contains("gateway_errors_total{error_type=\"upstream_status\"} 2"));
}

#[tokio::test]
async fn missing_credential_never_contacts_upstream() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_completion("nunca", 0).await;
    let client = fixture.client_with(GatewayConfig {
        api_key: None,
        ..fixture.config()
    });

    let answer = client.generate_text("hola", None, &[]).await.unwrap();

    assert_eq!(answer, failure::SERVICE_UNCONFIGURED);
    assert_eq!(client.api_status(), "degraded");
    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_upstream_yields_generic_message() {
    let client = completion_gateway::GatewayClientBuilder::from_config(GatewayConfig {
        endpoint_url: "http://127.0.0.1:1/v1/chat/completions".into(),
        api_key: Some("sk-test".into()),
        max_attempts: 2,
        retry_min_delay_ms: 5,
        retry_max_delay_ms: 10,
        request_timeout_secs: 5,
        ..GatewayConfig::default()
    })
    .build()
    .unwrap();

    let err = client.generate_text("hola", None, &[]).await.unwrap_err();

    assert!(matches!(err, Error::Transport { .. }));
    assert_eq!(err.to_string(), FailureKind::Network.user_message());
    assert_eq!(client.signals().circuit_breaker.consecutive_failures, 1);
}
