//! Text completions: parsing, reasoning removal and caching.

use super::mock_server::MockServerFixture;
use completion_gateway::Message;
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn completion_text_is_parsed_and_cleaned() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_completion(
            "<think>El usuario pregunta por la norma.</think>\n\nLa NSR-10 es el reglamento sismo resistente.",
            1,
        )
        .await;
    let client = fixture.client();

    let answer = client
        .generate_text("¿Qué es la NSR-10?", None, &[])
        .await
        .unwrap();

    assert_eq!(answer, "La NSR-10 es el reglamento sismo resistente.");
    mock.assert_async().await;
}

#[tokio::test]
async fn request_carries_model_context_and_limits() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_completion_matching(
            Matcher::PartialJson(json!({
                "model": "llama-3.3-70b",
                "max_tokens": 1000,
                "messages": [
                    {"role": "system", "content": "Responde en español."},
                    {"role": "assistant", "content": "Hola."},
                    {"role": "user", "content": "¿Cuánto cemento lleva?"}
                ]
            })),
            "Depende de la mezcla.",
            1,
        )
        .await;
    let client = fixture.client();
    let context = vec![Message::system("Responde en español."), Message::assistant("Hola.")];

    let answer = client
        .generate_text("¿Cuánto cemento lleva?", Some("llama-3.3-70b"), &context)
        .await
        .unwrap();

    assert_eq!(answer, "Depende de la mezcla.");
    mock.assert_async().await;
}

#[tokio::test]
async fn identical_requests_are_served_from_cache() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_completion("Cacheable", 1).await;
    let client = fixture.client();

    for _ in 0..3 {
        let answer = client.generate_text("explica el APU", None, &[]).await.unwrap();
        assert_eq!(answer, "Cacheable");
    }

    mock.assert_async().await;
    let stats = client.stats();
    assert_eq!(stats.cache_size, 1);
    assert_eq!(stats.request_count, 3);
    let metrics = client.metrics().render().unwrap();
    assert!(metrics.contains("gateway_cache_hits_total 2"));
    assert!(metrics.contains("gateway_cache_misses_total 1"));
}

#[tokio::test]
async fn time_sensitive_queries_always_reach_upstream() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_completion("Fresco", 2).await;
    let client = fixture.client();

    for _ in 0..2 {
        client
            .generate_text("What changed today on site?", None, &[])
            .await
            .unwrap();
    }

    mock.assert_async().await;
    assert_eq!(client.cache_size(), 0);
}

#[tokio::test]
async fn different_models_do_not_share_cache_entries() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_completion("Respuesta", 2).await;
    let client = fixture.client();

    client.generate_text("q", Some("model-a"), &[]).await.unwrap();
    client.generate_text("q", Some("model-b"), &[]).await.unwrap();

    mock.assert_async().await;
    assert_eq!(client.cache_size(), 2);
}
