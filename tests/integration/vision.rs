//! Vision completions.

use super::mock_server::MockServerFixture;
use completion_gateway::client::encode_image;
use completion_gateway::Message;
use mockito::Matcher;

const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[tokio::test]
async fn vision_sends_data_uri_and_uses_vision_model() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_completion_matching(
            Matcher::AllOf(vec![
                Matcher::Regex(r#""model":"qwen-2\.5-vision""#.to_string()),
                Matcher::Regex(r#""type":"image_url""#.to_string()),
                Matcher::Regex(r#"data:image/png;base64,"#.to_string()),
            ]),
            "<think>veo un plano</think>Un plano estructural.",
            1,
        )
        .await;
    let client = fixture.client();
    let image = encode_image(&PNG_HEADER).unwrap();

    let answer = client
        .generate_vision("¿Qué muestra la imagen?", &image, &[Message::system("Eres ingeniero.")])
        .await
        .unwrap();

    assert_eq!(answer, "Un plano estructural.");
    mock.assert_async().await;
}

#[tokio::test]
async fn vision_calls_are_never_cached() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_completion("Una foto.", 2).await;
    let client = fixture.client();
    let image = encode_image(&PNG_HEADER).unwrap();

    for _ in 0..2 {
        client.generate_vision("describe", &image, &[]).await.unwrap();
    }

    mock.assert_async().await;
    assert_eq!(client.cache_size(), 0);
    let metrics = client.metrics().render().unwrap();
    assert!(metrics.contains("gateway_cache_misses_total 0"));
}
