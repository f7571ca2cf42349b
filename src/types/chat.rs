//! Upstream chat-completion wire format (OpenAI-compatible).

use super::message::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// Request body posted to the chat-completion endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Outbound message: plain text, or a list of parts for vision requests.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: MessageRole,
    pub content: WireContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Inline image as a `data:` URI.
    pub fn image_base64(media_type: &str, data: &str) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", media_type, data),
            },
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        WireMessage {
            role: m.role,
            content: WireContent::Text(m.content.clone()),
        }
    }
}

impl ChatCompletionRequest {
    pub fn from_messages(
        model: impl Into<String>,
        messages: &[Message],
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature,
            max_tokens,
        }
    }
}

/// Response body of a successful chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_request_shape() {
        let req = ChatCompletionRequest::from_messages(
            "qwen-3-32b",
            &[Message::system("s"), Message::user("hola")],
            0.7,
            1000,
        );
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "model": "qwen-3-32b",
                "messages": [
                    {"role": "system", "content": "s"},
                    {"role": "user", "content": "hola"}
                ],
                "temperature": 0.7,
                "max_tokens": 1000
            })
        );
    }

    #[test]
    fn vision_parts_shape() {
        let msg = WireMessage {
            role: MessageRole::User,
            content: WireContent::Parts(vec![
                ContentPart::text("¿qué ves?"),
                ContentPart::image_base64("image/png", "iVBOR"),
            ]),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["content"][0], json!({"type": "text", "text": "¿qué ves?"}));
        assert_eq!(
            v["content"][1],
            json!({"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBOR"}})
        );
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let resp: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hi"}}]}"#).unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("hi"));
        assert!(resp.usage.is_none());
    }
}
