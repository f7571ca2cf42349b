//! Image intake for vision requests.

use crate::types::{
    ChatCompletionRequest, ContentPart, ImageUrl, Message, MessageRole, WireContent, WireMessage,
};
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Largest accepted image, before encoding.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Base64-encode raw image bytes, rejecting anything over [`MAX_IMAGE_BYTES`].
pub fn encode_image(bytes: &[u8]) -> Result<String> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(Error::ImageTooLarge {
            size: bytes.len(),
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(STANDARD.encode(bytes))
}

/// Base64 payload of an image given bare or as a `data:` URI.
pub(crate) fn image_payload(image: &str) -> &str {
    let image = image.trim();
    if image.starts_with("data:") {
        match image.split_once(',') {
            Some((_, payload)) => payload.trim(),
            None => "",
        }
    } else {
        image
    }
}

/// Decoded size of an image, without decoding it. A `data:` header is not counted.
pub(crate) fn decoded_len(image: &str) -> usize {
    let trimmed = image_payload(image).trim_end_matches('=');
    trimmed.len() * 3 / 4
}

/// Presence and size checks done before any upstream contact.
pub(crate) fn check_image(image: &str) -> Result<()> {
    if image_payload(image).is_empty() {
        return Err(Error::ImageMissing);
    }
    let size = decoded_len(image);
    if size > MAX_IMAGE_BYTES {
        return Err(Error::ImageTooLarge {
            size,
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// Media type guessed from the base64 signature of common formats. Defaults to JPEG.
pub fn sniff_media_type(b64: &str) -> &'static str {
    if b64.starts_with("iVBOR") {
        "image/png"
    } else if b64.starts_with("R0lGOD") {
        "image/gif"
    } else if b64.starts_with("UklGR") {
        "image/webp"
    } else {
        // "/9j/" and anything unrecognised
        "image/jpeg"
    }
}

/// Context messages followed by one user message carrying the query and the image.
///
/// `image` may be bare base64 or already a `data:` URI.
pub(crate) fn vision_request(
    model: &str,
    context: &[Message],
    query: &str,
    image: &str,
    temperature: f64,
    max_tokens: u32,
) -> ChatCompletionRequest {
    let image_part = if image.starts_with("data:") {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.to_string(),
            },
        }
    } else {
        ContentPart::image_base64(sniff_media_type(image), image)
    };

    let mut req = ChatCompletionRequest::from_messages(model, context, temperature, max_tokens);
    req.messages.push(WireMessage {
        role: MessageRole::User,
        content: WireContent::Parts(vec![ContentPart::text(query), image_part]),
    });
    req
}
