//! Completion parsing and reasoning-markup removal.

use crate::types::{ChatCompletionResponse, Usage};
use crate::{Error, Result};

const REASONING_OPEN: &str = "<think>";
const REASONING_CLOSE: &str = "</think>";

/// Cleaned completion text plus the token usage the upstream reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Parse a 2xx chat-completion body into cleaned text.
///
/// Fails on invalid JSON, an empty `choices` array, or a first choice without content.
pub fn parse_completion(body: &str) -> Result<Completion> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| Error::malformed(e.to_string()))?;

    let first = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::malformed("response has no choices"))?;
    let content = first
        .message
        .content
        .ok_or_else(|| Error::malformed("first choice has no content"))?;

    Ok(Completion {
        text: strip_reasoning(&content),
        usage: parsed.usage,
    })
}

/// Remove every `<think>…</think>` span, then trim.
///
/// Balanced nested spans go as a unit. When the tags do not balance, each
/// opening tag is paired with the next closing tag instead. An opening tag
/// with no closing tag after it leaves the rest of the text untouched, and a
/// closing tag with no opener is kept.
pub fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied_from = 0;
    let mut depth = 0usize;
    let mut pos = 0;

    while let Some(off) = text[pos..].find('<') {
        let at = pos + off;
        let rest = &text[at..];
        if rest.starts_with(REASONING_OPEN) {
            if depth == 0 {
                out.push_str(&text[copied_from..at]);
            }
            depth += 1;
            pos = at + REASONING_OPEN.len();
        } else if depth > 0 && rest.starts_with(REASONING_CLOSE) {
            depth -= 1;
            pos = at + REASONING_CLOSE.len();
            if depth == 0 {
                copied_from = pos;
            }
        } else {
            pos = at + 1;
        }
    }

    if depth > 0 {
        return strip_pairwise(text);
    }
    out.push_str(&text[copied_from..]);
    out.trim().to_string()
}

/// First opening tag through the next closing tag, repeated.
fn strip_pairwise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(off) = text[pos..].find(REASONING_OPEN) {
        let open = pos + off;
        let after_open = open + REASONING_OPEN.len();
        match text[after_open..].find(REASONING_CLOSE) {
            Some(close_off) => {
                out.push_str(&text[pos..open]);
                pos = after_open + close_off + REASONING_CLOSE.len();
            }
            None => break,
        }
    }
    out.push_str(&text[pos..]);
    out.trim().to_string()
}

/// Query prefix asking for a short, data-only answer.
pub const CONCISE_DIRECTIVE: &str = "/no_think";

/// Lines at or past this many bytes are never picked as the concise answer.
const CONCISE_MAX_LINE: usize = 1000;

/// Split a leading [`CONCISE_DIRECTIVE`] (any case) off a query.
///
/// Returns whether the directive was present and the query without it.
pub fn split_concise_directive(query: &str) -> (bool, &str) {
    match query.get(..CONCISE_DIRECTIVE.len()) {
        Some(head) if head.eq_ignore_ascii_case(CONCISE_DIRECTIVE) => {
            (true, query[CONCISE_DIRECTIVE.len()..].trim())
        }
        _ => (false, query),
    }
}

/// Shortest line carrying technical content (digits, `kg`, `m²`, `mm`) and
/// longer than 10 bytes. Falls back to the whole completion.
pub fn concise_answer(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| line.len() > 10 && line.len() < CONCISE_MAX_LINE)
        .filter(|line| is_technical(line))
        .min_by_key(|line| line.len())
        .unwrap_or(text)
        .to_string()
}

fn is_technical(line: &str) -> bool {
    line.bytes().any(|b| b.is_ascii_digit())
        || line.contains("kg")
        || line.contains("m²")
        || line.contains("mm")
}

/// At most `max` characters of an upstream body, for logs.
pub(crate) fn body_excerpt(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
