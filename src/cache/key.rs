//! Request fingerprinting.

use crate::types::Message;
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Serialize)]
struct Canonical<'a> {
    model: &'a str,
    messages: &'a [Message],
}

/// Deterministic cache key for a (model, ordered messages) pair.
///
/// The canonical JSON form is hashed with SHA-256. Should serialization ever
/// fail, the key degrades to a plain concatenation of the model and every
/// role/content pair, which is still deterministic.
pub fn fingerprint(model: &str, messages: &[Message]) -> String {
    match serde_json::to_vec(&Canonical { model, messages }) {
        Ok(canonical) => {
            let mut hasher = Sha256::new();
            hasher.update(&canonical);
            hasher
                .finalize()
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect()
        }
        Err(e) => {
            tracing::debug!(error = %e, "fingerprint serialization failed, using concatenated key");
            concatenated_key(model, messages)
        }
    }
}

fn concatenated_key(model: &str, messages: &[Message]) -> String {
    let mut key = String::from(model);
    for m in messages {
        key.push(':');
        key.push_str(m.role.as_str());
        key.push(':');
        key.push_str(&m.content);
    }
    key
}
