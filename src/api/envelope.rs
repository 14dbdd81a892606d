// SPDX-License-Identifier: MIT
//! Response normalization for the constelia Web API.
//!
//! The API answers in three shapes: a `{status, message}` handshake-protocol
//! envelope, a `{code, message}` application error (code ≠ 200), or a bare
//! JSON payload — any of which may arrive wrapped in an HTML `<pre>` block.
//! [`parse_api_response`] reduces all of them to a single [`ApiEnvelope`] or
//! a classified error, without dropping the status code or message text.

use serde_json::Value;

use super::error::ApiError;

/// Which protocol shape the response had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// `{status, message}` — the handshake protocol envelope, kept verbatim
    /// so the auth layer can branch on the embedded `status`.
    Handshake,
    /// Everything else that parsed successfully.
    Success,
}

/// Normalized result of one API round trip.
#[derive(Debug, Clone)]
pub struct ApiEnvelope {
    pub kind: EnvelopeKind,
    /// Decoded payload: the verbatim object for handshake envelopes, the
    /// `message` field when one is present, otherwise the whole value.
    pub payload: Value,
    /// HTTP status, preserved so a 401 hash mismatch stays distinguishable.
    pub status: u16,
}

impl ApiEnvelope {
    /// The embedded handshake `status` field, when this is a handshake envelope.
    pub fn handshake_status(&self) -> Option<i64> {
        match self.kind {
            EnvelopeKind::Handshake => self.payload.get("status").and_then(Value::as_i64),
            EnvelopeKind::Success => None,
        }
    }

    /// The textual message of this envelope, whichever shape carried it.
    pub fn message_str(&self) -> Option<&str> {
        match self.payload {
            Value::String(ref s) => Some(s),
            ref v => v.get("message").and_then(Value::as_str),
        }
    }
}

/// Normalize a raw response body against the HTTP status that carried it.
///
/// Order of attempts:
/// 1. strict JSON parse;
/// 2. a parsed object with a `status` field is the handshake envelope,
///    returned verbatim;
/// 3. a parsed object with `code` ≠ 200 is an application error carrying
///    `message`;
/// 4. otherwise the payload is `message` if present, else the whole value;
/// 5. on parse failure, the inner text of an HTML `<pre>` wrapper is put
///    through steps 1–4;
/// 6. failing that, the entire raw body becomes a [`ApiError::RawResponse`] —
///    some failure modes are only diagnosable from the raw text.
pub fn parse_api_response(status: u16, raw: &str) -> Result<ApiEnvelope, ApiError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => interpret(status, value),
        Err(_) => match extract_pre_block(raw) {
            Some(inner) => match serde_json::from_str::<Value>(inner.trim()) {
                Ok(value) => interpret(status, value),
                Err(_) => Err(ApiError::RawResponse(raw.to_string())),
            },
            None => Err(ApiError::RawResponse(raw.to_string())),
        },
    }
}

fn interpret(status: u16, value: Value) -> Result<ApiEnvelope, ApiError> {
    if value.get("status").is_some() {
        return Ok(ApiEnvelope {
            kind: EnvelopeKind::Handshake,
            payload: value,
            status,
        });
    }

    if let Some(code) = value.get("code").and_then(Value::as_i64) {
        if code != 200 {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("the API returned an error without a message")
                .to_string();
            return Err(ApiError::Api { message });
        }
    }

    let payload = match value.get("message") {
        Some(message) => message.clone(),
        None => value,
    };
    Ok(ApiEnvelope {
        kind: EnvelopeKind::Success,
        payload,
        status,
    })
}

/// Inner text of the first `<pre>...</pre>` block, if any.
fn extract_pre_block(raw: &str) -> Option<&str> {
    let start = raw.find("<pre>")? + "<pre>".len();
    let end = raw[start..].find("</pre>")? + start;
    Some(&raw[start..end])
}
