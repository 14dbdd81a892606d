// SPDX-License-Identifier: MIT
//! Gateway to the constelia Web API.
//!
//! One fixed endpoint, command-based addressing: every request is
//! `{base}?key={apiKey}&cmd={command}` plus per-command parameters. GET for
//! everything except payloads too large for a query string (script source,
//! configuration text), which go out as multipart POST bodies.
//!
//! All normalization and error classification happens here, once, at the
//! transport boundary. Diagnostic output is redacted before it is written.

pub mod envelope;
pub mod error;

pub use envelope::{parse_api_response, ApiEnvelope, EnvelopeKind};
pub use error::ApiError;

use std::sync::RwLock;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::redact::{redact, scrub_key_params};
use error::{classify, HASH_MISMATCH_MSG, INVALID_KEY_MSG};

/// Cap on response body length in debug logs.
const LOG_BODY_MAX: usize = 600;

pub struct ApiGateway {
    http: reqwest::Client,
    base_url: Url,
    /// True when the configured origin is a `file://` URL — transport
    /// failures then classify as cross-origin blocks.
    file_origin: bool,
    /// The live license key. Written by the auth controller only.
    key: RwLock<Option<String>>,
}

impl ApiGateway {
    pub fn new(base_url: &str, origin: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url,
            file_origin: origin.starts_with("file:"),
            key: RwLock::new(None),
        })
    }

    /// Install the license key used for subsequent requests.
    pub fn set_key(&self, key: &str) {
        *self.key.write().expect("key lock poisoned") = Some(key.to_string());
    }

    /// Drop the license key. Requests sent afterwards carry no `key` param.
    pub fn clear_key(&self) {
        *self.key.write().expect("key lock poisoned") = None;
    }

    pub fn current_key(&self) -> Option<String> {
        self.key.read().expect("key lock poisoned").clone()
    }

    /// GET `{base}?key=..&cmd={cmd}&..params`.
    ///
    /// `None` values are omitted; `Some("")` is retained as an explicit
    /// present-but-blank flag (the API treats bare parameters as switches).
    pub async fn call(
        &self,
        cmd: &str,
        params: &[(&str, Option<&str>)],
    ) -> Result<ApiEnvelope, ApiError> {
        self.dispatch(cmd, params, None).await
    }

    /// Same addressing as [`call`], but submits `body` as multipart form
    /// data. Used for payloads too large for a query string.
    ///
    /// [`call`]: Self::call
    pub async fn call_with_body(
        &self,
        cmd: &str,
        params: &[(&str, Option<&str>)],
        body: &[(&str, &str)],
    ) -> Result<ApiEnvelope, ApiError> {
        self.dispatch(cmd, params, Some(body)).await
    }

    async fn dispatch(
        &self,
        cmd: &str,
        params: &[(&str, Option<&str>)],
        body: Option<&[(&str, &str)]>,
    ) -> Result<ApiEnvelope, ApiError> {
        let key = self.current_key();
        let url = self.build_url(cmd, params, key.as_deref());
        let redacted_url = self.redacted(url.as_str(), key.as_deref());
        debug!(url = %redacted_url, post = body.is_some(), "api request");

        let request = match body {
            None => self.http.get(url),
            Some(fields) => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name.to_string(), value.to_string());
                }
                self.http.post(url).multipart(form)
            }
        };

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                return Err(classify(0, ApiError::Network(e), self.file_origin));
            }
        };

        let status = response.status().as_u16();
        let raw = response
            .text()
            .await
            .map_err(|e| classify(status, ApiError::Network(e), self.file_origin))?;

        debug!(
            cmd,
            status,
            body = %self.redacted(truncate(&raw), key.as_deref()),
            "api response"
        );

        let env = parse_api_response(status, &raw)
            .map_err(|e| classify(status, e, self.file_origin))?;
        self.reclassify_ok(env)
    }

    /// The fixed invalid-key and hash-mismatch messages occasionally arrive
    /// inside an HTTP 200 success shape; inspect normalized payloads too.
    /// Handshake envelopes stay verbatim — the auth layer owns them.
    fn reclassify_ok(&self, env: ApiEnvelope) -> Result<ApiEnvelope, ApiError> {
        if env.kind == EnvelopeKind::Handshake {
            return Ok(env);
        }
        if let Some(message) = env.message_str() {
            if message.trim() == INVALID_KEY_MSG {
                return Err(ApiError::InvalidLicenseKey);
            }
            if env.status == 401 && message.contains(HASH_MISMATCH_MSG) {
                return Err(ApiError::HashMismatch);
            }
        }
        Ok(env)
    }

    fn build_url(&self, cmd: &str, params: &[(&str, Option<&str>)], key: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(key) = key {
                query.append_pair("key", key);
            }
            query.append_pair("cmd", cmd);
            for (name, value) in params {
                if let Some(value) = value {
                    query.append_pair(name, value);
                }
            }
        }
        url
    }

    fn redacted(&self, text: &str, key: Option<&str>) -> String {
        let scrubbed = scrub_key_params(text);
        match key {
            Some(key) => redact(&scrubbed, key),
            None => scrubbed,
        }
    }
}

fn truncate(raw: &str) -> &str {
    match raw.char_indices().nth(LOG_BODY_MAX) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(origin: &str) -> ApiGateway {
        ApiGateway::new(
            "https://constelia.ai/api.php",
            origin,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn url_omits_none_and_keeps_blank_params() {
        let gw = gateway("https://constelia.ai/dashboard/");
        gw.set_key("SECRET-KEY");
        let url = gw.build_url(
            "getMember",
            &[
                ("scripts", Some("")),
                ("bans", None),
                ("beautify", Some("true")),
            ],
            gw.current_key().as_deref(),
        );
        let q = url.query().unwrap();
        assert!(q.contains("key=SECRET-KEY"));
        assert!(q.contains("cmd=getMember"));
        assert!(q.contains("scripts="), "blank param must be retained");
        assert!(!q.contains("bans"), "None param must be omitted");
        assert!(q.contains("beautify=true"));
    }

    #[test]
    fn url_without_key_has_no_key_param() {
        let gw = gateway("https://constelia.ai/dashboard/");
        let url = gw.build_url("getHandshake", &[("token", Some("tok"))], None);
        assert!(!url.query().unwrap().contains("key="));
    }

    #[test]
    fn redacted_urls_never_carry_the_key() {
        let gw = gateway("https://constelia.ai/dashboard/");
        gw.set_key("ULTRA-SECRET-123");
        let url = gw.build_url("getMember", &[], gw.current_key().as_deref());
        let logged = gw.redacted(url.as_str(), gw.current_key().as_deref());
        assert!(!logged.contains("ULTRA-SECRET-123"));
    }
}
