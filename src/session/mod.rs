// SPDX-License-Identifier: MIT
//! Session state and the environment-appropriate handshake token store.
//!
//! The handshake token is the only credential that survives restarts. Where
//! it lives depends on the environment the dashboard is served from: a real
//! http/https host gets a cookie record (a server can eventually validate it
//! server-side), everything else falls back to the local key-value store.

pub mod store;

use url::Url;

/// Whether the configured origin counts as a real served deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Served over http/https from a real host — cookie persistence applies.
    Online,
    /// `file://`, or a bare localhost serve with no explicit port — local
    /// store only.
    Offline,
}

impl Environment {
    /// Classify an origin URL.
    ///
    /// Online requires an http/https scheme and a real host. `localhost` and
    /// `127.0.0.1` without an explicit port are treated as a local
    /// static-file serve, i.e. Offline; the same hosts with an explicit port
    /// are a genuine dev server and count as Online.
    pub fn classify(origin: &str) -> Self {
        let url = match Url::parse(origin) {
            Ok(u) => u,
            Err(_) => return Self::Offline,
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Self::Offline;
        }
        let host = match url.host_str() {
            Some(h) => h,
            None => return Self::Offline,
        };
        let loopback = host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1";
        if loopback && url.port().is_none() {
            return Self::Offline;
        }
        Self::Online
    }
}

/// The live authentication material for this browser-context-equivalent.
/// Exactly one session exists at a time; it is owned by the application
/// state and written only by the auth controller.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// The bearer credential accepted by the API. Never logged in full.
    pub api_key: Option<String>,
    /// Longer-lived opaque token exchangeable for the key.
    pub handshake_token: Option<String>,
}

impl Session {
    pub fn clear(&mut self) {
        self.api_key = None;
        self.handshake_token = None;
    }
}
