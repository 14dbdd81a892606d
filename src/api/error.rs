// SPDX-License-Identifier: MIT
//! Error taxonomy for the constelia Web API.
//!
//! Classification happens exactly once, at the transport boundary in the
//! gateway. Higher layers branch on the variant, never on raw text — except
//! for the two prose checks the protocol itself forces (stale-handshake
//! wording, handshake-conflict wording), which live in `auth` against the
//! named constants below.

use thiserror::Error;

/// Fixed message the API returns for a rejected license key.
pub const INVALID_KEY_MSG: &str = "invalid license key";

/// Fixed sentence paired with HTTP 401 when the requester fingerprint no
/// longer matches the one the session was issued for.
pub const HASH_MISMATCH_MSG: &str =
    "this license key cannot authorize due to the hash not matching the current Web API requester.";

/// Fixed wording when a handshake already exists for the key.
pub const HANDSHAKE_EXISTS_MSG: &str = "handshake already exists";

/// Fixed sentence when the panel session has lapsed server-side.
pub const NOT_LOGGED_IN_MSG: &str = "You are not logged into the Member's Panel";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The supplied license key was rejected. Terminal: never retried, the
    /// client always returns to the unauthenticated state and clears any
    /// stored handshake token.
    #[error("invalid license key")]
    InvalidLicenseKey,

    /// HTTP 401 carrying the fixed hash-mismatch sentence. Terminal for the
    /// current attempt; routes to a dedicated explanatory UI state.
    #[error("license key cannot authorize: requester hash does not match")]
    HashMismatch,

    /// Transport failure from a `file://` origin. Informational only — the
    /// environment cannot reach the API cross-origin; no state is mutated.
    #[error("request blocked: the API is not reachable from a file:// origin")]
    CorsOnFileProtocol,

    /// The API refused to create a handshake because one already exists.
    /// Recoverable: triggers one wipe-and-regenerate attempt.
    #[error("a handshake already exists for this license key")]
    HandshakeConflict,

    /// Application-level error envelope (`{code, message}` with code ≠ 200).
    #[error("{message}")]
    Api { message: String },

    /// The body was neither JSON nor a `<pre>`-wrapped JSON document. The
    /// raw text is carried verbatim: some failure modes are only
    /// diagnosable from it.
    #[error("unrecognized API response: {0}")]
    RawResponse(String),

    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// Terminal errors end the current attempt unconditionally — no retry,
    /// no fallback bootstrap.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidLicenseKey | Self::HashMismatch)
    }

    /// The human-readable message carried by this error.
    pub fn message(&self) -> String {
        match self {
            Self::Api { message } => message.clone(),
            Self::RawResponse(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// Upgrade a normalized error to its classified form. Applied once, in the
/// gateway, right after normalization.
///
/// Priority order:
/// 1. message exactly equals the fixed invalid-key string
/// 2. HTTP 401 and the message carries the fixed hash-mismatch sentence
/// 3. transport failure from a `file://` origin that looks like a
///    cross-origin block
/// 4. anything else passes through unchanged
pub(crate) fn classify(status: u16, err: ApiError, file_origin: bool) -> ApiError {
    match err {
        ApiError::Api { ref message } | ApiError::RawResponse(ref message) => {
            if message.trim() == INVALID_KEY_MSG {
                ApiError::InvalidLicenseKey
            } else if status == 401 && message.contains(HASH_MISMATCH_MSG) {
                ApiError::HashMismatch
            } else {
                err
            }
        }
        ApiError::Network(ref e) => {
            if file_origin && (e.is_connect() || e.is_request() || e.is_timeout()) {
                ApiError::CorsOnFileProtocol
            } else {
                err
            }
        }
        other => other,
    }
}
