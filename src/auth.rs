// SPDX-License-Identifier: MIT
//! Authentication controller.
//!
//! Owns the login, handshake, and recovery flows. Two hard invariants:
//!
//! 1. **Probe before commit.** A license key must pass the `getMember`
//!    verification probe before any presenter update or state write shows a
//!    connected session.
//! 2. **The stored handshake token is always either valid or absent.** Every
//!    path that sees the server reject the token deletes it before returning,
//!    so the next attempt never races against stale state.
//!
//! The remote protocol has no machine-readable codes for handshake expiry or
//! conflict — only prose. The two substring checks below are the intentional,
//! narrow exceptions to "never match raw text above the gateway"; the exact
//! wording lives in `api::error` as named constants.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::error::{HANDSHAKE_EXISTS_MSG, NOT_LOGGED_IN_MSG};
use crate::api::{ApiEnvelope, ApiError};
use crate::model::MemberSnapshot;
use crate::ops::PanelClient;
use crate::session::store::SessionStore;
use crate::state::AppState;
use crate::ui::{MessageLevel, Presenter};

/// Wording that marks a stored handshake as dead during the silent startup
/// exchange. Case-insensitive substring match, per the upstream protocol.
const STALE_HANDSHAKE_WORDS: [&str; 6] =
    ["expired", "invalid", "handshake", "encoding", "forum", "session"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    LoggedOut,
    Authenticating,
    HashMismatch,
    RecoveryPending,
    LoggedIn,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LoggedOut => "logged_out",
            Self::Authenticating => "authenticating",
            Self::HashMismatch => "hash_mismatch",
            Self::RecoveryPending => "recovery_pending",
            Self::LoggedIn => "logged_in",
        };
        f.write_str(s)
    }
}

pub struct AuthController {
    client: PanelClient,
    store: Arc<SessionStore>,
    state: Arc<AppState>,
    presenter: Arc<dyn Presenter>,
}

impl AuthController {
    pub fn new(
        client: PanelClient,
        store: Arc<SessionStore>,
        state: Arc<AppState>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            client,
            store,
            state,
            presenter,
        }
    }

    /// Log in with a freshly supplied license key.
    ///
    /// With `remember`, a handshake is created and persisted once the probe
    /// has passed; a terminal handshake failure fails the whole attempt.
    pub async fn login(&self, license_key: &str, remember: bool) -> Result<(), ApiError> {
        self.enter_authenticating().await;
        self.client.gateway().set_key(license_key);

        let member = match self.client.probe_member().await {
            Ok(member) => member,
            Err(e) => return Err(self.fail_attempt(e).await),
        };

        let token = if remember {
            match self.establish_handshake().await {
                Ok(token) => Some(token),
                Err(e) => return Err(self.fail_attempt(e).await),
            }
        } else {
            None
        };

        self.commit(license_key.to_string(), token, member).await;
        Ok(())
    }

    /// Silent auto-login from a stored handshake token at startup.
    ///
    /// Returns `Ok(true)` when a session was restored. `Ok(false)` means
    /// there was nothing to restore — no token, or a dead token that has
    /// been deleted and routed to the inline recovery prompt.
    pub async fn resume(&self) -> Result<bool, ApiError> {
        let Some(token) = self.store.load() else {
            debug!("no stored handshake token");
            return Ok(false);
        };

        self.enter_authenticating().await;

        let key = match self.redeem_handshake(&token).await {
            Ok(key) => key,
            Err(e) => {
                if stale_handshake_wording(&e.message()) {
                    info!("stored handshake rejected ({}) — prompting recovery", e);
                    self.store.delete();
                    self.state.clear_session();
                    self.state.set_auth_state(AuthState::RecoveryPending);
                    self.presenter
                        .auth_state_changed(AuthState::RecoveryPending)
                        .await;
                    self.presenter.prompt_recovery().await;
                    return Ok(false);
                }
                return Err(self.fail_attempt(e).await);
            }
        };

        self.client.gateway().set_key(&key);
        let member = match self.client.probe_member().await {
            Ok(member) => member,
            Err(e) => return Err(self.fail_attempt(e).await),
        };

        self.commit(key, Some(token), member).await;
        Ok(true)
    }

    /// Explicit disconnect. The remote handshake session is terminated
    /// best-effort — failure here commonly happens incidentally during
    /// logout and never surfaces as a user-facing error.
    pub async fn logout(&self) {
        if self.state.session().handshake_token.is_some() {
            if let Err(e) = self.client.terminate_handshake().await {
                debug!("terminateHandshake during logout failed (ignored): {e}");
            }
        }
        self.store.delete();
        self.client.gateway().clear_key();
        self.state.bump_epoch();
        self.state.clear_session();
        self.state.set_auth_state(AuthState::LoggedOut);
        self.presenter.auth_state_changed(AuthState::LoggedOut).await;
    }

    /// Mid-session check for the fixed "not logged into the Member's Panel"
    /// sentence. When it matches, the session is dead server-side: wipe and
    /// route to recovery. Returns whether the message matched.
    pub async fn handle_session_expired(&self, message: &str) -> bool {
        if !message.contains(NOT_LOGGED_IN_MSG) {
            return false;
        }
        warn!("server reports the panel session has lapsed");
        self.store.delete();
        self.client.gateway().clear_key();
        self.state.bump_epoch();
        self.state.clear_session();
        self.state.set_auth_state(AuthState::RecoveryPending);
        self.presenter
            .auth_state_changed(AuthState::RecoveryPending)
            .await;
        self.presenter.prompt_recovery().await;
        true
    }

    // ─── Handshake protocol ──────────────────────────────────────────────

    /// Create a handshake for the current key and persist the token.
    ///
    /// On a conflict ("handshake already exists") the controller wipes and
    /// regenerates exactly once: terminate with the fresh key (a non-JSON
    /// success response is expected — parse errors are ignored), clear any
    /// local token, retry creation. Failure of the retry is terminal for
    /// this login attempt.
    async fn establish_handshake(&self) -> Result<String, ApiError> {
        match self.create_handshake().await {
            Ok(token) => {
                self.persist_token(&token).await;
                Ok(token)
            }
            Err(ApiError::HandshakeConflict) => {
                info!("handshake already exists — wiping and regenerating");
                match self.client.terminate_handshake().await {
                    Ok(_) | Err(ApiError::RawResponse(_)) => {}
                    Err(e) => warn!("terminateHandshake before regenerate failed: {e}"),
                }
                self.store.delete();
                let token = self.create_handshake().await?;
                self.persist_token(&token).await;
                Ok(token)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_handshake(&self) -> Result<String, ApiError> {
        let env = match self.client.authorize_handshake().await {
            Ok(env) => env,
            Err(e) => return Err(conflict_or(e)),
        };
        match env.handshake_status() {
            Some(200) => env
                .message_str()
                .map(str::to_string)
                .ok_or_else(|| ApiError::Api {
                    message: "handshake response carried no token".to_string(),
                }),
            _ => Err(conflict_or(envelope_error(&env))),
        }
    }

    /// Exchange a stored token for the license key.
    async fn redeem_handshake(&self, token: &str) -> Result<String, ApiError> {
        let env = self.client.get_handshake(token).await?;
        match env.handshake_status() {
            Some(200) => env
                .message_str()
                .map(str::to_string)
                .ok_or_else(|| ApiError::Api {
                    message: "handshake exchange carried no license key".to_string(),
                }),
            _ => Err(envelope_error(&env)),
        }
    }

    async fn persist_token(&self, token: &str) {
        if !self.store.save(token) {
            self.presenter
                .show_message(
                    MessageLevel::Warn,
                    "could not persist the session token; you will need to reconnect next time",
                )
                .await;
        }
    }

    // ─── Transitions ─────────────────────────────────────────────────────

    async fn enter_authenticating(&self) {
        self.state.set_auth_state(AuthState::Authenticating);
        self.presenter
            .auth_state_changed(AuthState::Authenticating)
            .await;
    }

    /// Commit a verified session. The probe has already passed; only now do
    /// state and presenter learn about the new session.
    async fn commit(&self, key: String, token: Option<String>, member: MemberSnapshot) {
        self.state.bump_epoch();
        self.state.set_session(Some(key), token);
        let epoch = self.state.epoch();
        self.state.set_member_if_current(epoch, member);
        self.state.set_auth_state(AuthState::LoggedIn);
        self.presenter.auth_state_changed(AuthState::LoggedIn).await;
    }

    /// Route a failed attempt to its terminal shape. The stored token is
    /// deleted first on every path — the valid-or-absent invariant.
    async fn fail_attempt(&self, err: ApiError) -> ApiError {
        self.store.delete();
        self.client.gateway().clear_key();
        self.state.bump_epoch();
        self.state.clear_session();

        match err {
            ApiError::HashMismatch => {
                self.state.set_auth_state(AuthState::HashMismatch);
                self.presenter
                    .auth_state_changed(AuthState::HashMismatch)
                    .await;
                self.presenter.explain_hash_mismatch().await;
            }
            ref e => {
                self.state.set_auth_state(AuthState::LoggedOut);
                self.presenter.auth_state_changed(AuthState::LoggedOut).await;
                self.presenter
                    .show_message(MessageLevel::Error, &e.message())
                    .await;
            }
        }
        err
    }
}

/// Conflict detection on handshake creation: the server only signals it in
/// prose.
fn conflict_or(err: ApiError) -> ApiError {
    if err
        .message()
        .to_lowercase()
        .contains(HANDSHAKE_EXISTS_MSG)
    {
        ApiError::HandshakeConflict
    } else {
        err
    }
}

fn envelope_error(env: &ApiEnvelope) -> ApiError {
    ApiError::Api {
        message: env
            .message_str()
            .unwrap_or("handshake request failed")
            .to_string(),
    }
}

/// Case-insensitive check against the stale-handshake wording set.
fn stale_handshake_wording(message: &str) -> bool {
    let lower = message.to_lowercase();
    STALE_HANDSHAKE_WORDS.iter().any(|w| lower.contains(w))
}
