// SPDX-License-Identifier: MIT
//! The presentation collaborator.
//!
//! Rendering is not this crate's business. The core hands plain data to a
//! [`Presenter`] — auth-state changes, the member snapshot, messages — and
//! the implementation decides what to do with it. The CLI ships a terminal
//! printer; tests use a recording double.

use async_trait::async_trait;
use tracing::info;

use crate::auth::AuthState;
use crate::model::MemberSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warn,
    Error,
}

#[async_trait]
pub trait Presenter: Send + Sync {
    /// A user-facing message. Never carries credential material.
    async fn show_message(&self, level: MessageLevel, text: &str);

    /// The auth state machine moved.
    async fn auth_state_changed(&self, state: AuthState);

    /// The member record resolved — fired as soon as it arrives, before the
    /// rest of the bootstrap settles.
    async fn member_ready(&self, member: &MemberSnapshot);

    /// The dedicated hash-mismatch explanation, never a generic error.
    async fn explain_hash_mismatch(&self);

    /// A stored handshake failed validation at startup; ask the user to
    /// re-enter their license key inline.
    async fn prompt_recovery(&self);
}

/// Terminal presenter used by the CLI.
pub struct TerminalPresenter;

#[async_trait]
impl Presenter for TerminalPresenter {
    async fn show_message(&self, level: MessageLevel, text: &str) {
        match level {
            MessageLevel::Info => println!("{text}"),
            MessageLevel::Warn => println!("warning: {text}"),
            MessageLevel::Error => eprintln!("error: {text}"),
        }
    }

    async fn auth_state_changed(&self, state: AuthState) {
        info!(state = %state, "auth state changed");
    }

    async fn member_ready(&self, member: &MemberSnapshot) {
        println!(
            "connected as {} (level {}, {} xp)",
            member.username, member.level, member.xp
        );
    }

    async fn explain_hash_mismatch(&self) {
        eprintln!(
            "Your license key could not authorize because the requester hash no longer \
             matches the one this session was issued for. This usually means your network \
             or browser fingerprint changed. Re-authorize from the Member's Panel and \
             connect again."
        );
    }

    async fn prompt_recovery(&self) {
        eprintln!(
            "Your saved session is no longer valid. Run `comet connect` with your \
             license key to sign in again."
        );
    }
}
