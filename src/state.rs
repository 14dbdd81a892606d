// SPDX-License-Identifier: MIT
//! Process-wide application state.
//!
//! One [`AppState`] is constructed by the composition root and shared by
//! `Arc` — no ambient singleton, so tests can instantiate independent
//! sessions. Only the auth controller and the bootstrapper write; every
//! other component reads.
//!
//! Writers must not assume atomicity across an await: the session `epoch`
//! is bumped on every login/logout, and any completion handler that was
//! dispatched under an older epoch discards its result instead of applying
//! it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::auth::AuthState;
use crate::model::{MemberProject, MemberScript, MemberSnapshot};
use crate::session::Session;

#[derive(Default)]
struct Inner {
    session: Session,
    auth: AuthState,
    member: Option<MemberSnapshot>,
}

#[derive(Default)]
pub struct AppState {
    inner: RwLock<Inner>,
    epoch: AtomicU64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session epoch. Capture before dispatching async work; pass it
    /// back to the `*_if_current` writers afterwards.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate all in-flight completion handlers. Called by the auth
    /// controller on every login and logout.
    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ─── Session ─────────────────────────────────────────────────────────

    pub fn auth_state(&self) -> AuthState {
        self.read().auth
    }

    pub fn set_auth_state(&self, auth: AuthState) {
        self.write().auth = auth;
    }

    pub fn session(&self) -> Session {
        self.read().session.clone()
    }

    pub fn set_session(&self, api_key: Option<String>, handshake_token: Option<String>) {
        let mut inner = self.write();
        inner.session.api_key = api_key;
        inner.session.handshake_token = handshake_token;
    }

    pub fn clear_session(&self) {
        let mut inner = self.write();
        inner.session.clear();
        inner.member = None;
    }

    // ─── Member snapshot ─────────────────────────────────────────────────

    pub fn member(&self) -> Option<MemberSnapshot> {
        self.read().member.clone()
    }

    /// Replace the member snapshot wholesale, but only if the session that
    /// requested it is still the live one. Returns whether the write was
    /// applied.
    pub fn set_member_if_current(&self, epoch: u64, member: MemberSnapshot) -> bool {
        if self.epoch() != epoch {
            return false;
        }
        self.write().member = Some(member);
        true
    }

    /// Optimistic script flip. Returns the new active state, or `None` when
    /// no member snapshot is loaded.
    pub fn flip_script(&self, entry: MemberScript) -> Option<bool> {
        let mut inner = self.write();
        let member = inner.member.as_mut()?;
        if let Some(pos) = member.scripts.iter().position(|s| s.id == entry.id) {
            member.scripts.remove(pos);
            Some(false)
        } else {
            member.scripts.push(entry);
            Some(true)
        }
    }

    /// Optimistic project flip, same contract as [`flip_script`].
    ///
    /// [`flip_script`]: Self::flip_script
    pub fn flip_project(&self, entry: MemberProject) -> Option<bool> {
        let mut inner = self.write();
        let member = inner.member.as_mut()?;
        if let Some(pos) = member.projects.iter().position(|p| p.id == entry.id) {
            member.projects.remove(pos);
            Some(false)
        } else {
            member.projects.push(entry);
            Some(true)
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("state lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("state lock poisoned")
    }
}
