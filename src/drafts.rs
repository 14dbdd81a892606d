// SPDX-License-Identifier: MIT
//! Local script-editing drafts and the caching flag.
//!
//! Drafts live in the local key-value store, one entry per script, keyed by
//! script id and timestamped. A draft older than 24 hours is expired: it is
//! purged on load and never returned.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::store::LocalStore;

/// Draft time-to-live.
const DRAFT_TTL_HOURS: i64 = 24;

const DRAFT_KEY_PREFIX: &str = "script_draft_";
const CACHING_FLAG_KEY: &str = "caching_enabled";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDraft {
    pub script_id: i64,
    pub source: String,
    pub saved_at: DateTime<Utc>,
}

impl ScriptDraft {
    fn expired(&self) -> bool {
        Utc::now() - self.saved_at > Duration::hours(DRAFT_TTL_HOURS)
    }
}

pub struct DraftStore {
    store: LocalStore,
}

impl DraftStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn save_draft(&self, script_id: i64, source: &str) -> anyhow::Result<()> {
        let draft = ScriptDraft {
            script_id,
            source: source.to_string(),
            saved_at: Utc::now(),
        };
        self.store
            .set(&draft_key(script_id), serde_json::to_value(&draft)?)
    }

    /// The stored draft for a script, unless it has expired — an expired
    /// draft is deleted and treated as absent.
    pub fn load_draft(&self, script_id: i64) -> Option<ScriptDraft> {
        let value = self.store.get(&draft_key(script_id))?;
        let draft: ScriptDraft = serde_json::from_value(value).ok()?;
        if draft.expired() {
            debug!(script_id, "draft expired — purging");
            let _ = self.store.remove(&draft_key(script_id));
            return None;
        }
        Some(draft)
    }

    pub fn delete_draft(&self, script_id: i64) {
        let _ = self.store.remove(&draft_key(script_id));
    }

    /// Drop every expired draft. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0;
        for key in self.store.keys() {
            if !key.starts_with(DRAFT_KEY_PREFIX) {
                continue;
            }
            let expired = self
                .store
                .get(&key)
                .and_then(|v| serde_json::from_value::<ScriptDraft>(v).ok())
                .map(|d| d.expired())
                // An unreadable draft entry is as good as expired.
                .unwrap_or(true);
            if expired {
                let _ = self.store.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    // ─── Caching flag ────────────────────────────────────────────────────

    pub fn caching_enabled(&self) -> bool {
        self.store
            .get(CACHING_FLAG_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn set_caching_enabled(&self, enabled: bool) -> anyhow::Result<()> {
        self.store.set(CACHING_FLAG_KEY, enabled.into())
    }
}

fn draft_key(script_id: i64) -> String {
    format!("{DRAFT_KEY_PREFIX}{script_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn drafts(dir: &Path) -> DraftStore {
        DraftStore::new(LocalStore::new(dir))
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = drafts(dir.path());
        store.save_draft(42, "function on_loop() end").unwrap();

        let draft = store.load_draft(42).expect("draft must load");
        assert_eq!(draft.script_id, 42);
        assert_eq!(draft.source, "function on_loop() end");
    }

    #[test]
    fn expired_draft_is_purged_on_load() {
        let dir = TempDir::new().unwrap();
        let store = drafts(dir.path());
        store.save_draft(7, "old work").unwrap();

        // Backdate the entry past the TTL.
        let local = LocalStore::new(dir.path());
        let mut value = local.get("script_draft_7").unwrap();
        value["saved_at"] =
            serde_json::to_value(Utc::now() - Duration::hours(DRAFT_TTL_HOURS + 1)).unwrap();
        local.set("script_draft_7", value).unwrap();

        assert!(store.load_draft(7).is_none());
        assert!(local.get("script_draft_7").is_none(), "must be purged");
    }

    #[test]
    fn purge_expired_leaves_fresh_drafts() {
        let dir = TempDir::new().unwrap();
        let store = drafts(dir.path());
        store.save_draft(1, "fresh").unwrap();
        store.save_draft(2, "stale").unwrap();

        let local = LocalStore::new(dir.path());
        let mut value = local.get("script_draft_2").unwrap();
        value["saved_at"] =
            serde_json::to_value(Utc::now() - Duration::hours(DRAFT_TTL_HOURS + 1)).unwrap();
        local.set("script_draft_2", value).unwrap();

        assert_eq!(store.purge_expired(), 1);
        assert!(store.load_draft(1).is_some());
        assert!(store.load_draft(2).is_none());
    }

    #[test]
    fn caching_flag_defaults_off() {
        let dir = TempDir::new().unwrap();
        let store = drafts(dir.path());
        assert!(!store.caching_enabled());
        store.set_caching_enabled(true).unwrap();
        assert!(store.caching_enabled());
    }
}
