// SPDX-License-Identifier: MIT
//! File-backed persistence for the handshake token.
//!
//! Two media, mirroring what a browser would use:
//! - a cookie file (`cookies.json`) holding records with expiry, `secure`,
//!   and `SameSite` attributes — the Online medium;
//! - a local key-value store (`local_store.json`) — the Offline medium and
//!   the fallback when a cookie write fails.
//!
//! Both files are created with user-only permissions on Unix; they hold
//! credential material.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::Environment;

/// Name under which the handshake token is persisted, in either medium.
pub const HANDSHAKE_TOKEN_KEY: &str = "constelia_handshake";

/// Cookie lifetime.
const COOKIE_EXPIRY_DAYS: i64 = 30;

// ─── LocalStore ───────────────────────────────────────────────────────────────

/// Persistent key-value store backed by one JSON file.
///
/// Also used by the drafts module for per-script editing drafts and the
/// caching flag; the token is just one more entry.
#[derive(Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("local_store.json"),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_map().remove(key)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.read_map();
        map.insert(key.to_string(), value);
        self.write_map(&map)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    /// All keys currently present. Used by the drafts purge.
    pub fn keys(&self) -> Vec<String> {
        self.read_map().keys().cloned().collect()
    }

    fn read_map(&self) -> HashMap<String, Value> {
        let Ok(contents) = std::fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_str(&contents).unwrap_or_default()
    }

    fn write_map(&self, map: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("writing {}", self.path.display()))?;
        restrict_permissions(&self.path);
        Ok(())
    }
}

// ─── Cookie file ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CookieRecord {
    name: String,
    value: String,
    expires_at: DateTime<Utc>,
    secure: bool,
    same_site: String,
}

struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("cookies.json"),
        }
    }

    fn set(&self, name: &str, value: &str, secure: bool) -> Result<()> {
        let mut records = self.read_live();
        records.retain(|r| r.name != name);
        records.push(CookieRecord {
            name: name.to_string(),
            value: value.to_string(),
            expires_at: Utc::now() + Duration::days(COOKIE_EXPIRY_DAYS),
            secure,
            same_site: "Lax".to_string(),
        });
        self.write(&records)
    }

    /// Value of a live (unexpired) cookie. Expired records are purged as a
    /// side effect so a stale token never resurfaces.
    fn get(&self, name: &str) -> Option<String> {
        let all = self.read_all();
        let live = self.read_live();
        if live.len() != all.len() {
            let _ = self.write(&live);
        }
        live.iter().find(|r| r.name == name).map(|r| r.value.clone())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let mut records = self.read_live();
        records.retain(|r| r.name != name);
        self.write(&records)
    }

    fn read_all(&self) -> Vec<CookieRecord> {
        let Ok(contents) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        serde_json::from_str(&contents).unwrap_or_default()
    }

    fn read_live(&self) -> Vec<CookieRecord> {
        let now = Utc::now();
        self.read_all()
            .into_iter()
            .filter(|r| r.expires_at > now)
            .collect()
    }

    fn write(&self, records: &[CookieRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("writing {}", self.path.display()))?;
        restrict_permissions(&self.path);
        Ok(())
    }
}

// ─── SessionStore ─────────────────────────────────────────────────────────────

/// Environment-appropriate persistence for the handshake token.
pub struct SessionStore {
    env: Environment,
    /// Cookie `secure` attribute: set iff the origin is https.
    https_origin: bool,
    cookies: CookieFile,
    local: LocalStore,
}

impl SessionStore {
    pub fn new(data_dir: &Path, origin: &str) -> Self {
        Self {
            env: Environment::classify(origin),
            https_origin: origin.starts_with("https:"),
            cookies: CookieFile::new(data_dir),
            local: LocalStore::new(data_dir),
        }
    }

    pub fn is_online_environment(&self) -> bool {
        self.env == Environment::Online
    }

    /// Share the underlying key-value store (drafts, caching flag).
    pub fn local_store(&self) -> LocalStore {
        self.local.clone()
    }

    /// Persist the token. Online: cookie first, local store on write
    /// failure; Offline: local store only. Returns whether either path
    /// succeeded.
    pub fn save(&self, token: &str) -> bool {
        if self.is_online_environment() {
            match self
                .cookies
                .set(HANDSHAKE_TOKEN_KEY, token, self.https_origin)
            {
                Ok(()) => {
                    debug!("handshake token persisted as cookie");
                    return true;
                }
                Err(e) => {
                    warn!("cookie write failed, falling back to local store: {e:#}");
                }
            }
        }
        match self
            .local
            .set(HANDSHAKE_TOKEN_KEY, Value::String(token.to_string()))
        {
            Ok(()) => {
                debug!("handshake token persisted in local store");
                true
            }
            Err(e) => {
                warn!("failed to persist handshake token: {e:#}");
                false
            }
        }
    }

    /// Retrieve the stored token, if any. Online reads the cookie first and
    /// the local store as fallback; Offline reads the local store only.
    pub fn load(&self) -> Option<String> {
        if self.is_online_environment() {
            if let Some(token) = self.cookies.get(HANDSHAKE_TOKEN_KEY) {
                return Some(token);
            }
        }
        self.local
            .get(HANDSHAKE_TOKEN_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Remove the token from every medium it could live in. Unconditional:
    /// a deletion failure must not leave a stale token loadable, so both
    /// media are always attempted and failures are logged loudly.
    pub fn delete(&self) {
        if let Err(e) = self.cookies.remove(HANDSHAKE_TOKEN_KEY) {
            warn!("failed to clear handshake cookie: {e:#}");
        }
        if let Err(e) = self.local.remove(HANDSHAKE_TOKEN_KEY) {
            warn!("failed to clear handshake token from local store: {e:#}");
        }
    }
}

fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
            warn!(path = %path.display(), "failed to restrict permissions: {e}");
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ONLINE: &str = "https://constelia.ai/dashboard/";
    const OFFLINE: &str = "file:///opt/dashboard/index.html";

    #[test]
    fn save_then_load_roundtrips_online() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path(), ONLINE);
        assert!(store.is_online_environment());
        assert!(store.save("tok-online"));
        assert_eq!(store.load().as_deref(), Some("tok-online"));
    }

    #[test]
    fn save_then_load_roundtrips_offline() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path(), OFFLINE);
        assert!(!store.is_online_environment());
        assert!(store.save("tok-offline"));
        assert_eq!(store.load().as_deref(), Some("tok-offline"));
    }

    #[test]
    fn delete_then_load_is_empty_in_both_environments() {
        for origin in [ONLINE, OFFLINE] {
            let dir = TempDir::new().unwrap();
            let store = SessionStore::new(dir.path(), origin);
            store.save("doomed");
            store.delete();
            assert_eq!(store.load(), None, "origin {origin}");
        }
    }

    #[test]
    fn online_load_falls_back_to_local_store() {
        let dir = TempDir::new().unwrap();
        // Written by an offline run (local store only)...
        SessionStore::new(dir.path(), OFFLINE).save("from-local");
        // ...must still be loadable by an online run.
        let online = SessionStore::new(dir.path(), ONLINE);
        assert_eq!(online.load().as_deref(), Some("from-local"));
    }

    #[test]
    fn expired_cookie_is_treated_as_absent_and_purged() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path(), ONLINE);
        store.save("short-lived");

        // Rewrite the cookie record with an expiry in the past.
        let path = dir.path().join("cookies.json");
        let mut records: Vec<CookieRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        records[0].expires_at = Utc::now() - Duration::days(1);
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        assert_eq!(store.load(), None);
        let after: Vec<CookieRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(after.is_empty(), "expired record must be purged");
    }

    #[test]
    fn cookie_secure_flag_follows_scheme() {
        let dir = TempDir::new().unwrap();
        SessionStore::new(dir.path(), ONLINE).save("t");
        let records: Vec<CookieRecord> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("cookies.json")).unwrap(),
        )
        .unwrap();
        assert!(records[0].secure);
        assert_eq!(records[0].same_site, "Lax");

        let dir2 = TempDir::new().unwrap();
        SessionStore::new(dir2.path(), "http://panel.example.org/").save("t");
        let records: Vec<CookieRecord> = serde_json::from_str(
            &std::fs::read_to_string(dir2.path().join("cookies.json")).unwrap(),
        )
        .unwrap();
        assert!(!records[0].secure);
    }
}
