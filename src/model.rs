// SPDX-License-Identifier: MIT
//! Data model for the member dashboard.
//!
//! Everything here deserializes tolerantly (`#[serde(default)]` throughout):
//! the API omits fields freely depending on which flags a query carried.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Member ──────────────────────────────────────────────────────────────────

/// A script the member currently has enabled.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MemberScript {
    pub id: i64,
    pub name: String,
    pub author: String,
    pub software: i64,
}

/// An FC2T project the member currently has enabled.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MemberProject {
    pub id: i64,
    pub name: String,
    pub author: String,
}

/// A perk the member owns.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MemberPerk {
    pub id: i64,
    pub name: String,
}

/// The comprehensive member record.
///
/// Replaced wholesale on each successful refresh; the only partial mutations
/// are the optimistic toggle flips, and those re-fetch to confirm.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MemberSnapshot {
    pub username: String,
    pub avatar: String,
    pub level: i64,
    pub xp: i64,
    pub posts: i64,
    pub score: i64,
    /// Protection mode as the API reports it (numeric).
    pub protection: i64,
    pub language: String,
    /// Venus buddy status.
    pub buddy: String,
    pub unread_alerts: i64,
    pub unread_conversations: i64,
    pub scripts: Vec<MemberScript>,
    #[serde(rename = "fc2t")]
    pub projects: Vec<MemberProject>,
    pub perks: Vec<MemberPerk>,
}

impl MemberSnapshot {
    pub fn script_active(&self, id: i64) -> bool {
        self.scripts.iter().any(|s| s.id == id)
    }

    pub fn project_active(&self, id: i64) -> bool {
        self.projects.iter().any(|p| p.id == id)
    }
}

// ─── Catalogs ────────────────────────────────────────────────────────────────

/// An entry of the all-scripts catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Script {
    pub id: i64,
    pub name: String,
    pub author: String,
    pub software: i64,
    pub last_update: i64,
    pub update_notes: String,
    pub library: bool,
}

/// An entry of the FC2T projects catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub author: String,
    pub version: String,
    pub last_update: i64,
}

/// An entry of the perks catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Perk {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub cost: i64,
}

/// Software/version info for the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftwareInfo {
    pub name: String,
    pub version: String,
    pub last_update: i64,
}

impl Default for SoftwareInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: "unknown".to_string(),
            last_update: 0,
        }
    }
}

/// A named, shareable bundle of script/project selections plus an optional
/// configuration override, applied in one step.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Build {
    pub name: String,
    pub author: String,
    pub scripts: Vec<i64>,
    pub projects: Vec<i64>,
    pub configuration: Option<String>,
}

/// One script's full source, as returned by `getScript`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScriptSource {
    pub id: i64,
    pub name: String,
    pub script: String,
    pub last_update: i64,
}

// ─── Bootstrap aggregate ─────────────────────────────────────────────────────

/// Aggregate of the eight bootstrap calls. Every auxiliary field defaults
/// independently on failure; only the member record gates the whole result.
#[derive(Debug, Clone, Default)]
pub struct BootstrapResult {
    /// `None` only on the degraded minimal-fallback path.
    pub member: Option<MemberSnapshot>,
    pub scripts: Vec<Script>,
    pub projects: Vec<Project>,
    pub configuration: Value,
    pub perks: Vec<Perk>,
    pub translations: HashMap<String, String>,
    pub software: SoftwareInfo,
    pub builds: Vec<Build>,
    /// True when the minimal fallback produced this result.
    pub degraded: bool,
}
