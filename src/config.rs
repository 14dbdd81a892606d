// SPDX-License-Identifier: MIT
//! Client configuration.
//!
//! Priority: CLI / env var  >  TOML  >  built-in default. The TOML file
//! lives at `{data_dir}/config.toml`; all fields are optional overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::error;

const DEFAULT_API_BASE_URL: &str = "https://constelia.ai/api.php";
const DEFAULT_ORIGIN: &str = "https://constelia.ai/dashboard/";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_LOG: &str = "info";

/// `{data_dir}/config.toml` — all fields are optional overrides.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Override the Web API endpoint (default: https://constelia.ai/api.php).
    api_base_url: Option<String>,
    /// Origin the dashboard is considered served from; decides cookie vs
    /// local-store token persistence (default: https://constelia.ai/dashboard/).
    origin: Option<String>,
    /// Per-request timeout in seconds (default: 15).
    request_timeout_secs: Option<u64>,
    /// Log level filter string, e.g. "debug", "info,comet=trace" (default: "info").
    log: Option<String>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub api_base_url: String,
    pub origin: String,
    pub data_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub log: String,
}

impl PanelConfig {
    /// Resolve the effective configuration from CLI overrides, the TOML
    /// file, and built-in defaults, in that priority order.
    pub fn load(
        data_dir: Option<PathBuf>,
        api_base_url: Option<String>,
        origin: Option<String>,
        log: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let toml = load_toml(&data_dir).unwrap_or_default();

        Self {
            api_base_url: api_base_url
                .or(toml.api_base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            origin: origin
                .or(toml.origin)
                .unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            request_timeout_secs: toml.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            log: log.or(toml.log).unwrap_or_else(|| DEFAULT_LOG.to_string()),
            data_dir,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::load(None, None, None, None)
    }
}

fn default_data_dir() -> PathBuf {
    // $XDG_DATA_HOME/comet or ~/.local/share/comet
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("comet");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/share/comet");
    }
    PathBuf::from(".comet")
}
