// SPDX-License-Identifier: MIT
//! Typed wrappers for every Web API command the dashboard consumes.
//!
//! Thin layer over the gateway: addressing and payload decoding only. No
//! retry policy, no state — that belongs to the auth controller and the
//! bootstrapper.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::api::{ApiEnvelope, ApiError, ApiGateway};
use crate::model::{
    Build, MemberSnapshot, Perk, Project, Script, ScriptSource, SoftwareInfo,
};

#[derive(Clone)]
pub struct PanelClient {
    gateway: Arc<ApiGateway>,
}

impl PanelClient {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    // ─── Handshake protocol ──────────────────────────────────────────────

    /// `authorizeHandshake` — create a handshake for the current key.
    /// Returns the raw envelope; the auth controller interprets the embedded
    /// status and conflict wording.
    pub async fn authorize_handshake(&self) -> Result<ApiEnvelope, ApiError> {
        self.gateway.call("authorizeHandshake", &[]).await
    }

    /// `getHandshake` — exchange a stored token for the license key.
    /// Issued without a key; the token is the credential here.
    pub async fn get_handshake(&self, token: &str) -> Result<ApiEnvelope, ApiError> {
        self.gateway
            .call("getHandshake", &[("token", Some(token))])
            .await
    }

    /// `terminateHandshake` — end the remote handshake session.
    pub async fn terminate_handshake(&self) -> Result<ApiEnvelope, ApiError> {
        self.gateway.call("terminateHandshake", &[]).await
    }

    // ─── Member ──────────────────────────────────────────────────────────

    /// `getMember` with the full detail flags the dashboard renders from.
    pub async fn get_member(&self) -> Result<MemberSnapshot, ApiError> {
        let env = self
            .gateway
            .call(
                "getMember",
                &[
                    ("scripts", Some("")),
                    ("fc2t", Some("")),
                    ("perks", Some("")),
                    ("xp", Some("")),
                ],
            )
            .await?;
        decode(env.payload)
    }

    /// Minimal `getMember` used as the session verification probe.
    pub async fn probe_member(&self) -> Result<MemberSnapshot, ApiError> {
        let env = self.gateway.call("getMember", &[]).await?;
        decode(env.payload)
    }

    // ─── Catalogs ────────────────────────────────────────────────────────

    pub async fn get_all_scripts(&self) -> Result<Vec<Script>, ApiError> {
        let env = self.gateway.call("getAllScripts", &[]).await?;
        decode(env.payload)
    }

    pub async fn get_fc2t_projects(&self) -> Result<Vec<Project>, ApiError> {
        let env = self.gateway.call("getFC2TProjects", &[]).await?;
        decode(env.payload)
    }

    pub async fn list_perks(&self) -> Result<Vec<Perk>, ApiError> {
        let env = self.gateway.call("listPerks", &[]).await?;
        // Either a bare array or an object with a `perks` field, depending
        // on whether the member owns any.
        let value = match env.payload {
            Value::Object(ref map) if map.contains_key("perks") => map["perks"].clone(),
            other => other,
        };
        decode(value)
    }

    pub async fn get_translations(&self) -> Result<HashMap<String, String>, ApiError> {
        let env = self.gateway.call("getTranslations", &[]).await?;
        decode(env.payload)
    }

    pub async fn get_software(&self) -> Result<SoftwareInfo, ApiError> {
        let env = self.gateway.call("getSoftware", &[]).await?;
        decode(env.payload)
    }

    // ─── Configuration ───────────────────────────────────────────────────

    /// `getConfiguration` — the blob arrives as a JSON string; decode it to
    /// a value so callers can address sections directly.
    pub async fn get_configuration(&self) -> Result<Value, ApiError> {
        let env = self.gateway.call("getConfiguration", &[]).await?;
        match env.payload {
            Value::String(text) => {
                Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
            }
            other => Ok(other),
        }
    }

    /// `setConfiguration` — the full configuration text goes in the body.
    pub async fn set_configuration(&self, text: &str) -> Result<(), ApiError> {
        self.gateway
            .call_with_body("setConfiguration", &[], &[("value", text)])
            .await?;
        Ok(())
    }

    pub async fn reset_configuration(&self) -> Result<(), ApiError> {
        self.gateway.call("resetConfiguration", &[]).await?;
        Ok(())
    }

    // ─── Builds ──────────────────────────────────────────────────────────

    pub async fn get_builds(&self) -> Result<Vec<Build>, ApiError> {
        let env = self.gateway.call("getBuilds", &[]).await?;
        decode(env.payload)
    }

    pub async fn create_build(
        &self,
        name: &str,
        scripts: &[i64],
        projects: &[i64],
        configuration: Option<&str>,
    ) -> Result<(), ApiError> {
        let scripts = serde_json::to_string(scripts).unwrap_or_default();
        let projects = serde_json::to_string(projects).unwrap_or_default();
        let mut body = vec![("scripts", scripts.as_str()), ("projects", projects.as_str())];
        if let Some(configuration) = configuration {
            body.push(("configuration", configuration));
        }
        self.gateway
            .call_with_body("createBuild", &[("name", Some(name))], &body)
            .await?;
        Ok(())
    }

    pub async fn delete_build(&self, name: &str) -> Result<(), ApiError> {
        self.gateway
            .call("deleteBuild", &[("name", Some(name))])
            .await?;
        Ok(())
    }

    // ─── Scripts & projects ──────────────────────────────────────────────

    pub async fn toggle_script_status(&self, id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        self.gateway
            .call("toggleScriptStatus", &[("id", Some(id.as_str()))])
            .await?;
        Ok(())
    }

    pub async fn toggle_project_status(&self, id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        self.gateway
            .call("toggleProjectStatus", &[("id", Some(id.as_str()))])
            .await?;
        Ok(())
    }

    /// Replace the member's enabled scripts in one call.
    pub async fn set_member_scripts(&self, ids: &[i64]) -> Result<(), ApiError> {
        let ids = serde_json::to_string(ids).unwrap_or_default();
        self.gateway
            .call_with_body("setMemberScripts", &[], &[("scripts", ids.as_str())])
            .await?;
        Ok(())
    }

    /// Replace the member's enabled projects in one call.
    pub async fn set_member_projects(&self, ids: &[i64]) -> Result<(), ApiError> {
        let ids = serde_json::to_string(ids).unwrap_or_default();
        self.gateway
            .call_with_body("setMemberProjects", &[], &[("projects", ids.as_str())])
            .await?;
        Ok(())
    }

    pub async fn get_script(&self, id: i64) -> Result<ScriptSource, ApiError> {
        let id = id.to_string();
        let env = self
            .gateway
            .call("getScript", &[("id", Some(id.as_str()))])
            .await?;
        decode(env.payload)
    }

    /// `updateScript` — full source in the body, never the query string.
    pub async fn update_script(
        &self,
        id: i64,
        source: &str,
        notes: &str,
    ) -> Result<(), ApiError> {
        let id = id.to_string();
        self.gateway
            .call_with_body(
                "updateScript",
                &[("id", Some(id.as_str()))],
                &[("script", source), ("notes", notes)],
            )
            .await?;
        Ok(())
    }

    // ─── Account ─────────────────────────────────────────────────────────

    /// `rollLoot` — returns whatever the loot table produced, as prose.
    pub async fn roll_loot(&self) -> Result<Value, ApiError> {
        let env = self.gateway.call("rollLoot", &[]).await?;
        Ok(env.payload)
    }

    pub async fn set_language(&self, language: &str) -> Result<(), ApiError> {
        self.gateway
            .call("setLanguage", &[("language", Some(language))])
            .await?;
        Ok(())
    }

    pub async fn set_protection(&self, mode: i64) -> Result<(), ApiError> {
        let mode = mode.to_string();
        self.gateway
            .call("setProtection", &[("protection", Some(mode.as_str()))])
            .await?;
        Ok(())
    }

    /// `changeVenus` — toggle the Venus buddy state.
    pub async fn change_venus(&self) -> Result<(), ApiError> {
        self.gateway.call("changeVenus", &[]).await?;
        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Api {
        message: format!("unexpected payload shape: {e}"),
    })
}
