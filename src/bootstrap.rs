// SPDX-License-Identifier: MIT
//! Initial data load after a session is confirmed valid.
//!
//! Eight calls go out concurrently. The member record is the critical one:
//! its completion handler fires the presenter as soon as it resolves,
//! independent of the rest. Everything else defaults on failure — partial
//! auxiliary failure must never block presentation of member-identity data.
//!
//! After all eight settle (a join barrier, not a race), the member outcome
//! decides the overall shape: hash mismatch and invalid key propagate as-is
//! (the caller must not fall back on a known-bad credential); any other
//! member failure degrades to a minimal scripts+configuration load that
//! still leaves the application usable.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::ApiError;
use crate::model::{BootstrapResult, Build};
use crate::ops::PanelClient;
use crate::state::AppState;
use crate::ui::Presenter;

/// Delay before the single builds-list retry.
const BUILDS_RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct SessionBootstrapper {
    client: PanelClient,
    state: Arc<AppState>,
    presenter: Arc<dyn Presenter>,
}

impl SessionBootstrapper {
    pub fn new(client: PanelClient, state: Arc<AppState>, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            client,
            state,
            presenter,
        }
    }

    /// Run the full bootstrap for the current session.
    ///
    /// Completion handlers capture the session epoch at dispatch; a login or
    /// logout that supersedes this session makes them discard their results
    /// instead of applying them.
    pub async fn bootstrap(&self) -> Result<BootstrapResult, ApiError> {
        let epoch = self.state.epoch();

        // The member call gets its own early handler: presenter learns the
        // identity as soon as this one resolves, not when the join settles.
        let member_task: JoinHandle<Result<_, ApiError>> = {
            let client = self.client.clone();
            let state = self.state.clone();
            let presenter = self.presenter.clone();
            tokio::spawn(async move {
                let member = client.get_member().await?;
                if state.set_member_if_current(epoch, member.clone()) {
                    presenter.member_ready(&member).await;
                } else {
                    info!("member record resolved for a superseded session — discarded");
                }
                Ok(member)
            })
        };

        let scripts_task = spawn({
            let c = self.client.clone();
            async move { c.get_all_scripts().await }
        });
        let projects_task = spawn({
            let c = self.client.clone();
            async move { c.get_fc2t_projects().await }
        });
        let configuration_task = spawn({
            let c = self.client.clone();
            async move { c.get_configuration().await }
        });
        let perks_task = spawn({
            let c = self.client.clone();
            async move { c.list_perks().await }
        });
        let translations_task = spawn({
            let c = self.client.clone();
            async move { c.get_translations().await }
        });
        let software_task = spawn({
            let c = self.client.clone();
            async move { c.get_software().await }
        });
        let builds_task = {
            let c = self.client.clone();
            tokio::spawn(async move { load_builds_with_retry(&c).await })
        };

        // Join barrier: every call settles before aggregation.
        let (member, scripts, projects, configuration, perks, translations, software, builds) = tokio::join!(
            member_task,
            scripts_task,
            projects_task,
            configuration_task,
            perks_task,
            translations_task,
            software_task,
            builds_task,
        );

        let member = flatten(member);
        match member {
            Err(e @ ApiError::HashMismatch) | Err(e @ ApiError::InvalidLicenseKey) => {
                // Known-bad credential or fingerprint: never fall back.
                Err(e)
            }
            Err(e) => {
                warn!("member record failed ({e}) — degrading to minimal bootstrap");
                Ok(self.minimal_bootstrap(epoch).await)
            }
            Ok(member) => Ok(BootstrapResult {
                member: Some(member),
                scripts: flatten(scripts).unwrap_or_default(),
                projects: flatten(projects).unwrap_or_default(),
                configuration: flatten(configuration).unwrap_or_default(),
                perks: flatten(perks).unwrap_or_default(),
                translations: flatten(translations).unwrap_or_default(),
                software: flatten(software).unwrap_or_default(),
                builds: builds.unwrap_or_default(),
                degraded: false,
            }),
        }
    }

    /// Degraded path: scripts catalog and configuration only, everything
    /// else defaulted. Keeps the application usable instead of stuck on a
    /// loading screen.
    async fn minimal_bootstrap(&self, epoch: u64) -> BootstrapResult {
        let (scripts, configuration) = tokio::join!(
            self.client.get_all_scripts(),
            self.client.get_configuration(),
        );
        if self.state.epoch() != epoch {
            info!("minimal bootstrap resolved for a superseded session — discarded");
            return BootstrapResult {
                degraded: true,
                ..Default::default()
            };
        }
        BootstrapResult {
            member: None,
            scripts: scripts.unwrap_or_default(),
            configuration: configuration.unwrap_or_default(),
            degraded: true,
            ..Default::default()
        }
    }
}

/// Fetch the builds list with its internal one-shot retry: a first failure
/// whose wording matches the security-hash family waits a short fixed delay
/// and tries exactly once more; every other failure is an empty list.
pub async fn load_builds_with_retry(client: &PanelClient) -> Vec<Build> {
    match client.get_builds().await {
        Ok(builds) => builds,
        Err(e) if is_hash_flavored(&e) => {
            warn!("builds list hit a hash mismatch — retrying once");
            tokio::time::sleep(BUILDS_RETRY_DELAY).await;
            client.get_builds().await.unwrap_or_default()
        }
        Err(e) => {
            warn!("builds list failed ({e}) — defaulting to empty");
            Vec::new()
        }
    }
}

fn is_hash_flavored(err: &ApiError) -> bool {
    if matches!(err, ApiError::HashMismatch) {
        return true;
    }
    let message = err.message();
    message.to_lowercase().contains("hash mismatch") || message.contains("Security hash")
}

fn spawn<T: Send + 'static>(
    fut: impl std::future::Future<Output = Result<T, ApiError>> + Send + 'static,
) -> JoinHandle<Result<T, ApiError>> {
    tokio::spawn(fut)
}

/// Collapse a join outcome into the call's own result; a panicked task
/// counts as a generic failure.
fn flatten<T>(joined: Result<Result<T, ApiError>, tokio::task::JoinError>) -> Result<T, ApiError> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(ApiError::Api {
            message: format!("bootstrap task failed: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_flavored_detection() {
        assert!(is_hash_flavored(&ApiError::HashMismatch));
        assert!(is_hash_flavored(&ApiError::Api {
            message: "Security hash mismatch".into()
        }));
        assert!(is_hash_flavored(&ApiError::Api {
            message: "detected a Hash Mismatch, try again".into()
        }));
        assert!(!is_hash_flavored(&ApiError::Api {
            message: "plain failure".into()
        }));
    }
}
