// SPDX-License-Identifier: MIT
//! Optimistic script/project toggles.
//!
//! The dashboard contract: flip the switch immediately, confirm against the
//! server, revert on failure. Expressed as a command — apply, await
//! confirmation, compensate — instead of UI-side state flips.
//!
//! Confirmation re-fetches the member record so local state reflects what
//! the server actually applied; rapid consecutive toggles share one
//! debounced re-fetch.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::api::ApiError;
use crate::cooldown::Debounce;
use crate::model::{MemberProject, MemberScript};
use crate::ops::PanelClient;
use crate::state::AppState;
use crate::ui::{MessageLevel, Presenter};

/// Window in which consecutive toggles coalesce into one confirm re-fetch.
const CONFIRM_DEBOUNCE: Duration = Duration::from_millis(250);

pub struct Toggler {
    client: PanelClient,
    state: Arc<AppState>,
    presenter: Arc<dyn Presenter>,
    confirm: Debounce,
}

impl Toggler {
    pub fn new(client: PanelClient, state: Arc<AppState>, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            client,
            state,
            presenter,
            confirm: Debounce::new(),
        }
    }

    /// Toggle a script. Returns the script's new active state.
    pub async fn toggle_script(&mut self, id: i64, name: &str) -> Result<bool, ApiError> {
        let entry = MemberScript {
            id,
            name: name.to_string(),
            ..Default::default()
        };
        let Some(now_active) = self.state.flip_script(entry.clone()) else {
            return Err(ApiError::Api {
                message: "no member loaded".to_string(),
            });
        };

        match self.client.toggle_script_status(id).await {
            Ok(()) => {
                self.schedule_confirm();
                Ok(now_active)
            }
            Err(e) => {
                // Compensate: the optimistic flip did not stick server-side.
                self.state.flip_script(entry);
                self.report_revert(&e, name).await;
                Err(e)
            }
        }
    }

    /// Toggle a project. Same contract as [`toggle_script`].
    ///
    /// [`toggle_script`]: Self::toggle_script
    pub async fn toggle_project(&mut self, id: i64, name: &str) -> Result<bool, ApiError> {
        let entry = MemberProject {
            id,
            name: name.to_string(),
            ..Default::default()
        };
        let Some(now_active) = self.state.flip_project(entry.clone()) else {
            return Err(ApiError::Api {
                message: "no member loaded".to_string(),
            });
        };

        match self.client.toggle_project_status(id).await {
            Ok(()) => {
                self.schedule_confirm();
                Ok(now_active)
            }
            Err(e) => {
                self.state.flip_project(entry);
                self.report_revert(&e, name).await;
                Err(e)
            }
        }
    }

    /// Wait for any pending confirmation re-fetch. One-shot flows (the CLI)
    /// call this before exiting so the snapshot is settled.
    pub async fn settle(&mut self) {
        self.confirm.flush().await;
    }

    fn schedule_confirm(&mut self) {
        let client = self.client.clone();
        let state = self.state.clone();
        let epoch = state.epoch();
        self.confirm.schedule(CONFIRM_DEBOUNCE, move || async move {
            match client.get_member().await {
                Ok(member) => {
                    // Stale completions for a superseded session are dropped.
                    state.set_member_if_current(epoch, member);
                }
                Err(e) => warn!("toggle confirmation re-fetch failed: {e}"),
            }
        });
    }

    async fn report_revert(&self, err: &ApiError, name: &str) {
        self.presenter
            .show_message(
                MessageLevel::Error,
                &format!("could not toggle {name}: {} (reverted)", err.message()),
            )
            .await;
    }
}
