// SPDX-License-Identifier: MIT
//! comet — terminal member dashboard for the constelia.ai Web API.
//!
//! The library is organized around four components:
//! - [`api`]: the gateway to the remote API, response normalization, and
//!   the classified error taxonomy;
//! - [`session`]: the handshake token store and environment classification;
//! - [`auth`]: the login/handshake/recovery state machine;
//! - [`bootstrap`]: the post-login parallel data load.
//!
//! Everything is composed by [`AppContext`]; no ambient singletons, so tests
//! can instantiate independent sessions side by side.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod cooldown;
pub mod drafts;
pub mod model;
pub mod ops;
pub mod redact;
pub mod session;
pub mod state;
pub mod toggle;
pub mod ui;

use std::sync::Arc;

use anyhow::Context as _;

use api::ApiGateway;
use auth::AuthController;
use bootstrap::SessionBootstrapper;
use config::PanelConfig;
use drafts::DraftStore;
use ops::PanelClient;
use session::store::SessionStore;
use state::AppState;
use toggle::Toggler;
use ui::Presenter;

/// Composition root: one per process (or per test).
pub struct AppContext {
    pub config: PanelConfig,
    pub state: Arc<AppState>,
    pub client: PanelClient,
    pub store: Arc<SessionStore>,
    pub auth: AuthController,
    pub bootstrapper: SessionBootstrapper,
    pub drafts: DraftStore,
    pub presenter: Arc<dyn Presenter>,
}

impl AppContext {
    pub fn new(config: PanelConfig, presenter: Arc<dyn Presenter>) -> anyhow::Result<Self> {
        let gateway = ApiGateway::new(
            &config.api_base_url,
            &config.origin,
            config.request_timeout(),
        )
        .context("constructing API gateway")?;
        let client = PanelClient::new(Arc::new(gateway));
        let state = Arc::new(AppState::new());
        let store = Arc::new(SessionStore::new(&config.data_dir, &config.origin));
        let drafts = DraftStore::new(store.local_store());

        let auth = AuthController::new(
            client.clone(),
            store.clone(),
            state.clone(),
            presenter.clone(),
        );
        let bootstrapper =
            SessionBootstrapper::new(client.clone(), state.clone(), presenter.clone());

        Ok(Self {
            config,
            state,
            client,
            store,
            auth,
            bootstrapper,
            drafts,
            presenter,
        })
    }

    /// A toggler bound to this context's client and state.
    pub fn toggler(&self) -> Toggler {
        Toggler::new(
            self.client.clone(),
            self.state.clone(),
            self.presenter.clone(),
        )
    }
}
