//! Shared harness for the integration tests: a wiremock-backed API plus an
//! [`AppContext`] wired to a recording presenter.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use comet::auth::AuthState;
use comet::config::PanelConfig;
use comet::model::MemberSnapshot;
use comet::ui::{MessageLevel, Presenter};
use comet::AppContext;

pub const ONLINE_ORIGIN: &str = "https://constelia.ai/dashboard/";

// ─── Recording presenter ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPresenter {
    pub messages: Mutex<Vec<(MessageLevel, String)>>,
    pub states: Mutex<Vec<AuthState>>,
    /// Username and arrival instant of every `member_ready` call.
    pub members: Mutex<Vec<(String, Instant)>>,
    pub hash_explained: AtomicBool,
    pub recovery_prompted: AtomicBool,
}

impl RecordingPresenter {
    pub fn last_state(&self) -> Option<AuthState> {
        self.states.lock().unwrap().last().copied()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level == MessageLevel::Error)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn show_message(&self, level: MessageLevel, text: &str) {
        self.messages.lock().unwrap().push((level, text.to_string()));
    }

    async fn auth_state_changed(&self, state: AuthState) {
        self.states.lock().unwrap().push(state);
    }

    async fn member_ready(&self, member: &MemberSnapshot) {
        self.members
            .lock()
            .unwrap()
            .push((member.username.clone(), Instant::now()));
    }

    async fn explain_hash_mismatch(&self) {
        self.hash_explained.store(true, Ordering::SeqCst);
    }

    async fn prompt_recovery(&self) {
        self.recovery_prompted.store(true, Ordering::SeqCst);
    }
}

// ─── Test context ────────────────────────────────────────────────────────────

pub struct TestCtx {
    pub server: MockServer,
    pub ctx: AppContext,
    pub presenter: Arc<RecordingPresenter>,
    _data_dir: TempDir,
}

pub async fn test_ctx() -> TestCtx {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().unwrap();
    let presenter = Arc::new(RecordingPresenter::default());

    let config = PanelConfig::load(
        Some(data_dir.path().to_path_buf()),
        Some(format!("{}/api.php", server.uri())),
        Some(ONLINE_ORIGIN.to_string()),
        None,
    );
    let ctx = AppContext::new(config, presenter.clone()).unwrap();

    TestCtx {
        server,
        ctx,
        presenter,
        _data_dir: data_dir,
    }
}

// ─── Mock helpers ────────────────────────────────────────────────────────────

/// Mount a response for one API command.
pub async fn mock_cmd(server: &MockServer, cmd: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api.php"))
        .and(query_param("cmd", cmd))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mount a response for one API command that stops matching after `n` hits.
pub async fn mock_cmd_n(server: &MockServer, cmd: &str, response: ResponseTemplate, n: u64) {
    Mock::given(method("GET"))
        .and(path("/api.php"))
        .and(query_param("cmd", cmd))
        .respond_with(response)
        .up_to_n_times(n)
        .mount(server)
        .await;
}

pub fn ok_json(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn member_body() -> Value {
    json!({
        "username": "typedef",
        "level": 9,
        "xp": 41250,
        "protection": 2,
        "language": "english",
        "scripts": [
            {"id": 5, "name": "better esp", "author": "typedef", "software": 4},
            {"id": 11, "name": "auto buy", "author": "rose", "software": 4}
        ],
        "fc2t": [
            {"id": 3, "name": "overlay", "author": "typedef"}
        ],
        "perks": [
            {"id": 1, "name": "venus"}
        ]
    })
}

/// How many requests the server saw for a given command.
pub async fn request_count(server: &MockServer, cmd: &str) -> usize {
    let needle = format!("cmd={cmd}");
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.query().unwrap_or("").contains(&needle))
        .count()
}
