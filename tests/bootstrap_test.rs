//! Bootstrap behavior: concurrency, per-call defaulting, fallback policy.

mod common;

use std::time::{Duration, Instant};

use common::*;
use serde_json::json;
use wiremock::ResponseTemplate;

use comet::api::error::{HASH_MISMATCH_MSG, INVALID_KEY_MSG};
use comet::api::ApiError;
use comet::bootstrap::load_builds_with_retry;

async fn login(t: &TestCtx) {
    mock_cmd(&t.server, "getMember", ok_json(member_body())).await;
    t.ctx.auth.login("KEY-AAAA-BBBB", false).await.unwrap();
}

fn scripts_body() -> serde_json::Value {
    json!([
        {"id": 5, "name": "better esp", "author": "typedef", "software": 4},
        {"id": 11, "name": "auto buy", "author": "rose", "software": 4},
        {"id": 20, "name": "radar", "author": "hany", "software": 4}
    ])
}

#[tokio::test]
async fn auxiliary_failures_default_without_blocking_member_data() {
    let t = test_ctx().await;
    login(&t).await;

    mock_cmd(&t.server, "getAllScripts", ok_json(scripts_body())).await;
    mock_cmd(&t.server, "getConfiguration", ok_json(json!({"master": {}}))).await;
    mock_cmd(
        &t.server,
        "getBuilds",
        ok_json(json!([{"name": "starter", "author": "rose", "scripts": [5], "projects": []}])),
    )
    .await;
    // Projects, perks, translations, and software all fail outright.
    for cmd in ["getFC2TProjects", "listPerks", "getTranslations", "getSoftware"] {
        mock_cmd(
            &t.server,
            cmd,
            ResponseTemplate::new(500).set_body_string("Internal Server Error"),
        )
        .await;
    }

    let result = t.ctx.bootstrapper.bootstrap().await.unwrap();

    assert!(!result.degraded);
    let member = result.member.expect("member is the critical call");
    assert_eq!(member.username, "typedef");

    // Successful calls arrive unchanged...
    assert_eq!(result.scripts.len(), 3);
    assert_eq!(result.builds.len(), 1);
    assert_eq!(result.configuration["master"], json!({}));
    // ...and the failed ones default independently.
    assert!(result.projects.is_empty());
    assert!(result.perks.is_empty());
    assert!(result.translations.is_empty());
    assert_eq!(result.software.version, "unknown");
}

#[tokio::test]
async fn invalid_key_never_reaches_the_fallback_path() {
    let t = test_ctx().await;
    login(&t).await;
    t.server.reset().await;

    mock_cmd(
        &t.server,
        "getMember",
        ok_json(json!({"code": 403, "message": INVALID_KEY_MSG})),
    )
    .await;
    mock_cmd(&t.server, "getAllScripts", ok_json(scripts_body())).await;
    mock_cmd(&t.server, "getConfiguration", ok_json(json!({}))).await;

    let err = t.ctx.bootstrapper.bootstrap().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidLicenseKey));

    // The primary dispatch hits scripts/configuration once each; the
    // fallback must not add a second round.
    assert_eq!(request_count(&t.server, "getAllScripts").await, 1);
    assert_eq!(request_count(&t.server, "getConfiguration").await, 1);
}

#[tokio::test]
async fn member_hash_mismatch_propagates_as_the_overall_failure() {
    let t = test_ctx().await;
    login(&t).await;
    t.server.reset().await;

    mock_cmd(
        &t.server,
        "getMember",
        ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "message": HASH_MISMATCH_MSG,
        })),
    )
    .await;

    let err = t.ctx.bootstrapper.bootstrap().await.unwrap_err();
    assert!(matches!(err, ApiError::HashMismatch));
    assert_eq!(request_count(&t.server, "getAllScripts").await, 1);
}

#[tokio::test]
async fn generic_member_failure_degrades_to_the_minimal_load() {
    let t = test_ctx().await;
    login(&t).await;
    t.server.reset().await;

    mock_cmd(
        &t.server,
        "getMember",
        ResponseTemplate::new(500).set_body_string("Fatal error on line 42"),
    )
    .await;
    mock_cmd(&t.server, "getAllScripts", ok_json(scripts_body())).await;
    mock_cmd(&t.server, "getConfiguration", ok_json(json!({"master": {}}))).await;

    let result = t.ctx.bootstrapper.bootstrap().await.unwrap();

    assert!(result.degraded);
    assert!(result.member.is_none());
    assert_eq!(result.scripts.len(), 3, "minimal load still carries scripts");
    assert_eq!(result.configuration["master"], json!({}));
    assert!(result.builds.is_empty());
    // Primary dispatch plus the fallback round.
    assert_eq!(request_count(&t.server, "getAllScripts").await, 2);
    assert_eq!(request_count(&t.server, "getConfiguration").await, 2);
}

#[tokio::test]
async fn member_handler_fires_before_slow_auxiliaries_settle() {
    let t = test_ctx().await;
    login(&t).await;
    t.server.reset().await;

    mock_cmd(&t.server, "getMember", ok_json(member_body())).await;
    // Every auxiliary call is slow; the member handler must not wait for them.
    let slow = || {
        ResponseTemplate::new(200)
            .set_body_json(json!([]))
            .set_delay(Duration::from_millis(400))
    };
    for cmd in [
        "getAllScripts",
        "getFC2TProjects",
        "getConfiguration",
        "listPerks",
        "getTranslations",
        "getSoftware",
        "getBuilds",
    ] {
        mock_cmd(&t.server, cmd, slow()).await;
    }

    let started = Instant::now();
    let result = t.ctx.bootstrapper.bootstrap().await.unwrap();
    let finished = Instant::now();

    assert!(result.member.is_some());
    let members = t.presenter.members.lock().unwrap();
    let (username, ready_at) = members.last().expect("member_ready fired");
    assert_eq!(username, "typedef");

    // The join barrier had to wait out the 400 ms auxiliaries, the member
    // handler did not.
    assert!(finished.duration_since(started) >= Duration::from_millis(400));
    assert!(ready_at.duration_since(started) < Duration::from_millis(300));
}

#[tokio::test]
async fn builds_retry_once_after_a_security_hash_failure() {
    let t = test_ctx().await;
    login(&t).await;

    mock_cmd_n(
        &t.server,
        "getBuilds",
        ok_json(json!({"code": 500, "message": "Security hash mismatch"})),
        1,
    )
    .await;
    mock_cmd(
        &t.server,
        "getBuilds",
        ok_json(json!([{"name": "starter", "author": "rose", "scripts": [5], "projects": []}])),
    )
    .await;

    let builds = load_builds_with_retry(&t.ctx.client).await;
    assert_eq!(builds.len(), 1, "the retry's result must be returned");
    assert_eq!(builds[0].name, "starter");
    assert_eq!(request_count(&t.server, "getBuilds").await, 2);
}

#[tokio::test]
async fn builds_other_failures_return_empty_without_retry() {
    let t = test_ctx().await;
    login(&t).await;

    mock_cmd(
        &t.server,
        "getBuilds",
        ok_json(json!({"code": 500, "message": "database unavailable"})),
    )
    .await;

    let builds = load_builds_with_retry(&t.ctx.client).await;
    assert!(builds.is_empty());
    assert_eq!(request_count(&t.server, "getBuilds").await, 1);
}
