//! Optimistic toggle commands: apply, confirm, compensate.

mod common;

use common::*;
use serde_json::json;
use wiremock::ResponseTemplate;

async fn login(t: &TestCtx) {
    mock_cmd(&t.server, "getMember", ok_json(member_body())).await;
    t.ctx.auth.login("KEY-AAAA-BBBB", false).await.unwrap();
}

#[tokio::test]
async fn failed_toggle_reverts_the_optimistic_flip() {
    let t = test_ctx().await;
    login(&t).await;
    assert!(t.ctx.state.member().unwrap().script_active(5));

    mock_cmd(
        &t.server,
        "toggleScriptStatus",
        ok_json(json!({"code": 500, "message": "script is locked"})),
    )
    .await;

    let mut toggler = t.ctx.toggler();
    let err = toggler.toggle_script(5, "better esp").await.unwrap_err();
    assert!(err.to_string().contains("script is locked"));

    // The flip was compensated: script 5 is active again.
    assert!(t.ctx.state.member().unwrap().script_active(5));
    let errors = t.presenter.error_messages();
    assert!(errors.iter().any(|m| m.contains("reverted")));
}

#[tokio::test]
async fn successful_toggle_confirms_against_the_server() {
    let t = test_ctx().await;
    login(&t).await;
    assert!(!t.ctx.state.member().unwrap().script_active(20));

    // The confirmation re-fetch returns the server's own view, which now
    // includes script 20.
    t.server.reset().await;
    mock_cmd(&t.server, "toggleScriptStatus", ok_json(json!({"message": "success"}))).await;
    let mut confirmed = member_body();
    confirmed["scripts"]
        .as_array_mut()
        .unwrap()
        .push(json!({"id": 20, "name": "radar", "author": "hany", "software": 4}));
    mock_cmd(&t.server, "getMember", ok_json(confirmed)).await;

    let mut toggler = t.ctx.toggler();
    let now_active = toggler.toggle_script(20, "radar").await.unwrap();
    assert!(now_active, "optimistic flip reports the new state");
    assert!(t.ctx.state.member().unwrap().script_active(20));

    toggler.settle().await;
    // After the debounced confirm, state is the server snapshot.
    let member = t.ctx.state.member().unwrap();
    assert!(member.script_active(20));
    assert_eq!(member.scripts.len(), 3);
}

#[tokio::test]
async fn project_toggle_follows_the_same_contract() {
    let t = test_ctx().await;
    login(&t).await;
    assert!(t.ctx.state.member().unwrap().project_active(3));

    mock_cmd(
        &t.server,
        "toggleProjectStatus",
        ResponseTemplate::new(500).set_body_string("nope"),
    )
    .await;

    let mut toggler = t.ctx.toggler();
    assert!(toggler.toggle_project(3, "overlay").await.is_err());
    assert!(t.ctx.state.member().unwrap().project_active(3), "reverted");
}

#[tokio::test]
async fn stale_confirmation_is_discarded_after_logout() {
    let t = test_ctx().await;
    login(&t).await;

    mock_cmd(&t.server, "toggleScriptStatus", ok_json(json!({"message": "success"}))).await;

    let mut toggler = t.ctx.toggler();
    toggler.toggle_script(20, "radar").await.unwrap();

    // Logout supersedes the session before the debounced confirm lands.
    t.ctx.auth.logout().await;
    toggler.settle().await;

    assert!(
        t.ctx.state.member().is_none(),
        "a confirm from the old session must not resurrect member state"
    );
}
