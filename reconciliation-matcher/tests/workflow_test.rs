mod common;

use axum::http::StatusCode;
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;

const ENTITY: &str = "invoice";

fn setup() -> (TestApp, uuid::Uuid) {
    let app = TestApp::new();
    app.store
        .allow_transition(ENTITY, "draft", "submitted", "submit")
        .unwrap();
    app.store
        .allow_transition(ENTITY, "submitted", "paid", "pay")
        .unwrap();
    let instance = app
        .store
        .register_workflow_instance(app.tenant_id, ENTITY, "draft")
        .unwrap();
    (app, instance)
}

#[tokio::test]
async fn allowed_transition_moves_the_instance() {
    let (app, instance) = setup();

    let (status, body) = app
        .post(
            &format!("/workflow/instances/{}/transitions", instance),
            json!({"targetState": "submitted", "action": "submit"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "fromState": "draft", "toState": "submitted"})
    );

    let history = app.store.history(instance);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_state.as_deref(), Some("draft"));
    assert_eq!(history[0].actor.as_deref(), Some("reviewer-1"));
}

#[tokio::test]
async fn disallowed_transition_reports_the_reason() {
    let (app, instance) = setup();

    let (status, body) = app
        .post(
            &format!("/workflow/instances/{}/transitions", instance),
            json!({"targetState": "paid", "action": "pay"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["fromState"], "draft");
    assert_eq!(body["error"], "transition draft -> paid via pay is not allowed");
    assert!(app.store.history(instance).is_empty());
}

#[tokio::test]
async fn wrong_action_for_a_valid_edge_is_refused() {
    let (app, instance) = setup();

    let (_, body) = app
        .post(
            &format!("/workflow/instances/{}/transitions", instance),
            json!({"targetState": "submitted", "action": "pay"}),
        )
        .await;

    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_instance_is_reported_not_raised() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            &format!("/workflow/instances/{}/transitions", uuid::Uuid::new_v4()),
            json!({"targetState": "approved", "action": "approve"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "workflow instance not found");
}

#[tokio::test]
async fn blank_fields_fail_validation() {
    let (app, instance) = setup();

    let (status, _) = app
        .post(
            &format!("/workflow/instances/{}/transitions", instance),
            json!({"targetState": "", "action": "submit"}),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn approval_requests_are_not_moved_by_generic_transitions() {
    let app = TestApp::new();
    let line = app.add_line(dec!(120.00), "2024-03-10", "deposito A");
    let recv = app.add_receivable(dec!(120.00), "2024-01-10", "Alfa");

    let (_, body) = app
        .post(
            "/reconciliation/approvals",
            json!({"matches": [
                {"statementId": line.line_id, "transactionId": recv.receivable_id, "confidence": 60}
            ]}),
        )
        .await;
    let approval_id = body["approvalId"].as_str().unwrap().to_string();
    app.post(
        &format!("/reconciliation/approvals/{}/decision", approval_id),
        json!({"decision": "approve"}),
    )
    .await;

    let (status, body) = app
        .post(
            &format!("/workflow/instances/{}/transitions", approval_id),
            json!({"targetState": "executed", "action": "execute"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["fromState"], "approved");
    assert_eq!(
        body["error"],
        "approval requests are driven through /reconciliation/approvals"
    );

    let (status, executed) = app
        .post(
            &format!("/reconciliation/approvals/{}/execute", approval_id),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(executed, json!({"succeeded": 1, "failed": 0}));
    assert!(!app.store.receivable(recv.receivable_id).unwrap().is_open());
}
