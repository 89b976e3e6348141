mod common;

use axum::http::StatusCode;
use common::{date, TestApp};
use reconciliation_matcher::config::MatchingConfig;
use reconciliation_matcher::services::ReconciliationEvent;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn exact_match_is_settled_automatically() {
    let app = TestApp::new();
    let line = app.add_line(dec!(1000.00), "2024-03-10", "PIX recebido de Joao Silva");
    let recv = app.add_receivable(dec!(1000.00), "2024-03-09", "Joao Silva");

    let (status, body) = app.post("/reconciliation/match", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autoApproved"], 1);
    assert_eq!(body["requiresReview"], json!([]));
    assert_eq!(body["unmatched"], 0);

    let line = app.store.statement_line(line.line_id).unwrap();
    assert_eq!(line.status, "reconciled");
    assert_eq!(line.receivable_id, Some(recv.receivable_id));
    assert_eq!(
        app.store.receivable(recv.receivable_id).unwrap().payment_date,
        Some(date("2024-03-10"))
    );
}

#[tokio::test]
async fn exact_amount_only_requires_review() {
    let app = TestApp::new();
    let line = app.add_line(dec!(1000.00), "2024-03-10", "PIX recebido de Joao Silva");
    let recv = app.add_receivable(dec!(1000.00), "2024-02-01", "Empresa XYZ");

    let (status, body) = app.post("/reconciliation/match", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autoApproved"], 0);
    assert_eq!(body["unmatched"], 0);

    let candidate = &body["requiresReview"][0];
    assert_eq!(candidate["statementId"], line.line_id.to_string());
    assert_eq!(candidate["transactionId"], recv.receivable_id.to_string());
    assert_eq!(candidate["confidence"], 50);
    assert_eq!(candidate["matchReason"], "valor exato");
    assert_eq!(candidate["amount"], json!(1000.0));
    assert_eq!(candidate["expectedAmount"], json!(1000.0));
    assert_eq!(candidate["statementDate"], "2024-03-10");
    assert_eq!(candidate["dueDate"], "2024-02-01");
    assert_eq!(candidate["customerName"], "Empresa XYZ");

    assert_eq!(app.store.statement_line(line.line_id).unwrap().status, "pending");
}

#[tokio::test]
async fn no_receivables_returns_everything_unmatched() {
    let app = TestApp::new();
    app.add_line(dec!(10.00), "2024-03-10", "PIX A");
    app.add_line(dec!(20.00), "2024-03-11", "PIX B");

    let (status, body) = app.post("/reconciliation/match", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"autoApproved": 0, "requiresReview": [], "unmatched": 2}));
}

#[tokio::test]
async fn empty_tenant_is_not_an_error() {
    let app = TestApp::new();

    let (status, body) = app.post("/reconciliation/match", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"autoApproved": 0, "requiresReview": [], "unmatched": 0}));
}

#[tokio::test]
async fn rerunning_the_pass_does_not_settle_twice() {
    let app = TestApp::new();
    app.add_line(dec!(1000.00), "2024-03-10", "PIX recebido de Joao Silva");
    app.add_line(dec!(300.00), "2024-03-10", "deposito");
    app.add_receivable(dec!(1000.00), "2024-03-09", "Joao Silva");
    app.add_receivable(dec!(300.00), "2024-01-10", "Beta");

    let (_, first) = app.post("/reconciliation/match", json!({})).await;
    let (_, second) = app.post("/reconciliation/match", json!({})).await;

    assert_eq!(first["autoApproved"], 1);
    assert_eq!(second["autoApproved"], 0);
    assert_eq!(first["requiresReview"], second["requiresReview"]);
}

#[tokio::test]
async fn bank_account_filter_limits_the_pass() {
    let app = TestApp::new();
    app.add_line(dec!(1000.00), "2024-03-10", "PIX recebido de Joao Silva");
    app.add_receivable(dec!(1000.00), "2024-03-09", "Joao Silva");

    let (status, body) = app
        .post(
            "/reconciliation/match",
            json!({"bankAccountId": uuid::Uuid::new_v4()}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autoApproved"], 0);
    assert_eq!(body["unmatched"], 0);
}

#[tokio::test]
async fn other_tenants_data_is_invisible() {
    let app = TestApp::new();
    app.add_line(dec!(1000.00), "2024-03-10", "PIX recebido de Joao Silva");
    app.add_receivable(dec!(1000.00), "2024-03-09", "Joao Silva");

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/reconciliation/match")
        .header("content-type", "application/json")
        .header("X-Tenant-ID", uuid::Uuid::new_v4().to_string())
        .body(axum::body::Body::from("{}"))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autoApproved"], 0);
    assert_eq!(body["unmatched"], 0);
}

#[tokio::test]
async fn missing_tenant_header_is_unauthorized() {
    let app = TestApp::new();

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/reconciliation/match")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{}"))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("X-Tenant-ID"));
}

#[tokio::test]
async fn pass_completion_is_published() {
    let app = TestApp::new();
    let mut rx = app.events.subscribe();
    app.add_line(dec!(10.00), "2024-03-10", "PIX A");

    app.post("/reconciliation/match", json!({})).await;

    match rx.recv().await.unwrap() {
        ReconciliationEvent::MatchPassCompleted {
            tenant_id,
            unmatched,
            ..
        } => {
            assert_eq!(tenant_id, app.tenant_id);
            assert_eq!(unmatched, 1);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn debit_lines_are_left_out_of_the_pass() {
    let app = TestApp::new();
    let line = app.add_debit_line(dec!(1000.00), "2024-03-10", "PIX enviado a Joao Silva");
    let recv = app.add_receivable(dec!(1000.00), "2024-03-10", "Joao Silva");

    let (status, body) = app.post("/reconciliation/match", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"autoApproved": 0, "requiresReview": [], "unmatched": 0}));
    assert_eq!(app.store.statement_line(line.line_id).unwrap().status, "pending");
    assert!(app.store.receivable(recv.receivable_id).unwrap().is_open());
}

#[tokio::test]
async fn pending_line_limit_keeps_the_newest_lines() {
    let app = TestApp::with_config(MatchingConfig {
        pending_line_limit: 1,
        ..MatchingConfig::default()
    });
    let older = app.add_line(dec!(1000.00), "2024-03-01", "PIX recebido de Joao Silva");
    app.add_line(dec!(7.77), "2024-03-10", "tarifa");
    let recv = app.add_receivable(dec!(1000.00), "2024-03-01", "Joao Silva");

    let (status, body) = app.post("/reconciliation/match", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autoApproved"], 0);
    assert_eq!(body["unmatched"], 1);
    assert_eq!(app.store.statement_line(older.line_id).unwrap().status, "pending");
    assert!(app.store.receivable(recv.receivable_id).unwrap().is_open());
}
