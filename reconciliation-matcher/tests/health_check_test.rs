mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestApp;

#[tokio::test]
async fn health_check_reports_ok() {
    let app = TestApp::new();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "reconciliation-matcher");
}

#[tokio::test]
async fn readiness_needs_no_tenant() {
    let app = TestApp::new();

    let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_are_exposed_as_text() {
    let app = TestApp::new();
    reconciliation_matcher::services::init_metrics();

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = tower::util::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
}
