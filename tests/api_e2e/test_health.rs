//! E2E tests: health and readiness.

use super::test_helpers::*;

#[actix_rt::test]
async fn test_health_reports_healthy() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;

    let (status, body) = get_json(&app, "/api/health").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[actix_rt::test]
async fn test_ready_follows_work_directory() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;

    let (status, body) = get_json(&app, "/api/ready").await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["status"], "ready");

    tokio::fs::remove_dir_all(ctx.workspace.root()).await.unwrap();

    let (status, body) = get_json(&app, "/api/ready").await;
    assert_eq!(status, 503);
    assert_eq!(body["code"], "NOT_READY");
}
