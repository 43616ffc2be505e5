//! E2E tests: generated file preview.

use test_converter_lib::db::ConversionStore;
use test_converter_lib::models::{ConversionId, CreateConversionRequest};

use super::mock_services::{GENERATED_KEYWORDS, GENERATED_TEST};
use super::test_helpers::*;

#[actix_rt::test]
async fn test_file_content_matches_generated_and_written_files() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;
    let id = completed_conversion(&app).await;
    let output = ctx.workspace.output_dir(&ConversionId::new(id.as_str()));

    let (status, body) = get_json(&app, &format!("/api/conversions/{}/files/login.robot", id)).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["content"], GENERATED_TEST);
    let on_disk = tokio::fs::read_to_string(output.join("tests/login.robot"))
        .await
        .unwrap();
    assert_eq!(on_disk, GENERATED_TEST);

    let (status, body) = get_json(
        &app,
        &format!("/api/conversions/{}/files/login_keywords.robot", id),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["content"], GENERATED_KEYWORDS);
    let on_disk = tokio::fs::read_to_string(output.join("resources/login_keywords.robot"))
        .await
        .unwrap();
    assert_eq!(on_disk, GENERATED_KEYWORDS);
}

#[actix_rt::test]
async fn test_file_content_matches_path_suffix() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;
    let id = completed_conversion(&app).await;

    let (status, body) = get_json(
        &app,
        &format!("/api/conversions/{}/files/tests/login.robot", id),
    )
    .await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["content"], GENERATED_TEST);
}

#[actix_rt::test]
async fn test_file_content_errors() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;
    let id = completed_conversion(&app).await;

    let (status, body) =
        get_json(&app, &format!("/api/conversions/{}/files/missing.robot", id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "File missing.robot not found");

    let (status, body) = get_json(&app, &format!("/api/conversions/{}/files/", id)).await;
    assert_eq!(status, 404, "{}", body);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = get_json(&app, &format!("/api/conversions/{}/files/%20", id)).await;
    assert_eq!(status, 404);

    let (status, _) =
        get_json(&app, &format!("/api/conversions/{}/files/..login.robot", id)).await;
    assert_eq!(status, 400);

    let (status, _) = get_json(&app, "/api/conversions/999/files/login.robot").await;
    assert_eq!(status, 404);

    let pending = ctx
        .store
        .create(
            serde_json::from_value::<CreateConversionRequest>(conversion_body(
                "https://github.com/acme/widgets",
                "sk-test",
            ))
            .unwrap()
            .validate()
            .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = get_json(
        &app,
        &format!("/api/conversions/{}/files/login.robot", pending.id),
    )
    .await;
    assert_eq!(status, 400, "{}", body);
}
