//! E2E tests: zip download and deployment.

use std::io::{Cursor, Read};

use actix_web::test;
use serde_json::{Value, json};

use test_converter_lib::db::ConversionStore;
use test_converter_lib::models::{
    ConversionStatus, ConversionUpdate, CreateConversionRequest, NewConversion,
};

use super::mock_services::GENERATED_TEST;
use super::test_helpers::*;

fn new_conversion() -> NewConversion {
    serde_json::from_value::<CreateConversionRequest>(conversion_body(
        "https://github.com/acme/widgets",
        "sk-test",
    ))
    .unwrap()
    .validate()
    .unwrap()
}

/// Store jobs directly (bypassing the worker) in every non-completed status.
async fn jobs_in_each_open_status(ctx: &TestContext) -> Vec<(ConversionStatus, String)> {
    let mut jobs = Vec::new();

    let pending = ctx.store.create(new_conversion()).await.unwrap();
    jobs.push((ConversionStatus::Pending, pending.id.to_string()));

    let analyzing = ctx.store.create(new_conversion()).await.unwrap();
    ctx.store
        .update(
            &analyzing.id,
            ConversionUpdate::stage(ConversionStatus::Analyzing, 25),
        )
        .await
        .unwrap();
    jobs.push((ConversionStatus::Analyzing, analyzing.id.to_string()));

    let converting = ctx.store.create(new_conversion()).await.unwrap();
    for update in [
        ConversionUpdate::stage(ConversionStatus::Analyzing, 10),
        ConversionUpdate::stage(ConversionStatus::Converting, 70),
    ] {
        ctx.store.update(&converting.id, update).await.unwrap();
    }
    jobs.push((ConversionStatus::Converting, converting.id.to_string()));

    let failed = ctx.store.create(new_conversion()).await.unwrap();
    ctx.store
        .update(&failed.id, ConversionUpdate::failed("Code analysis failed"))
        .await
        .unwrap();
    jobs.push((ConversionStatus::Failed, failed.id.to_string()));

    jobs
}

fn deploy_body() -> Value {
    json!({
        "targetUrl": "https://github.com/acme/widgets-robot.git",
        "accessToken": "ghp_deploy",
        "branch": "robot-conversion",
        "commitMessage": "Add converted Robot Framework suite"
    })
}

#[actix_rt::test]
async fn test_download_returns_zip_attachment() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;
    let id = completed_conversion(&app).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/conversions/{}/download", id))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/zip"
    );
    assert_eq!(
        resp.headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap(),
        format!(
            "attachment; filename=\"robot-framework-conversion-{}.zip\"",
            id
        )
    );

    let bytes = test::read_body(resp).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "README.md",
            "requirements.txt",
            "resources/",
            "resources/login_keywords.robot",
            "tests/",
            "tests/login.robot",
        ]
    );

    let mut content = String::new();
    archive
        .by_name("tests/login.robot")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, GENERATED_TEST);
}

#[actix_rt::test]
async fn test_download_refuses_unfinished_jobs() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;

    for (status, id) in jobs_in_each_open_status(&ctx).await {
        let (code, body) = get_json(&app, &format!("/api/conversions/{}/download", id)).await;
        assert_eq!(code, 400, "{:?}: {}", status, body);
        assert_eq!(body["code"], "INVALID_INPUT");
        assert!(body["error"].as_str().unwrap().contains(status.as_str()));
    }

    let (code, _) = get_json(&app, "/api/conversions/404/download").await;
    assert_eq!(code, 404);
}

#[actix_rt::test]
async fn test_download_without_output_is_server_error() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;
    let id = completed_conversion(&app).await;

    let output = ctx
        .workspace
        .output_dir(&test_converter_lib::models::ConversionId::new(id.as_str()));
    tokio::fs::remove_dir_all(&output).await.unwrap();

    let (code, body) = get_json(&app, &format!("/api/conversions/{}/download", id)).await;
    assert_eq!(code, 500);
    assert_eq!(body["code"], "ARCHIVE_ERROR");
}

#[actix_rt::test]
async fn test_deploy_requires_every_field() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;
    let id = completed_conversion(&app).await;

    for field in ["targetUrl", "accessToken", "branch", "commitMessage"] {
        let mut body = deploy_body();
        body.as_object_mut().unwrap().remove(field);

        let (status, resp) =
            post_json(&app, &format!("/api/conversions/{}/deploy", id), body).await;

        assert_eq!(status, 400, "missing {}: {}", field, resp);
        assert_eq!(resp["details"][0]["field"], field);
    }

    let mut blank = deploy_body();
    blank["branch"] = json!("   ");
    let (status, _) = post_json(&app, &format!("/api/conversions/{}/deploy", id), blank).await;
    assert_eq!(status, 400);

    assert!(ctx.publisher.calls().is_empty());
}

#[actix_rt::test]
async fn test_deploy_checks_job_before_publishing() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;

    let (status, _) = post_json(&app, "/api/conversions/77/deploy", deploy_body()).await;
    assert_eq!(status, 404);

    for (job_status, id) in jobs_in_each_open_status(&ctx).await {
        let (status, body) =
            post_json(&app, &format!("/api/conversions/{}/deploy", id), deploy_body()).await;
        assert_eq!(status, 400, "{:?}: {}", job_status, body);
    }

    assert!(ctx.publisher.calls().is_empty());
}

#[actix_rt::test]
async fn test_deploy_publishes_output_directory() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;
    let id = completed_conversion(&app).await;

    let (status, body) =
        post_json(&app, &format!("/api/conversions/{}/deploy", id), deploy_body()).await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Code deployed successfully");

    let calls = ctx.publisher.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(
        call.source_dir,
        ctx.workspace
            .output_dir(&test_converter_lib::models::ConversionId::new(id.as_str()))
    );
    assert_eq!(call.target_url, "https://github.com/acme/widgets-robot.git");
    assert_eq!(call.token, "ghp_deploy");
    assert_eq!(call.branch, "robot-conversion");
    assert_eq!(call.commit_message, "Add converted Robot Framework suite");
    assert!(call.readme_present);
}

#[actix_rt::test]
async fn test_deploy_failure_is_server_error() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;
    let id = completed_conversion(&app).await;

    let mut body = deploy_body();
    body["targetUrl"] = json!("https://github.com/acme/readonly.git");
    let (status, resp) = post_json(&app, &format!("/api/conversions/{}/deploy", id), body).await;

    assert_eq!(status, 500);
    assert_eq!(resp["code"], "PUBLISH_ERROR");
    assert!(!resp.to_string().contains("ghp_deploy"));
}
