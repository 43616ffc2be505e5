//! E2E tests: repository validation.

use serde_json::json;

use super::mock_services::unreachable_url;
use super::test_helpers::*;

#[actix_rt::test]
async fn test_validate_public_repository() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;

    let (status, body) = post_json(
        &app,
        "/api/repository/validate",
        json!({"repositoryUrl": "https://github.com/acme/widgets.git"}),
    )
    .await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["name"], "acme/widgets");
    assert_eq!(body["description"], "Widget storefront");
    assert_eq!(body["lastUpdated"], "3/5/2024");
}

#[actix_rt::test]
async fn test_validate_private_repository_with_token() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;

    let (status, body) = post_json(
        &app,
        "/api/repository/validate",
        json!({"repositoryUrl": "https://github.com/acme/private", "accessToken": "ghp_valid"}),
    )
    .await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["name"], "acme/private");
    assert_eq!(body["description"], "No description provided");
    assert_eq!(body["lastUpdated"], "11/20/2024");
}

#[actix_rt::test]
async fn test_validate_rejects_bad_input_and_credentials() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;

    let cases = [
        (
            json!({"repositoryUrl": "https://gitlab.com/acme/widgets"}),
            "INVALID_URL_FORMAT",
        ),
        (
            json!({"repositoryUrl": "https://github.com/acme/private"}),
            "REPOSITORY_NOT_FOUND",
        ),
        (
            json!({"repositoryUrl": "https://github.com/acme/private", "accessToken": "ghp_expired"}),
            "INVALID_CREDENTIAL",
        ),
        (
            json!({"repositoryUrl": "https://github.com/acme/private", "accessToken": "ghp_readonly"}),
            "INSUFFICIENT_PERMISSION",
        ),
        (
            json!({"repositoryUrl": "https://github.com/acme/flaky"}),
            "HOST_API_ERROR",
        ),
        (json!({}), "INVALID_INPUT"),
    ];

    for (request, code) in cases {
        let (status, body) = post_json(&app, "/api/repository/validate", request.clone()).await;
        assert_eq!(status, 400, "{} -> {}", request, body);
        assert_eq!(body["code"], code, "{} -> {}", request, body);
        assert!(body["error"].is_string());
    }
}

#[actix_rt::test]
async fn test_validate_not_found_message_mentions_token() {
    let ctx = TestContext::start().await;
    let app = create_test_app(&ctx).await;

    let (_, without_token) = post_json(
        &app,
        "/api/repository/validate",
        json!({"repositoryUrl": "https://github.com/acme/private"}),
    )
    .await;
    let (_, with_token) = post_json(
        &app,
        "/api/repository/validate",
        json!({"repositoryUrl": "https://github.com/acme/private", "accessToken": "ghp_other"}),
    )
    .await;

    assert!(
        without_token["error"]
            .as_str()
            .unwrap()
            .contains("provide an access token")
    );
    assert!(
        with_token["error"]
            .as_str()
            .unwrap()
            .contains("token permissions")
    );
}

#[actix_rt::test]
async fn test_validate_unreachable_host_is_server_error() {
    let ctx = TestContext::with_github_url(&unreachable_url()).await;
    let app = create_test_app(&ctx).await;

    let (status, body) = post_json(
        &app,
        "/api/repository/validate",
        json!({"repositoryUrl": "https://github.com/acme/widgets"}),
    )
    .await;

    assert_eq!(status, 500, "{}", body);
    assert_eq!(body["code"], "HOST_UNAVAILABLE");
}
