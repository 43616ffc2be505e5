//! Mock collaborators for E2E tests.
//!
//! The repository host API and the model API are real HTTP servers on
//! ephemeral ports; cloning and publishing are replaced by in-process fakes
//! that touch only the local filesystem.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, get, post, web};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use test_converter_lib::services::git::{GitError, PublishRequest};
use test_converter_lib::services::{Publisher, WorkingCopyProvider};

/// Content of the generated primary file returned by the mock model.
pub const GENERATED_TEST: &str = "*** Settings ***\nResource    ../resources/login_keywords.robot\n\n*** Test Cases ***\nValid Login\n    Open Login Page\n    Submit Credentials    alice    secret\n";

/// Content of the generated resource file returned by the mock model.
pub const GENERATED_KEYWORDS: &str = "*** Keywords ***\nOpen Login Page\n    Open Browser    ${URL}    chrome\n";

// ============================================================================
// Repository host API
// ============================================================================

#[get("/repos/{owner}/{name}")]
async fn mock_repo(req: HttpRequest, path: web::Path<(String, String)>) -> HttpResponse {
    let (owner, name) = path.into_inner();
    let auth = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match (owner.as_str(), name.as_str()) {
        ("acme", "widgets") => HttpResponse::Ok().json(json!({
            "full_name": "acme/widgets",
            "description": "Widget storefront",
            "updated_at": "2024-03-05T10:00:00Z"
        })),
        ("acme", "private") => match auth.as_str() {
            "Bearer ghp_valid" => HttpResponse::Ok().json(json!({
                "full_name": "acme/private",
                "description": null,
                "updated_at": "2024-11-20T08:30:00Z"
            })),
            "Bearer ghp_expired" => HttpResponse::Unauthorized().finish(),
            "Bearer ghp_readonly" => HttpResponse::Forbidden().finish(),
            _ => HttpResponse::NotFound().finish(),
        },
        ("acme", "flaky") => HttpResponse::BadGateway().finish(),
        _ => HttpResponse::NotFound().finish(),
    }
}

/// Start a mock GitHub REST API and return its base URL.
pub fn start_mock_github() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = HttpServer::new(|| App::new().service(mock_repo))
        .listen(listener)
        .unwrap()
        .disable_signals()
        .workers(1)
        .run();
    tokio::spawn(server);
    format!("http://127.0.0.1:{}", port)
}

/// A base URL nothing listens on.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

// ============================================================================
// Model API
// ============================================================================

fn completion(content: Value) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content.to_string()}
        }]
    }))
}

#[post("/chat/completions")]
async fn mock_completions(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    let key = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    let system = body["messages"][0]["content"].as_str().unwrap_or_default();
    let is_analysis = system.contains("Analyze code");

    if key == "sk-slow" {
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    if is_analysis {
        if key == "sk-fail-analysis" {
            return HttpResponse::InternalServerError()
                .json(json!({"error": {"message": "model overloaded"}}));
        }
        return completion(json!({
            "testFiles": [{
                "path": "src/test/java/LoginTest.java",
                "testCases": [{"name": "validLogin", "steps": ["open", "submit"]}],
                "keywords": ["Open Login Page"],
                "complexity": "low"
            }],
            "framework": "TestNG",
            "language": "Java",
            "patterns": [{"type": "page-object", "description": "LoginPage", "occurrences": 1}],
            "dependencies": ["selenium"]
        }));
    }

    let primary_path = if key == "sk-unsafe" {
        "../escape.robot"
    } else {
        "tests/login.robot"
    };
    completion(json!({
        "primaryFiles": [{"path": primary_path, "content": GENERATED_TEST, "testCases": 1}],
        "resourceFiles": [{"path": "resources/login_keywords.robot", "content": GENERATED_KEYWORDS, "keywords": 1}],
        "requirements": ["robotframework", "robotframework-seleniumlibrary"],
        "summary": {
            "totalTestFiles": 1,
            "totalTestCases": 1,
            "totalResourceFiles": 1,
            "warnings": [],
            "recommendations": ["Move credentials to a variables file"]
        }
    }))
}

/// Start a mock OpenAI-compatible API and return its base URL.
///
/// Behavior is selected by the API key: `sk-test` succeeds, `sk-slow` succeeds
/// after a delay, `sk-fail-analysis` fails the analysis call and `sk-unsafe`
/// returns a generated path that escapes the output directory.
pub fn start_mock_model() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = HttpServer::new(|| App::new().service(mock_completions))
        .listen(listener)
        .unwrap()
        .disable_signals()
        .workers(1)
        .run();
    tokio::spawn(server);
    format!("http://127.0.0.1:{}", port)
}

// ============================================================================
// Working copies and publishing
// ============================================================================

/// Writes a small Java/TestNG repository instead of cloning.
#[derive(Default)]
pub struct FakeCheckout {
    pub fetched: Mutex<Vec<String>>,
}

#[async_trait]
impl WorkingCopyProvider for FakeCheckout {
    async fn fetch(
        &self,
        url: &str,
        _token: Option<&SecretString>,
        target: &Path,
    ) -> Result<(), GitError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if url.contains("/missing") {
            return Err(GitError::CommandFailed {
                operation: "clone",
                message: "Repository not found".to_string(),
            });
        }

        tokio::fs::create_dir_all(target.join("src/test/java")).await?;
        tokio::fs::create_dir_all(target.join("src/main/java")).await?;
        tokio::fs::create_dir_all(target.join(".git")).await?;
        tokio::fs::write(target.join("pom.xml"), "<project/>").await?;
        tokio::fs::write(
            target.join("src/test/java/LoginTest.java"),
            "public class LoginTest { @Test public void validLogin() {} }",
        )
        .await?;
        tokio::fs::write(
            target.join("src/main/java/Main.java"),
            "public class Main {}",
        )
        .await?;
        tokio::fs::write(target.join(".git/HEAD"), "ref: refs/heads/main").await?;
        Ok(())
    }
}

/// One recorded publish call.
#[derive(Debug, Clone)]
pub struct PublishCall {
    pub source_dir: PathBuf,
    pub target_url: String,
    pub token: String,
    pub branch: String,
    pub commit_message: String,
    pub readme_present: bool,
}

/// Records publish calls; fails for target URLs containing `/readonly`.
#[derive(Default)]
pub struct RecordingPublisher {
    pub calls: Mutex<Vec<PublishCall>>,
}

impl RecordingPublisher {
    pub fn calls(&self) -> Vec<PublishCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, request: PublishRequest<'_>) -> Result<(), GitError> {
        self.calls.lock().unwrap().push(PublishCall {
            source_dir: request.source_dir.to_path_buf(),
            target_url: request.target_url.to_string(),
            token: request.token.expose_secret().to_string(),
            branch: request.branch.to_string(),
            commit_message: request.commit_message.to_string(),
            readme_present: request.source_dir.join("README.md").is_file(),
        });

        if request.target_url.contains("/readonly") {
            return Err(GitError::CommandFailed {
                operation: "push",
                message: "Permission denied".to_string(),
            });
        }
        Ok(())
    }
}
