//! Shared test helpers for API E2E tests.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use test_converter_lib::api;
use test_converter_lib::db::{ConversionStore, IdStrategy, MemoryStore};
use test_converter_lib::services::{
    ConversionPipeline, GitHubClient, OpenAiClient, Publisher, RepositoryHost, WorkerHandle,
    Workspace, spawn_worker,
};

use super::mock_services::{
    FakeCheckout, RecordingPublisher, start_mock_github, start_mock_model,
};

/// Everything one test app runs against.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub host: Arc<GitHubClient>,
    pub checkout: Arc<FakeCheckout>,
    pub publisher: Arc<RecordingPublisher>,
    pub workspace: Workspace,
    pub worker: WorkerHandle,
    _work_dir: TempDir,
}

impl TestContext {
    /// Start mock servers and a worker backed by a fresh sequential store.
    pub async fn start() -> Self {
        Self::with_github_url(&start_mock_github()).await
    }

    /// Same as [`TestContext::start`] with a custom repository host API base.
    pub async fn with_github_url(github_url: &str) -> Self {
        let work_dir = TempDir::new().unwrap();
        let workspace = Workspace::new(work_dir.path().join("code-converter"));
        workspace.ensure().await.unwrap();

        let store = Arc::new(MemoryStore::new(IdStrategy::Sequential));
        let host = Arc::new(GitHubClient::new(github_url, Duration::from_secs(5)).unwrap());
        let model = Arc::new(OpenAiClient::new(&start_mock_model(), Duration::from_secs(5)).unwrap());
        let checkout = Arc::new(FakeCheckout::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let pipeline = Arc::new(ConversionPipeline::new(
            store.clone(),
            host.clone(),
            checkout.clone(),
            model,
            workspace.clone(),
        ));
        let worker = spawn_worker(pipeline, 4, CancellationToken::new());

        Self {
            store,
            host,
            checkout,
            publisher,
            workspace,
            worker,
            _work_dir: work_dir,
        }
    }
}

/// Create a test app wired to the context's collaborators.
pub async fn create_test_app(
    ctx: &TestContext,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    let store: Arc<dyn ConversionStore> = ctx.store.clone();
    let host: Arc<dyn RepositoryHost> = ctx.host.clone();
    let publisher: Arc<dyn Publisher> = ctx.publisher.clone();

    test::init_service(
        App::new()
            .app_data(web::Data::from(store))
            .app_data(web::Data::from(host))
            .app_data(web::Data::from(publisher))
            .app_data(web::Data::new(ctx.worker.clone()))
            .app_data(web::Data::new(ctx.workspace.clone()))
            .app_data(api::json_config())
            .app_data(api::query_config())
            .service(web::scope("/api").configure(api::configure)),
    )
    .await
}

/// A complete, valid conversion request.
pub fn conversion_body(repository_url: &str, model_api_key: &str) -> Value {
    json!({
        "repositoryUrl": repository_url,
        "sourceLanguage": "Java",
        "sourceFramework": "TestNG",
        "sourceAutomationTool": "Selenium",
        "targetFramework": "Robot Framework",
        "targetLibrary": "SeleniumLibrary",
        "testStructure": "page-object",
        "modelApiKey": model_api_key,
    })
}

/// POST a JSON body and return status and parsed body.
pub async fn post_json<S>(app: &S, uri: &str, body: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// GET a JSON endpoint and return status and parsed body.
pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Create a conversion and return its id.
pub async fn create_conversion<S>(app: &S, repository_url: &str, model_api_key: &str) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (status, body) = post_json(
        app,
        "/api/conversions",
        conversion_body(repository_url, model_api_key),
    )
    .await;
    assert_eq!(status, 200, "Failed to create conversion: {}", body);
    body["id"].as_str().unwrap().to_string()
}

/// Poll a conversion until it reaches a terminal status.
///
/// Returns every observed snapshot, the last one terminal.
pub async fn wait_for_terminal<S>(app: &S, id: &str) -> Vec<Value>
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut snapshots = Vec::new();
    for _ in 0..500 {
        let (status, body) = get_json(app, &format!("/api/conversions/{}", id)).await;
        assert_eq!(status, 200, "Polling failed: {}", body);
        let done = matches!(body["status"].as_str(), Some("completed") | Some("failed"));
        snapshots.push(body);
        if done {
            return snapshots;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Conversion {} did not finish: {:?}", id, snapshots.last());
}

/// Create a conversion and wait until it completes successfully.
pub async fn completed_conversion<S>(app: &S) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let id = create_conversion(app, "https://github.com/acme/widgets", "sk-test").await;
    let snapshots = wait_for_terminal(app, &id).await;
    let last = snapshots.last().unwrap();
    assert_eq!(last["status"], "completed", "Conversion failed: {}", last);
    id
}
