//! Test Converter Server - Main entry point.
//!
//! Starts the Actix-web server with configured routes, middleware and the
//! background conversion worker.

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use test_converter_lib::api::{self, ApiDoc};
use test_converter_lib::config::{Config, LogFormat};
use test_converter_lib::db::{ConversionStore, MemoryStore};
use test_converter_lib::middleware::RequestLogger;
use test_converter_lib::services::{
    ConversionPipeline, GitCli, GitHubClient, ModelClient, OpenAiClient, Publisher,
    RepositoryHost, WorkingCopyProvider, Workspace, spawn_worker,
};

/// Time in-flight conversions get to record their outcome on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,test_converter_lib=info"));

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, external API URLs must use https://");
            error!("  - In production, TC_ID_STRATEGY must be 'uuid'");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    info!("========================================");
    info!("  Test Converter Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let workspace = Workspace::new(config.work_dir.clone());
    if let Err(e) = workspace.ensure().await {
        error!(
            "Failed to create work directory {}: {}",
            workspace.root().display(),
            e
        );
        std::process::exit(1);
    }
    info!("Work directory: {}", workspace.root().display());

    let host: Arc<dyn RepositoryHost> = Arc::new(
        GitHubClient::new(&config.github_api_url, config.host_timeout())
            .map_err(std::io::Error::other)?,
    );
    let model: Arc<dyn ModelClient> = Arc::new(
        OpenAiClient::new(&config.model_api_url, config.model_timeout())
            .map_err(std::io::Error::other)?,
    );
    let git = Arc::new(GitCli::new(config.git_timeout()));
    let working_copies: Arc<dyn WorkingCopyProvider> = git.clone();
    let publisher: Arc<dyn Publisher> = git;
    let store: Arc<dyn ConversionStore> = Arc::new(MemoryStore::new(config.id_strategy));

    let pipeline = Arc::new(ConversionPipeline::new(
        store.clone(),
        host.clone(),
        working_copies,
        model,
        workspace.clone(),
    ));

    let cancel = CancellationToken::new();
    let worker = spawn_worker(pipeline, config.max_concurrent_conversions, cancel);

    let bind_address = config.bind_address();
    let cors_origin = config.cors_origin.clone();
    let openapi = ApiDoc::openapi();

    let worker_count = if config.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };
    info!("API documentation at http://{}/api/docs/", bind_address);

    let app_worker = worker.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);
        // Production is same-origin only
        if let Some(origin) = cors_origin.as_deref() {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::from(host.clone()))
            .app_data(web::Data::from(publisher.clone()))
            .app_data(web::Data::new(app_worker.clone()))
            .app_data(web::Data::new(workspace.clone()))
            .app_data(api::json_config())
            .app_data(api::query_config())
            .service(
                SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", openapi.clone()),
            )
            .service(web::scope("/api").configure(api::configure))
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run();

    let result = server.await;

    info!("HTTP server stopped, shutting down conversion worker");
    worker.shutdown(SHUTDOWN_GRACE).await;

    result
}
