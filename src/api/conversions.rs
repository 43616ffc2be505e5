//! Conversion job endpoints.

use actix_web::{HttpResponse, http::header, web};
use secrecy::SecretString;
use tracing::{error, info};

use crate::db::ConversionStore;
use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    ConversionDetailResponse, ConversionId, ConversionJob, ConversionListResponse,
    ConversionStatus, ConversionUpdate, ConversionView, CreateConversionRequest, DeployRequest,
    DeployResponse, FileContentResponse, ListConversionsQuery,
};
use crate::services::archive::zip_directory;
use crate::services::git::PublishRequest;
use crate::services::{Publisher, WorkerHandle, Workspace};

async fn load_job(store: &dyn ConversionStore, id: &ConversionId) -> AppResult<ConversionJob> {
    store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Conversion {}", id)))
}

fn ensure_completed(job: &ConversionJob) -> AppResult<()> {
    if job.status != ConversionStatus::Completed {
        return Err(AppError::InvalidInput(format!(
            "Conversion is not completed (status: {})",
            job.status.as_str()
        )));
    }
    Ok(())
}

/// Create a conversion job and queue it for processing.
///
/// Responds as soon as the job is stored; progress is observed by polling.
#[utoipa::path(
    post,
    path = "/api/conversions",
    tag = "Conversions",
    request_body = CreateConversionRequest,
    responses(
        (status = 200, description = "Conversion created", body = ConversionView),
        (status = 400, description = "Invalid request data", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal error", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_conversion(
    store: web::Data<dyn ConversionStore>,
    worker: web::Data<WorkerHandle>,
    body: web::Json<CreateConversionRequest>,
) -> AppResult<HttpResponse> {
    let new = body.into_inner().validate().map_err(AppError::Validation)?;
    let job = store.create(new).await?;

    if let Err(e) = worker.submit(job.id.clone()) {
        error!("Failed to queue conversion {}: {}", job.id, e);
        store
            .update(&job.id, ConversionUpdate::failed(e.to_string()))
            .await?;
        return Err(AppError::Internal(e.to_string()));
    }

    info!(
        "Created conversion {} ({} {} -> {})",
        job.id, job.source_language, job.source_framework, job.target_framework
    );
    Ok(HttpResponse::Ok().json(ConversionView::from(job)))
}

/// List conversions in one status, oldest first.
#[utoipa::path(
    get,
    path = "/api/conversions",
    tag = "Conversions",
    params(
        ("status" = String, Query, description = "One of pending, analyzing, converting, completed, failed")
    ),
    responses(
        (status = 200, description = "Conversions in the requested status", body = ConversionListResponse),
        (status = 400, description = "Missing or unknown status", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_conversions(
    store: web::Data<dyn ConversionStore>,
    query: web::Query<ListConversionsQuery>,
) -> AppResult<HttpResponse> {
    let raw = query
        .into_inner()
        .status
        .ok_or_else(|| AppError::InvalidInput("status query parameter is required".to_string()))?;
    let status = ConversionStatus::parse(&raw)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown status '{}'", raw)))?;

    let conversions: Vec<ConversionView> = store
        .list_by_status(status)
        .await?
        .into_iter()
        .map(ConversionView::from)
        .collect();

    Ok(HttpResponse::Ok().json(ConversionListResponse {
        total: conversions.len(),
        conversions,
    }))
}

/// Get a conversion with its repository info.
#[utoipa::path(
    get,
    path = "/api/conversions/{id}",
    tag = "Conversions",
    params(
        ("id" = String, Path, description = "Conversion id")
    ),
    responses(
        (status = 200, description = "Conversion status", body = ConversionDetailResponse),
        (status = 404, description = "Conversion not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_conversion(
    store: web::Data<dyn ConversionStore>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = ConversionId::new(path.into_inner());
    let job = load_job(store.get_ref(), &id).await?;
    let repository_info = store.get_repository_info(&id).await?;

    Ok(HttpResponse::Ok().json(ConversionDetailResponse {
        conversion: ConversionView::from(job),
        repository_info,
    }))
}

/// Download the generated files as a zip archive.
#[utoipa::path(
    get,
    path = "/api/conversions/{id}/download",
    tag = "Conversions",
    params(
        ("id" = String, Path, description = "Conversion id")
    ),
    responses(
        (status = 200, description = "Zip archive of the generated files", body = Vec<u8>, content_type = "application/zip"),
        (status = 400, description = "Conversion not completed", body = crate::error::ErrorResponse),
        (status = 404, description = "Conversion not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Archive could not be built", body = crate::error::ErrorResponse),
    )
)]
pub async fn download_conversion(
    store: web::Data<dyn ConversionStore>,
    workspace: web::Data<Workspace>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = ConversionId::new(path.into_inner());
    let job = load_job(store.get_ref(), &id).await?;
    ensure_completed(&job)?;

    let bytes = zip_directory(&workspace.output_dir(&id))
        .await
        .map_err(|e| AppError::Archive(format!("conversion {}: {}", id, e)))?;

    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"robot-framework-conversion-{}.zip\"",
                id
            ),
        ))
        .body(bytes))
}

/// Commit and push the generated files to a repository.
#[utoipa::path(
    post,
    path = "/api/conversions/{id}/deploy",
    tag = "Conversions",
    params(
        ("id" = String, Path, description = "Conversion id")
    ),
    request_body = DeployRequest,
    responses(
        (status = 200, description = "Files pushed", body = DeployResponse),
        (status = 400, description = "Missing fields or conversion not completed", body = crate::error::ErrorResponse),
        (status = 404, description = "Conversion not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Push failed", body = crate::error::ErrorResponse),
    )
)]
pub async fn deploy_conversion(
    store: web::Data<dyn ConversionStore>,
    workspace: web::Data<Workspace>,
    publisher: web::Data<dyn Publisher>,
    path: web::Path<String>,
    body: web::Json<DeployRequest>,
) -> AppResult<HttpResponse> {
    let id = ConversionId::new(path.into_inner());
    let body = body.into_inner();

    let mut missing = Vec::new();
    let mut field = |name: &'static str, value: Option<String>| match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(FieldError::new(name, "Required"));
            String::new()
        }
    };
    let target_url = field("targetUrl", body.target_url);
    let access_token = field("accessToken", body.access_token);
    let branch = field("branch", body.branch);
    let commit_message = field("commitMessage", body.commit_message);
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    let job = load_job(store.get_ref(), &id).await?;
    ensure_completed(&job)?;

    let token = SecretString::from(access_token);
    let source_dir = workspace.output_dir(&id);
    publisher
        .publish(PublishRequest {
            source_dir: &source_dir,
            target_url: target_url.trim(),
            token: &token,
            branch: branch.trim(),
            commit_message: &commit_message,
        })
        .await
        .map_err(|e| AppError::Publish(format!("conversion {}: {}", id, e)))?;

    info!("Deployed conversion {} to branch {}", id, branch.trim());
    Ok(HttpResponse::Ok().json(DeployResponse {
        success: true,
        message: "Code deployed successfully".to_string(),
    }))
}

/// Get the content of one generated file, matched by filename suffix.
#[utoipa::path(
    get,
    path = "/api/conversions/{id}/files/{filename}",
    tag = "Conversions",
    params(
        ("id" = String, Path, description = "Conversion id"),
        ("filename" = String, Path, description = "Generated file name or path suffix")
    ),
    responses(
        (status = 200, description = "File content", body = FileContentResponse),
        (status = 400, description = "Conversion not completed or invalid filename", body = crate::error::ErrorResponse),
        (status = 404, description = "Conversion or file not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_file_content(
    store: web::Data<dyn ConversionStore>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (id, filename) = path.into_inner();
    let id = ConversionId::new(id);

    if filename.trim().is_empty() {
        return Err(AppError::NotFound("File".to_string()));
    }
    if filename.contains("..") {
        return Err(AppError::InvalidInput("Invalid filename".to_string()));
    }

    let job = load_job(store.get_ref(), &id).await?;
    ensure_completed(&job)?;

    let content = job
        .converted_output
        .as_ref()
        .and_then(|output| output.find_content(&filename))
        .ok_or_else(|| AppError::NotFound(format!("File {}", filename)))?;

    Ok(HttpResponse::Ok().json(FileContentResponse {
        content: content.to_string(),
    }))
}

/// Configure conversion routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/conversions")
            .route(web::get().to(list_conversions))
            .route(web::post().to(create_conversion)),
    )
    .service(web::resource("/conversions/{id}").route(web::get().to(get_conversion)))
    .service(
        web::resource("/conversions/{id}/download").route(web::get().to(download_conversion)),
    )
    .service(web::resource("/conversions/{id}/deploy").route(web::post().to(deploy_conversion)))
    .service(
        web::resource("/conversions/{id}/files/{filename:.*}")
            .route(web::get().to(get_file_content)),
    );
}
