//! Repository validation endpoint.

use actix_web::{HttpResponse, post, web};
use secrecy::SecretString;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::ValidateRepositoryRequest;
use crate::services::RepositoryHost;

/// Check that a repository exists and is readable with the given token.
#[utoipa::path(
    post,
    path = "/api/repository/validate",
    tag = "Repository",
    request_body = ValidateRepositoryRequest,
    responses(
        (status = 200, description = "Repository is accessible", body = crate::models::RepositoryValidation),
        (status = 400, description = "Invalid URL, repository not found, or credential rejected", body = crate::error::ErrorResponse),
        (status = 500, description = "Repository host unreachable", body = crate::error::ErrorResponse),
    )
)]
#[post("/repository/validate")]
pub async fn validate_repository(
    host: web::Data<dyn RepositoryHost>,
    body: web::Json<ValidateRepositoryRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let url = body
        .repository_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("Repository URL is required".to_string()))?;
    let token = body
        .access_token
        .filter(|t| !t.is_empty())
        .map(SecretString::from);

    debug!(
        "Validating repository {} (token supplied: {})",
        url,
        token.is_some()
    );
    let validation = host.validate(url.trim(), token.as_ref()).await?;

    Ok(HttpResponse::Ok().json(validation))
}

/// Configure repository routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(validate_repository);
}
