//! API endpoint modules.

use actix_web::{HttpResponse, error::InternalError, web};

use crate::error::ErrorResponse;

pub mod conversions;
pub mod health;
pub mod openapi;
pub mod repository;

pub use conversions::configure_routes as configure_conversion_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use repository::configure_routes as configure_repository_routes;

/// Largest accepted JSON body.
pub const MAX_JSON_BODY_BYTES: usize = 1024 * 1024;

/// JSON extractor config that reports malformed bodies in the API error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BODY_BYTES)
        .error_handler(|err, _req| {
            let body = ErrorResponse {
                error: format!("Invalid JSON body: {}", err),
                code: "INVALID_INPUT".to_string(),
                details: None,
            };
            InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        })
}

/// Query extractor config with the same error shape.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let body = ErrorResponse {
            error: format!("Invalid query string: {}", err),
            code: "INVALID_INPUT".to_string(),
            details: None,
        };
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

/// Register every API route on the given scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_repository_routes)
        .configure(configure_conversion_routes);
}
