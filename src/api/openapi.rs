//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Test Converter Server",
        version = "0.1.0",
        description = "API server that analyzes a repository's test suite and converts it to another test framework"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Repository endpoints
        api::repository::validate_repository,
        // Conversion endpoints
        api::conversions::create_conversion,
        api::conversions::list_conversions,
        api::conversions::get_conversion,
        api::conversions::download_conversion,
        api::conversions::deploy_conversion,
        api::conversions::get_file_content,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            error::FieldError,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Repository
            models::ValidateRepositoryRequest,
            models::RepositoryValidation,
            models::RepositoryInfo,
            models::FileStructure,
            models::FileInfo,
            models::FileType,
            // Conversions
            models::ConversionId,
            models::ConversionStatus,
            models::CreateConversionRequest,
            models::ConversionView,
            models::ConversionDetailResponse,
            models::ConversionListResponse,
            models::ListConversionsQuery,
            models::DeployRequest,
            models::DeployResponse,
            models::FileContentResponse,
            // Analysis and generated output
            models::Complexity,
            models::AnalyzedTestCase,
            models::AnalyzedFile,
            models::CodePattern,
            models::CodeAnalysisResult,
            models::PrimaryFile,
            models::ResourceFile,
            models::ConversionSummary,
            models::ConversionResult,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Repository", description = "Source repository validation"),
        (name = "Conversions", description = "Conversion jobs, generated files and deployment")
    )
)]
pub struct ApiDoc;
