//! Repository host client: URL parsing and repository validation.
//!
//! Only GitHub is supported. Validation calls `GET /repos/{owner}/{name}` on
//! the configured API base and maps the response status to a
//! [`RepositoryError`].

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::RepositoryValidation;

/// HTTP connect timeout for host API calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = "test-converter/0.1";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const NO_DESCRIPTION: &str = "No description provided";

/// Accepted repository URL shapes, tried in order.
static URL_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"github\.com/([^/]+)/([^/]+?)(?:\.git)?(?:/.*)?$").unwrap(),
        Regex::new(r"^https?://github\.com/([^/]+)/([^/]+?)(?:\.git)?(?:/.*)?$").unwrap(),
        Regex::new(r"^git@github\.com:([^/]+)/([^/]+?)(?:\.git)?$").unwrap(),
    ]
});

/// Repository validation errors.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Invalid GitHub URL format. Please use: https://github.com/owner/repository")]
    InvalidUrlFormat,

    #[error("{}", not_found_message(.has_token))]
    NotFoundOrForbidden { has_token: bool },

    #[error("Invalid access token. Please check your GitHub personal access token.")]
    InvalidCredential,

    #[error("Access forbidden. Your token may not have the required permissions.")]
    InsufficientPermission,

    #[error("GitHub API error ({status}): {reason}")]
    HostApi { status: u16, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from GitHub API: {0}")]
    InvalidResponse(String),
}

fn not_found_message(has_token: &bool) -> &'static str {
    if *has_token {
        "Repository not found or access denied. Check the URL and token permissions."
    } else {
        "Repository not found. For private repositories, please provide an access token."
    }
}

impl RepositoryError {
    /// Whether the failure is caused by the caller's input (reported as 400).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Network(_) | Self::InvalidResponse(_))
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrlFormat => "INVALID_URL_FORMAT",
            Self::NotFoundOrForbidden { .. } => "REPOSITORY_NOT_FOUND",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::InsufficientPermission => "INSUFFICIENT_PERMISSION",
            Self::HostApi { .. } => "HOST_API_ERROR",
            Self::Network(_) | Self::InvalidResponse(_) => "HOST_UNAVAILABLE",
        }
    }
}

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCoordinates {
    pub owner: String,
    pub name: String,
}

impl RepositoryCoordinates {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// HTTPS clone URL (credentials are supplied out of band).
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }
}

/// Parse a repository URL into owner and name.
///
/// Accepts web URLs (optionally with a trailing `/`, a `.git` suffix or a
/// sub-path) and SSH `git@github.com:owner/name.git` URLs.
pub fn parse_repository_url(url: &str) -> Result<RepositoryCoordinates, RepositoryError> {
    let trimmed = url.trim();
    let cleaned = trimmed.strip_suffix('/').unwrap_or(trimmed);

    URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(cleaned))
        .and_then(|caps| {
            let owner = caps.get(1)?.as_str();
            let name = caps.get(2)?.as_str();
            let name = name.strip_suffix(".git").unwrap_or(name);
            if owner.is_empty() || name.is_empty() {
                return None;
            }
            Some(RepositoryCoordinates {
                owner: owner.to_string(),
                name: name.to_string(),
            })
        })
        .ok_or(RepositoryError::InvalidUrlFormat)
}

/// `Authorization` header value for a host credential.
///
/// Fine-grained and classic personal access tokens use `Bearer`; anything
/// else uses the legacy `token` scheme.
fn authorization_value(token: &SecretString) -> String {
    let raw = token.expose_secret();
    if raw.starts_with("ghp_") || raw.starts_with("github_pat_") {
        format!("Bearer {}", raw)
    } else {
        format!("token {}", raw)
    }
}

/// Format the host's `updated_at` timestamp as `M/D/YYYY`.
fn format_last_updated(updated_at: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(updated_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).format("%-m/%-d/%Y").to_string())
}

/// Repository host read API.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Confirm that a repository exists and is reachable with `token`.
    async fn validate(
        &self,
        url: &str,
        token: Option<&SecretString>,
    ) -> Result<RepositoryValidation, RepositoryError>;
}

#[derive(Deserialize)]
struct RepoMetadata {
    full_name: String,
    description: Option<String>,
    updated_at: Option<String>,
}

/// GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    api_base_url: String,
    http_client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(api_base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn validate(
        &self,
        url: &str,
        token: Option<&SecretString>,
    ) -> Result<RepositoryValidation, RepositoryError> {
        let coords = parse_repository_url(url)?;
        let api_url = format!(
            "{}/repos/{}/{}",
            self.api_base_url, coords.owner, coords.name
        );

        debug!("Validating repository {} via {}", coords.full_name(), api_url);

        let mut request = self
            .http_client
            .get(&api_url)
            .header("Accept", GITHUB_ACCEPT);
        if let Some(token) = token {
            request = request.header("Authorization", authorization_value(token));
        }

        let response = request.send().await.map_err(|e| {
            warn!("GitHub API request failed for {}: {}", coords.full_name(), e);
            RepositoryError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => RepositoryError::NotFoundOrForbidden {
                    has_token: token.is_some(),
                },
                StatusCode::UNAUTHORIZED => RepositoryError::InvalidCredential,
                StatusCode::FORBIDDEN => RepositoryError::InsufficientPermission,
                other => {
                    let body = response.text().await.unwrap_or_default();
                    warn!("GitHub API error: {} - {}", other.as_u16(), body);
                    RepositoryError::HostApi {
                        status: other.as_u16(),
                        reason: other.canonical_reason().unwrap_or("Unknown").to_string(),
                    }
                }
            });
        }

        let metadata: RepoMetadata = response
            .json()
            .await
            .map_err(|e| RepositoryError::InvalidResponse(e.to_string()))?;

        info!("Repository validated: {}", metadata.full_name);

        Ok(RepositoryValidation {
            is_valid: true,
            name: metadata.full_name,
            description: metadata
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            last_updated: metadata.updated_at.as_deref().and_then(format_last_updated),
        })
    }
}
