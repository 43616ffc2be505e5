//! Conversion job domain models and DTOs.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::analysis::{CodeAnalysisResult, ConversionResult};
use super::repository::RepositoryInfo;
use crate::error::FieldError;

/// Model used when a request does not select one.
pub const DEFAULT_MODEL_SELECTION: &str = "gpt-4o";

/// Opaque conversion job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ConversionId(String);

impl ConversionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversion lifecycle status.
///
/// `pending → analyzing → converting → completed`, with `failed` reachable from
/// every non-terminal state. `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Pending,
    Analyzing,
    Converting,
    Completed,
    Failed,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Converting => "converting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "analyzing" => Some(Self::Analyzing),
            "converting" => Some(Self::Converting),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a job in this status may move to `next`.
    ///
    /// Staying in the same non-terminal status is allowed (progress updates).
    pub fn can_transition_to(&self, next: ConversionStatus) -> bool {
        use ConversionStatus::*;
        match (self, next) {
            (Completed | Failed, _) => false,
            (_, Failed) => true,
            (Pending, Pending | Analyzing) => true,
            (Analyzing, Analyzing | Converting) => true,
            (Converting, Converting | Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected job mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("conversion is already {0}")]
    Terminal(ConversionStatus),

    #[error("illegal status transition {from} -> {to}")]
    IllegalStatus {
        from: ConversionStatus,
        to: ConversionStatus,
    },

    #[error("progress cannot decrease from {from} to {to}")]
    ProgressRegression { from: u8, to: u8 },

    #[error("progress {0} is out of range")]
    ProgressOutOfRange(u8),
}

/// Stored conversion job.
///
/// Credentials are kept as secrets and never leave the server; API responses
/// use [`ConversionView`].
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: ConversionId,
    pub repository_url: String,
    pub access_token: Option<SecretString>,
    pub source_language: String,
    pub source_framework: String,
    pub source_automation_tool: String,
    pub target_framework: String,
    pub target_library: String,
    pub test_structure: String,
    pub model_api_key: SecretString,
    pub model_selection: String,
    pub status: ConversionStatus,
    pub progress: u8,
    pub analysis_result: Option<CodeAnalysisResult>,
    pub converted_output: Option<ConversionResult>,
    pub error_log: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionJob {
    /// Build a fresh `pending` job from validated input.
    pub fn new(id: ConversionId, new: NewConversion, now: DateTime<Utc>) -> Self {
        Self {
            id,
            repository_url: new.repository_url,
            access_token: new.access_token,
            source_language: new.source_language,
            source_framework: new.source_framework,
            source_automation_tool: new.source_automation_tool,
            target_framework: new.target_framework,
            target_library: new.target_library,
            test_structure: new.test_structure,
            model_api_key: new.model_api_key,
            model_selection: new.model_selection,
            status: ConversionStatus::Pending,
            progress: 0,
            analysis_result: None,
            converted_output: None,
            error_log: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update, enforcing the lifecycle rules.
    pub fn apply(
        &mut self,
        update: ConversionUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal(self.status));
        }

        if let Some(next) = update.status
            && !self.status.can_transition_to(next)
        {
            return Err(TransitionError::IllegalStatus {
                from: self.status,
                to: next,
            });
        }

        if let Some(progress) = update.progress {
            if progress > 100 {
                return Err(TransitionError::ProgressOutOfRange(progress));
            }
            if progress < self.progress {
                return Err(TransitionError::ProgressRegression {
                    from: self.progress,
                    to: progress,
                });
            }
        }

        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(analysis) = update.analysis_result {
            self.analysis_result = Some(analysis);
        }
        if let Some(output) = update.converted_output {
            self.converted_output = Some(output);
        }
        if let Some(log) = update.error_log {
            self.error_log = Some(log);
        }
        self.updated_at = now;

        Ok(())
    }

    /// Source/target stack selection carried into the model prompts.
    pub fn stack(&self) -> StackSelection {
        StackSelection {
            source_language: self.source_language.clone(),
            source_framework: self.source_framework.clone(),
            source_automation_tool: self.source_automation_tool.clone(),
            target_framework: self.target_framework.clone(),
            target_library: self.target_library.clone(),
            test_structure: self.test_structure.clone(),
        }
    }
}

/// Source and target automation stacks chosen for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSelection {
    pub source_language: String,
    pub source_framework: String,
    pub source_automation_tool: String,
    pub target_framework: String,
    pub target_library: String,
    pub test_structure: String,
}

/// Validated job configuration.
#[derive(Debug, Clone)]
pub struct NewConversion {
    pub repository_url: String,
    pub access_token: Option<SecretString>,
    pub source_language: String,
    pub source_framework: String,
    pub source_automation_tool: String,
    pub target_framework: String,
    pub target_library: String,
    pub test_structure: String,
    pub model_api_key: SecretString,
    pub model_selection: String,
}

/// Partial job mutation. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ConversionUpdate {
    pub status: Option<ConversionStatus>,
    pub progress: Option<u8>,
    pub analysis_result: Option<CodeAnalysisResult>,
    pub converted_output: Option<ConversionResult>,
    pub error_log: Option<Vec<String>>,
}

impl ConversionUpdate {
    pub fn stage(status: ConversionStatus, progress: u8) -> Self {
        Self {
            status: Some(status),
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn with_analysis(mut self, analysis: CodeAnalysisResult) -> Self {
        self.analysis_result = Some(analysis);
        self
    }

    /// Output, `completed` and 100% in one update.
    pub fn completed(output: ConversionResult) -> Self {
        Self {
            status: Some(ConversionStatus::Completed),
            progress: Some(100),
            converted_output: Some(output),
            ..Default::default()
        }
    }

    /// Mark failed; progress stays where it was.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ConversionStatus::Failed),
            error_log: Some(vec![message.into()]),
            ..Default::default()
        }
    }
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// Request to create a conversion job.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversionRequest {
    pub repository_url: Option<String>,
    pub access_token: Option<String>,
    pub source_language: Option<String>,
    pub source_framework: Option<String>,
    pub source_automation_tool: Option<String>,
    pub target_framework: Option<String>,
    pub target_library: Option<String>,
    pub test_structure: Option<String>,
    /// Model API key. `openaiApiKey` is accepted as an alias.
    #[serde(alias = "openaiApiKey")]
    pub model_api_key: Option<String>,
    pub model_selection: Option<String>,
    /// Only `pending` is accepted.
    pub status: Option<String>,
    /// Only `0` is accepted.
    pub progress: Option<i64>,
}

fn required(field: &'static str, value: Option<String>, errors: &mut Vec<FieldError>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.push(FieldError::new(field, "Required"));
            String::new()
        }
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateConversionRequest {
    /// Validate the request, collecting every field error.
    pub fn validate(self) -> Result<NewConversion, Vec<FieldError>> {
        let mut errors = Vec::new();

        let repository_url = required("repositoryUrl", self.repository_url, &mut errors);
        let source_language = required("sourceLanguage", self.source_language, &mut errors);
        let source_framework = required("sourceFramework", self.source_framework, &mut errors);
        let source_automation_tool =
            required("sourceAutomationTool", self.source_automation_tool, &mut errors);
        let target_framework = required("targetFramework", self.target_framework, &mut errors);
        let target_library = required("targetLibrary", self.target_library, &mut errors);
        let test_structure = required("testStructure", self.test_structure, &mut errors);
        let model_api_key = required("modelApiKey", self.model_api_key, &mut errors);

        if let Some(status) = self.status.as_deref()
            && status != ConversionStatus::Pending.as_str()
        {
            errors.push(FieldError::new(
                "status",
                "New conversions must start as 'pending'",
            ));
        }
        if let Some(progress) = self.progress
            && progress != 0
        {
            errors.push(FieldError::new(
                "progress",
                "New conversions must start at 0",
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewConversion {
            repository_url,
            access_token: optional(self.access_token).map(SecretString::from),
            source_language,
            source_framework,
            source_automation_tool,
            target_framework,
            target_library,
            test_structure,
            model_api_key: SecretString::from(model_api_key),
            model_selection: optional(self.model_selection)
                .unwrap_or_else(|| DEFAULT_MODEL_SELECTION.to_string()),
        })
    }
}

/// Conversion as returned by the API (credentials omitted).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionView {
    pub id: ConversionId,
    pub repository_url: String,
    pub has_access_token: bool,
    pub source_language: String,
    pub source_framework: String,
    pub source_automation_tool: String,
    pub target_framework: String,
    pub target_library: String,
    pub test_structure: String,
    pub model_selection: String,
    pub status: ConversionStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<CodeAnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_output: Option<ConversionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_log: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConversionJob> for ConversionView {
    fn from(job: ConversionJob) -> Self {
        Self {
            id: job.id,
            repository_url: job.repository_url,
            has_access_token: job.access_token.is_some(),
            source_language: job.source_language,
            source_framework: job.source_framework,
            source_automation_tool: job.source_automation_tool,
            target_framework: job.target_framework,
            target_library: job.target_library,
            test_structure: job.test_structure,
            model_selection: job.model_selection,
            status: job.status,
            progress: job.progress,
            analysis_result: job.analysis_result,
            converted_output: job.converted_output,
            error_log: job.error_log,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Conversion status merged with its repository info.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDetailResponse {
    #[serde(flatten)]
    pub conversion: ConversionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_info: Option<RepositoryInfo>,
}

/// Query parameters for listing conversions.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListConversionsQuery {
    pub status: Option<String>,
}

/// List of conversions in one status.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversionListResponse {
    pub conversions: Vec<ConversionView>,
    pub total: usize,
}

/// Generated file content for preview.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileContentResponse {
    pub content: String,
}

/// Request to publish generated output to a repository host.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub target_url: Option<String>,
    pub access_token: Option<String>,
    pub branch: Option<String>,
    pub commit_message: Option<String>,
}

/// Deploy outcome.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeployResponse {
    pub success: bool,
    pub message: String,
}
