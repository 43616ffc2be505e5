//! Repository metadata and scan result models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ConversionId;

/// Kind of a scanned entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
}

/// One entry of a working copy scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileInfo {
    /// Path relative to the working copy root, `/`-separated.
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Extension including the leading dot (e.g. `.java`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Size in bytes (files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileInfo {
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }
}

/// Result of scanning a working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileStructure {
    pub files: Vec<FileInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
}

/// Repository display metadata attached to a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub conversion_id: ConversionId,
    pub name: String,
    pub description: Option<String>,
    pub last_updated: Option<String>,
    /// Paths of the files selected as test files.
    pub detected_files: Option<Vec<String>>,
    pub file_structure: Option<FileStructure>,
}

/// Request body for repository validation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRepositoryRequest {
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Successful repository validation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryValidation {
    pub is_valid: bool,
    /// Full `owner/name` as reported by the host.
    pub name: String,
    pub description: String,
    /// Last update date formatted as `M/D/YYYY`.
    pub last_updated: Option<String>,
}
