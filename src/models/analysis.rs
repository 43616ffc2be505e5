//! Structured payloads exchanged with the model API.
//!
//! The analysis stage produces a [`CodeAnalysisResult`]; the conversion stage
//! produces a [`ConversionResult`]. Both are parsed at the boundary so that
//! materialization works on typed data rather than raw JSON.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Complexity estimate for an analyzed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// A single test case found in a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedTestCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub assertions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Analysis of one source test file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedFile {
    pub path: String,
    #[serde(default)]
    pub test_cases: Vec<AnalyzedTestCase>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
}

/// A recurring code pattern (page objects, explicit waits, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodePattern {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub occurrences: u32,
}

/// Result of the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodeAnalysisResult {
    pub test_files: Vec<AnalyzedFile>,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub patterns: Vec<CodePattern>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Generated test-case file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryFile {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub test_cases: u32,
}

/// Generated reusable keyword / support file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFile {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub keywords: u32,
}

/// Counts and advisories reported alongside the generated files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    #[serde(default)]
    pub total_test_files: u32,
    #[serde(default)]
    pub total_test_cases: u32,
    #[serde(default)]
    pub total_resource_files: u32,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Result of the conversion stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    #[serde(alias = "robotFiles")]
    pub primary_files: Vec<PrimaryFile>,
    #[serde(default)]
    pub resource_files: Vec<ResourceFile>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub summary: ConversionSummary,
}

impl ConversionResult {
    /// Find generated file content whose path ends with `filename`.
    ///
    /// Primary files are searched before resource files.
    pub fn find_content(&self, filename: &str) -> Option<&str> {
        self.primary_files
            .iter()
            .find(|f| f.path.ends_with(filename))
            .map(|f| f.content.as_str())
            .or_else(|| {
                self.resource_files
                    .iter()
                    .find(|f| f.path.ends_with(filename))
                    .map(|f| f.content.as_str())
            })
    }
}
