//! Generative model client for the analysis and conversion stages.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint and requests
//! JSON-object responses. The API key is supplied per call by the job that
//! owns it; the client never stores one.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{CodeAnalysisResult, ConversionResult, StackSelection};

/// HTTP connect timeout for model API calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert in test automation frameworks. \
Analyze code and provide detailed insights for framework conversion.";

/// Error types for model API calls.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error: HTTP {status} - {body}")]
    Server { status: u16, body: String },

    #[error("Model API returned an empty response")]
    EmptyResponse,

    #[error("Model response is not valid JSON for the expected shape: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per-call model selection and credential.
#[derive(Clone, Copy)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub api_key: &'a SecretString,
}

/// Analysis and conversion capability backed by a generative model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Analyze extracted test files (path to content).
    async fn analyze(
        &self,
        files: &BTreeMap<String, String>,
        stack: &StackSelection,
        request: ModelRequest<'_>,
    ) -> Result<CodeAnalysisResult, ModelError>;

    /// Generate target-framework files from an analysis.
    async fn convert(
        &self,
        analysis: &CodeAnalysisResult,
        stack: &StackSelection,
        request: ModelRequest<'_>,
    ) -> Result<ConversionResult, ModelError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Build the analysis prompt embedding every file's full text.
pub fn analysis_prompt(files: &BTreeMap<String, String>, stack: &StackSelection) -> String {
    let mut prompt = format!(
        "Analyze the following {} test automation code files ({} with {}) and provide a \
         detailed analysis in JSON format.\n\nFiles to analyze:\n",
        stack.source_language, stack.source_framework, stack.source_automation_tool
    );

    for (path, content) in files {
        prompt.push_str(&format!("\nFile: {}\nContent:\n{}\n", path, content));
    }

    prompt.push_str(
        r#"
Respond with a single JSON object of this shape:
{
  "testFiles": [
    {
      "path": "string",
      "testCases": [
        {
          "name": "string",
          "description": "string",
          "steps": ["string"],
          "assertions": ["string"],
          "tags": ["string"]
        }
      ],
      "keywords": ["string"],
      "complexity": "low|medium|high"
    }
  ],
  "framework": "string",
  "language": "string",
  "patterns": [{ "type": "string", "description": "string", "occurrences": 0 }],
  "dependencies": ["string"]
}

Identify test methods, page object patterns, wait strategies, assertions and any logic that needs special handling during conversion.
"#,
    );

    prompt
}

/// Build the conversion prompt from an analysis and the target stack.
pub fn conversion_prompt(
    analysis: &CodeAnalysisResult,
    stack: &StackSelection,
) -> Result<String, serde_json::Error> {
    let analysis_json = serde_json::to_string_pretty(analysis)?;

    Ok(format!(
        r#"Convert the analyzed test automation code to {target} based on the following analysis and requirements.

Analysis Result:
{analysis_json}

Target Framework: {target}
Target Library: {library}
Test Structure: {structure}

Respond with a single JSON object of this shape:
{{
  "primaryFiles": [
    {{ "path": "string (e.g. tests/login_test.robot)", "content": "string (full file content)", "testCases": 0 }}
  ],
  "resourceFiles": [
    {{ "path": "string (e.g. resources/common_keywords.resource)", "content": "string", "keywords": 0 }}
  ],
  "requirements": ["string (e.g. robotframework==6.1.1)"],
  "summary": {{
    "totalTestFiles": 0,
    "totalTestCases": 0,
    "totalResourceFiles": 0,
    "warnings": ["string"],
    "recommendations": ["string"]
  }}
}}

Guidelines:
1. Use {library} for browser and UI automation.
2. Put test case files under tests/ and reusable keyword files under resources/.
3. Use relative paths only.
4. Include test documentation and tags.
5. Translate wait strategies and assertions to idiomatic {target} equivalents.
6. Organize tests according to the {structure} structure.

The generated code must be syntactically valid {target}.
"#,
        target = stack.target_framework,
        library = stack.target_library,
        structure = stack.test_structure,
    ))
}

fn conversion_system_prompt(stack: &StackSelection) -> String {
    format!(
        "You are an expert in {} and test automation conversion. \
         Generate high-quality, syntactically correct {} code.",
        stack.target_framework, stack.target_framework
    )
}

/// Strip a surrounding Markdown code fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse model output text as `T`.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T, ModelError> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(serde_json::from_str(body)?)
}

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ModelError> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        messages: Vec<ChatMessage>,
        request: ModelRequest<'_>,
    ) -> Result<T, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: request.model,
            messages,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        debug!("Calling model {} at {}", request.model, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(request.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model API returned HTTP {}", status.as_u16());
            return Err(ModelError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ModelError::EmptyResponse)?;

        parse_structured(&content)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn analyze(
        &self,
        files: &BTreeMap<String, String>,
        stack: &StackSelection,
        request: ModelRequest<'_>,
    ) -> Result<CodeAnalysisResult, ModelError> {
        let messages = vec![
            ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
            ChatMessage::user(analysis_prompt(files, stack)),
        ];
        self.complete_json(messages, request).await
    }

    async fn convert(
        &self,
        analysis: &CodeAnalysisResult,
        stack: &StackSelection,
        request: ModelRequest<'_>,
    ) -> Result<ConversionResult, ModelError> {
        let messages = vec![
            ChatMessage::system(conversion_system_prompt(stack)),
            ChatMessage::user(conversion_prompt(analysis, stack)?),
        ];
        self.complete_json(messages, request).await
    }
}
