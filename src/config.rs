//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::db::IdStrategy;

/// Default values used when a variable is not set.
pub mod defaults {
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 8080;
    pub const WORK_DIR_NAME: &str = "code-converter";
    pub const GITHUB_API_URL: &str = "https://api.github.com";
    pub const MODEL_API_URL: &str = "https://api.openai.com/v1";
    pub const MODEL_TIMEOUT_SECS: u64 = 300; // LLM calls routinely take minutes
    pub const HOST_TIMEOUT_SECS: u64 = 10;
    pub const GIT_TIMEOUT_SECS: u64 = 300;
    pub const MAX_CONCURRENT_CONVERSIONS: usize = 4;
    pub const DEV_CORS_ORIGIN: &str = "http://localhost:5173";
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Root of per-job working copies and output directories
    pub work_dir: PathBuf,
    /// Repository host read API base URL
    pub github_api_url: String,
    /// OpenAI-compatible API base URL
    pub model_api_url: String,
    pub model_timeout_secs: u64,
    pub host_timeout_secs: u64,
    /// Timeout for each git clone/push invocation
    pub git_timeout_secs: u64,
    /// Maximum pipelines running at once
    pub max_concurrent_conversions: usize,
    pub id_strategy: IdStrategy,
    pub log_format: LogFormat,
    /// Allowed browser origin (development only)
    pub cors_origin: Option<String>,
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    message: &'static str,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue(message)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only `RUST_ENV` is required; everything else has a default.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `TC_HOST`: Server host (default: 127.0.0.1)
    /// - `TC_PORT`: Server port (default: 8080)
    /// - `TC_WORK_DIR`: Work directory (default: `<temp>/code-converter`)
    /// - `TC_GITHUB_API_URL`: Repository host API (default: https://api.github.com)
    /// - `TC_MODEL_API_URL`: Model API (default: https://api.openai.com/v1)
    /// - `TC_MODEL_TIMEOUT_SECS`: Model call timeout (default: 300)
    /// - `TC_HOST_TIMEOUT_SECS`: Repository host call timeout (default: 10)
    /// - `TC_GIT_TIMEOUT_SECS`: git clone/push timeout (default: 300)
    /// - `TC_MAX_CONCURRENT_CONVERSIONS`: Concurrent pipelines (default: 4)
    /// - `TC_ID_STRATEGY`: `uuid` or `sequential` (default: uuid)
    /// - `TC_LOG_FORMAT`: `pretty` or `json` (default: pretty)
    /// - `TC_CORS_ORIGIN`: Allowed origin in development (default: http://localhost:5173)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env_str = lookup("RUST_ENV").ok_or(ConfigError::MissingEnvVar("RUST_ENV"))?;
        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = lookup("TC_HOST").unwrap_or_else(|| defaults::HOST.to_string());
        let port = parse_or(
            &lookup,
            "TC_PORT",
            defaults::PORT,
            "TC_PORT must be a valid port number",
        )?;

        let work_dir = lookup("TC_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join(defaults::WORK_DIR_NAME));

        let github_api_url = lookup("TC_GITHUB_API_URL")
            .unwrap_or_else(|| defaults::GITHUB_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let model_api_url = lookup("TC_MODEL_API_URL")
            .unwrap_or_else(|| defaults::MODEL_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model_timeout_secs = parse_or(
            &lookup,
            "TC_MODEL_TIMEOUT_SECS",
            defaults::MODEL_TIMEOUT_SECS,
            "TC_MODEL_TIMEOUT_SECS must be a valid number",
        )?;
        let host_timeout_secs = parse_or(
            &lookup,
            "TC_HOST_TIMEOUT_SECS",
            defaults::HOST_TIMEOUT_SECS,
            "TC_HOST_TIMEOUT_SECS must be a valid number",
        )?;
        let git_timeout_secs = parse_or(
            &lookup,
            "TC_GIT_TIMEOUT_SECS",
            defaults::GIT_TIMEOUT_SECS,
            "TC_GIT_TIMEOUT_SECS must be a valid number",
        )?;
        for (value, message) in [
            (model_timeout_secs, "TC_MODEL_TIMEOUT_SECS must be at least 1"),
            (host_timeout_secs, "TC_HOST_TIMEOUT_SECS must be at least 1"),
            (git_timeout_secs, "TC_GIT_TIMEOUT_SECS must be at least 1"),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(message));
            }
        }
        let max_concurrent_conversions = parse_or(
            &lookup,
            "TC_MAX_CONCURRENT_CONVERSIONS",
            defaults::MAX_CONCURRENT_CONVERSIONS,
            "TC_MAX_CONCURRENT_CONVERSIONS must be a valid number",
        )?;
        if max_concurrent_conversions == 0 {
            return Err(ConfigError::InvalidValue(
                "TC_MAX_CONCURRENT_CONVERSIONS must be at least 1",
            ));
        }

        let id_strategy = match lookup("TC_ID_STRATEGY") {
            Some(raw) => IdStrategy::parse(&raw).ok_or(ConfigError::InvalidValue(
                "TC_ID_STRATEGY must be 'uuid' or 'sequential'",
            ))?,
            None => IdStrategy::Uuid,
        };

        let log_format = match lookup("TC_LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidValue(
                "TC_LOG_FORMAT must be 'pretty' or 'json'",
            ))?,
            None => LogFormat::Pretty,
        };

        let cors_origin = if environment.is_development() {
            Some(lookup("TC_CORS_ORIGIN").unwrap_or_else(|| defaults::DEV_CORS_ORIGIN.to_string()))
        } else {
            None
        };

        let config = Config {
            environment,
            host,
            port,
            work_dir,
            github_api_url,
            model_api_url,
            model_timeout_secs,
            host_timeout_secs,
            git_timeout_secs,
            max_concurrent_conversions,
            id_strategy,
            log_format,
            cors_origin,
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Reject settings that are only acceptable in development.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !self.github_api_url.starts_with("https://") {
            errors.push(format!(
                "TC_GITHUB_API_URL must use https:// in production (got '{}')",
                self.github_api_url
            ));
        }

        if !self.model_api_url.starts_with("https://") {
            errors.push(format!(
                "TC_MODEL_API_URL must use https:// in production (got '{}')",
                self.model_api_url
            ));
        }

        if self.id_strategy == IdStrategy::Sequential {
            errors.push(
                "TC_ID_STRATEGY=sequential is for tests only. Use 'uuid' in production."
                    .to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn host_timeout(&self) -> Duration {
        Duration::from_secs(self.host_timeout_secs)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
