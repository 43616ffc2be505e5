//! Git command-line integration: cloning working copies and publishing output.
//!
//! Credentials never appear in URLs or argv. Authenticated commands run with
//! `GIT_ASKPASS` pointing at a short-lived helper script that reads the token
//! from the child's environment.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Environment variable the askpass helper reads the token from.
const TOKEN_ENV: &str = "TC_GIT_TOKEN";

/// Identity used for publish commits.
const COMMIT_AUTHOR_NAME: &str = "Test Converter";
const COMMIT_AUTHOR_EMAIL: &str = "test-converter@localhost";

const ASKPASS_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  Username*) echo "x-access-token" ;;
  *) printf '%s\n' "$TC_GIT_TOKEN" ;;
esac
"#;

/// Git errors.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {operation} failed: {message}")]
    CommandFailed {
        operation: &'static str,
        message: String,
    },

    #[error("git {operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Failed to prepare credentials: {0}")]
    Askpass(String),

    #[error("Invalid {field}: {value}")]
    InvalidArgument { field: &'static str, value: String },

    #[error("Failed to prepare directory: {0}")]
    Io(#[from] std::io::Error),
}

/// RAII guard deleting the askpass helper when dropped.
struct AskpassCleanup {
    path: Option<PathBuf>,
}

impl AskpassCleanup {
    fn empty() -> Self {
        Self { path: None }
    }
}

impl Drop for AskpassCleanup {
    fn drop(&mut self) {
        if let Some(path) = self.path.take()
            && let Err(e) = std::fs::remove_file(&path)
        {
            warn!("Failed to clean up askpass script: {}", e);
        }
    }
}

/// Write the askpass helper with a random name and owner-only permissions.
fn write_askpass_script() -> Result<(PathBuf, AskpassCleanup), GitError> {
    let path = std::env::temp_dir().join(format!(".tc-askpass-{}.sh", uuid::Uuid::new_v4()));

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o700)
            .open(&path)
            .map_err(|e| GitError::Askpass(e.to_string()))?;
        file.write_all(ASKPASS_SCRIPT.as_bytes())
            .map_err(|e| GitError::Askpass(e.to_string()))?;
    }

    #[cfg(not(unix))]
    std::fs::write(&path, ASKPASS_SCRIPT).map_err(|e| GitError::Askpass(e.to_string()))?;

    let cleanup = AskpassCleanup {
        path: Some(path.clone()),
    };
    Ok((path, cleanup))
}

/// Environment for an authenticated command plus the guard that must
/// outlive it.
fn auth_env(
    token: Option<&SecretString>,
) -> Result<(Vec<(&'static str, String)>, AskpassCleanup), GitError> {
    let mut env = vec![("GIT_TERMINAL_PROMPT", "0".to_string())];

    let Some(token) = token else {
        return Ok((env, AskpassCleanup::empty()));
    };

    let (path, cleanup) = write_askpass_script()?;
    let path = path
        .to_str()
        .ok_or_else(|| {
            GitError::Askpass("Temp directory path contains non-UTF8 characters".to_string())
        })?
        .to_string();

    env.push(("GIT_ASKPASS", path));
    env.push((TOKEN_ENV, token.expose_secret().to_string()));
    Ok((env, cleanup))
}

/// Formats a git failure with both stderr and stdout.
fn format_git_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!(
            "Command failed with exit code {}",
            output.status.code().unwrap_or(-1)
        ),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}

/// Reject values git could parse as options or that cannot be a ref/URL.
fn check_argument(field: &'static str, value: &str) -> Result<(), GitError> {
    if value.is_empty() || value.starts_with('-') || value.chars().any(char::is_whitespace) {
        return Err(GitError::InvalidArgument {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Materializes a local working copy of a repository.
#[async_trait]
pub trait WorkingCopyProvider: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        token: Option<&SecretString>,
        target: &Path,
    ) -> Result<(), GitError>;
}

/// Everything needed to publish an output directory.
pub struct PublishRequest<'a> {
    pub source_dir: &'a Path,
    pub target_url: &'a str,
    pub token: &'a SecretString,
    pub branch: &'a str,
    pub commit_message: &'a str,
}

/// Commits and pushes an output directory to a repository host.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: PublishRequest<'_>) -> Result<(), GitError>;
}

/// `git` executable wrapper.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(
        &self,
        operation: &'static str,
        dir: Option<&Path>,
        args: &[&str],
        env: &[(&'static str, String)],
    ) -> Result<Output, GitError> {
        let mut cmd = Command::new("git");
        // Ignore configured credential helpers so tokens are never persisted.
        cmd.args(["-c", "credential.helper="])
            .args(args)
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        debug!("Running git {}", operation);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| GitError::Timeout {
                operation,
                seconds: self.timeout.as_secs(),
            })?
            .map_err(GitError::Spawn)?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                operation,
                message: format_git_error(&output),
            });
        }

        Ok(output)
    }

    async fn set_remote(&self, dir: &Path, url: &str) -> Result<(), GitError> {
        let remotes = self.run("remote", Some(dir), &["remote"], &[]).await?;
        let has_origin = String::from_utf8_lossy(&remotes.stdout)
            .lines()
            .any(|line| line.trim() == "origin");

        if has_origin {
            self.run("remote", Some(dir), &["remote", "set-url", "origin", url], &[])
                .await?;
        } else {
            self.run("remote", Some(dir), &["remote", "add", "origin", url], &[])
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl WorkingCopyProvider for GitCli {
    async fn fetch(
        &self,
        url: &str,
        token: Option<&SecretString>,
        target: &Path,
    ) -> Result<(), GitError> {
        check_argument("repository URL", url)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let target = target.to_str().ok_or_else(|| GitError::InvalidArgument {
            field: "target directory",
            value: target.display().to_string(),
        })?;

        let (env, _cleanup) = auth_env(token)?;
        self.run(
            "clone",
            None,
            &["clone", "--depth", "1", "--", url, target],
            &env,
        )
        .await?;

        info!("Cloned working copy into {}", target);
        Ok(())
    }
}

#[async_trait]
impl Publisher for GitCli {
    async fn publish(&self, request: PublishRequest<'_>) -> Result<(), GitError> {
        check_argument("target URL", request.target_url)?;
        check_argument("branch", request.branch)?;

        let dir = Some(request.source_dir);
        let author_name = format!("user.name={}", COMMIT_AUTHOR_NAME);
        let author_email = format!("user.email={}", COMMIT_AUTHOR_EMAIL);

        self.run("init", dir, &["init"], &[]).await?;
        self.run("add", dir, &["add", "-A"], &[]).await?;
        self.run(
            "commit",
            dir,
            &[
                "-c",
                &author_name,
                "-c",
                &author_email,
                "commit",
                "--allow-empty",
                "-m",
                request.commit_message,
            ],
            &[],
        )
        .await?;
        self.run("branch", dir, &["branch", "-M", request.branch], &[])
            .await?;
        self.set_remote(request.source_dir, request.target_url)
            .await?;

        let (env, _cleanup) = auth_env(Some(request.token))?;
        self.run(
            "push",
            dir,
            &["push", "-u", "origin", request.branch],
            &env,
        )
        .await?;

        info!(
            "Published {} to {} ({})",
            request.source_dir.display(),
            request.target_url,
            request.branch
        );
        Ok(())
    }
}
