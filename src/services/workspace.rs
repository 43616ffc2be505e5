//! Per-job directory layout under the configured work directory.

use std::path::{Path, PathBuf};

use crate::models::ConversionId;

/// Root of per-job working copies (`repo-<id>`) and output trees (`output-<id>`).
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if missing.
    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Whether the root directory currently exists.
    pub async fn is_ready(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    pub fn repo_dir(&self, id: &ConversionId) -> PathBuf {
        self.root.join(format!("repo-{}", id))
    }

    pub fn output_dir(&self, id: &ConversionId) -> PathBuf {
        self.root.join(format!("output-{}", id))
    }
}

/// Remove a directory tree, treating "already gone" as success.
pub async fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
