//! Conversion pipeline: drives one job from `pending` to a terminal state.
//!
//! Stages and the progress recorded after each:
//!
//! | step                          | status       | progress |
//! |-------------------------------|--------------|----------|
//! | start                         | `analyzing`  | 10       |
//! | clone + scan                  | `analyzing`  | 25       |
//! | extract test files            | `analyzing`  | 40       |
//! | model analysis                | `analyzing`  | 60       |
//! | start conversion              | `converting` | 70       |
//! | model conversion + write files| `completed`  | 100      |
//!
//! Any failure marks the job `failed` with the error message as its only
//! `errorLog` entry; progress stays at the last recorded value.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db::{ConversionStore, StoreError};
use crate::models::{
    ConversionId, ConversionJob, ConversionStatus, ConversionUpdate, RepositoryInfo,
};
use crate::services::extraction::extract_test_files;
use crate::services::git::{GitError, WorkingCopyProvider};
use crate::services::github::{RepositoryHost, parse_repository_url};
use crate::services::materialize::{MaterializeError, write_output};
use crate::services::model_client::{ModelClient, ModelError, ModelRequest};
use crate::services::scanner::{ScanError, scan_repository};
use crate::services::workspace::{Workspace, remove_dir_if_exists};

/// Progress checkpoints.
pub mod progress {
    pub const STARTED: u8 = 10;
    pub const SCANNED: u8 = 25;
    pub const EXTRACTED: u8 = 40;
    pub const ANALYZED: u8 = 60;
    pub const CONVERTING: u8 = 70;
    pub const COMPLETED: u8 = 100;
}

/// Errors ending a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Conversion {0} not found")]
    JobNotFound(ConversionId),

    #[error("Conversion {id} already started (status: {status})")]
    AlreadyStarted {
        id: ConversionId,
        status: ConversionStatus,
    },

    #[error("Failed to clone repository: {0}")]
    Clone(#[from] GitError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Code analysis failed: {0}")]
    AnalysisFailed(#[source] ModelError),

    #[error("Code conversion failed: {0}")]
    ConversionFailed(#[source] ModelError),

    #[error("Failed to save converted files: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("Failed to prepare working directory: {0}")]
    Workspace(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Conversion cancelled: server shutting down")]
    Cancelled,
}

/// Runs conversion jobs against injected collaborators.
pub struct ConversionPipeline {
    store: Arc<dyn ConversionStore>,
    host: Arc<dyn RepositoryHost>,
    working_copies: Arc<dyn WorkingCopyProvider>,
    model: Arc<dyn ModelClient>,
    workspace: Workspace,
}

impl ConversionPipeline {
    pub fn new(
        store: Arc<dyn ConversionStore>,
        host: Arc<dyn RepositoryHost>,
        working_copies: Arc<dyn WorkingCopyProvider>,
        model: Arc<dyn ModelClient>,
        workspace: Workspace,
    ) -> Self {
        Self {
            store,
            host,
            working_copies,
            model,
            workspace,
        }
    }

    /// Run the pipeline for a `pending` job.
    ///
    /// Returns without touching the job when it is missing or already
    /// started. Every other failure is recorded on the job before returning.
    pub async fn run(
        &self,
        id: &ConversionId,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::JobNotFound(id.clone()))?;

        if job.status != ConversionStatus::Pending {
            return Err(PipelineError::AlreadyStarted {
                id: id.clone(),
                status: job.status,
            });
        }

        let repo_dir = self.workspace.repo_dir(id);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.execute(&job, &repo_dir) => result,
        };

        if let Err(e) = remove_dir_if_exists(&repo_dir).await {
            warn!("Failed to remove working copy {}: {}", repo_dir.display(), e);
        }

        match &outcome {
            Ok(()) => info!("Conversion {} completed", id),
            Err(err) => {
                warn!("Conversion {} failed: {}", id, err);
                if let Err(e) = self
                    .store
                    .update(id, ConversionUpdate::failed(err.to_string()))
                    .await
                {
                    error!("Failed to record failure for conversion {}: {}", id, e);
                }
            }
        }

        outcome
    }

    async fn execute(&self, job: &ConversionJob, repo_dir: &Path) -> Result<(), PipelineError> {
        let id = &job.id;
        let stack = job.stack();

        self.store
            .update(
                id,
                ConversionUpdate::stage(ConversionStatus::Analyzing, progress::STARTED),
            )
            .await?;

        // A directory left by an earlier process would make the clone fail.
        remove_dir_if_exists(repo_dir)
            .await
            .map_err(PipelineError::Workspace)?;

        let coords = parse_repository_url(&job.repository_url).ok();
        let clone_url = coords
            .as_ref()
            .map(|c| c.clone_url())
            .unwrap_or_else(|| job.repository_url.clone());
        self.working_copies
            .fetch(&clone_url, job.access_token.as_ref(), repo_dir)
            .await?;

        let structure = scan_repository(repo_dir).await?;
        self.store
            .update(id, ConversionUpdate::progress(progress::SCANNED))
            .await?;

        let test_files = extract_test_files(repo_dir, &structure.files).await;
        info!(
            "Conversion {}: {} test files out of {} entries",
            id,
            test_files.len(),
            structure.files.len()
        );

        // Host metadata is best effort.
        let (name, description, last_updated) = match self
            .host
            .validate(&job.repository_url, job.access_token.as_ref())
            .await
        {
            Ok(validation) => (
                validation.name,
                Some(validation.description),
                validation.last_updated,
            ),
            Err(e) => {
                warn!("Repository metadata unavailable for conversion {}: {}", id, e);
                let name = coords
                    .as_ref()
                    .map(|c| c.full_name())
                    .unwrap_or_else(|| job.repository_url.clone());
                (name, None, None)
            }
        };
        self.store
            .create_repository_info(RepositoryInfo {
                conversion_id: id.clone(),
                name,
                description,
                last_updated,
                detected_files: Some(test_files.keys().cloned().collect()),
                file_structure: Some(structure),
            })
            .await?;

        self.store
            .update(id, ConversionUpdate::progress(progress::EXTRACTED))
            .await?;

        let request = ModelRequest {
            model: &job.model_selection,
            api_key: &job.model_api_key,
        };

        let analysis = self
            .model
            .analyze(&test_files, &stack, request)
            .await
            .map_err(PipelineError::AnalysisFailed)?;
        self.store
            .update(
                id,
                ConversionUpdate::progress(progress::ANALYZED).with_analysis(analysis.clone()),
            )
            .await?;

        self.store
            .update(
                id,
                ConversionUpdate::stage(ConversionStatus::Converting, progress::CONVERTING),
            )
            .await?;

        let output = self
            .model
            .convert(&analysis, &stack, request)
            .await
            .map_err(PipelineError::ConversionFailed)?;

        write_output(&self.workspace.output_dir(id), &output, &stack).await?;

        self.store
            .update(id, ConversionUpdate::completed(output))
            .await?;

        Ok(())
    }
}
