//! Conversion store: the single source of truth for job lifecycle state.
//!
//! The store is injected as `Arc<dyn ConversionStore>`; [`MemoryStore`] is the
//! in-process implementation.

pub mod memory;

use async_trait::async_trait;

use crate::models::{
    ConversionId, ConversionJob, ConversionStatus, ConversionUpdate, NewConversion,
    RepositoryInfo, TransitionError,
};

pub use memory::{IdStrategy, MemoryStore};

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Conversion {0} not found")]
    JobNotFound(ConversionId),

    #[error("Rejected update for conversion {id}: {source}")]
    Transition {
        id: ConversionId,
        #[source]
        source: TransitionError,
    },

    #[error("Repository info for conversion {0} already exists")]
    RepositoryInfoExists(ConversionId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed store of conversion jobs and their repository info.
///
/// Updates are atomic per job: each `update` is a single read-modify-write.
#[async_trait]
pub trait ConversionStore: Send + Sync {
    /// Create a `pending` job with a fresh id.
    async fn create(&self, new: NewConversion) -> StoreResult<ConversionJob>;

    /// Get a job by id.
    async fn get(&self, id: &ConversionId) -> StoreResult<Option<ConversionJob>>;

    /// Merge a partial update and refresh `updated_at`.
    async fn update(&self, id: &ConversionId, update: ConversionUpdate)
    -> StoreResult<ConversionJob>;

    /// All jobs currently in `status`, oldest first.
    async fn list_by_status(&self, status: ConversionStatus) -> StoreResult<Vec<ConversionJob>>;

    /// Record repository info for a job. At most once per job.
    async fn create_repository_info(&self, info: RepositoryInfo) -> StoreResult<RepositoryInfo>;

    /// Get the repository info recorded for a job.
    async fn get_repository_info(
        &self,
        conversion_id: &ConversionId,
    ) -> StoreResult<Option<RepositoryInfo>>;
}
