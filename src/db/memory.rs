//! In-memory conversion store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ConversionStore, StoreError, StoreResult};
use crate::models::{
    ConversionId, ConversionJob, ConversionStatus, ConversionUpdate, NewConversion,
    RepositoryInfo,
};

/// How new conversion ids are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// "1", "2", ... in creation order.
    Sequential,
    /// UUIDv7 (time-ordered, globally unique).
    Uuid,
}

impl IdStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "uuid" => Some(Self::Uuid),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Tables {
    conversions: HashMap<ConversionId, ConversionJob>,
    repositories: HashMap<ConversionId, RepositoryInfo>,
}

/// Process-local store backed by hash maps behind a single `RwLock`.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    ids: IdStrategy,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new(ids: IdStrategy) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            ids,
            next_id: AtomicU64::new(1),
        }
    }

    /// Store with counter-based ids.
    pub fn sequential() -> Self {
        Self::new(IdStrategy::Sequential)
    }

    fn generate_id(&self) -> ConversionId {
        match self.ids {
            IdStrategy::Sequential => {
                ConversionId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string())
            }
            IdStrategy::Uuid => ConversionId::new(Uuid::now_v7().to_string()),
        }
    }
}

#[async_trait]
impl ConversionStore for MemoryStore {
    async fn create(&self, new: NewConversion) -> StoreResult<ConversionJob> {
        let job = ConversionJob::new(self.generate_id(), new, Utc::now());

        let mut tables = self.tables.write().await;
        tables.conversions.insert(job.id.clone(), job.clone());

        Ok(job)
    }

    async fn get(&self, id: &ConversionId) -> StoreResult<Option<ConversionJob>> {
        let tables = self.tables.read().await;
        Ok(tables.conversions.get(id).cloned())
    }

    async fn update(
        &self,
        id: &ConversionId,
        update: ConversionUpdate,
    ) -> StoreResult<ConversionJob> {
        let mut tables = self.tables.write().await;
        let job = tables
            .conversions
            .get_mut(id)
            .ok_or_else(|| StoreError::JobNotFound(id.clone()))?;

        job.apply(update, Utc::now())
            .map_err(|source| StoreError::Transition {
                id: id.clone(),
                source,
            })?;

        Ok(job.clone())
    }

    async fn list_by_status(&self, status: ConversionStatus) -> StoreResult<Vec<ConversionJob>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<ConversionJob> = tables
            .conversions
            .values()
            .filter(|job| job.status == status)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn create_repository_info(&self, info: RepositoryInfo) -> StoreResult<RepositoryInfo> {
        let mut tables = self.tables.write().await;
        if !tables.conversions.contains_key(&info.conversion_id) {
            return Err(StoreError::JobNotFound(info.conversion_id));
        }
        if tables.repositories.contains_key(&info.conversion_id) {
            return Err(StoreError::RepositoryInfoExists(info.conversion_id));
        }
        tables
            .repositories
            .insert(info.conversion_id.clone(), info.clone());
        Ok(info)
    }

    async fn get_repository_info(
        &self,
        conversion_id: &ConversionId,
    ) -> StoreResult<Option<RepositoryInfo>> {
        let tables = self.tables.read().await;
        Ok(tables.repositories.get(conversion_id).cloned())
    }
}
