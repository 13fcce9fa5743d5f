use crate::db::Repository;
use crate::error::DomainError;
use crate::ingest::Ingestor;
use crate::keyed_lock::KeyedLock;
use crate::vector::VectorStore;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct BatchSyncReport {
    pub synced_count: usize,
    pub total_docs_added: usize,
    pub failed: Vec<SyncFailure>,
}

#[derive(Debug, Serialize)]
pub struct SyncFailure {
    pub reference: String,
    pub error: String,
}

/// Per-datasource sync/unsync plus workspace-wide batch variants. Concurrent
/// operations on the *same* datasource are serialized via a keyed lock;
/// distinct datasources proceed fully in parallel, including within a batch.
pub struct SyncScheduler {
    repository: Arc<Repository>,
    ingestor: Arc<Ingestor>,
    vector_store: Arc<dyn VectorStore>,
    locks: KeyedLock<Uuid>,
}

impl SyncScheduler {
    pub fn new(repository: Arc<Repository>, ingestor: Arc<Ingestor>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            repository,
            ingestor,
            vector_store,
            locks: KeyedLock::new(),
        }
    }

    pub async fn sync_one(&self, source_id: Uuid) -> Result<usize, DomainError> {
        let _guard = self.locks.lock(source_id).await;
        let source = self
            .repository
            .find_data_source(source_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("data source {source_id}")))?;
        let outcome = self.ingestor.ingest(&source).await?;
        Ok(outcome.chunks_added)
    }

    /// Any vector-store delete happens before the DB state change, so a
    /// crash mid-unsync leaves the store cleaner, not dirtier.
    pub async fn unsync_one(&self, source_id: Uuid) -> Result<(), DomainError> {
        let _guard = self.locks.lock(source_id).await;
        let source = self
            .repository
            .find_data_source(source_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("data source {source_id}")))?;

        self.vector_store
            .delete_by_source(&source.reference)
            .await
            .map_err(|e| DomainError::UpstreamUnavailable(e.to_string()))?;
        self.repository.mark_unsynced(source_id).await?;
        Ok(())
    }

    pub async fn sync_all_regular(&self, workspace_id: Uuid) -> Result<BatchSyncReport, DomainError> {
        let sources = self.repository.find_data_sources_to_sync(workspace_id).await?;
        let mut report = BatchSyncReport {
            synced_count: 0,
            total_docs_added: 0,
            failed: Vec::new(),
        };
        for source in sources {
            match self.sync_one(source.id).await {
                Ok(added) => {
                    report.synced_count += 1;
                    report.total_docs_added += added;
                }
                Err(e) => report.failed.push(SyncFailure {
                    reference: source.reference,
                    error: e.to_string(),
                }),
            }
        }
        Ok(report)
    }

    pub async fn unsync_all(&self, workspace_id: Uuid) -> Result<BatchSyncReport, DomainError> {
        let sources = self.repository.find_synced_data_sources(workspace_id).await?;
        let mut report = BatchSyncReport {
            synced_count: 0,
            total_docs_added: 0,
            failed: Vec::new(),
        };
        for source in sources {
            match self.unsync_one(source.id).await {
                Ok(()) => report.synced_count += 1,
                Err(e) => report.failed.push(SyncFailure {
                    reference: source.reference,
                    error: e.to_string(),
                }),
            }
        }
        Ok(report)
    }
}
