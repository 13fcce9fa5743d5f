use crate::db::{DataSource, Repository};
use crate::embedding::Embedder;
use crate::error::DomainError;
use crate::loader::loader_for;
use crate::splitter;
use crate::vector::{ChunkPayload, VectorStore};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct IngestOutcome {
    pub chunks_added: usize,
    pub last_synced_at: chrono::DateTime<Utc>,
}

/// Load → split → embed → upsert → mark synced, for a single data source.
/// Re-ingesting an already-synced source first removes its existing chunks
/// so stale duplicates never accumulate.
pub struct Ingestor {
    repository: Arc<Repository>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    embedding_batch_size: usize,
}

impl Ingestor {
    pub fn new(
        repository: Arc<Repository>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        embedding_batch_size: usize,
    ) -> Self {
        Self {
            repository,
            embedder,
            vector_store,
            embedding_batch_size,
        }
    }

    pub async fn ingest(&self, source: &DataSource) -> Result<IngestOutcome, DomainError> {
        let reference = source.path.as_deref().unwrap_or(&source.reference);
        let loader = loader_for(reference);
        let content = loader
            .load(reference)
            .await
            .map_err(|e| DomainError::UpstreamUnavailable(format!("loading {reference}: {e}")))?;

        let pieces = splitter::split(&source.reference, &content);
        if pieces.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "{} produced no chunks",
                source.reference
            )));
        }

        // Remove any chunks left over from a previous ingest before upserting
        // the fresh set, so re-sync never leaves stale duplicates.
        self.vector_store
            .delete_by_source(&source.reference)
            .await
            .map_err(|e| DomainError::UpstreamUnavailable(e.to_string()))?;

        let embeddings = self
            .embed_in_batches(&pieces)
            .await
            .map_err(|e| DomainError::UpstreamUnavailable(e.to_string()))?;

        let points: Vec<(Vec<f32>, ChunkPayload)> = pieces
            .into_iter()
            .zip(embeddings)
            .map(|(text, vector)| {
                (
                    vector,
                    ChunkPayload {
                        chunk_id: Uuid::new_v4().to_string(),
                        source_reference: source.reference.clone(),
                        workspace_id: source.workspace_id.to_string(),
                        text,
                    },
                )
            })
            .collect();

        let chunks_added = points.len();

        self.vector_store
            .upsert(points)
            .await
            .map_err(|e| DomainError::UpstreamUnavailable(e.to_string()))?;

        let synced_at = Utc::now();
        self.repository.mark_synced(source.id, synced_at).await?;

        Ok(IngestOutcome {
            chunks_added,
            last_synced_at: synced_at,
        })
    }

    async fn embed_in_batches(&self, pieces: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(pieces.len());
        for batch in pieces.chunks(self.embedding_batch_size.max(1)) {
            let batch_vec = batch.to_vec();
            let batch_embeddings = self.embedder.embed_batch(&batch_vec).await?;
            embeddings.extend(batch_embeddings);
        }
        Ok(embeddings)
    }
}
