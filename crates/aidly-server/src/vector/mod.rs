mod qdrant_store;

pub use qdrant_store::QdrantVectorStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single retrievable unit of text plus the metadata every Chunk must
/// carry. Lives only in the vector store; there is no relational table
/// for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub chunk_id: String,
    pub source_reference: String,
    pub workspace_id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub payload: ChunkPayload,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub workspace_id: String,
}

/// Persisted ANN index over `{id, vector, payload}` with filtered search.
/// The core depends only on this trait so the concrete backend (Qdrant here)
/// is swappable and fakeable in tests.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn ensure_collection(&self, dim: usize) -> anyhow::Result<()>;

    /// Cheap reachability probe used by the readiness endpoint; never
    /// mutates state.
    async fn health_check(&self) -> anyhow::Result<()>;

    async fn upsert(&self, points: Vec<(Vec<f32>, ChunkPayload)>) -> anyhow::Result<()>;

    async fn search_with_score(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &SearchFilter,
    ) -> anyhow::Result<Vec<ScoredChunk>>;

    async fn delete_by_source(&self, source_reference: &str) -> anyhow::Result<()>;

    async fn reset(&self) -> anyhow::Result<()>;
}
