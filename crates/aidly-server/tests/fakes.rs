use aidly_server::embedding::Embedder;
use aidly_server::llm::{Chat, ChatTurn};
use aidly_server::utils::similarity::cosine_similarity;
use aidly_server::vector::{ChunkPayload, ScoredChunk, SearchFilter, VectorStore};
use async_trait::async_trait;
use std::sync::Mutex;

/// Deterministic bag-of-words embedding: each distinct lowercase word hashes
/// into one of 32 dimensions. Good enough to make semantically similar
/// sentences score higher than unrelated ones without a real model.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self { dim: 32 }
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dim];
        for word in text.to_lowercase().split_whitespace() {
            let mut hash: u64 = 1469598103934665603;
            for byte in word.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            vector[(hash as usize) % self.dim] += 1.0;
        }
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// Echoes back a canned answer referencing the supplied context, so tests can
/// assert on its shape without depending on a real model's wording.
pub struct FakeChat;

#[async_trait]
impl Chat for FakeChat {
    async fn generate(&self, messages: Vec<ChatTurn>, _temperature: f32) -> anyhow::Result<String> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if prompt.contains("No relevant context was found.") {
            return Ok("I don't have enough information to answer that.".to_string());
        }
        Ok("Based on the provided context, here is the answer.".to_string())
    }
}

/// In-memory vector store backed by a `Mutex<Vec<..>>`, scored with the same
/// cosine-similarity helper the source chunker test double uses.
pub struct FakeVectorStore {
    points: Mutex<Vec<(Vec<f32>, ChunkPayload)>>,
}

impl FakeVectorStore {
    pub fn new() -> Self {
        Self {
            points: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn ensure_collection(&self, _dim: usize) -> anyhow::Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<(Vec<f32>, ChunkPayload)>) -> anyhow::Result<()> {
        self.points.lock().unwrap().extend(points);
        Ok(())
    }

    async fn search_with_score(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &SearchFilter,
    ) -> anyhow::Result<Vec<ScoredChunk>> {
        let points = self.points.lock().unwrap();
        let mut scored: Vec<ScoredChunk> = points
            .iter()
            .filter(|(_, payload)| payload.workspace_id == filter.workspace_id)
            .map(|(v, payload)| ScoredChunk {
                payload: payload.clone(),
                score: cosine_similarity(v, &vector).unwrap_or(0.0),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete_by_source(&self, source_reference: &str) -> anyhow::Result<()> {
        self.points
            .lock()
            .unwrap()
            .retain(|(_, payload)| payload.source_reference != source_reference);
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        self.points.lock().unwrap().clear();
        Ok(())
    }
}

impl FakeVectorStore {
    pub fn chunk_count_for(&self, source_reference: &str) -> usize {
        self.points
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| p.source_reference == source_reference)
            .count()
    }
}
