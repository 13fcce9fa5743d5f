use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::EmbeddingConfig;

/// Text → fixed-dim vector. Deterministic for a given (model, text);
/// implementations may batch for throughput.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/v1/embeddings` client with a read-through cache for
/// repeated identical texts (a pure optimization, never load-bearing).
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
    cache: RwLock<std::collections::HashMap<String, Vec<f32>>>,
}

impl HttpEmbedder {
    pub async fn new(config: &EmbeddingConfig, timeout: Duration) -> anyhow::Result<Arc<Self>> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let this = Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimension: 0,
            cache: RwLock::new(std::collections::HashMap::new()),
        };

        // Discover the embedding dimension with a probe call.
        let probe = this.embed_internal("dimension probe").await?;
        let dimension = probe.len();
        Ok(Arc::new(Self { dimension, ..this }))
    }

    async fn embed_internal(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        const MAX_ATTEMPTS: u32 = 3;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self
                .client
                .post(format!("{}/v1/embeddings", self.base_url))
                .json(&EmbeddingRequest {
                    input: text,
                    model: &self.model,
                });
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed: EmbeddingResponse = response.json().await?;
                    let embedding = parsed
                        .data
                        .into_iter()
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("embedding response had no data"))?
                        .embedding;
                    return Ok(embedding);
                }
                Ok(response) if response.status().is_server_error() && attempt < MAX_ATTEMPTS => {
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                    continue;
                }
                Ok(response) => {
                    anyhow::bail!("embedding backend returned {}", response.status());
                }
                Err(e) if attempt < MAX_ATTEMPTS && e.is_timeout() => {
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if let Some(cached) = self.cache.read().await.get(text) {
            return Ok(cached.clone());
        }
        let embedding = self.embed_internal(text).await?;
        self.cache
            .write()
            .await
            .insert(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        const BATCH: usize = 16;
        let mut results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH) {
            let futures = chunk.iter().map(|t| self.embed(t));
            let batch = futures::future::try_join_all(futures).await?;
            results.extend(batch);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
