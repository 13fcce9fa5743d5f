use super::{ChunkPayload, ScoredChunk, SearchFilter, VectorStore};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    with_payload_selector::SelectorOptions, Condition, CreateCollectionBuilder,
    DeletePointsBuilder, Distance, Filter, PointStruct, SearchPoints, UpsertPointsBuilder,
    Vectors, VectorParamsBuilder, WithPayloadSelector,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    pub fn new(url: &str, collection: String) -> anyhow::Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client, collection })
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(&self, dim: usize) -> anyhow::Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine)),
            )
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        self.client.collection_exists(&self.collection).await?;
        Ok(())
    }

    async fn upsert(&self, points: Vec<(Vec<f32>, ChunkPayload)>) -> anyhow::Result<()> {
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|(vector, chunk)| {
                let payload: Payload = json!({
                    "source_reference": chunk.source_reference,
                    "workspace_id": chunk.workspace_id,
                    "text": chunk.text,
                })
                .try_into()
                .expect("payload is always a JSON object");
                PointStruct {
                    id: Some(chunk.chunk_id.into()),
                    vectors: Some(Vectors::from(vector)),
                    payload: payload.into(),
                    ..Default::default()
                }
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(&self.collection, points).build();
        self.client.upsert_points(upsert).await?;
        Ok(())
    }

    async fn search_with_score(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &SearchFilter,
    ) -> anyhow::Result<Vec<ScoredChunk>> {
        let qfilter = Filter::must([Condition::matches(
            "workspace_id",
            filter.workspace_id.clone(),
        )]);

        let result = self
            .client
            .search_points(SearchPoints {
                collection_name: self.collection.clone(),
                vector,
                filter: Some(qfilter),
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await?;

        Ok(result
            .result
            .into_iter()
            .map(|point| {
                let payload = &point.payload;
                let chunk_id = point
                    .id
                    .as_ref()
                    .and_then(|id| id.point_id_options.as_ref())
                    .map(|v| match v {
                        qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s) => s.clone(),
                        qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
                    })
                    .unwrap_or_default();
                ScoredChunk {
                    payload: ChunkPayload {
                        chunk_id,
                        source_reference: payload
                            .get("source_reference")
                            .and_then(|v| v.as_str())
                            .map(|s| s.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        workspace_id: payload
                            .get("workspace_id")
                            .and_then(|v| v.as_str())
                            .map(|s| s.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        text: payload
                            .get("text")
                            .and_then(|v| v.as_str())
                            .map(|s| s.as_str())
                            .unwrap_or_default()
                            .to_string(),
                    },
                    score: point.score,
                }
            })
            .collect())
    }

    async fn delete_by_source(&self, source_reference: &str) -> anyhow::Result<()> {
        let qfilter = Filter::must([Condition::matches(
            "source_reference",
            source_reference.to_string(),
        )]);
        let delete = DeletePointsBuilder::new(&self.collection).points(qfilter).build();
        self.client.delete_points(delete).await?;
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        let _ = self.client.delete_collection(&self.collection).await;
        Ok(())
    }
}
