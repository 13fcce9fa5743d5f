use crate::db::Repository;
use crate::embedding::Embedder;
use crate::llm::{Chat, ChatTurn};
use crate::translate::Translator;
use crate::vector::{ScoredChunk, SearchFilter, VectorStore};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const GREETINGS: &[&str] = &[
    "hey",
    "hi",
    "hello",
    "good morning",
    "good afternoon",
    "good evening",
    "what's up",
    "how are you",
    "sup",
];

const GREETING_REPLY: &str = "Hello! How can I help you with your question today?";
const FALLBACK_ANSWER: &str =
    "I'm having trouble processing your question right now. Please try again.";
const SYSTEM_PERSONA: &str =
    "You are a technical support assistant. Answer using only the provided context. \
     If the context does not contain the answer, say you don't have enough information.";

#[derive(Debug, Clone)]
pub struct RetrievedDocInfo {
    pub source_reference: String,
    pub workspace_id: String,
    pub score: f32,
    pub snippet: String,
}

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub retrieval_latency_ms: u64,
    pub generation_latency_ms: u64,
    pub retrieved_docs_info: Vec<RetrievedDocInfo>,
    pub model_name: String,
    pub num_retrieved: usize,
    pub source_language: String,
    pub response_language: String,
    pub was_translated: bool,
    pub translated_question: Option<String>,
    pub error: Option<String>,
}

pub struct PipelineOutcome {
    pub answer: String,
    pub metrics: PipelineMetrics,
}

pub struct RagPipeline {
    repository: Arc<Repository>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    chat: Arc<dyn Chat>,
    translator: Arc<dyn Translator>,
    retrieval_k: usize,
    score_threshold: f32,
    temperature: f32,
    model_name: String,
}

impl RagPipeline {
    pub fn new(
        repository: Arc<Repository>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        chat: Arc<dyn Chat>,
        translator: Arc<dyn Translator>,
        retrieval_k: usize,
        score_threshold: f32,
        temperature: f32,
        model_name: String,
    ) -> Self {
        Self {
            repository,
            embedder,
            vector_store,
            chat,
            translator,
            retrieval_k,
            score_threshold,
            temperature: temperature.min(0.4),
            model_name,
        }
    }

    pub async fn run(&self, question: &str, workspace_id: Uuid, user_id: Uuid) -> PipelineOutcome {
        let response_language = self
            .repository
            .get_user_preference(user_id, "language")
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "en".to_string());

        if is_greeting(question) {
            return PipelineOutcome {
                answer: GREETING_REPLY.to_string(),
                metrics: PipelineMetrics {
                    retrieval_latency_ms: 0,
                    generation_latency_ms: 0,
                    retrieved_docs_info: Vec::new(),
                    model_name: self.model_name.clone(),
                    num_retrieved: 0,
                    source_language: "en".to_string(),
                    response_language,
                    was_translated: false,
                    translated_question: None,
                    error: None,
                },
            };
        }

        self.run_full(question, workspace_id, response_language).await
    }

    async fn run_full(
        &self,
        question: &str,
        workspace_id: Uuid,
        response_language: String,
    ) -> PipelineOutcome {
        let source_language = self.translator.detect(question);
        let mut was_translated = false;
        let mut translated_question = None;

        let retrieval_query = if source_language != "en" {
            match self.translator.translate(question, &source_language, "en").await {
                Ok(translated) => {
                    was_translated = true;
                    translated_question = Some(translated.clone());
                    translated
                }
                Err(e) => {
                    tracing::warn!(error = %e, "translation failed, retrieving with original text");
                    question.to_string()
                }
            }
        } else {
            question.to_string()
        };

        let retrieval_start = Instant::now();
        let retrieval_result = self.retrieve(&retrieval_query, workspace_id).await;
        let retrieval_latency_ms = retrieval_start.elapsed().as_millis() as u64;

        let (context, retrieved_docs_info, num_retrieved) = match retrieval_result {
            Ok(hits) => {
                let num_retrieved = hits.len();
                let docs_info = hits.iter().map(to_doc_info).collect::<Vec<_>>();
                let retained = retain_above_threshold(&hits, self.score_threshold);
                let context = retained
                    .iter()
                    .map(|c| c.payload.text.clone())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                (context, docs_info, num_retrieved)
            }
            Err(e) => {
                tracing::error!(error = %e, "retrieval failed");
                (String::new(), Vec::new(), 0)
            }
        };

        let generation_start = Instant::now();
        let generation_result = self
            .generate(question, &context, &response_language)
            .await;
        let generation_latency_ms = generation_start.elapsed().as_millis() as u64;

        let (answer, error) = match generation_result {
            Ok(answer) => (answer, None),
            Err(e) => {
                tracing::error!(error = %e, "generation failed, returning fallback answer");
                (FALLBACK_ANSWER.to_string(), Some(e.to_string()))
            }
        };

        PipelineOutcome {
            answer,
            metrics: PipelineMetrics {
                retrieval_latency_ms,
                generation_latency_ms,
                retrieved_docs_info,
                model_name: self.model_name.clone(),
                num_retrieved,
                source_language,
                response_language,
                was_translated,
                translated_question,
                error,
            },
        }
    }

    async fn retrieve(&self, query: &str, workspace_id: Uuid) -> anyhow::Result<Vec<ScoredChunk>> {
        let embedding = self.embedder.embed(query).await?;
        self.vector_store
            .search_with_score(
                embedding,
                self.retrieval_k,
                &SearchFilter {
                    workspace_id: workspace_id.to_string(),
                },
            )
            .await
    }

    async fn generate(
        &self,
        question: &str,
        context: &str,
        response_language: &str,
    ) -> anyhow::Result<String> {
        let context_block = if context.is_empty() {
            "No relevant context was found.".to_string()
        } else {
            context.to_string()
        };

        let prompt = format!(
            "{SYSTEM_PERSONA}\nRespond in language: {response_language}\n\nContext:\n{context_block}\n\nQuestion: {question}"
        );

        self.chat
            .generate(
                vec![ChatTurn {
                    role: "user".to_string(),
                    content: prompt,
                }],
                self.temperature,
            )
            .await
    }
}

/// Keeps only hits scoring strictly above the threshold; a hit scored exactly
/// at the threshold is dropped, matching `score_threshold` as an exclusive
/// lower bound.
fn retain_above_threshold(hits: &[ScoredChunk], threshold: f32) -> Vec<&ScoredChunk> {
    hits.iter().filter(|h| h.score > threshold).collect()
}

fn to_doc_info(hit: &ScoredChunk) -> RetrievedDocInfo {
    RetrievedDocInfo {
        source_reference: hit.payload.source_reference.clone(),
        workspace_id: hit.payload.workspace_id.clone(),
        score: hit.score,
        snippet: hit.payload.text.chars().take(200).collect(),
    }
}

/// A message of at most 3 whitespace-separated tokens, normalized, that
/// contains one of the configured greeting phrases.
fn is_greeting(question: &str) -> bool {
    let normalized = question.trim().to_lowercase();
    if normalized.split_whitespace().count() > 3 {
        return false;
    }
    GREETINGS.iter().any(|greeting| normalized.contains(greeting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::ChunkPayload;

    #[test]
    fn short_greeting_is_detected() {
        assert!(is_greeting("hi"));
        assert!(is_greeting("Hello"));
        assert!(is_greeting("good morning"));
    }

    #[test]
    fn short_greeting_with_punctuation_or_trailing_word_is_detected() {
        assert!(is_greeting("hi!"));
        assert!(is_greeting("hi there"));
    }

    #[test]
    fn longer_message_is_not_a_greeting_even_with_prefix() {
        assert!(!is_greeting("hi there, I have a question about exports"));
    }

    #[test]
    fn non_greeting_short_message_is_not_a_greeting() {
        assert!(!is_greeting("reset password"));
    }

    fn chunk(score: f32) -> ScoredChunk {
        ScoredChunk {
            payload: ChunkPayload {
                chunk_id: "c1".to_string(),
                source_reference: "doc.txt".to_string(),
                workspace_id: "w1".to_string(),
                text: "body".to_string(),
            },
            score,
        }
    }

    #[test]
    fn hit_scored_exactly_at_threshold_is_excluded() {
        let hits = vec![chunk(0.6)];
        assert!(retain_above_threshold(&hits, 0.6).is_empty());
    }

    #[test]
    fn hit_scored_just_above_threshold_is_included() {
        let hits = vec![chunk(0.6000001)];
        assert_eq!(retain_above_threshold(&hits, 0.6).len(), 1);
    }
}
