use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocRecord {
    pub source_reference: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LogRecord {
    Rag(RagInteractionRecord),
    Feedback(FeedbackInteractionRecord),
}

impl LogRecord {
    pub fn file_name(&self) -> &'static str {
        match self {
            LogRecord::Rag(_) => "rag_interactions.jsonl",
            LogRecord::Feedback(_) => "feedback_interactions.jsonl",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RagInteractionRecord {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub session_id: Option<Uuid>,
    pub user_id: Uuid,
    pub user_query: String,
    pub retrieved_docs: Vec<RetrievedDocRecord>,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
    pub response: String,
    pub latency_ms: u64,
    pub retrieval_latency_ms: u64,
    pub generation_latency_ms: u64,
    pub model_name: String,
    pub num_retrieved: usize,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub error: Option<String>,
    pub source_language: String,
    pub response_language: String,
    pub was_translated: bool,
    pub original_question: String,
    pub translated_question: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackInteractionRecord {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub session_id: Option<Uuid>,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub feedback_type: String,
    pub original_query: String,
    pub original_response: String,
    pub response_latency_ms: u64,
    pub num_retrieved_docs: usize,
    pub model_used: String,
    pub conversation_id: Uuid,
    pub client_ip: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_rag() -> RagInteractionRecord {
        RagInteractionRecord {
            timestamp: Utc::now(),
            session_id: None,
            user_id: Uuid::new_v4(),
            user_query: "how do I reset my password".to_string(),
            retrieved_docs: vec![RetrievedDocRecord {
                source_reference: "clickup_1.txt".to_string(),
                score: 0.81,
            }],
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            response: "...".to_string(),
            latency_ms: 120,
            retrieval_latency_ms: 40,
            generation_latency_ms: 80,
            model_name: "gpt".to_string(),
            num_retrieved: 1,
            conversation_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            error: None,
            source_language: "en".to_string(),
            response_language: "en".to_string(),
            was_translated: false,
            original_question: "how do I reset my password".to_string(),
            translated_question: None,
        }
    }

    #[test]
    fn rag_record_picks_the_rag_file_name() {
        let record = LogRecord::Rag(sample_rag());
        assert_eq!(record.file_name(), "rag_interactions.jsonl");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("user_query").is_some());
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn feedback_record_picks_the_feedback_file_name() {
        let record = LogRecord::Feedback(FeedbackInteractionRecord {
            timestamp: Utc::now(),
            session_id: None,
            message_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            feedback_type: "up".to_string(),
            original_query: "q".to_string(),
            original_response: "a".to_string(),
            response_latency_ms: 10,
            num_retrieved_docs: 1,
            model_used: "gpt".to_string(),
            conversation_id: Uuid::new_v4(),
            client_ip: None,
        });
        assert_eq!(record.file_name(), "feedback_interactions.jsonl");
    }
}
