use crate::auth::middleware::AuthenticatedUser;
use crate::context::AppContext;
use crate::error::DomainError;
use crate::logging::records::{LogRecord, RagInteractionRecord, RetrievedDocRecord};
use crate::token_estimate::estimate_tokens;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub conversation_id: Option<Uuid>,
    pub model_name: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub latency_ms: u64,
    pub message_id: Uuid,
    pub conversation_id: Uuid,
}

/// The chat protocol: validate → ensure a conversation exists → run the
/// pipeline → persist the turn → fire-and-forget the interaction log.
pub async fn send_message(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, DomainError> {
    let requester = ctx
        .repository
        .find_user_by_id(user.user_id)
        .await?
        .ok_or(DomainError::Unauthenticated)?;
    let workspace_id = requester
        .current_workspace_id
        .ok_or_else(|| DomainError::InvalidInput("no current workspace set".to_string()))?;

    let question = body.question.trim().to_string();
    validate_question_length(&question, ctx.settings.rag.max_question_length)?;

    let conversation = match body.conversation_id {
        Some(id) => {
            let conversation = ctx
                .repository
                .find_conversation(id)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("conversation {id}")))?;
            if conversation.user_id != user.user_id || conversation.workspace_id != workspace_id {
                return Err(DomainError::Forbidden("not your conversation".to_string()));
            }
            conversation
        }
        None => {
            let title = if question.chars().count() > 10 {
                format!("{}...", question.chars().take(10).collect::<String>())
            } else {
                Utc::now().to_rfc3339()
            };
            let conversation = crate::db::Conversation {
                id: Uuid::new_v4(),
                title,
                user_id: user.user_id,
                workspace_id,
                created_at: Utc::now(),
            };
            ctx.repository.insert_conversation(&conversation).await?;
            conversation
        }
    };

    let request_start = Instant::now();
    let outcome = ctx.pipeline.run(&question, workspace_id, user.user_id).await;
    let latency_ms = request_start.elapsed().as_millis() as u64;

    let message = crate::db::Message {
        id: Uuid::new_v4(),
        conversation_id: conversation.id,
        user_id: Some(user.user_id),
        question: question.clone(),
        answer: outcome.answer.clone(),
        latency_ms: latency_ms as i64,
        timestamp: Utc::now(),
        feedback: None,
    };
    ctx.repository.insert_message(&message).await?;

    let prompt_tokens = estimate_tokens(&question);
    let completion_tokens = estimate_tokens(&outcome.answer);
    ctx.interaction_logger.log(LogRecord::Rag(RagInteractionRecord {
        timestamp: Utc::now(),
        session_id: None,
        user_id: user.user_id,
        user_query: question.clone(),
        retrieved_docs: outcome
            .metrics
            .retrieved_docs_info
            .iter()
            .map(|d| RetrievedDocRecord {
                source_reference: d.source_reference.clone(),
                score: d.score,
            })
            .collect(),
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
        response: outcome.answer.clone(),
        latency_ms,
        retrieval_latency_ms: outcome.metrics.retrieval_latency_ms,
        generation_latency_ms: outcome.metrics.generation_latency_ms,
        model_name: body.model_name.unwrap_or(outcome.metrics.model_name.clone()),
        num_retrieved: outcome.metrics.num_retrieved,
        conversation_id: conversation.id,
        message_id: message.id,
        error: outcome.metrics.error.clone(),
        source_language: outcome.metrics.source_language.clone(),
        response_language: outcome.metrics.response_language.clone(),
        was_translated: outcome.metrics.was_translated,
        original_question: question,
        translated_question: outcome.metrics.translated_question.clone(),
    }));

    Ok(Json(ChatResponse {
        answer: outcome.answer,
        latency_ms,
        message_id: message.id,
        conversation_id: conversation.id,
    }))
}

fn validate_question_length(question: &str, max_question_length: usize) -> Result<(), DomainError> {
    if question.is_empty() || question.len() > max_question_length {
        return Err(DomainError::InvalidInput(format!(
            "question must be between 1 and {max_question_length} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_question_is_rejected() {
        assert!(validate_question_length("", 1000).is_err());
    }

    #[test]
    fn single_byte_question_is_accepted() {
        assert!(validate_question_length("a", 1000).is_ok());
    }

    #[test]
    fn question_at_max_length_is_accepted() {
        let question = "a".repeat(1000);
        assert!(validate_question_length(&question, 1000).is_ok());
    }

    #[test]
    fn question_over_max_length_is_rejected() {
        let question = "a".repeat(1001);
        assert!(validate_question_length(&question, 1000).is_err());
    }
}
