use crate::auth::middleware::AuthenticatedUser;
use crate::context::AppContext;
use crate::db::{Conversation, Feedback, Message};
use crate::error::DomainError;
use crate::logging::records::{FeedbackInteractionRecord, LogRecord};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

pub async fn list(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Conversation>>, DomainError> {
    let conversations = ctx.repository.list_conversations(user.user_id).await?;
    Ok(Json(conversations))
}

pub async fn messages(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, DomainError> {
    let conversation = ctx
        .repository
        .find_conversation(id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("conversation {id}")))?;
    if conversation.user_id != user.user_id {
        return Err(DomainError::Forbidden("not your conversation".to_string()));
    }
    let messages = ctx.repository.list_messages(id).await?;
    Ok(Json(messages))
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Feedback,
}

pub async fn feedback(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<FeedbackRequest>,
) -> Result<Json<serde_json::Value>, DomainError> {
    ctx.repository.set_message_feedback(id, body.feedback).await?;
    let message = ctx.repository.find_message(id).await?;

    ctx.interaction_logger.log(LogRecord::Feedback(FeedbackInteractionRecord {
        timestamp: Utc::now(),
        session_id: None,
        message_id: id,
        user_id: user.user_id,
        feedback_type: match body.feedback {
            Feedback::Up => "up".to_string(),
            Feedback::Down => "down".to_string(),
        },
        original_query: message.as_ref().map(|m| m.question.clone()).unwrap_or_default(),
        original_response: message.as_ref().map(|m| m.answer.clone()).unwrap_or_default(),
        response_latency_ms: message.as_ref().map(|m| m.latency_ms as u64).unwrap_or_default(),
        num_retrieved_docs: 0,
        model_used: String::new(),
        conversation_id: message.as_ref().map(|m| m.conversation_id).unwrap_or_else(Uuid::nil),
        client_ip: None,
    }));

    Ok(Json(serde_json::json!({"status": "ok"})))
}
