use crate::auth::middleware::AuthenticatedUser;
use crate::context::AppContext;
use crate::db::Bot;
use crate::error::DomainError;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize, Default)]
pub struct GenerateRequest {
    pub bot_id: Option<Uuid>,
    pub bot_name: Option<String>,
    pub workspace_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub widget_token: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub embed_code: String,
    pub bot_id: Uuid,
    pub bot_name: String,
}

/// Issues a widget token for an existing bot, or auto-provisions one when
/// none is given.
pub async fn generate(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, DomainError> {
    let requester = ctx
        .repository
        .find_user_by_id(user.user_id)
        .await?
        .ok_or(DomainError::Unauthenticated)?;

    let bot = match body.bot_id {
        Some(id) => {
            let bot = ctx
                .repository
                .find_bot(id)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("bot {id}")))?;
            if bot.owner_id != user.user_id {
                return Err(DomainError::Forbidden("bot not owned".to_string()));
            }
            bot
        }
        None => {
            let workspace_id = body
                .workspace_id
                .or(requester.current_workspace_id)
                .ok_or_else(|| DomainError::InvalidInput("no workspace_id and no current workspace".to_string()))?;
            let bot = Bot {
                id: Uuid::new_v4(),
                name: body.bot_name.unwrap_or_else(|| "Support Bot".to_string()),
                workspace_id,
                owner_id: user.user_id,
                system_prompt: None,
                is_active: true,
            };
            ctx.repository.insert_bot(&bot).await?;
            bot
        }
    };

    let widget_token = ctx.auth_service.issue_widget_token(user.user_id, bot.id).await?;
    let expires_at = Utc::now() + chrono::Duration::days(ctx.settings.auth.widget_token_expire_days);
    let embed_code = format!(
        "<script src=\"/widget.js\" data-token=\"{widget_token}\" data-bot=\"{}\"></script>",
        bot.id
    );

    Ok(Json(GenerateResponse {
        widget_token,
        expires_at,
        embed_code,
        bot_id: bot.id,
        bot_name: bot.name,
    }))
}

pub struct WidgetAuth {
    pub bot: Bot,
}

impl axum::extract::FromRequestParts<AppContext> for WidgetAuth {
    type Rejection = DomainError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(DomainError::Unauthenticated)?;
        let token = header.strip_prefix("Bearer ").ok_or(DomainError::Unauthenticated)?;

        let widget_token = state.auth_service.verify_widget_token(token).await?;
        let bot = state
            .repository
            .find_bot(widget_token.bot_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("bot {}", widget_token.bot_id)))?;
        Ok(WidgetAuth { bot })
    }
}

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub visitor_identifier: Option<String>,
}

#[derive(Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub bot_name: String,
    pub welcome_message: String,
}

pub async fn start_session(
    State(ctx): State<AppContext>,
    auth: WidgetAuth,
    body: Option<Json<StartSessionRequest>>,
) -> Result<Json<StartSessionResponse>, DomainError> {
    let visitor_identifier = body.and_then(|Json(b)| b.visitor_identifier);
    let session = ctx
        .widget_sessions
        .start_session(&auth.bot, visitor_identifier)
        .await?;

    Ok(Json(StartSessionResponse {
        session_id: session.id,
        bot_name: auth.bot.name,
        welcome_message: "Hello! How can I help you with your question today?".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct WidgetChatRequest {
    pub session_id: Uuid,
    pub message: String,
}

#[derive(Serialize)]
pub struct WidgetChatResponse {
    pub answer: String,
    pub message_id: Uuid,
    pub latency_ms: u64,
}

pub async fn chat(
    State(ctx): State<AppContext>,
    auth: WidgetAuth,
    Json(body): Json<WidgetChatRequest>,
) -> Result<Json<WidgetChatResponse>, DomainError> {
    let start = std::time::Instant::now();
    let outcome = ctx
        .widget_sessions
        .send_message(body.session_id, &auth.bot, &body.message)
        .await?;
    let latency_ms = start.elapsed().as_millis() as u64;

    Ok(Json(WidgetChatResponse {
        answer: outcome.answer,
        message_id: Uuid::new_v4(),
        latency_ms,
    }))
}
