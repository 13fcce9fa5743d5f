use crate::db::{Bot, ChatSession, Repository};
use crate::error::DomainError;
use crate::pipeline::{PipelineOutcome, RagPipeline};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Fast admission-control cache of active sessions per bot. The relational
/// `chat_sessions` table remains the source of truth for `messages_count`
/// and `last_activity_at`; this map only answers "is the bot at its session
/// cap" without a DB round trip on the hot path.
#[derive(Clone, Copy)]
struct SessionHandle {
    bot_id: Uuid,
}

pub struct WidgetSessionManager {
    repository: Arc<Repository>,
    pipeline: Arc<RagPipeline>,
    active_sessions: DashMap<Uuid, SessionHandle>,
    max_sessions_per_bot: usize,
}

impl WidgetSessionManager {
    pub fn new(repository: Arc<Repository>, pipeline: Arc<RagPipeline>, max_sessions_per_bot: usize) -> Self {
        Self {
            repository,
            pipeline,
            active_sessions: DashMap::new(),
            max_sessions_per_bot,
        }
    }

    pub async fn start_session(
        &self,
        bot: &Bot,
        visitor_identifier: Option<String>,
    ) -> Result<ChatSession, DomainError> {
        let active = self.repository.count_active_chat_sessions(bot.id).await?;
        if active as usize >= self.max_sessions_per_bot {
            return Err(DomainError::RateLimited(format!(
                "bot {} has reached its active session cap",
                bot.id
            )));
        }

        let session = ChatSession {
            id: Uuid::new_v4(),
            bot_id: bot.id,
            session_token: Uuid::new_v4().to_string(),
            visitor_identifier,
            started_at: Utc::now(),
            last_activity_at: Utc::now(),
            messages_count: 0,
            is_active: true,
        };
        self.repository.insert_chat_session(&session).await?;
        self.active_sessions
            .insert(session.id, SessionHandle { bot_id: bot.id });
        Ok(session)
    }

    pub async fn send_message(
        &self,
        session_id: Uuid,
        bot: &Bot,
        message: &str,
    ) -> Result<PipelineOutcome, DomainError> {
        let session = self
            .repository
            .find_chat_session(session_id)
            .await?
            .filter(|s| s.is_active && s.bot_id == bot.id)
            .ok_or_else(|| DomainError::NotFound(format!("chat session {session_id}")))?;

        let outcome = self.pipeline.run(message, bot.workspace_id, bot.owner_id).await;
        self.repository
            .record_chat_session_turn(session.id, Utc::now())
            .await?;
        Ok(outcome)
    }
}
