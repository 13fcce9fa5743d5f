use crate::db::models::*;
use crate::db::pool::DbPool;
use crate::error::DomainError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Thin wrapper over the connection pool; every relational access for the
/// core goes through here so call sites never hold a raw `PgPool`.
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn is_workspace_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM workspace_users WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(row.is_some())
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, is_admin, current_workspace_id)
             VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.current_workspace_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn insert_workspace(&self, workspace: &Workspace) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO workspaces (id, name, description, is_active, active_repository_id)
             VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.description)
        .bind(workspace.is_active)
        .bind(workspace.active_repository_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn insert_workspace_user(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO workspace_users (workspace_id, user_id, role) VALUES ($1,$2,$3)")
            .bind(workspace_id)
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn set_user_preference(
        &self,
        user_id: Uuid,
        preference: &str,
        value: &str,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO user_preferences (user_id, preference, value) VALUES ($1,$2,$3)
             ON CONFLICT (user_id, preference) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(user_id)
        .bind(preference)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn get_user_preference(
        &self,
        user_id: Uuid,
        preference: &str,
    ) -> Result<Option<String>, DomainError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM user_preferences WHERE user_id = $1 AND preference = $2",
        )
        .bind(user_id)
        .bind(preference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(row.map(|(v,)| v))
    }

    // --- Data sources ---------------------------------------------------

    pub async fn insert_data_source(&self, ds: &DataSource) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO data_sources
               (id, source_type, reference, path, workspace_id, owner_id, category, tags, size_mb, added_at, last_synced_at, is_synced)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
             ON CONFLICT (id) DO UPDATE SET
               path = EXCLUDED.path,
               category = EXCLUDED.category,
               tags = EXCLUDED.tags,
               size_mb = EXCLUDED.size_mb",
        )
        .bind(ds.id)
        .bind(ds.source_type)
        .bind(&ds.reference)
        .bind(&ds.path)
        .bind(ds.workspace_id)
        .bind(ds.owner_id)
        .bind(&ds.category)
        .bind(&ds.tags)
        .bind(ds.size_mb)
        .bind(ds.added_at)
        .bind(ds.last_synced_at)
        .bind(ds.is_synced)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn find_data_source(&self, id: Uuid) -> Result<Option<DataSource>, DomainError> {
        sqlx::query_as::<_, DataSource>("SELECT * FROM data_sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn find_data_source_by_reference(
        &self,
        workspace_id: Uuid,
        reference: &str,
    ) -> Result<Option<DataSource>, DomainError> {
        sqlx::query_as::<_, DataSource>(
            "SELECT * FROM data_sources WHERE workspace_id = $1 AND reference = $2",
        )
        .bind(workspace_id)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn find_data_sources_to_sync(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<DataSource>, DomainError> {
        sqlx::query_as::<_, DataSource>(
            "SELECT * FROM data_sources
             WHERE workspace_id = $1 AND is_synced = false AND source_type != 'external_task'",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn find_synced_data_sources(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<DataSource>, DomainError> {
        sqlx::query_as::<_, DataSource>(
            "SELECT * FROM data_sources
             WHERE workspace_id = $1 AND is_synced = true AND source_type != 'external_task'",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn mark_synced(&self, id: Uuid, synced_at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query("UPDATE data_sources SET is_synced = true, last_synced_at = $2 WHERE id = $1")
            .bind(id)
            .bind(synced_at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn mark_unsynced(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("UPDATE data_sources SET is_synced = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    // --- Conversations / messages ----------------------------------------

    pub async fn insert_conversation(&self, conv: &Conversation) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO conversations (id, title, user_id, workspace_id, created_at) VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(conv.id)
        .bind(&conv.title)
        .bind(conv.user_id)
        .bind(conv.workspace_id)
        .bind(conv.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, DomainError> {
        sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, DomainError> {
        sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn insert_message(&self, msg: &Message) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, user_id, question, answer, latency_ms, timestamp, feedback)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
        )
        .bind(msg.id)
        .bind(msg.conversation_id)
        .bind(msg.user_id)
        .bind(&msg.question)
        .bind(&msg.answer)
        .bind(msg.latency_ms)
        .bind(msg.timestamp)
        .bind(msg.feedback)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, DomainError> {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY timestamp ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn find_message(&self, id: Uuid) -> Result<Option<Message>, DomainError> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn set_message_feedback(&self, id: Uuid, feedback: Feedback) -> Result<(), DomainError> {
        sqlx::query("UPDATE messages SET feedback = $2 WHERE id = $1")
            .bind(id)
            .bind(feedback)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    // --- Refresh tokens ----------------------------------------------------

    pub async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at, is_active)
             VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn active_refresh_tokens(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, DomainError> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE user_id = $1 AND is_active = true ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn deactivate_refresh_token(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("UPDATE refresh_tokens SET is_active = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn deactivate_all_refresh_tokens(&self, user_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("UPDATE refresh_tokens SET is_active = false WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn find_active_refresh_token_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<RefreshToken>, DomainError> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_hash = $1 AND is_active = true AND expires_at > now()",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn cleanup_refresh_tokens(&self) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens
             WHERE expires_at < now()
                OR (is_active = false AND created_at < now() - interval '7 days')",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    // --- Bots / widget tokens / chat sessions ------------------------------

    pub async fn insert_bot(&self, bot: &Bot) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO bots (id, name, workspace_id, owner_id, system_prompt, is_active)
             VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(bot.id)
        .bind(&bot.name)
        .bind(bot.workspace_id)
        .bind(bot.owner_id)
        .bind(&bot.system_prompt)
        .bind(bot.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn find_bot(&self, id: Uuid) -> Result<Option<Bot>, DomainError> {
        sqlx::query_as::<_, Bot>("SELECT * FROM bots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn insert_widget_token(&self, token: &WidgetToken) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO widget_tokens (id, bot_id, owner_id, token_hash, expires_at, is_active, last_used_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7)",
        )
        .bind(token.id)
        .bind(token.bot_id)
        .bind(token.owner_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.is_active)
        .bind(token.last_used_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn find_active_widget_token_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<WidgetToken>, DomainError> {
        sqlx::query_as::<_, WidgetToken>(
            "SELECT * FROM widget_tokens WHERE token_hash = $1 AND is_active = true AND expires_at > now()",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn touch_widget_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query("UPDATE widget_tokens SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn count_active_chat_sessions(&self, bot_id: Uuid) -> Result<i64, DomainError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM chat_sessions WHERE bot_id = $1 AND is_active = true",
        )
        .bind(bot_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(row.0)
    }

    pub async fn insert_chat_session(&self, session: &ChatSession) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO chat_sessions
               (id, bot_id, session_token, visitor_identifier, started_at, last_activity_at, messages_count, is_active)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
        )
        .bind(session.id)
        .bind(session.bot_id)
        .bind(&session.session_token)
        .bind(&session.visitor_identifier)
        .bind(session.started_at)
        .bind(session.last_activity_at)
        .bind(session.messages_count)
        .bind(session.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn find_chat_session(&self, id: Uuid) -> Result<Option<ChatSession>, DomainError> {
        sqlx::query_as::<_, ChatSession>("SELECT * FROM chat_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.into()))
    }

    pub async fn record_chat_session_turn(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE chat_sessions SET messages_count = messages_count + 1, last_activity_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Internal(e.into()))?;
        Ok(())
    }
}
