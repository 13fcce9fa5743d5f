use crate::auth::jwt::JwtCodec;
use crate::config::AuthConfig;
use crate::db::{Repository, User};
use crate::db::{RefreshToken, WidgetToken};
use crate::error::DomainError;
use crate::keyed_lock::KeyedLock;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Password hashing, access/refresh/widget token issuance, verification,
/// rotation (at most two active refresh tokens per user), and cleanup.
pub struct AuthService {
    repository: Arc<Repository>,
    codec: JwtCodec,
    config: AuthConfig,
    rotation_locks: KeyedLock<Uuid>,
}

impl AuthService {
    pub fn new(repository: Arc<Repository>, config: AuthConfig) -> Self {
        let codec = JwtCodec::new(&config.secret_key);
        Self {
            repository,
            codec,
            config,
            rotation_locks: KeyedLock::new(),
        }
    }

    pub fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("hashing password: {e}"))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, DomainError> {
        let user = self
            .repository
            .find_user_by_username(username)
            .await?
            .ok_or(DomainError::Unauthenticated)?;
        if !self.verify_password(password, &user.password_hash) {
            return Err(DomainError::Unauthenticated);
        }
        Ok(user)
    }

    /// Issues a fresh access + refresh pair, rotating so that at most the
    /// two most recently created active refresh tokens survive. Serialized
    /// per user so a burst of logins can never leave more than two active.
    pub async fn issue_tokens(&self, user_id: Uuid) -> Result<TokenPair, DomainError> {
        let _guard = self.rotation_locks.lock(user_id).await;

        let access_token = self
            .codec
            .encode_access(user_id, self.config.access_token_expire_minutes)
            .map_err(|e| DomainError::Internal(e))?;

        let refresh_secret = generate_opaque_secret();
        let token_hash = hash_secret(&refresh_secret);
        let refresh_row = RefreshToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            expires_at: Utc::now() + chrono::Duration::days(self.config.refresh_token_expire_days),
            created_at: Utc::now(),
            is_active: true,
        };
        self.repository.insert_refresh_token(&refresh_row).await?;

        let mut active = self.repository.active_refresh_tokens(user_id).await?;
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for stale in active.into_iter().skip(2) {
            self.repository.deactivate_refresh_token(stale.id).await?;
        }

        Ok(TokenPair {
            access_token,
            refresh_token: refresh_secret,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Uuid, DomainError> {
        self.codec
            .decode_access(token)
            .map(|c| c.sub)
            .map_err(|e| DomainError::InvalidToken(e.to_string()))
    }

    pub async fn refresh(&self, refresh_secret: &str) -> Result<TokenPair, DomainError> {
        let hash = hash_secret(refresh_secret);
        let existing = self
            .repository
            .find_active_refresh_token_by_hash(&hash)
            .await?
            .ok_or_else(|| DomainError::InvalidToken("refresh token not recognized".to_string()))?;

        self.repository.deactivate_refresh_token(existing.id).await?;
        self.issue_tokens(existing.user_id).await
    }

    pub async fn logout(&self, refresh_secret: &str) -> Result<(), DomainError> {
        let hash = hash_secret(refresh_secret);
        if let Some(token) = self.repository.find_active_refresh_token_by_hash(&hash).await? {
            self.repository.deactivate_refresh_token(token.id).await?;
        }
        Ok(())
    }

    pub async fn logout_all(&self, user_id: Uuid) -> Result<(), DomainError> {
        self.repository.deactivate_all_refresh_tokens(user_id).await
    }

    pub async fn cleanup_expired(&self) -> Result<u64, DomainError> {
        self.repository.cleanup_refresh_tokens().await
    }

    pub async fn issue_widget_token(
        &self,
        owner_id: Uuid,
        bot_id: Uuid,
    ) -> Result<String, DomainError> {
        let token = self
            .codec
            .encode_widget(owner_id, bot_id, self.config.widget_token_expire_days)
            .map_err(DomainError::Internal)?;
        let row = WidgetToken {
            id: Uuid::new_v4(),
            bot_id,
            owner_id,
            token_hash: hash_secret(&token),
            expires_at: Utc::now() + chrono::Duration::days(self.config.widget_token_expire_days),
            is_active: true,
            last_used_at: None,
        };
        self.repository.insert_widget_token(&row).await?;
        Ok(token)
    }

    pub async fn verify_widget_token(&self, token: &str) -> Result<WidgetToken, DomainError> {
        let claims = self
            .codec
            .decode_widget(token)
            .map_err(|e| DomainError::InvalidToken(e.to_string()))?;
        let hash = hash_secret(token);
        let row = self
            .repository
            .find_active_widget_token_by_hash(&hash)
            .await?
            .ok_or_else(|| DomainError::InvalidToken("widget token revoked or expired".to_string()))?;
        if row.bot_id != claims.bot_id {
            return Err(DomainError::InvalidToken("widget token bot mismatch".to_string()));
        }
        self.repository.touch_widget_token(row.id, Utc::now()).await?;
        Ok(row)
    }
}

fn generate_opaque_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
