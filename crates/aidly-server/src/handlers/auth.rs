use crate::auth::middleware::AuthenticatedUser;
use crate::context::AppContext;
use crate::error::DomainError;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn refresh_cookie(value: &str, max_age_days: i64) -> String {
    format!(
        "{REFRESH_COOKIE}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        max_age_days * 86_400
    )
}

pub async fn login(
    State(ctx): State<AppContext>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, DomainError> {
    let user = ctx.auth_service.authenticate(&body.username, &body.password).await?;
    let pair = ctx.auth_service.issue_tokens(user.id).await?;

    let cookie = refresh_cookie(&pair.refresh_token, ctx.settings.auth.refresh_token_expire_days);
    let mut response = Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    })
    .into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, cookie.parse().map_err(|_| DomainError::Internal(anyhow::anyhow!("invalid cookie header")))?);
    Ok(response)
}

#[derive(Deserialize, Default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

pub async fn refresh(
    State(ctx): State<AppContext>,
    headers: axum::http::HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response, DomainError> {
    let from_body = body.and_then(|Json(b)| b.refresh_token);
    let from_cookie = headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|kv| {
                let (k, v) = kv.trim().split_once('=')?;
                (k == REFRESH_COOKIE).then(|| v.to_string())
            })
        });

    let presented = from_body
        .or(from_cookie)
        .ok_or(DomainError::Unauthenticated)?;

    let pair = ctx.auth_service.refresh(&presented).await?;
    let cookie = refresh_cookie(&pair.refresh_token, ctx.settings.auth.refresh_token_expire_days);
    let mut response = Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    })
    .into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, cookie.parse().map_err(|_| DomainError::Internal(anyhow::anyhow!("invalid cookie header")))?);
    Ok(response)
}

pub async fn logout(
    State(ctx): State<AppContext>,
    headers: axum::http::HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<serde_json::Value>, DomainError> {
    let from_body = body.and_then(|Json(b)| b.refresh_token);
    let from_cookie = headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|kv| {
                let (k, v) = kv.trim().split_once('=')?;
                (k == REFRESH_COOKIE).then(|| v.to_string())
            })
        });
    if let Some(token) = from_body.or(from_cookie) {
        ctx.auth_service.logout(&token).await?;
    }
    Ok(Json(serde_json::json!({"status": "ok"})))
}

pub async fn logout_all(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, DomainError> {
    ctx.auth_service.logout_all(user.user_id).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

pub async fn cleanup_tokens(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, DomainError> {
    let requester = ctx
        .repository
        .find_user_by_id(user.user_id)
        .await?
        .ok_or(DomainError::Unauthenticated)?;
    if !requester.is_admin {
        return Err(DomainError::Forbidden("admin only".to_string()));
    }
    let deleted = ctx.auth_service.cleanup_expired().await?;
    Ok(Json(serde_json::json!({"deleted": deleted})))
}
