use crate::context::AppContext;
use crate::error::DomainError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

/// The authenticated user for a request, extracted from the `Authorization:
/// Bearer <access token>` header. Handlers that need auth take this as an
/// extractor argument; axum rejects the request before the handler runs if
/// it is missing or invalid.
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppContext> for AuthenticatedUser {
    type Rejection = DomainError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(DomainError::Unauthenticated)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(DomainError::Unauthenticated)?;

        let user_id = state.auth_service.verify_access_token(token)?;
        Ok(AuthenticatedUser { user_id })
    }
}
