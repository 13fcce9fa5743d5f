use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use thiserror::Error;

/// Single domain error enum covering every failure kind the core can surface.
/// Lower layers may return `anyhow::Result` for call-site convenience; the
/// service boundary maps those into the appropriate variant here.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            DomainError::InvalidInput(m) => (StatusCode::BAD_REQUEST, "InvalidInput", m.clone()),
            DomainError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Unauthenticated",
                "authentication required".to_string(),
            ),
            DomainError::InvalidToken(m) => (StatusCode::UNAUTHORIZED, "InvalidToken", m.clone()),
            DomainError::Forbidden(m) => (StatusCode::FORBIDDEN, "Forbidden", m.clone()),
            DomainError::NotFound(m) => (StatusCode::NOT_FOUND, "NotFound", m.clone()),
            DomainError::Conflict(m) => (StatusCode::CONFLICT, "Conflict", m.clone()),
            DomainError::RateLimited(m) => (StatusCode::TOO_MANY_REQUESTS, "RateLimited", m.clone()),
            DomainError::UpstreamUnavailable(m) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UpstreamUnavailable",
                m.clone(),
            ),
            DomainError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal",
                    "an internal error occurred".to_string(),
                )
            }
        };

        if !matches!(self, DomainError::Internal(_)) {
            tracing::warn!(kind, %message, "request failed");
        }

        (
            status,
            Json(ErrorBody {
                error: kind.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
