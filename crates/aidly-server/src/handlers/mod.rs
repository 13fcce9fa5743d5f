mod auth;
mod chat;
mod conversations;
mod datasources;
mod health;
mod widget;

use crate::context::AppContext;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Assembles the full HTTP surface. Health routes are mounted on their own
/// unlayered sub-router so liveness/readiness checks never depend on CORS or
/// the request body limit.
pub fn router(ctx: AppContext) -> Router {
    let cors_origins = ctx.settings.server.cors_origins.clone();
    let cors = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods([Method::GET, Method::POST])
    } else {
        let origins = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
    };

    let health_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(ctx.clone());

    let api_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/auth/cleanup-tokens", post(auth::cleanup_tokens))
        .route("/chat/", post(chat::send_message))
        .route("/conversations/", get(conversations::list))
        .route("/conversations/{id}/messages", get(conversations::messages))
        .route("/messages/{id}/feedback", post(conversations::feedback))
        .route("/datasources/upload", post(datasources::upload))
        .route("/datasources/regular/sync", post(datasources::sync_all))
        .route("/datasources/regular/unsync", post(datasources::unsync_all))
        .route("/datasources/regular/{id}/sync", post(datasources::sync_one))
        .route("/datasources/regular/{id}/unsync", post(datasources::unsync_one))
        .route(
            "/datasources/external/{source_id}/{provider}/tickets/{ticket_id}/sync",
            post(datasources::sync_external_task),
        )
        .route(
            "/datasources/external/{source_id}/{provider}/tickets/{ticket_id}/unsync",
            post(datasources::unsync_external_task),
        )
        .route("/widget/generate", post(widget::generate))
        .route("/widget/session/start", post(widget::start_session))
        .route("/widget/chat", post(widget::chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::extract::DefaultBodyLimit::max(25 * 1024 * 1024))
        .with_state(ctx);

    Router::new().merge(health_routes).merge(api_routes)
}
