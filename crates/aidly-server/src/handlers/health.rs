use crate::context::AppContext;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness(State(ctx): State<AppContext>) -> (StatusCode, Json<serde_json::Value>) {
    let db_ok = sqlx::query("SELECT 1").execute(&ctx.db_pool).await.is_ok();
    let vector_ok = ctx.vector_store.health_check().await.is_ok();

    if db_ok && vector_ok {
        (StatusCode::OK, Json(json!({"status": "ready"})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not ready", "db": db_ok, "vector_store": vector_ok})),
        )
    }
}
