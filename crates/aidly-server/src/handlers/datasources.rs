use crate::auth::middleware::AuthenticatedUser;
use crate::context::AppContext;
use crate::db::{DataSource, SourceType};
use crate::error::DomainError;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Serialize)]
pub struct UploadedSource {
    pub id: Uuid,
    pub reference: String,
}

/// `multipart/form-data`: one or more `files` parts plus optional `category`,
/// `tags`, and `workspace_id` fields. Falls back to the caller's current
/// workspace when `workspace_id` is absent.
pub async fn upload(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadedSource>>, DomainError> {
    let requester = ctx
        .repository
        .find_user_by_id(user.user_id)
        .await?
        .ok_or(DomainError::Unauthenticated)?;

    let mut category: Option<String> = None;
    let mut tags: Option<String> = None;
    let mut workspace_id = requester.current_workspace_id;
    let mut uploaded = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::InvalidInput(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "category" => {
                category = Some(field.text().await.map_err(|e| DomainError::InvalidInput(e.to_string()))?);
            }
            "tags" => {
                tags = Some(field.text().await.map_err(|e| DomainError::InvalidInput(e.to_string()))?);
            }
            "workspace_id" => {
                let text = field.text().await.map_err(|e| DomainError::InvalidInput(e.to_string()))?;
                workspace_id = text.parse().ok();
            }
            "files" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| DomainError::InvalidInput("missing file name".to_string()))?;
                let bytes = field.bytes().await.map_err(|e| DomainError::InvalidInput(e.to_string()))?;
                let workspace_id = workspace_id
                    .ok_or_else(|| DomainError::InvalidInput("no workspace_id and no current workspace".to_string()))?;

                let dir: PathBuf = [&ctx.settings.storage.data_directory, "workspaces", &workspace_id.to_string()]
                    .iter()
                    .collect();
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| DomainError::Internal(e.into()))?;
                let path = dir.join(&file_name);
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| DomainError::Internal(e.into()))?;

                let source = DataSource {
                    id: Uuid::new_v4(),
                    source_type: SourceType::File,
                    reference: file_name.clone(),
                    path: Some(path.to_string_lossy().to_string()),
                    workspace_id,
                    owner_id: user.user_id,
                    category: category.clone(),
                    tags: tags.clone(),
                    size_mb: Some(bytes.len() as f64 / 1_048_576.0),
                    added_at: Utc::now(),
                    last_synced_at: None,
                    is_synced: false,
                };
                ctx.repository.insert_data_source(&source).await?;
                uploaded.push(UploadedSource {
                    id: source.id,
                    reference: source.reference,
                });
            }
            _ => {}
        }
    }

    if uploaded.is_empty() {
        return Err(DomainError::InvalidInput("no files provided".to_string()));
    }
    Ok(Json(uploaded))
}

async fn current_workspace(ctx: &AppContext, user_id: Uuid) -> Result<Uuid, DomainError> {
    ctx.repository
        .find_user_by_id(user_id)
        .await?
        .ok_or(DomainError::Unauthenticated)?
        .current_workspace_id
        .ok_or_else(|| DomainError::InvalidInput("no current workspace set".to_string()))
}

async fn require_own_data_source(ctx: &AppContext, user_id: Uuid, id: Uuid) -> Result<DataSource, DomainError> {
    let workspace_id = current_workspace(ctx, user_id).await?;
    let source = ctx
        .repository
        .find_data_source(id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("data source {id}")))?;
    if source.workspace_id != workspace_id {
        return Err(DomainError::Forbidden("data source not in your workspace".to_string()));
    }
    Ok(source)
}

pub async fn sync_one(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, DomainError> {
    require_own_data_source(&ctx, user.user_id, id).await?;
    let added = ctx.sync_scheduler.sync_one(id).await?;
    Ok(Json(serde_json::json!({"added_docs": added, "is_synced": true})))
}

pub async fn unsync_one(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, DomainError> {
    require_own_data_source(&ctx, user.user_id, id).await?;
    ctx.sync_scheduler.unsync_one(id).await?;
    Ok(Json(serde_json::json!({"is_synced": false})))
}

pub async fn sync_all(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
) -> Result<Json<crate::sync::BatchSyncReport>, DomainError> {
    let workspace_id = current_workspace(&ctx, user.user_id).await?;
    let report = ctx.sync_scheduler.sync_all_regular(workspace_id).await?;
    Ok(Json(report))
}

pub async fn unsync_all(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
) -> Result<Json<crate::sync::BatchSyncReport>, DomainError> {
    let workspace_id = current_workspace(&ctx, user.user_id).await?;
    let report = ctx.sync_scheduler.unsync_all(workspace_id).await?;
    Ok(Json(report))
}

pub async fn sync_external_task(
    State(ctx): State<AppContext>,
    user: AuthenticatedUser,
    Path((source_id, provider, ticket_id)): Path<(Uuid, String, String)>,
) -> Result<Json<serde_json::Value>, DomainError> {
    let workspace_id = current_workspace(&ctx, user.user_id).await?;

    let expected_reference = format!("clickup_{ticket_id}.txt");
    if let Some(existing) = ctx.repository.find_data_source(source_id).await? {
        if existing.reference != expected_reference || existing.workspace_id != workspace_id {
            return Err(DomainError::Forbidden("data source not in your workspace".to_string()));
        }
    }

    let outcome = ctx
        .external_syncer
        .sync_task(workspace_id, user.user_id, &provider, &ticket_id)
        .await?;
    Ok(Json(serde_json::json!({
        "added_docs": outcome.chunks_added,
        "last_synced_at": outcome.last_synced_at,
    })))
}

/// Unsyncing an external task is just unsyncing its datasource row, once we
/// confirm the path segments actually name it.
pub async fn unsync_external_task(
    State(ctx): State<AppContext>,
    _user: AuthenticatedUser,
    Path((source_id, _provider, ticket_id)): Path<(Uuid, String, String)>,
) -> Result<Json<serde_json::Value>, DomainError> {
    let source = ctx
        .repository
        .find_data_source(source_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("data source {source_id}")))?;

    let expected_reference = format!("clickup_{ticket_id}.txt");
    if source.reference != expected_reference {
        return Err(DomainError::NotFound(format!("data source {source_id}")));
    }
    ctx.sync_scheduler.unsync_one(source.id).await?;
    Ok(Json(serde_json::json!({"is_synced": false})))
}
