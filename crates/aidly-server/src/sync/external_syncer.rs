use crate::db::{DataSource, Repository, SourceType};
use crate::error::DomainError;
use crate::ingest::{IngestOutcome, Ingestor};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// A single external task as fetched from a provider (e.g. a ClickUp-shaped
/// project-management API). The canonical text format below is
/// provider-independent; only fetching is swappable.
#[derive(Debug, Clone)]
pub struct ExternalTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub solution: Option<String>,
    pub status: String,
    pub assignees: Vec<String>,
}

#[async_trait]
pub trait ExternalTaskProvider: Send + Sync {
    async fn fetch_task(&self, provider: &str, task_id: &str) -> anyhow::Result<ExternalTask>;
}

/// Canonicalizes an external task into the fixed textual form and hands it
/// to the Ingestor. File naming and text format are exact, regardless of
/// provider.
pub struct ExternalSyncer {
    repository: Arc<Repository>,
    ingestor: Arc<Ingestor>,
    data_directory: String,
    provider: Arc<dyn ExternalTaskProvider>,
}

impl ExternalSyncer {
    pub fn new(
        repository: Arc<Repository>,
        ingestor: Arc<Ingestor>,
        data_directory: String,
        provider: Arc<dyn ExternalTaskProvider>,
    ) -> Self {
        Self {
            repository,
            ingestor,
            data_directory,
            provider,
        }
    }

    pub fn canonical_text(task: &ExternalTask) -> String {
        format!(
            "Task ID: {}\nIssue: {}\nProblem: {}\nSolution:\n{}",
            task.id,
            task.title,
            task.description,
            task.solution.as_deref().unwrap_or("No solution provided."),
        )
    }

    fn file_path(&self, workspace_id: Uuid, task_id: &str) -> String {
        format!(
            "{}/workspaces/{}/clickup_{}.txt",
            self.data_directory, workspace_id, task_id
        )
    }

    pub async fn sync_task(
        &self,
        workspace_id: Uuid,
        owner_id: Uuid,
        provider_name: &str,
        task_id: &str,
    ) -> Result<IngestOutcome, DomainError> {
        let task = self
            .provider
            .fetch_task(provider_name, task_id)
            .await
            .map_err(|e| DomainError::UpstreamUnavailable(e.to_string()))?;

        let text = Self::canonical_text(&task);
        let path = self.file_path(workspace_id, &task.id);

        if let Some(parent) = std::path::Path::new(&path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Internal(e.into()))?;
        }
        tokio::fs::write(&path, &text)
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;

        let reference = format!("clickup_{}.txt", task.id);
        let existing = self
            .repository
            .find_data_source_by_reference(workspace_id, &reference)
            .await?;

        let source = match existing {
            Some(mut ds) => {
                ds.path = Some(path.clone());
                ds.category = Some(task.status.clone());
                ds.tags = Some(task.assignees.join(","));
                ds
            }
            None => DataSource {
                id: Uuid::new_v4(),
                source_type: SourceType::ExternalTask,
                reference,
                path: Some(path),
                workspace_id,
                owner_id,
                category: Some(task.status.clone()),
                tags: Some(task.assignees.join(",")),
                size_mb: Some(text.len() as f64 / 1_048_576.0),
                added_at: Utc::now(),
                last_synced_at: None,
                is_synced: false,
            },
        };

        self.repository.insert_data_source(&source).await?;
        self.ingestor.ingest(&source).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_text_matches_fixed_format() {
        let task = ExternalTask {
            id: "42".to_string(),
            title: "cannot export PDF".to_string(),
            description: "export button does nothing".to_string(),
            solution: Some("enable print driver".to_string()),
            status: "closed".to_string(),
            assignees: vec!["alice".to_string()],
        };
        let text = ExternalSyncer::canonical_text(&task);
        assert_eq!(
            text,
            "Task ID: 42\nIssue: cannot export PDF\nProblem: export button does nothing\nSolution:\nenable print driver"
        );
    }

    #[test]
    fn missing_solution_uses_default_text() {
        let task = ExternalTask {
            id: "7".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            solution: None,
            status: "open".to_string(),
            assignees: vec![],
        };
        let text = ExternalSyncer::canonical_text(&task);
        assert!(text.ends_with("Solution:\nNo solution provided."));
    }
}
