use super::external_syncer::{ExternalTask, ExternalTaskProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Generic REST-backed provider: `GET {base_url}/{provider}/tasks/{task_id}`
/// returning a JSON object with the fields below. A specific provider (e.g.
/// a ClickUp-shaped API) is swapped in purely via `base_url` and response
/// shape; the canonical text format this feeds is provider-independent.
pub struct HttpExternalTaskProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExternalTaskProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct TaskResponse {
    id: String,
    name: String,
    description: String,
    status: StatusField,
    assignees: Vec<AssigneeField>,
    #[serde(default)]
    custom_fields: Vec<CustomField>,
}

#[derive(Deserialize)]
struct StatusField {
    status: String,
}

#[derive(Deserialize)]
struct AssigneeField {
    username: String,
}

#[derive(Deserialize)]
struct CustomField {
    name: String,
    value: Option<String>,
}

#[async_trait]
impl ExternalTaskProvider for HttpExternalTaskProvider {
    async fn fetch_task(&self, provider: &str, task_id: &str) -> anyhow::Result<ExternalTask> {
        let url = format!("{}/{}/tasks/{}", self.base_url, provider, task_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("fetching task {task_id} returned {}", response.status());
        }
        let task: TaskResponse = response.json().await?;

        let solution = task
            .custom_fields
            .into_iter()
            .collect::<HashMap<_, _>>()
            .get("Solution")
            .cloned()
            .flatten();

        Ok(ExternalTask {
            id: task.id,
            title: task.name,
            description: task.description,
            solution,
            status: task.status.status,
            assignees: task.assignees.into_iter().map(|a| a.username).collect(),
        })
    }
}

impl FromIterator<CustomField> for HashMap<String, Option<String>> {
    fn from_iter<T: IntoIterator<Item = CustomField>>(iter: T) -> Self {
        iter.into_iter().map(|f| (f.name, f.value)).collect()
    }
}
