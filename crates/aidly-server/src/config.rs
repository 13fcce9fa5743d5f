use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub vector_store: VectorStoreConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub rag: RagConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub external_tasks: ExternalTasksConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorStoreConfig {
    pub qdrant_url: String,
    pub qdrant_collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    pub similarity_search_k: usize,
    pub score_threshold: f32,
    pub temperature: f32,
    pub max_question_length: usize,
    pub enable_translation: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub widget_token_expire_days: i64,
    pub max_active_widget_sessions_per_bot: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_directory: String,
    pub logs_directory: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalTasksConfig {
    pub base_url: String,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}
