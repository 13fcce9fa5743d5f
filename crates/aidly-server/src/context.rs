use crate::auth::AuthService;
use crate::config::Settings;
use crate::db::{DbPool, Repository};
use crate::embedding::Embedder;
use crate::ingest::Ingestor;
use crate::llm::Chat;
use crate::logging::InteractionLogger;
use crate::pipeline::RagPipeline;
use crate::sync::{ExternalSyncer, SyncScheduler};
use crate::vector::VectorStore;
use crate::widget::WidgetSessionManager;
use std::sync::Arc;

/// The single composition root, built once at startup and handed to the
/// router as shared state. Replaces the source's global singletons: every
/// handler borrows its dependencies from here instead of reaching into
/// process-wide mutable statics.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub db_pool: DbPool,
    pub repository: Arc<Repository>,
    pub embedder: Arc<dyn Embedder>,
    pub vector_store: Arc<dyn VectorStore>,
    pub chat: Arc<dyn Chat>,
    pub pipeline: Arc<RagPipeline>,
    pub ingestor: Arc<Ingestor>,
    pub sync_scheduler: Arc<SyncScheduler>,
    pub external_syncer: Arc<ExternalSyncer>,
    pub auth_service: Arc<AuthService>,
    pub widget_sessions: Arc<WidgetSessionManager>,
    pub interaction_logger: Arc<InteractionLogger>,
}
