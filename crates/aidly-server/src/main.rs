use aidly_server::auth::AuthService;
use aidly_server::config::Settings;
use aidly_server::context::AppContext;
use aidly_server::db::{new_pool, Repository};
use aidly_server::embedding::HttpEmbedder;
use aidly_server::handlers::router;
use aidly_server::ingest::Ingestor;
use aidly_server::llm::HttpChat;
use aidly_server::logging::{InteractionLogger, LoggerConfig};
use aidly_server::pipeline::RagPipeline;
use aidly_server::sync::{ExternalSyncer, HttpExternalTaskProvider, SyncScheduler};
use aidly_server::translate::{HeuristicTranslator, PassthroughTranslator, Translator};
use aidly_server::vector::{QdrantVectorStore, VectorStore};
use aidly_server::widget::WidgetSessionManager;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::load()?;

    let db_pool = new_pool(&settings.database).await?;
    let repository = Arc::new(Repository::new(db_pool.clone()));

    let embedder = HttpEmbedder::new(&settings.embedding, Duration::from_secs(30)).await?;
    let embedder: Arc<dyn aidly_server::embedding::Embedder> = embedder;

    let vector_store: Arc<dyn VectorStore> =
        Arc::new(QdrantVectorStore::new(&settings.vector_store.qdrant_url, settings.vector_store.qdrant_collection.clone())?);
    vector_store.ensure_collection(embedder.dimension()).await?;

    let chat: Arc<dyn aidly_server::llm::Chat> = Arc::new(HttpChat::new(&settings.llm)?);

    let translator: Arc<dyn Translator> = if settings.rag.enable_translation {
        Arc::new(HeuristicTranslator::new(chat.clone()))
    } else {
        Arc::new(PassthroughTranslator)
    };

    let auth_service = Arc::new(AuthService::new(repository.clone(), settings.auth.clone()));

    let ingestor = Arc::new(Ingestor::new(
        repository.clone(),
        embedder.clone(),
        vector_store.clone(),
        16,
    ));

    let sync_scheduler = Arc::new(SyncScheduler::new(
        repository.clone(),
        ingestor.clone(),
        vector_store.clone(),
    ));

    let external_provider = Arc::new(HttpExternalTaskProvider::new(settings.external_tasks.base_url.clone()));
    let external_syncer = Arc::new(ExternalSyncer::new(
        repository.clone(),
        ingestor.clone(),
        settings.storage.data_directory.clone(),
        external_provider,
    ));

    let pipeline = Arc::new(RagPipeline::new(
        repository.clone(),
        embedder.clone(),
        vector_store.clone(),
        chat.clone(),
        translator.clone(),
        settings.rag.similarity_search_k,
        settings.rag.score_threshold,
        settings.rag.temperature,
        settings.llm.model.clone(),
    ));

    let widget_sessions = Arc::new(WidgetSessionManager::new(
        repository.clone(),
        pipeline.clone(),
        settings.auth.max_active_widget_sessions_per_bot,
    ));

    let interaction_logger = InteractionLogger::new(
        PathBuf::from(&settings.storage.logs_directory),
        LoggerConfig::default(),
    );

    let ctx = AppContext {
        settings: settings.clone(),
        db_pool,
        repository,
        embedder,
        vector_store,
        chat,
        pipeline,
        ingestor,
        sync_scheduler,
        external_syncer,
        auth_service,
        widget_sessions,
        interaction_logger,
    };

    let app = router(ctx);

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
