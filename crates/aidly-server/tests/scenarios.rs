mod fakes;

use aidly_server::auth::AuthService;
use aidly_server::config::AuthConfig;
use aidly_server::db::{DataSource, Repository, SourceType, User, Workspace, WorkspaceRole};
use aidly_server::embedding::Embedder;
use aidly_server::ingest::Ingestor;
use aidly_server::pipeline::RagPipeline;
use aidly_server::sync::{ExternalSyncer, ExternalTask, ExternalTaskProvider, SyncScheduler};
use aidly_server::translate::PassthroughTranslator;
use aidly_server::vector::VectorStore;
use async_trait::async_trait;
use chrono::Utc;
use fakes::{FakeChat, FakeEmbedder, FakeVectorStore};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

fn auth_config() -> AuthConfig {
    AuthConfig {
        secret_key: "test-secret".to_string(),
        access_token_expire_minutes: 30,
        refresh_token_expire_days: 30,
        widget_token_expire_days: 7,
        max_active_widget_sessions_per_bot: 10,
    }
}

async fn seed_user_and_workspace(repository: &Repository, password_hash: &str) -> (Uuid, Uuid) {
    let workspace_id = Uuid::new_v4();
    repository
        .insert_workspace(&Workspace {
            id: workspace_id,
            name: "W".to_string(),
            description: None,
            is_active: true,
            active_repository_id: None,
        })
        .await
        .unwrap();

    let user_id = Uuid::new_v4();
    repository
        .insert_user(&User {
            id: user_id,
            username: "alice".to_string(),
            email: None,
            password_hash: password_hash.to_string(),
            is_admin: false,
            current_workspace_id: Some(workspace_id),
        })
        .await
        .unwrap();
    repository
        .insert_workspace_user(workspace_id, user_id, WorkspaceRole::Member)
        .await
        .unwrap();

    (user_id, workspace_id)
}

fn pipeline_for(
    repository: Arc<Repository>,
    embedder: Arc<FakeEmbedder>,
    vector_store: Arc<FakeVectorStore>,
) -> RagPipeline {
    RagPipeline::new(
        repository,
        embedder,
        vector_store,
        Arc::new(FakeChat),
        Arc::new(PassthroughTranslator),
        4,
        0.6,
        0.2,
        "fake-model".to_string(),
    )
}

// S1. Login + chat: seeded chunk is retrieved and a non-empty answer is produced.
#[sqlx::test(migrations = "./migrations")]
async fn s1_login_and_chat_retrieves_seeded_chunk(pool: PgPool) {
    let repository = Arc::new(Repository::new(pool));
    let auth = AuthService::new(repository.clone(), auth_config());
    let password_hash = auth.hash_password("hunter2").unwrap();
    let (user_id, workspace_id) = seed_user_and_workspace(&repository, &password_hash).await;

    let authenticated = auth.authenticate("alice", "hunter2").await.unwrap();
    assert_eq!(authenticated.id, user_id);
    let tokens = auth.issue_tokens(user_id).await.unwrap();
    assert_eq!(auth.verify_access_token(&tokens.access_token).unwrap(), user_id);

    let embedder = Arc::new(FakeEmbedder::new());
    let vector_store = Arc::new(FakeVectorStore::new());
    let embedding = embedder
        .embed("Issue: cannot export PDF. Solution: enable print driver.")
        .await
        .unwrap();
    vector_store
        .upsert(vec![(
            embedding,
            aidly_server::vector::ChunkPayload {
                chunk_id: Uuid::new_v4().to_string(),
                source_reference: "pdf-export.txt".to_string(),
                workspace_id: workspace_id.to_string(),
                text: "Issue: cannot export PDF. Solution: enable print driver.".to_string(),
            },
        )])
        .await
        .unwrap();

    let pipeline = pipeline_for(repository.clone(), embedder, vector_store);
    let outcome = pipeline
        .run("How do I fix pdf export?", workspace_id, user_id)
        .await;

    assert!(!outcome.answer.is_empty());
    assert!(outcome.metrics.num_retrieved >= 1);
    assert!(outcome
        .metrics
        .retrieved_docs_info
        .iter()
        .any(|d| d.source_reference == "pdf-export.txt"));
}

// S2. Workspace isolation: a chunk ingested only into W1 never leaks into a
// retrieval scoped to W2.
#[sqlx::test(migrations = "./migrations")]
async fn s2_workspace_isolation_hides_other_workspaces_chunks(pool: PgPool) {
    let repository = Arc::new(Repository::new(pool));
    let (user1, workspace1) = seed_user_and_workspace(&repository, "hash").await;
    let user2 = Uuid::new_v4();
    let workspace2 = Uuid::new_v4();
    repository
        .insert_workspace(&Workspace {
            id: workspace2,
            name: "W2".to_string(),
            description: None,
            is_active: true,
            active_repository_id: None,
        })
        .await
        .unwrap();
    repository
        .insert_user(&User {
            id: user2,
            username: "bob".to_string(),
            email: None,
            password_hash: "hash".to_string(),
            is_admin: false,
            current_workspace_id: Some(workspace2),
        })
        .await
        .unwrap();
    let _ = user1;

    let embedder = Arc::new(FakeEmbedder::new());
    let vector_store = Arc::new(FakeVectorStore::new());
    let shared_text = "Our export wizard requires Acrobat version 9 or later.";
    let embedding = embedder.embed(shared_text).await.unwrap();
    vector_store
        .upsert(vec![(
            embedding,
            aidly_server::vector::ChunkPayload {
                chunk_id: Uuid::new_v4().to_string(),
                source_reference: "w1-only.txt".to_string(),
                workspace_id: workspace1.to_string(),
                text: shared_text.to_string(),
            },
        )])
        .await
        .unwrap();

    let pipeline = pipeline_for(repository.clone(), embedder, vector_store);
    let outcome = pipeline.run(shared_text, workspace2, user2).await;

    assert!(outcome
        .metrics
        .retrieved_docs_info
        .iter()
        .all(|d| d.source_reference != "w1-only.txt"));
    assert_eq!(outcome.metrics.num_retrieved, 0);
}

// S3. Refresh rotation cap: after a third login, only the two newest refresh
// tokens are active and the oldest is rejected.
#[sqlx::test(migrations = "./migrations")]
async fn s3_refresh_rotation_keeps_only_two_active(pool: PgPool) {
    let repository = Arc::new(Repository::new(pool));
    let auth = AuthService::new(repository.clone(), auth_config());
    let (user_id, _workspace_id) = seed_user_and_workspace(&repository, "hash").await;

    let t1 = auth.issue_tokens(user_id).await.unwrap();
    let t2 = auth.issue_tokens(user_id).await.unwrap();
    let t3 = auth.issue_tokens(user_id).await.unwrap();

    assert!(auth.refresh(&t1.refresh_token).await.is_err());
    assert!(auth.refresh(&t3.refresh_token).await.is_ok());
    let _ = t2;
}

// S4. Sync / unsync round-trip: two H2 sections yield two chunks, and unsync
// removes them all.
#[sqlx::test(migrations = "./migrations")]
async fn s4_sync_then_unsync_round_trips_chunk_count(pool: PgPool) {
    let repository = Arc::new(Repository::new(pool));
    let (user_id, workspace_id) = seed_user_and_workspace(&repository, "hash").await;

    let dir = std::env::temp_dir().join(format!("aidly-test-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let file_path = dir.join("notes.md");
    tokio::fs::write(
        &file_path,
        "## First issue\nDetails about the first issue.\n## Second issue\nDetails about the second issue.\n",
    )
    .await
    .unwrap();

    let source = DataSource {
        id: Uuid::new_v4(),
        source_type: SourceType::File,
        reference: "notes.md".to_string(),
        path: Some(file_path.to_string_lossy().to_string()),
        workspace_id,
        owner_id: user_id,
        category: None,
        tags: None,
        size_mb: Some(0.001),
        added_at: Utc::now(),
        last_synced_at: None,
        is_synced: false,
    };
    repository.insert_data_source(&source).await.unwrap();

    let embedder = Arc::new(FakeEmbedder::new());
    let vector_store = Arc::new(FakeVectorStore::new());
    let ingestor = Arc::new(Ingestor::new(repository.clone(), embedder, vector_store.clone(), 16));
    let scheduler = Arc::new(SyncScheduler::new(repository.clone(), ingestor, vector_store.clone()));

    let added = scheduler.sync_one(source.id).await.unwrap();
    assert_eq!(added, 2);
    assert_eq!(vector_store.chunk_count_for("notes.md"), 2);

    scheduler.unsync_one(source.id).await.unwrap();
    assert_eq!(vector_store.chunk_count_for("notes.md"), 0);
    let refreshed = repository.find_data_source(source.id).await.unwrap().unwrap();
    assert!(!refreshed.is_synced);
}

// S4b. Regular-file double sync: syncing the same DataSource twice in a row
// leaves the same chunk count as a single sync (no stale duplicates).
#[sqlx::test(migrations = "./migrations")]
async fn s4b_double_sync_of_regular_file_is_idempotent(pool: PgPool) {
    let repository = Arc::new(Repository::new(pool));
    let (user_id, workspace_id) = seed_user_and_workspace(&repository, "hash").await;

    let dir = std::env::temp_dir().join(format!("aidly-test-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let file_path = dir.join("notes.md");
    tokio::fs::write(
        &file_path,
        "## First issue\nDetails about the first issue.\n## Second issue\nDetails about the second issue.\n",
    )
    .await
    .unwrap();

    let source = DataSource {
        id: Uuid::new_v4(),
        source_type: SourceType::File,
        reference: "notes.md".to_string(),
        path: Some(file_path.to_string_lossy().to_string()),
        workspace_id,
        owner_id: user_id,
        category: None,
        tags: None,
        size_mb: Some(0.001),
        added_at: Utc::now(),
        last_synced_at: None,
        is_synced: false,
    };
    repository.insert_data_source(&source).await.unwrap();

    let embedder = Arc::new(FakeEmbedder::new());
    let vector_store = Arc::new(FakeVectorStore::new());
    let ingestor = Arc::new(Ingestor::new(repository.clone(), embedder, vector_store.clone(), 16));
    let scheduler = Arc::new(SyncScheduler::new(repository.clone(), ingestor, vector_store.clone()));

    let first_added = scheduler.sync_one(source.id).await.unwrap();
    assert_eq!(first_added, 2);
    assert_eq!(vector_store.chunk_count_for("notes.md"), 2);

    let second_added = scheduler.sync_one(source.id).await.unwrap();
    assert_eq!(second_added, 2);
    assert_eq!(vector_store.chunk_count_for("notes.md"), 2);
}

struct StubProvider;

#[async_trait]
impl ExternalTaskProvider for StubProvider {
    async fn fetch_task(&self, _provider: &str, task_id: &str) -> anyhow::Result<ExternalTask> {
        Ok(ExternalTask {
            id: task_id.to_string(),
            title: "cannot export PDF".to_string(),
            description: "export button does nothing".to_string(),
            solution: Some("enable print driver".to_string()),
            status: "open".to_string(),
            assignees: vec!["alice".to_string()],
        })
    }
}

// S5. External task sync idempotence: re-syncing the same ticket leaves
// exactly one chunk but advances last_synced_at.
#[sqlx::test(migrations = "./migrations")]
async fn s5_external_task_resync_is_idempotent(pool: PgPool) {
    let repository = Arc::new(Repository::new(pool));
    let (user_id, workspace_id) = seed_user_and_workspace(&repository, "hash").await;

    let data_directory = std::env::temp_dir().join(format!("aidly-ext-{}", Uuid::new_v4()));
    let embedder = Arc::new(FakeEmbedder::new());
    let vector_store = Arc::new(FakeVectorStore::new());
    let ingestor = Arc::new(Ingestor::new(repository.clone(), embedder, vector_store.clone(), 16));
    let syncer = ExternalSyncer::new(
        repository.clone(),
        ingestor,
        data_directory.to_string_lossy().to_string(),
        Arc::new(StubProvider),
    );

    let first = syncer.sync_task(workspace_id, user_id, "clickup", "42").await.unwrap();
    assert_eq!(vector_store.chunk_count_for("clickup_42.txt"), 1);

    let second = syncer.sync_task(workspace_id, user_id, "clickup", "42").await.unwrap();
    assert_eq!(vector_store.chunk_count_for("clickup_42.txt"), 1);
    assert!(second.last_synced_at >= first.last_synced_at);
}

// S6. Greeting short-circuit: no retrieval happens and the canned reply is returned.
#[sqlx::test(migrations = "./migrations")]
async fn s6_greeting_short_circuits_retrieval(pool: PgPool) {
    let repository = Arc::new(Repository::new(pool));
    let (user_id, workspace_id) = seed_user_and_workspace(&repository, "hash").await;

    let embedder = Arc::new(FakeEmbedder::new());
    let vector_store = Arc::new(FakeVectorStore::new());
    let pipeline = pipeline_for(repository, embedder, vector_store);

    let outcome = pipeline.run("hi", workspace_id, user_id).await;
    assert_eq!(outcome.metrics.num_retrieved, 0);
    assert_eq!(outcome.metrics.retrieval_latency_ms, 0);
    assert_eq!(outcome.answer, "Hello! How can I help you with your question today?");
}
