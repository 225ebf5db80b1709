use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use callbatch::application::ports::{
    AnalysisClient, BatchJobRepository, FileRecordRepository, FolderRepository,
    NotificationConfigRepository, ProviderFactory,
};
use callbatch::application::services::{BatchProcessor, NotificationDispatcher, ProviderRegistry};
use callbatch::infrastructure::analysis::{HttpAnalysisClient, MockAnalysisClient};
use callbatch::infrastructure::observability::init_tracing;
use callbatch::infrastructure::persistence::{
    InMemoryBatchJobRepository, InMemoryFileRecordRepository, InMemoryFolderRepository,
    InMemoryNotificationConfigRepository, PgBatchJobRepository, PgFileRecordRepository,
    PgFolderRepository, PgNotificationConfigRepository, create_pool, run_migrations,
};
use callbatch::infrastructure::providers::DefaultProviderFactory;
use callbatch::presentation::{AppState, Environment, Settings, create_router};

struct Repositories {
    folders: Arc<dyn FolderRepository>,
    batch_jobs: Arc<dyn BatchJobRepository>,
    file_records: Arc<dyn FileRecordRepository>,
    notification_configs: Arc<dyn NotificationConfigRepository>,
}

async fn repositories(settings: &Settings) -> anyhow::Result<Repositories> {
    match &settings.database {
        Some(database) => {
            let pool = create_pool(&database.url, database.max_connections).await?;
            run_migrations(&pool).await?;
            Ok(Repositories {
                folders: Arc::new(PgFolderRepository::new(pool.clone())),
                batch_jobs: Arc::new(PgBatchJobRepository::new(pool.clone())),
                file_records: Arc::new(PgFileRecordRepository::new(pool.clone())),
                notification_configs: Arc::new(PgNotificationConfigRepository::new(pool)),
            })
        }
        None => {
            tracing::warn!("No database configured, state is kept in memory");
            Ok(Repositories {
                folders: Arc::new(InMemoryFolderRepository::default()),
                batch_jobs: Arc::new(InMemoryBatchJobRepository::default()),
                file_records: Arc::new(InMemoryFileRecordRepository::default()),
                notification_configs: Arc::new(InMemoryNotificationConfigRepository::default()),
            })
        }
    }
}

fn analysis_client(settings: &Settings) -> Arc<dyn AnalysisClient> {
    match &settings.analysis.base_url {
        Some(base_url) => Arc::new(HttpAnalysisClient::new(
            base_url.clone(),
            settings.analysis.api_key.clone(),
            settings.analysis.timeout(),
        )),
        None => {
            tracing::warn!("No analysis service configured, using the mock client");
            Arc::new(MockAnalysisClient)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;
    init_tracing(&settings.tracing_config(environment))?;

    let repos = repositories(&settings).await?;
    let registry = Arc::new(ProviderRegistry::new());
    let factory: Arc<dyn ProviderFactory> =
        Arc::new(DefaultProviderFactory::new(Arc::clone(&registry)));

    let dispatcher = NotificationDispatcher::new(
        Arc::clone(&repos.notification_configs),
        Arc::clone(&factory),
        Arc::clone(&registry),
        settings.notifications.retry_policy(),
    );

    let processor = BatchProcessor::new(
        Arc::clone(&repos.folders),
        Arc::clone(&repos.batch_jobs),
        Arc::clone(&repos.file_records),
        factory,
        Arc::clone(&registry),
        analysis_client(&settings),
        dispatcher.clone(),
        settings.processor_settings(),
    );
    processor.init().await?;

    let state = AppState {
        processor: processor.clone(),
        dispatcher,
        registry,
        folders: repos.folders,
        batch_jobs: repos.batch_jobs,
        file_records: repos.file_records,
        notification_configs: repos.notification_configs,
    };
    let router = create_router(state);

    let host: std::net::IpAddr = settings
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server host: {}", settings.server.host))?;
    let addr = SocketAddr::new(host, settings.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    processor.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
