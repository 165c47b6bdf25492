use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use archivist_pipeline::{IngestContext, PipelineSettings};
use archivist_worker::{CommitWorker, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "archivist_worker=debug,archivist_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();
    let settings = PipelineSettings::from_env();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = archivist_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    archivist_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    for dir in [&settings.storage_dir, &settings.package_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .unwrap_or_else(|e| panic!("Failed to create {}: {e}", dir.display()));
    }

    let worker = CommitWorker::new(IngestContext::postgres(pool, settings), &config);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl-C handler");
    tracing::info!("Shutting down worker");
    cancel.cancel();

    if let Err(e) = handle.await {
        tracing::error!(error = %e, "Worker task panicked");
    }
}
