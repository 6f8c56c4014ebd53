mod error;
mod routes;
mod state;

use std::sync::Arc;

use clipharvest::{
    load_config_or_default, ArtifactStorage, Database, DownloadOrchestrator, JobQueue,
    KeywordPool, QueueOptions, TikTokSearchClient,
};
use log::{error, info, warn};
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;
use crate::routes::build_router;
use crate::state::{AllowAll, AppState};

const DEFAULT_LOG_FILTER: &str = "info,clipharvest=debug";

fn init_tracing() -> Result<(), StartupError> {
    tracing_log::LogTracer::init().map_err(|e| StartupError::Logging(e.to_string()))?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| StartupError::Logging(e.to_string()))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received");
}

async fn run() -> Result<(), StartupError> {
    let config = load_config_or_default()?;
    info!("Output directory: {}", config.output_directory);

    let db = Database::open_for_config(&config)?;

    let downloader = Arc::new(DownloadOrchestrator::from_config(&config)?);
    let queue = Arc::new(JobQueue::start_with(
        &config.queue,
        downloader.clone(),
        QueueOptions {
            storage: Some(ArtifactStorage::new(&config.output_directory)),
            database: Some(db.clone()),
        },
    )?);
    let search = Arc::new(TikTokSearchClient::new(&config.search, &config.network)?);
    let keywords = Arc::new(KeywordPool::new(Arc::new(db), config.keywords.clone()));

    let addr = config.server.bind_address.clone();
    let state = AppState {
        config: Arc::new(config),
        queue: Arc::clone(&queue),
        downloader,
        search,
        keywords,
        usage: Arc::new(AllowAll),
    };
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    queue.shutdown();
    queue.wait().await;
    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}
