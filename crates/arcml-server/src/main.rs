//! Arc ML Server
//!
//! Loads every model, then serves batch sentiment, keyword extraction and
//! workspace analysis over HTTP.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use arcml_analysis::{CommentStore, PgCommentStore};
use arcml_models::ModelCache;
use arcml_server::{
    create_router,
    telemetry::{init_metrics, init_tracing, record_model_gauges},
    AppConfig, AppState, ConfigOverrides,
};

#[derive(Parser, Debug)]
#[command(name = "arcml-server")]
#[command(about = "Arc ML comment analysis service", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to arcml.yaml when present)
    #[arg(short, long, env = "ARCML_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        host: cli.listen.clone(),
        port: cli.port,
    };
    let config = AppConfig::load(cli.config.as_deref(), &overrides)?;

    init_tracing(&config.logging, cli.verbose);
    info!("Starting Arc ML Service ({})", config.environment);
    info!("Sentiment model: {}", config.models.sentiment_model);
    info!("Embedding model: {}", config.models.embedding_repo());
    info!("Model cache: {}", config.models.cache_dir.display());

    let metrics_handle = init_metrics()?;

    // Models are required; storage is not
    info!("Loading ML models...");
    let models = match ModelCache::initialize(&config.models).await {
        Ok(models) => Arc::new(models),
        Err(e) => {
            error!("Failed to load models: {}", e);
            return Err(e.into());
        }
    };
    record_model_gauges(&models);
    info!("Models loaded: {:?}", models.loaded_models());

    let store = PgCommentStore::connect_lazy(&config.database)?;
    match store.ping().await {
        Ok(()) => info!("Database connection verified"),
        Err(e) => warn!("Database not reachable at startup: {}", e),
    }
    let pg_store = store.clone();
    let store: Arc<dyn CommentStore> = Arc::new(store);

    let state = AppState::new(
        models,
        store,
        config.processing,
        config.jobs,
        config.environment.clone(),
    )
    .with_metrics(metrics_handle);

    let app = create_router(state, &config.cors);

    let addr: SocketAddr = config.listen_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    pg_store.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
