use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dragnet_core::limits::QueryLimitService;
use dragnet_core::{
    create_history_system, load_config, validate_config, HistoryStore, SearchService,
    SqliteHistoryStore, StaticRegistry,
};

use dragnet_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("DRAGNET_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));

    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        indexers = config.indexers.len(),
        "Configuration loaded"
    );
    info!("Database path: {:?}", config.database.path);

    // Create SQLite history store
    let history_store: Arc<dyn HistoryStore> = Arc::new(
        SqliteHistoryStore::new(&config.database.path)
            .context("Failed to create history store")?,
    );
    info!("History store initialized");

    // Create history system and spawn its writer task
    let (event_handle, history_writer) =
        create_history_system(Arc::clone(&history_store), config.search.event_buffer);
    let writer_handle = tokio::spawn(history_writer.run());

    // Shared HTTP client for all indexers
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.search.timeout_secs as u64))
        .user_agent(format!("dragnet/{VERSION}"))
        .build()
        .context("Failed to build HTTP client")?;

    // Build indexers and the dispatch service
    let registry = Arc::new(StaticRegistry::from_config(&config.indexers, http_client));
    let limiter = Arc::new(QueryLimitService::new(&config.indexers));
    let search = Arc::new(SearchService::new(
        Arc::clone(&registry) as Arc<dyn dragnet_core::IndexerRegistry>,
        Arc::clone(&limiter) as Arc<dyn dragnet_core::QueryLimiter>,
        event_handle.clone(),
    ));

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        search,
        registry,
        limiter,
        history_store,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Drop the remaining event handle so the writer's channel closes.
    // The SearchService's clone went away with the AppState above.
    drop(event_handle);

    // Wait for the writer to finish processing remaining events
    let _ = writer_handle.await;
    info!("History writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
