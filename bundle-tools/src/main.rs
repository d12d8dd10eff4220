use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bundle_tools::{
    api::{create_router, router::AppState},
    load_index, Config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting bundle server");

    // Load configuration
    let config = Config::from_env().with_args(std::env::args().skip(1));
    config.validate()?;
    info!("Configuration loaded and validated");

    let index = load_index(&config).map_err(|e| {
        tracing::error!("Failed to load bundle: {}", e);
        e
    })?;
    info!(entries = index.len(), "Bundle index built");

    let app = create_router(AppState::new(index, config.stream_chunk_size));

    // Start server
    info!("Listening on {}", config.listen_addr);
    let listener = TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
