//! obmen-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use obmen_gateway::app_state::AppState;
use obmen_gateway::build_app;
use obmen_gateway::config::{GatewayConfig, LogFormat};
use obmen_gateway::persistence::{MemoryStore, PostgresStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting obmen-gateway");

    // Build persistence layer
    let store: Arc<dyn Store> = if config.persistence_enabled {
        tracing::info!(
            max_connections = config.database_max_connections,
            "using PostgreSQL store"
        );
        Arc::new(PostgresStore::connect(&config).await?)
    } else {
        tracing::warn!("persistence disabled; state is kept in memory only");
        Arc::new(MemoryStore::new())
    };

    // Build application state and router
    let app_state = AppState::new(store, config.message_max_len);
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
