use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulseboard::api;
use pulseboard::auth::AuthService;
use pulseboard::config::Config;
use pulseboard::storage::{SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    info!("Using SQLite storage: {}", config.database.url);
    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
    );

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    let auth_service = Arc::new(AuthService::new(config.auth.clone()));
    info!(
        "Session tokens expire after {} days",
        config.auth.token_ttl_days
    );

    let router = api::create_api_router(
        Arc::clone(&storage),
        auth_service,
        &config.api_server,
        config.dashboard.clone(),
    )?;

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);
    match config.api_server.cors_allowed_origin.as_deref() {
        Some(origin) => info!("CORS restricted to {}", origin),
        None => info!("CORS allows any origin"),
    }

    axum::serve(listener, router).await?;

    Ok(())
}
