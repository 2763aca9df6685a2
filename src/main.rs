/// Main application entry point
mod cache;
mod clients;
mod config;
mod domain;
mod errors;
mod geo;
mod handlers;
mod normalize;
mod query;
mod routes;
mod services;
mod utils;

use crate::cache::FetchCache;
use crate::clients::EonetClient;
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::routes::build_router;
use crate::services::EventService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Initialize cache and upstream client
    let cache = FetchCache::new(Duration::from_secs(config.cache_ttl_seconds));
    let client = EonetClient::new(config.eonet_base_url.clone(), config.request_limit)?;

    // Initialize services
    let event_service = Arc::new(EventService::new(cache, client));

    // Initialize application state
    let state = AppState {
        event_service: event_service.clone(),
    };

    // Start background tasks
    start_background_tasks(&config, event_service);

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("hazard_feed service listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Start the polling task that keeps the default event list warm
fn start_background_tasks(config: &AppConfig, event_service: Arc<EventService>) {
    let interval = config.poll_every_seconds;
    tokio::spawn(async move {
        info!("Starting event feed poller (interval: {}s)", interval);
        loop {
            match event_service.refresh().await {
                Ok(count) => info!("Event feed refreshed ({} events)", count),
                Err(e) => error!("Event feed refresh error: {:?}", e),
            }
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    });
}
