mod audit;
mod config;
mod error;
mod event;
mod orchestrator;
mod platform;
mod providers;
mod relay;
mod server;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::audit::AuditStore;
use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::platform::telegram::TelegramPlatform;
use crate::providers::Capabilities;
use crate::relay::Relay;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tg_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  LLM: {} ({})", config.llm.provider, config.llm.model);
    info!("  Transcription model: {}", config.transcription.model);
    info!("  Voice replies: {}", config.speech.is_some());
    info!("  Media resolver: {}", config.media.is_some());
    info!("  OCR: {}", config.ocr.is_some());
    info!("  Database: {}", config.storage.database_path.display());
    if config.telegram.webhook_url.is_empty() {
        warn!("telegram.webhook_url is empty, GET / will not register a webhook");
    }

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_address))?;

    let store = AuditStore::open(&config.storage.database_path)?;
    let platform = Arc::new(TelegramPlatform::new(&config.telegram)?);
    let orchestrator = Orchestrator::new(
        Capabilities::from_config(&config),
        config.replies.fallback_link.clone(),
    );
    let relay = Relay::new(platform, orchestrator, Arc::new(store.clone()));

    let state = AppState {
        relay: Arc::new(relay),
        store,
        webhook_url: config.telegram.webhook_url.clone(),
    };

    info!("Relay is starting...");
    server::run(addr, state).await?;

    Ok(())
}
