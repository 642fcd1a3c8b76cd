/*
 * GridHook agent
 * Main entry point for the application
 */

use gridhook_agent::{api, config::Config, service::GridService};
use std::env;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("Starting GridHook agent");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    let service = GridService::new(&config).await.map_err(|e| {
        error!("Failed to initialize service: {}", e);
        e
    })?;

    let api_state = api::ApiState {
        config: config.clone(),
        service: Arc::new(Mutex::new(service)),
    };

    info!("Starting API server on {}:{}", config.server.host, config.server.port);

    let rocket = api::create_rocket(api_state);
    rocket
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("API server failed: {e}"))?;

    Ok(())
}

fn init_tracing() {
    let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gridhook_agent={level}").into());

    let registry = tracing_subscriber::registry().with(filter);
    if env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
