use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use screener_api::api::YahooClient;
use screener_api::database::Database;
use screener_api::live_quotes::LiveQuoteService;
use screener_api::models::Config;
use screener_api::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("screener_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("starting screener API with database {}", config.database_path);

    let db = Database::connect(&config.database_path).await?;
    let provider = YahooClient::new(&config.provider_base_url, config.rate_limit_per_minute)?;
    let quotes = LiveQuoteService::new(db.clone(), Arc::new(provider));

    let state = Arc::new(AppState {
        db,
        quotes,
        universe_dir: config.universe_dir.clone().into(),
    });

    server::serve(&config.bind_addr, server::router(state)).await
}
