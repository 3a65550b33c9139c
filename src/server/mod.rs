use anyhow::Result;
use axum::{http::HeaderValue, routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::database::Database;
use crate::live_quotes::LiveQuoteService;

pub mod error;
pub mod routes;

/// Shared state for request handlers: the store handle and the live-quote
/// service, passed explicitly rather than held in module globals.
pub struct AppState {
    pub db: Database,
    pub quotes: LiveQuoteService,
    pub universe_dir: PathBuf,
}

/// Front-end dev servers allowed by CORS.
const ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3001",
];

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = ALLOWED_ORIGINS
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/universes", get(routes::universes))
        .route("/api/universe", get(routes::universe))
        .route("/api/sectors", get(routes::sectors))
        .route("/api/screener", get(routes::screener))
        .route("/api/screener.csv", get(routes::screener_csv))
        .route("/api/price", get(routes::price))
        .route("/api/fundamentals", get(routes::fundamentals))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn serve(bind_addr: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("screener API listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install ctrl-c handler: {}", e);
    }
}
