//! HTTP surface: REST endpoints, spreadsheet export and the web client

pub mod assets;
pub mod batch;
pub mod error;
pub mod export;
pub mod handlers;

use crate::core::config::AppConfig;
use crate::core::resolver::FundResolver;
use crate::providers::eastmoney::EastmoneyProvider;
use crate::store::fund_list::FundListStore;
use crate::store::memory::MemoryCache;
use anyhow::{Context, Result};
use axum::Router;
use axum::http::{Method, header};
use axum::routing::{delete, get, post, put};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FundListStore>,
    pub resolver: Arc<FundResolver>,
}

impl AppState {
    /// Wires the production store, name cache and Eastmoney source.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store_path = config.store_path()?;
        info!("Using fund list at {}", store_path.display());

        let source = EastmoneyProvider::new(config.providers.eastmoney.clone())?;
        let names = Arc::new(MemoryCache::<String, String>::new());

        Ok(Self {
            store: Arc::new(FundListStore::new(store_path)),
            resolver: Arc::new(FundResolver::new(Arc::new(source), names)),
        })
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(assets::index))
        .route("/index.html", get(assets::index))
        .route("/style.css", get(assets::stylesheet))
        .route("/app.js", get(assets::script))
        .route("/api/health", get(handlers::health))
        .route(
            "/api/funds",
            get(handlers::list_funds).post(handlers::add_fund),
        )
        .route("/api/funds/batch", post(handlers::add_funds_batch))
        .route("/api/funds/order", put(handlers::reorder_funds))
        .route("/api/funds/:code", delete(handlers::remove_fund))
        .route("/api/funds/:code/shares", put(handlers::update_shares))
        .route("/api/dividend/:code", get(handlers::dividend))
        .route("/api/fundname/:code", get(handlers::fund_name))
        .route("/api/fundinfo/:code", get(handlers::fund_info))
        .route("/api/fund/info/:code", get(handlers::fund_profile))
        .route("/api/fund/dividend/:code", get(handlers::fund_dividend))
        .route("/api/fund/history/:code", get(handlers::fund_history))
        .route("/api/export", post(export::export_funds))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Runs the HTTP server until Ctrl-C.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let addr: SocketAddr = config
        .server_address()
        .parse()
        .with_context(|| format!("Invalid server address: {}", config.server_address()))?;

    let app = router(AppState::from_config(config)?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
