use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{routing::get, Router};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::fmt::init as tracing_init;

use stockledger_backend::external::{HttpDeliveryApi, HttpStockApi, SqliteCache};
use stockledger_backend::middleware::actor::with_actor;
use stockledger_backend::routes;
use stockledger_backend::services::InventoryService;
use stockledger_backend::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_init();

    // Load environment variables
    dotenv().ok();

    // External collaborators
    let stock_base = std::env::var("STOCK_API_BASE")
        .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
    let delivery_base =
        std::env::var("DELIVERY_API_BASE").unwrap_or_else(|_| stock_base.clone());
    let cache_url = std::env::var("CACHE_DB")
        .unwrap_or_else(|_| "sqlite://stockledger-cache.db".to_string());

    let stock_api = HttpStockApi::new(&stock_base).expect("Failed to build stock API client");
    let delivery_api =
        HttpDeliveryApi::new(&delivery_base).expect("Failed to build delivery API client");
    let cache = SqliteCache::connect(&cache_url)
        .await
        .expect("Failed to open cache database");

    let service = Arc::new(InventoryService::new(
        Arc::new(stock_api),
        Arc::new(delivery_api),
        Arc::new(cache),
    ));
    service.load().await;

    let app_state = AppState::new(service);

    // Build application under /api base path
    let api = routes::create_router()
        .route("/", get(|| async { "Stock Ledger API" }))
        .route("/health", get(health_check));

    let app = Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn(with_actor))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server with HOST/PORT env and graceful port selection
    let host_str = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let host: IpAddr = host_str
        .parse()
        .unwrap_or_else(|_| "127.0.0.1".parse().unwrap());
    let base_port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);

    // Try base_port..base_port+20 to avoid crash when address is in use
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let port = base_port.saturating_add(offset);
            let addr = SocketAddr::from((host, port));
            match TcpListener::bind(addr).await {
                Ok(l) => {
                    bound = Some((l, addr));
                    break;
                }
                Err(e) => {
                    if offset == 0 {
                        tracing::warn!(%addr, error=%e, "Port in use, trying next");
                    }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on {}", addr);
                l
            }
            None => {
                tracing::error!(
                    "Failed to bind to any port starting at {} on {}",
                    base_port,
                    host
                );
                return;
            }
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error=%e, "Server error");
    }
}

async fn health_check() -> &'static str {
    "OK"
}
