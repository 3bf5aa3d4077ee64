pub mod cache;
pub mod delivery_api;
pub mod stock_api;

use thiserror::Error;

/// Failure talking to one of the REST collaborators. Every variant aborts
/// the in-progress operation before any local mutation.
#[derive(Debug, Error)]
pub enum ExternalApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response body: {0}")]
    Body(String),
}

pub use cache::{CacheError, LedgerCache, LedgerSnapshot, SqliteCache};
pub use delivery_api::{DeliveryApi, ExternalDelivery, HttpDeliveryApi};
pub use stock_api::{HttpStockApi, ProductTotal, StockApi};
