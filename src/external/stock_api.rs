//! Client for the system of record. It tracks exactly one stock number per
//! product; the per-location breakdown is this service's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::ExternalApiError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ProductTotal {
    pub product_id: i64,
    pub name: String,
    pub total: i64,
}

#[async_trait]
pub trait StockApi: Send + Sync {
    /// All products with their authoritative totals.
    async fn fetch_totals(&self) -> Result<Vec<ProductTotal>, ExternalApiError>;

    /// Authoritative total for one product.
    async fn fetch_total(&self, product_id: i64) -> Result<i64, ExternalApiError>;

    /// Propagate a new aggregate total. Called for every operation that
    /// changes a product's aggregate quantity; never for transfers.
    async fn push_total(&self, product_id: i64, new_total: i64)
        -> Result<(), ExternalApiError>;

    /// Create a product in the system of record, returning its id.
    async fn create_product(
        &self,
        name: &str,
        initial_stock: i64,
    ) -> Result<i64, ExternalApiError>;

    /// Remove a product from the system of record.
    async fn delete_product(&self, product_id: i64) -> Result<(), ExternalApiError>;
}

#[derive(Debug, Deserialize)]
struct InventoryItemWire {
    id: i64,
    inventory_product_name: Option<String>,
    #[serde(default)]
    inventory_stock: i64,
}

#[derive(Clone)]
pub struct HttpStockApi {
    client: Client,
    base_url: String,
}

impl HttpStockApi {
    pub fn new(base_url: &str) -> Result<Self, ExternalApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl StockApi for HttpStockApi {
    async fn fetch_totals(&self) -> Result<Vec<ProductTotal>, ExternalApiError> {
        let resp = self
            .client
            .get(self.url("/api/inventory/"))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ExternalApiError::Status(resp.status()));
        }
        let items: Vec<InventoryItemWire> = resp.json().await?;
        Ok(items
            .into_iter()
            .map(|i| ProductTotal {
                product_id: i.id,
                name: i.inventory_product_name.unwrap_or_default(),
                total: i.inventory_stock,
            })
            .collect())
    }

    async fn fetch_total(&self, product_id: i64) -> Result<i64, ExternalApiError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/inventory/{product_id}/")))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ExternalApiError::Status(resp.status()));
        }
        let item: InventoryItemWire = resp.json().await?;
        Ok(item.inventory_stock)
    }

    async fn push_total(
        &self,
        product_id: i64,
        new_total: i64,
    ) -> Result<(), ExternalApiError> {
        let resp = self
            .client
            .patch(self.url(&format!("/api/inventory/{product_id}/")))
            .json(&json!({ "inventory_stock": new_total }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ExternalApiError::Status(resp.status()));
        }
        Ok(())
    }

    async fn create_product(
        &self,
        name: &str,
        initial_stock: i64,
    ) -> Result<i64, ExternalApiError> {
        let resp = self
            .client
            .post(self.url("/api/inventory/"))
            .json(&json!({
                "inventory_product_name": name,
                "inventory_stock": initial_stock,
            }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ExternalApiError::Status(resp.status()));
        }
        let item: InventoryItemWire = resp
            .json()
            .await
            .map_err(|e| ExternalApiError::Body(e.to_string()))?;
        Ok(item.id)
    }

    async fn delete_product(&self, product_id: i64) -> Result<(), ExternalApiError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/inventory/{product_id}/")))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ExternalApiError::Status(resp.status()));
        }
        Ok(())
    }
}
