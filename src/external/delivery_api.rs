//! Read-side client for the external delivery API. Its rows are merged
//! with local sales-delivery ledger entries into one view.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::ExternalApiError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A delivery row as the external system reports it. `delivery_status`
/// arrives lowercased; the product field carries the product id.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalDelivery {
    pub id: i64,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "inventory_product_name")]
    pub product_id: Option<i64>,
    #[serde(rename = "inventory_product_name_display")]
    pub product_name: Option<String>,
    #[serde(default)]
    pub order_amount: i64,
    pub delivery_status: Option<String>,
    #[serde(rename = "company_name_display")]
    pub company: Option<String>,
    pub tracking_number: Option<String>,
    pub courier: Option<String>,
}

#[async_trait]
pub trait DeliveryApi: Send + Sync {
    async fn list_deliveries(&self) -> Result<Vec<ExternalDelivery>, ExternalApiError>;
}

#[derive(Clone)]
pub struct HttpDeliveryApi {
    client: Client,
    base_url: String,
}

impl HttpDeliveryApi {
    pub fn new(base_url: &str) -> Result<Self, ExternalApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DeliveryApi for HttpDeliveryApi {
    async fn list_deliveries(&self) -> Result<Vec<ExternalDelivery>, ExternalApiError> {
        let resp = self
            .client
            .get(format!("{}/api/delivery/", self.base_url))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ExternalApiError::Status(resp.status()));
        }
        Ok(resp.json().await?)
    }
}
