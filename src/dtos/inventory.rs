use serde::{Deserialize, Serialize};

use crate::models::{DeliveryStatus, StockRecord};

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub initial_qty: i64,
    pub warehouse: Option<String>,
    pub bin: Option<String>,
    pub lot: Option<String>,
    #[serde(default)]
    pub incoming: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub product_id: i64,
    pub warehouse: Option<String>,
    pub bin: Option<String>,
    pub lot: Option<String>,
    pub new_qty: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveStockRequest {
    pub product_id: i64,
    pub qty: i64,
    pub reference: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeliverStockRequest {
    pub product_id: i64,
    pub qty: i64,
    pub warehouse: Option<String>,
    pub bin: Option<String>,
    pub lot: Option<String>,
    pub status: Option<DeliveryStatus>,
    pub company: Option<String>,
    pub reference: Option<String>,
    pub tracking_number: Option<String>,
    pub courier: Option<String>,
    pub tracking_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferStockRequest {
    pub product_id: i64,
    pub qty: i64,
    pub from_warehouse: String,
    pub to_warehouse: String,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub product_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub records: Vec<StockRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Identifies one stock row for bulk delete.
#[derive(Debug, Deserialize)]
pub struct StockRowKey {
    pub product_id: i64,
    pub warehouse: Option<String>,
    pub bin: Option<String>,
    pub lot: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRowsRequest {
    pub rows: Vec<StockRowKey>,
}
