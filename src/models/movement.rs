use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::DeliveryStatus;
use crate::models::stock::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Adjustment,      // Manual quantity correction
    PurchaseReceipt, // Goods received against a purchase
    SalesDelivery,   // Goods reserved or shipped out
    Transfer,        // Warehouse-to-warehouse move, local only
}

/// Append-only ledger record of a stock-affecting action. `id` and
/// `movement_type` never change after creation; only `status` of a
/// sales delivery may be rewritten, and always together with the paired
/// stock effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementEntry {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub product_id: i64,
    #[serde(flatten)]
    pub location: Location,
    pub qty: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_qty: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_warehouse: Option<String>,
    pub ts: DateTime<Utc>,
    pub actor: String,
}

impl MovementEntry {
    pub fn new(
        movement_type: MovementType,
        product_id: i64,
        location: Location,
        qty: i64,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            movement_type,
            product_id,
            location,
            qty,
            delta: None,
            new_qty: None,
            reason: None,
            reference: None,
            company: None,
            status: None,
            tracking_number: None,
            courier: None,
            tracking_url: None,
            from_warehouse: None,
            to_warehouse: None,
            ts: now,
            actor: actor.to_string(),
        }
    }
}
