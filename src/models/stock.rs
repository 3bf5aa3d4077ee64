use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::DeliveryStatus;

pub const DEFAULT_WAREHOUSE: &str = "Main";
pub const DEFAULT_BIN: &str = "A-01-01";

/// Composite identity of a stock row: warehouse / bin / lot.
/// Empty inputs normalize to the defaults so that two callers naming the
/// same physical location always hit the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub warehouse: String,
    pub bin: String,
    pub lot: String,
}

impl Location {
    pub fn new(
        warehouse: Option<String>,
        bin: Option<String>,
        lot: Option<String>,
    ) -> Self {
        let warehouse = warehouse
            .filter(|w| !w.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WAREHOUSE.to_string());
        let bin = bin
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIN.to_string());
        let lot = lot.unwrap_or_default();
        Self { warehouse, bin, lot }
    }

    pub fn main() -> Self {
        Self::new(None, None, None)
    }

    pub fn in_warehouse(warehouse: &str) -> Self {
        Self::new(Some(warehouse.to_string()), None, None)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::main()
    }
}

/// One location-scoped quantity row for a product. The sum of `quantity`
/// across a product's records mirrors the external system's total after
/// every reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: i64,
    #[serde(flatten)]
    pub location: Location,
    pub quantity: i64,
    pub reserved: i64,
    pub incoming: i64,
    pub outgoing: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_status: Option<DeliveryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Default record synthesized when the external system knows a product
    /// the local store has never seen.
    pub fn synthesized(product_id: i64, quantity: i64, now: DateTime<Utc>) -> Self {
        Self {
            product_id,
            location: Location::main(),
            quantity,
            reserved: 0,
            incoming: 0,
            outgoing: 0,
            delivery_status: None,
            delivery_company: None,
            tracking_number: None,
            courier: None,
            tracking_url: None,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Sum of on-hand quantity across all of a product's records.
pub fn product_total(records: &[StockRecord], product_id: i64) -> i64 {
    records
        .iter()
        .filter(|r| r.product_id == product_id)
        .map(|r| r.quantity)
        .sum()
}

/// Tracking link templates for the couriers the delivery form offers.
/// An explicit URL (or a tracking number that is already a URL) wins.
pub fn build_tracking_url(
    courier: Option<&str>,
    tracking_number: Option<&str>,
    explicit_url: Option<&str>,
) -> Option<String> {
    if let Some(url) = explicit_url {
        let url = url.trim();
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }
    let number = tracking_number?.trim();
    if number.is_empty() {
        return None;
    }
    if number.starts_with("http") {
        return Some(number.to_string());
    }
    let url = match courier.unwrap_or("") {
        "Kerry" => format!("https://th.kerryexpress.com/th/track/?track={number}"),
        "Flash" => format!("https://www.flashexpress.co.th/tracking/?se={number}"),
        "ThaiPost" => format!("https://track.thailandpost.co.th/?trackNumber={number}"),
        "J&T" => format!("https://www.jtexpress.co.th/tracking?billcode={number}"),
        "DHL" => {
            format!("https://www.dhl.com/th-en/home/tracking.html?tracking-id={number}")
        }
        "SCG" => format!("https://www.scgexpress.co.th/tracking/detail/{number}"),
        "NinjaVan" => format!("https://www.ninjavan.co/th-th/tracking?id={number}"),
        "Best" => format!("https://www.best-inc.co.th/track?billcode={number}"),
        "Lazada" => format!("https://tracker.lel.asia/tracker?trackingNumber={number}"),
        "Shopee" => "https://spx.co.th/".to_string(),
        "Nim" => format!("https://www.nimexpress.com/web/p/tracking?i={number}"),
        _ => format!("https://t.17track.net/en#nums={number}"),
    };
    Some(url)
}
