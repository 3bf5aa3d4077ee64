use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Delivery lifecycle states. Pending and Ready are interchangeable
/// "not yet shipped" labels; Shipped and Delivered are interchangeable
/// "gone" labels. Stock effects are defined on the bucket, never on the
/// literal label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Pending,
    Ready,
    Shipped,
    Delivered,
    Returned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    NotShipped,
    Shipped,
    Returned,
}

impl DeliveryStatus {
    pub fn bucket(self) -> StatusBucket {
        match self {
            DeliveryStatus::Pending | DeliveryStatus::Ready => StatusBucket::NotShipped,
            DeliveryStatus::Shipped | DeliveryStatus::Delivered => StatusBucket::Shipped,
            DeliveryStatus::Returned => StatusBucket::Returned,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::Ready => "Ready",
            DeliveryStatus::Shipped => "Shipped",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Returned => "Returned",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = ();

    // The external delivery API stores statuses lowercased.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DeliveryStatus::Pending),
            "ready" => Ok(DeliveryStatus::Ready),
            "shipped" => Ok(DeliveryStatus::Shipped),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "returned" => Ok(DeliveryStatus::Returned),
            _ => Err(()),
        }
    }
}
