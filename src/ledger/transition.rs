//! Stock effects of delivery status changes. Changing a delivery's status
//! after the fact must land on the same net stock as if the delivery had
//! been issued with the new status from the start, so each transition is a
//! delta against the previously recorded status.

use crate::models::{DeliveryStatus, StatusBucket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffect {
    pub quantity_delta: i64,
    pub reserved_delta: i64,
}

impl TransitionEffect {
    pub const NONE: TransitionEffect = TransitionEffect {
        quantity_delta: 0,
        reserved_delta: 0,
    };

    pub fn is_noop(self) -> bool {
        self == Self::NONE
    }
}

/// Effect of moving a delivery of `qty` units from `old` to `new` status.
/// Defined purely on the (old bucket, new bucket) pair: Pending -> Ready
/// and Delivered -> Shipped are no-ops.
pub fn transition_effect(
    qty: i64,
    old: DeliveryStatus,
    new: DeliveryStatus,
) -> TransitionEffect {
    use StatusBucket::*;
    let (quantity_delta, reserved_delta) = match (old.bucket(), new.bucket()) {
        (NotShipped, NotShipped) | (Shipped, Shipped) | (Returned, Returned) => (0, 0),
        // Commit the shipment, release the reservation.
        (NotShipped, Shipped) => (-qty, -qty),
        // Undo the shipment, restore the reservation.
        (Shipped, NotShipped) => (qty, qty),
        // Cancel the reservation; nothing ever left the shelf.
        (NotShipped, Returned) => (0, -qty),
        // Customer sent it back.
        (Shipped, Returned) => (qty, 0),
        (Returned, NotShipped) => (0, qty),
        (Returned, Shipped) => (-qty, 0),
    };
    TransitionEffect {
        quantity_delta,
        reserved_delta,
    }
}
