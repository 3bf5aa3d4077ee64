//! Redistribution of an externally-supplied authoritative total across a
//! product's per-location records. The external system only tracks one
//! number per product; the location breakdown lives here.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{StockRecord, DEFAULT_WAREHOUSE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("authoritative total {0} is negative")]
    NegativeTotal(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Records already summed to the total, or the difference was absorbed.
    Balanced,
    /// No local records existed; a default "Main" record now holds the total.
    CreatedDefault,
    /// Clamping every record at zero still left part of the deficit
    /// unabsorbed. Non-fatal: records stay at zero and the shortfall is
    /// surfaced to the caller.
    Underflow { shortfall: i64 },
}

/// Reconcile one product's records against the authoritative total.
///
/// Surplus goes wholly to the "Main" record (first record when no "Main"
/// exists). Deficit drains from that same target first, then from the
/// remaining records in stored order, each clamped at zero. Postcondition:
/// `sum(quantity) == authoritative_total` unless `Underflow` is returned.
pub fn reconcile_group(
    product_id: i64,
    authoritative_total: i64,
    records: &mut Vec<StockRecord>,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome, ReconcileError> {
    if authoritative_total < 0 {
        return Err(ReconcileError::NegativeTotal(authoritative_total));
    }

    if records.is_empty() {
        records.push(StockRecord::synthesized(
            product_id,
            authoritative_total,
            now,
        ));
        return Ok(ReconcileOutcome::CreatedDefault);
    }

    let local_total: i64 = records.iter().map(|r| r.quantity).sum();
    let diff = authoritative_total - local_total;
    if diff == 0 {
        return Ok(ReconcileOutcome::Balanced);
    }

    let target = records
        .iter()
        .position(|r| r.location.warehouse == DEFAULT_WAREHOUSE)
        .unwrap_or(0);

    if diff > 0 {
        records[target].quantity += diff;
        records[target].touch(now);
        return Ok(ReconcileOutcome::Balanced);
    }

    // Deficit: drain the target first, then the rest in stored order.
    let mut remaining = -diff;
    let take = records[target].quantity.min(remaining);
    records[target].quantity -= take;
    records[target].touch(now);
    remaining -= take;

    if remaining > 0 {
        for (i, record) in records.iter_mut().enumerate() {
            if i == target {
                continue;
            }
            if remaining == 0 {
                break;
            }
            let take = record.quantity.min(remaining);
            record.quantity -= take;
            record.touch(now);
            remaining -= take;
        }
    }

    if remaining > 0 {
        Ok(ReconcileOutcome::Underflow {
            shortfall: remaining,
        })
    } else {
        Ok(ReconcileOutcome::Balanced)
    }
}
