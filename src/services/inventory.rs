//! Inventory service: owns the stock records and the movement ledger,
//! serializes all mutations, and keeps the local breakdown reconciled
//! against the external system's per-product totals.
//!
//! Every externally-visible mutation follows the same order: validate
//! against current state, push the new aggregate total upstream, then
//! apply the local delta, append the ledger entry and write the cache.
//! A failed upstream push therefore leaves no local trace. Transfers are
//! the one local-only mutation (they do not change the product total).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dtos::delivery::{DeliveryRow, DeliverySource};
use crate::dtos::inventory::{CreateItemRequest, DeliverStockRequest, StockRowKey};
use crate::error::{AppError, AppResult};
use crate::external::{DeliveryApi, LedgerCache, LedgerSnapshot, StockApi};
use crate::ledger::{reconcile_group, transition_effect, ReconcileOutcome};
use crate::models::stock::{build_tracking_url, product_total};
use crate::models::{
    DeliveryStatus, Location, MovementEntry, MovementType, StatusBucket, StockRecord,
    DEFAULT_BIN, DEFAULT_WAREHOUSE,
};

/// History views show the most recent entries; the full ledger stays in
/// the cache.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Default)]
struct LedgerState {
    records: Vec<StockRecord>,
    movements: Vec<MovementEntry>,
}

impl LedgerState {
    fn record_pos(&self, product_id: i64, location: &Location) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.product_id == product_id && r.location == *location)
    }

    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            records: self.records.clone(),
            movements: self.movements.clone(),
        }
    }
}

pub struct InventoryService {
    stock_api: Arc<dyn StockApi>,
    delivery_api: Arc<dyn DeliveryApi>,
    cache: Arc<dyn LedgerCache>,
    state: Mutex<LedgerState>,
}

impl InventoryService {
    pub fn new(
        stock_api: Arc<dyn StockApi>,
        delivery_api: Arc<dyn DeliveryApi>,
        cache: Arc<dyn LedgerCache>,
    ) -> Self {
        Self {
            stock_api,
            delivery_api,
            cache,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Startup: restore the cached snapshot, then reconcile against the
    /// system of record. Either step may fail without aborting startup.
    pub async fn load(&self) {
        let snapshot = match self.cache.load().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Cache load failed, starting empty");
                LedgerSnapshot::default()
            }
        };
        {
            let mut state = self.state.lock().await;
            state.records = snapshot.records;
            state.movements = snapshot.movements;
        }
        if let Err(e) = self.reconcile_all().await {
            tracing::warn!(error = %e, "Initial reconcile failed, serving cached snapshot");
        }
    }

    /// Full reconciliation pass: every product the system of record knows
    /// gets its local breakdown adjusted to the authoritative total; rows
    /// for products unknown upstream are dropped.
    pub async fn reconcile_all(&self) -> AppResult<Vec<StockRecord>> {
        let totals = self
            .stock_api
            .fetch_totals()
            .await
            .map_err(AppError::ExternalRead)?;

        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut remaining = std::mem::take(&mut state.records);
        for product in &totals {
            let (mut group, rest): (Vec<_>, Vec<_>) = remaining
                .into_iter()
                .partition(|r| r.product_id == product.product_id);
            remaining = rest;
            match reconcile_group(product.product_id, product.total, &mut group, now) {
                Ok(ReconcileOutcome::Underflow { shortfall }) => {
                    tracing::warn!(
                        product_id = product.product_id,
                        shortfall,
                        "Reconciliation underflow"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        product_id = product.product_id,
                        error = %e,
                        "Rejected authoritative total"
                    );
                }
            }
            state.records.append(&mut group);
        }
        if !remaining.is_empty() {
            tracing::debug!(
                dropped = remaining.len(),
                "Dropping rows for products unknown upstream"
            );
        }
        self.persist(&state).await;
        Ok(state.records.clone())
    }

    /// Reconcile a single product against a fresh authoritative read.
    /// Returns the product's records and a warning when clamping could
    /// not fully absorb the deficit.
    pub async fn reconcile_product(
        &self,
        product_id: i64,
    ) -> AppResult<(Vec<StockRecord>, Option<String>)> {
        let total = self
            .stock_api
            .fetch_total(product_id)
            .await
            .map_err(AppError::ExternalRead)?;

        let mut state = self.state.lock().await;
        let now = Utc::now();
        let all = std::mem::take(&mut state.records);
        let (mut group, rest): (Vec<_>, Vec<_>) =
            all.into_iter().partition(|r| r.product_id == product_id);
        state.records = rest;

        let outcome = reconcile_group(product_id, total, &mut group, now);
        let result = match outcome {
            Ok(ReconcileOutcome::Underflow { shortfall }) => {
                tracing::warn!(product_id, shortfall, "Reconciliation underflow");
                Some(format!(
                    "authoritative total short by {shortfall} after clamping all records to zero"
                ))
            }
            Ok(_) => None,
            Err(e) => {
                state.records.append(&mut group);
                return Err(AppError::validation(e.to_string()));
            }
        };
        let view = group.clone();
        state.records.append(&mut group);
        self.persist(&state).await;
        Ok((view, result))
    }

    /// Read path for the stock table: reconcile first, fall back to the
    /// cached rows when the system of record is unreachable.
    pub async fn stock_view(&self) -> AppResult<Vec<StockRecord>> {
        match self.reconcile_all().await {
            Ok(records) => Ok(records),
            Err(AppError::ExternalRead(e)) => {
                tracing::warn!(error = %e, "Stock service unreachable, serving cached rows");
                Ok(self.state.lock().await.records.clone())
            }
            Err(e) => Err(e),
        }
    }

    /// Create a product upstream and its first local stock row.
    pub async fn create_item(&self, req: CreateItemRequest) -> AppResult<StockRecord> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        if req.initial_qty < 0 {
            return Err(AppError::validation("initial_qty must not be negative"));
        }
        let product_id = self
            .stock_api
            .create_product(name, req.initial_qty)
            .await
            .map_err(AppError::ExternalWrite)?;

        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut record = StockRecord::synthesized(product_id, req.initial_qty, now);
        record.location = Location::new(req.warehouse, req.bin, req.lot);
        record.incoming = req.incoming.max(0);
        state.records.push(record.clone());
        self.persist(&state).await;
        Ok(record)
    }

    /// Set the absolute quantity of one location record. Negative input
    /// clamps to zero. The new product total is pushed upstream before
    /// anything changes locally.
    pub async fn set_quantity_at(
        &self,
        product_id: i64,
        location: Location,
        new_qty: i64,
        reason: Option<String>,
        reference: Option<String>,
        actor: &str,
    ) -> AppResult<StockRecord> {
        let new_qty = new_qty.max(0);

        let mut state = self.state.lock().await;
        let pos = state
            .record_pos(product_id, &location)
            .ok_or_else(|| AppError::not_found("Stock record not found"))?;
        let prev_qty = state.records[pos].quantity;
        let new_total = product_total(&state.records, product_id) - prev_qty + new_qty;
        self.stock_api
            .push_total(product_id, new_total)
            .await
            .map_err(AppError::ExternalWrite)?;

        let now = Utc::now();
        let delta = new_qty - prev_qty;
        {
            let record = &mut state.records[pos];
            record.quantity = new_qty;
            record.touch(now);
        }
        let mut entry = MovementEntry::new(
            MovementType::Adjustment,
            product_id,
            location,
            delta.abs(),
            actor,
            now,
        );
        entry.delta = Some(delta);
        entry.new_qty = Some(new_qty);
        entry.reason = reason;
        entry.reference = reference;
        state.movements.push(entry);

        let record = state.records[pos].clone();
        self.persist(&state).await;
        Ok(record)
    }

    /// Receive purchased goods. The receipt lands on the "Main" record
    /// (first record when no "Main" exists); `qty <= 0` is a no-op.
    pub async fn receive(
        &self,
        product_id: i64,
        qty: i64,
        reference: Option<String>,
        company: Option<String>,
        actor: &str,
    ) -> AppResult<Option<StockRecord>> {
        if qty <= 0 {
            return Ok(None);
        }

        let mut state = self.state.lock().await;
        let pos = state
            .records
            .iter()
            .position(|r| {
                r.product_id == product_id && r.location.warehouse == DEFAULT_WAREHOUSE
            })
            .or_else(|| {
                state
                    .records
                    .iter()
                    .position(|r| r.product_id == product_id)
            })
            .ok_or_else(|| AppError::not_found("Product has no stock records"))?;

        let new_total = product_total(&state.records, product_id) + qty;
        self.stock_api
            .push_total(product_id, new_total)
            .await
            .map_err(AppError::ExternalWrite)?;

        let now = Utc::now();
        let location = {
            let record = &mut state.records[pos];
            record.quantity += qty;
            record.incoming = (record.incoming - qty).max(0);
            record.delivery_status = Some(DeliveryStatus::Delivered);
            record.touch(now);
            record.location.clone()
        };
        let mut entry = MovementEntry::new(
            MovementType::PurchaseReceipt,
            product_id,
            location,
            qty,
            actor,
            now,
        );
        entry.reference = reference;
        entry.company = company;
        state.movements.push(entry);

        let record = state.records[pos].clone();
        self.persist(&state).await;
        Ok(Some(record))
    }

    /// Issue a delivery. Shipped/Delivered commits the quantity out
    /// immediately (external push first); Pending/Ready only reserves it.
    /// Rejects quantities above what the location holds.
    pub async fn deliver(
        &self,
        req: DeliverStockRequest,
        actor: &str,
    ) -> AppResult<Option<MovementEntry>> {
        if req.qty <= 0 {
            return Ok(None);
        }
        let location = Location::new(req.warehouse, req.bin, req.lot);
        let status = req.status.unwrap_or(DeliveryStatus::Delivered);

        let mut state = self.state.lock().await;
        let pos = state
            .record_pos(req.product_id, &location)
            .ok_or_else(|| AppError::not_found("Stock record not found"))?;
        let available = state.records[pos].quantity;
        if req.qty > available {
            return Err(AppError::InsufficientStock {
                available,
                requested: req.qty,
            });
        }

        if status.bucket() == StatusBucket::Shipped {
            let new_total = product_total(&state.records, req.product_id) - req.qty;
            self.stock_api
                .push_total(req.product_id, new_total)
                .await
                .map_err(AppError::ExternalWrite)?;
        }

        let now = Utc::now();
        let tracking_url = build_tracking_url(
            req.courier.as_deref(),
            req.tracking_number.as_deref(),
            req.tracking_url.as_deref(),
        );
        {
            let record = &mut state.records[pos];
            match status.bucket() {
                StatusBucket::Shipped => {
                    record.quantity = (record.quantity - req.qty).max(0);
                }
                StatusBucket::NotShipped => {
                    record.reserved += req.qty;
                    record.outgoing += req.qty;
                }
                StatusBucket::Returned => {}
            }
            record.delivery_status = Some(status);
            record.delivery_company = req.company.clone();
            record.tracking_number = req.tracking_number.clone();
            record.courier = req.courier.clone();
            record.tracking_url = tracking_url.clone();
            record.touch(now);
        }

        let mut entry = MovementEntry::new(
            MovementType::SalesDelivery,
            req.product_id,
            location,
            req.qty,
            actor,
            now,
        );
        entry.reference = req.reference;
        entry.company = req.company;
        entry.status = Some(status);
        entry.tracking_number = req.tracking_number;
        entry.courier = req.courier;
        entry.tracking_url = tracking_url;
        state.movements.push(entry.clone());
        self.persist(&state).await;
        Ok(Some(entry))
    }

    /// Move quantity between warehouses. Local-only: the product total is
    /// unchanged, so the system of record is never called. The destination
    /// is credited the full qty even when the source clamps below it; the
    /// next reconcile pass absorbs the difference.
    pub async fn transfer(
        &self,
        product_id: i64,
        qty: i64,
        from_warehouse: &str,
        to_warehouse: &str,
        reference: Option<String>,
        actor: &str,
    ) -> AppResult<Option<MovementEntry>> {
        if qty <= 0 || from_warehouse == to_warehouse {
            return Ok(None);
        }

        let mut state = self.state.lock().await;
        let src_pos = state
            .records
            .iter()
            .position(|r| {
                r.product_id == product_id && r.location.warehouse == from_warehouse
            })
            .ok_or_else(|| AppError::not_found("No stock record in source warehouse"))?;

        let now = Utc::now();
        let source = {
            let record = &mut state.records[src_pos];
            record.quantity = (record.quantity - qty).max(0);
            record.touch(now);
            record.clone()
        };

        match state.records.iter_mut().find(|r| {
            r.product_id == product_id && r.location.warehouse == to_warehouse
        }) {
            Some(dest) => {
                dest.quantity += qty;
                dest.touch(now);
            }
            None => {
                let mut dest = source.clone();
                dest.location = Location {
                    warehouse: to_warehouse.to_string(),
                    bin: DEFAULT_BIN.to_string(),
                    lot: source.location.lot.clone(),
                };
                dest.quantity = qty;
                dest.reserved = 0;
                dest.incoming = 0;
                dest.outgoing = 0;
                dest.updated_at = now;
                state.records.push(dest);
            }
        }

        let mut entry = MovementEntry::new(
            MovementType::Transfer,
            product_id,
            source.location.clone(),
            qty,
            actor,
            now,
        );
        entry.from_warehouse = Some(from_warehouse.to_string());
        entry.to_warehouse = Some(to_warehouse.to_string());
        entry.reference = reference;
        state.movements.push(entry.clone());
        self.persist(&state).await;
        Ok(Some(entry))
    }

    /// Change a recorded delivery's status. The stock effect is the delta
    /// between the previously recorded status bucket and the new one, so
    /// transitions round-trip exactly. Ledger update and stock effect
    /// apply together or not at all.
    pub async fn transition(
        &self,
        movement_id: Uuid,
        new_status: DeliveryStatus,
    ) -> AppResult<MovementEntry> {
        let mut state = self.state.lock().await;
        let m_pos = state
            .movements
            .iter()
            .position(|m| {
                m.id == movement_id && m.movement_type == MovementType::SalesDelivery
            })
            .ok_or_else(|| AppError::not_found("Delivery movement not found"))?;

        let old_status = state.movements[m_pos]
            .status
            .unwrap_or(DeliveryStatus::Delivered);
        let qty = state.movements[m_pos].qty;
        let product_id = state.movements[m_pos].product_id;
        let location = state.movements[m_pos].location.clone();

        let effect = transition_effect(qty, old_status, new_status);
        if effect.is_noop() {
            // Same bucket: relabel only, e.g. Pending -> Ready.
            state.movements[m_pos].status = Some(new_status);
            self.persist(&state).await;
            return Ok(state.movements[m_pos].clone());
        }

        let pos = state
            .record_pos(product_id, &location)
            .ok_or_else(|| AppError::not_found("Stock record for delivery not found"))?;

        // Clamp downward deltas to what the record holds, and push the
        // total the local sum will actually land on.
        let applied_quantity = if effect.quantity_delta < 0 {
            effect.quantity_delta.max(-state.records[pos].quantity)
        } else {
            effect.quantity_delta
        };
        let applied_reserved = if effect.reserved_delta < 0 {
            effect.reserved_delta.max(-state.records[pos].reserved)
        } else {
            effect.reserved_delta
        };

        if applied_quantity != 0 {
            let new_total = product_total(&state.records, product_id) + applied_quantity;
            self.stock_api
                .push_total(product_id, new_total)
                .await
                .map_err(AppError::ExternalWrite)?;
        }

        let now = Utc::now();
        {
            let record = &mut state.records[pos];
            record.quantity += applied_quantity;
            record.reserved += applied_reserved;
            record.delivery_status = Some(new_status);
            record.touch(now);
        }
        state.movements[m_pos].status = Some(new_status);
        let entry = state.movements[m_pos].clone();
        self.persist(&state).await;
        Ok(entry)
    }

    /// Ledger history, most recent first, bounded.
    pub async fn movements(
        &self,
        product_id: Option<i64>,
        warehouse: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<MovementEntry> {
        let state = self.state.lock().await;
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        state
            .movements
            .iter()
            .rev()
            .filter(|m| product_id.map_or(true, |p| m.product_id == p))
            .filter(|m| warehouse.map_or(true, |w| m.location.warehouse == w))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Bulk delete of ledger entries. Stock records are untouched.
    pub async fn delete_movements(&self, ids: &[Uuid]) -> AppResult<usize> {
        let mut state = self.state.lock().await;
        let before = state.movements.len();
        state.movements.retain(|m| !ids.contains(&m.id));
        let removed = before - state.movements.len();
        if removed > 0 {
            self.persist(&state).await;
        }
        Ok(removed)
    }

    /// Bulk delete of stock rows. Deleting every row of a product deletes
    /// the product upstream; a partial delete pushes the reduced total.
    /// External calls run before any local row is removed.
    pub async fn delete_stock_rows(&self, rows: Vec<StockRowKey>) -> AppResult<usize> {
        let keys: Vec<(i64, Location)> = rows
            .into_iter()
            .map(|k| (k.product_id, Location::new(k.warehouse, k.bin, k.lot)))
            .collect();

        let mut state = self.state.lock().await;

        let mut by_product: BTreeMap<i64, Vec<&Location>> = BTreeMap::new();
        for (product_id, location) in &keys {
            by_product.entry(*product_id).or_default().push(location);
        }

        enum ExternalOp {
            Delete(i64),
            SetTotal(i64, i64),
        }
        let mut ops = Vec::new();
        for (&product_id, locations) in &by_product {
            let all: Vec<&StockRecord> = state
                .records
                .iter()
                .filter(|r| r.product_id == product_id)
                .collect();
            if all.is_empty() {
                continue;
            }
            let selected: Vec<&&StockRecord> = all
                .iter()
                .filter(|r| locations.iter().any(|l| **l == r.location))
                .collect();
            if selected.is_empty() {
                continue;
            }
            if selected.len() == all.len() {
                ops.push(ExternalOp::Delete(product_id));
            } else {
                let removed_qty: i64 = selected.iter().map(|r| r.quantity).sum();
                let current: i64 = all.iter().map(|r| r.quantity).sum();
                ops.push(ExternalOp::SetTotal(
                    product_id,
                    (current - removed_qty).max(0),
                ));
            }
        }

        for op in &ops {
            match op {
                ExternalOp::Delete(product_id) => self
                    .stock_api
                    .delete_product(*product_id)
                    .await
                    .map_err(AppError::ExternalWrite)?,
                ExternalOp::SetTotal(product_id, total) => self
                    .stock_api
                    .push_total(*product_id, *total)
                    .await
                    .map_err(AppError::ExternalWrite)?,
            }
        }

        let before = state.records.len();
        state
            .records
            .retain(|r| !keys.iter().any(|(p, l)| *p == r.product_id && *l == r.location));
        let removed = before - state.records.len();
        self.persist(&state).await;
        Ok(removed)
    }

    /// Unified delivery view: external API rows plus local sales-delivery
    /// ledger entries, newest first. An unreachable delivery service
    /// degrades to ledger rows only.
    pub async fn deliveries_view(&self) -> Vec<DeliveryRow> {
        let external = match self.delivery_api.list_deliveries().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Delivery service unreachable, showing ledger rows only");
                Vec::new()
            }
        };

        let state = self.state.lock().await;
        let mut rows: Vec<DeliveryRow> = external
            .into_iter()
            .map(|d| DeliveryRow {
                id: d.id.to_string(),
                source: DeliverySource::Backend,
                ts: d.created_at,
                product_id: d.product_id,
                product_name: d.product_name,
                qty: d.order_amount,
                status: d
                    .delivery_status
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DeliveryStatus::Pending),
                company: d.company,
                tracking_url: build_tracking_url(
                    d.courier.as_deref(),
                    d.tracking_number.as_deref(),
                    None,
                ),
                tracking_number: d.tracking_number,
                courier: d.courier,
            })
            .collect();

        rows.extend(
            state
                .movements
                .iter()
                .filter(|m| m.movement_type == MovementType::SalesDelivery)
                .map(|m| DeliveryRow {
                    id: m.id.to_string(),
                    source: DeliverySource::Ledger,
                    ts: Some(m.ts),
                    product_id: Some(m.product_id),
                    product_name: None,
                    qty: m.qty,
                    status: m.status.unwrap_or(DeliveryStatus::Delivered),
                    company: m.company.clone(),
                    tracking_number: m.tracking_number.clone(),
                    courier: m.courier.clone(),
                    tracking_url: m.tracking_url.clone(),
                }),
        );

        rows.sort_by(|a, b| b.ts.cmp(&a.ts));
        rows
    }

    /// Best-effort cache write; the in-memory state is already committed.
    async fn persist(&self, state: &LedgerState) {
        if let Err(e) = self.cache.save(&state.snapshot()).await {
            tracing::warn!(error = %e, "Cache write failed");
        }
    }
}
