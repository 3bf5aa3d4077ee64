//! Service-level tests against in-memory doubles for the external stock
//! and delivery APIs and the cache.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use stockledger_backend::dtos::inventory::{CreateItemRequest, DeliverStockRequest, StockRowKey};
use stockledger_backend::error::AppError;
use stockledger_backend::external::{
    CacheError, DeliveryApi, ExternalApiError, ExternalDelivery, LedgerCache, LedgerSnapshot,
    ProductTotal, StockApi,
};
use stockledger_backend::models::{
    DeliveryStatus, Location, MovementType, StockRecord, DEFAULT_BIN, DEFAULT_WAREHOUSE,
};
use stockledger_backend::services::InventoryService;

// ==================== Doubles ====================

struct MockStockApi {
    totals: Mutex<Vec<ProductTotal>>,
    pushes: Mutex<Vec<(i64, i64)>>,
    fail_writes: AtomicBool,
    next_id: AtomicI64,
}

impl MockStockApi {
    fn with_products(products: &[(i64, &str, i64)]) -> Arc<Self> {
        Arc::new(Self {
            totals: Mutex::new(
                products
                    .iter()
                    .map(|&(product_id, name, total)| ProductTotal {
                        product_id,
                        name: name.to_string(),
                        total,
                    })
                    .collect(),
            ),
            pushes: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            next_id: AtomicI64::new(1000),
        })
    }

    fn total_of(&self, product_id: i64) -> Option<i64> {
        self.totals
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.product_id == product_id)
            .map(|t| t.total)
    }

    fn pushes(&self) -> Vec<(i64, i64)> {
        self.pushes.lock().unwrap().clone()
    }

    fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StockApi for MockStockApi {
    async fn fetch_totals(&self) -> Result<Vec<ProductTotal>, ExternalApiError> {
        Ok(self.totals.lock().unwrap().clone())
    }

    async fn fetch_total(&self, product_id: i64) -> Result<i64, ExternalApiError> {
        self.total_of(product_id)
            .ok_or_else(|| ExternalApiError::Body("unknown product".to_string()))
    }

    async fn push_total(
        &self,
        product_id: i64,
        new_total: i64,
    ) -> Result<(), ExternalApiError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ExternalApiError::Body("write rejected".to_string()));
        }
        let mut totals = self.totals.lock().unwrap();
        if let Some(t) = totals.iter_mut().find(|t| t.product_id == product_id) {
            t.total = new_total;
        }
        self.pushes.lock().unwrap().push((product_id, new_total));
        Ok(())
    }

    async fn create_product(
        &self,
        name: &str,
        initial_stock: i64,
    ) -> Result<i64, ExternalApiError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ExternalApiError::Body("write rejected".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.totals.lock().unwrap().push(ProductTotal {
            product_id: id,
            name: name.to_string(),
            total: initial_stock,
        });
        Ok(id)
    }

    async fn delete_product(&self, product_id: i64) -> Result<(), ExternalApiError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ExternalApiError::Body("write rejected".to_string()));
        }
        self.totals
            .lock()
            .unwrap()
            .retain(|t| t.product_id != product_id);
        Ok(())
    }
}

#[derive(Default)]
struct MockDeliveryApi {
    rows: Mutex<Vec<ExternalDelivery>>,
}

#[async_trait]
impl DeliveryApi for MockDeliveryApi {
    async fn list_deliveries(&self) -> Result<Vec<ExternalDelivery>, ExternalApiError> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct MemoryCache {
    saved: Mutex<Option<LedgerSnapshot>>,
}

#[async_trait]
impl LedgerCache for MemoryCache {
    async fn load(&self) -> Result<LedgerSnapshot, CacheError> {
        Ok(self.saved.lock().unwrap().clone().unwrap_or_default())
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), CacheError> {
        *self.saved.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }
}

// ==================== Fixtures ====================

async fn service_with(stock: Arc<MockStockApi>) -> InventoryService {
    let service = InventoryService::new(
        stock,
        Arc::new(MockDeliveryApi::default()),
        Arc::new(MemoryCache::default()),
    );
    service.load().await;
    service
}

async fn service_with_deliveries(
    stock: Arc<MockStockApi>,
    delivery: Arc<MockDeliveryApi>,
) -> InventoryService {
    let service =
        InventoryService::new(stock, delivery, Arc::new(MemoryCache::default()));
    service.load().await;
    service
}

fn deliver_req(
    product_id: i64,
    qty: i64,
    status: Option<DeliveryStatus>,
) -> DeliverStockRequest {
    DeliverStockRequest {
        product_id,
        qty,
        warehouse: None,
        bin: None,
        lot: None,
        status,
        company: None,
        reference: None,
        tracking_number: None,
        courier: None,
        tracking_url: None,
    }
}

fn find_record(records: &[StockRecord], product_id: i64, warehouse: &str) -> StockRecord {
    records
        .iter()
        .find(|r| r.product_id == product_id && r.location.warehouse == warehouse)
        .cloned()
        .expect("record should exist")
}

// ==================== Reconciliation ====================

#[tokio::test]
async fn startup_synthesizes_records_for_unknown_products() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    let records = service.stock_view().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.product_id, 1);
    assert_eq!(record.quantity, 100);
    assert_eq!(record.location.warehouse, DEFAULT_WAREHOUSE);
    assert_eq!(record.location.bin, DEFAULT_BIN);
    assert_eq!(record.location.lot, "");
}

#[tokio::test]
async fn reconcile_drops_rows_for_products_unknown_upstream() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;
    assert_eq!(service.stock_view().await.unwrap().len(), 1);

    stock.totals.lock().unwrap().clear();
    let records = service.stock_view().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn single_product_reconcile_reports_no_warning_when_balanced() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    let (records, warning) = service.reconcile_product(1).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].quantity, 100);
    assert!(warning.is_none());
}

// ==================== Adjust ====================

#[tokio::test]
async fn adjust_sets_absolute_quantity_and_logs_delta() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    let record = service
        .set_quantity_at(
            1,
            Location::main(),
            80,
            Some("damage".to_string()),
            None,
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(record.quantity, 80);
    assert_eq!(stock.total_of(1), Some(80));

    let movements = service.movements(Some(1), None, None).await;
    assert_eq!(movements.len(), 1);
    let entry = &movements[0];
    assert_eq!(entry.movement_type, MovementType::Adjustment);
    assert_eq!(entry.delta, Some(-20));
    assert_eq!(entry.new_qty, Some(80));
    assert_eq!(entry.reason.as_deref(), Some("damage"));
    assert_eq!(entry.actor, "alice");
}

#[tokio::test]
async fn adjust_clamps_negative_input_to_zero() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    let record = service
        .set_quantity_at(1, Location::main(), -5, None, None, "alice")
        .await
        .unwrap();
    assert_eq!(record.quantity, 0);
    assert_eq!(stock.total_of(1), Some(0));
}

#[tokio::test]
async fn failed_external_write_leaves_no_local_trace() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;
    stock.set_fail_writes(true);

    let err = service
        .set_quantity_at(1, Location::main(), 80, None, None, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ExternalWrite(_)));

    assert!(service.movements(Some(1), None, None).await.is_empty());
    stock.set_fail_writes(false);
    let records = service.stock_view().await.unwrap();
    assert_eq!(find_record(&records, 1, DEFAULT_WAREHOUSE).quantity, 100);
}

// ==================== Deliver ====================

#[tokio::test]
async fn deliver_rejects_more_than_available() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    let err = service
        .deliver(deliver_req(1, 150, Some(DeliveryStatus::Shipped)), "alice")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock {
            available: 100,
            requested: 150
        }
    ));
    assert!(service.movements(Some(1), None, None).await.is_empty());
}

#[tokio::test]
async fn deliver_shipped_commits_quantity_immediately() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    let entry = service
        .deliver(deliver_req(1, 30, Some(DeliveryStatus::Shipped)), "alice")
        .await
        .unwrap()
        .expect("movement");
    assert_eq!(entry.movement_type, MovementType::SalesDelivery);
    assert_eq!(entry.status, Some(DeliveryStatus::Shipped));

    let records = service.stock_view().await.unwrap();
    let record = find_record(&records, 1, DEFAULT_WAREHOUSE);
    assert_eq!(record.quantity, 70);
    assert_eq!(record.reserved, 0);
    assert_eq!(stock.total_of(1), Some(70));
}

#[tokio::test]
async fn deliver_pending_reserves_without_external_push() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    service
        .deliver(deliver_req(1, 30, Some(DeliveryStatus::Pending)), "alice")
        .await
        .unwrap();

    let records = service.stock_view().await.unwrap();
    let record = find_record(&records, 1, DEFAULT_WAREHOUSE);
    assert_eq!(record.quantity, 100);
    assert_eq!(record.reserved, 30);
    assert_eq!(record.outgoing, 30);
    assert!(stock.pushes().is_empty());
}

#[tokio::test]
async fn deliver_with_nonpositive_qty_is_a_no_op() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    let result = service
        .deliver(deliver_req(1, 0, Some(DeliveryStatus::Shipped)), "alice")
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(stock.pushes().is_empty());
}

#[tokio::test]
async fn deliver_builds_tracking_url_from_courier_template() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    let mut req = deliver_req(1, 5, Some(DeliveryStatus::Pending));
    req.courier = Some("Kerry".to_string());
    req.tracking_number = Some("TH123".to_string());
    let entry = service.deliver(req, "alice").await.unwrap().unwrap();
    let url = entry.tracking_url.expect("url");
    assert!(url.contains("kerryexpress"));
    assert!(url.ends_with("TH123"));
}

// ==================== Status transitions ====================

#[tokio::test]
async fn status_transitions_round_trip_through_the_buckets() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    let entry = service
        .deliver(deliver_req(1, 30, Some(DeliveryStatus::Pending)), "alice")
        .await
        .unwrap()
        .unwrap();

    // Pending -> Shipped: reservation converts to a committed issue.
    service
        .transition(entry.id, DeliveryStatus::Shipped)
        .await
        .unwrap();
    let records = service.stock_view().await.unwrap();
    let record = find_record(&records, 1, DEFAULT_WAREHOUSE);
    assert_eq!(record.quantity, 70);
    assert_eq!(record.reserved, 0);
    assert_eq!(stock.total_of(1), Some(70));

    // Shipped -> Returned: quantity comes back, nothing re-reserved.
    service
        .transition(entry.id, DeliveryStatus::Returned)
        .await
        .unwrap();
    let records = service.stock_view().await.unwrap();
    let record = find_record(&records, 1, DEFAULT_WAREHOUSE);
    assert_eq!(record.quantity, 100);
    assert_eq!(record.reserved, 0);
    assert_eq!(stock.total_of(1), Some(100));

    // Returned -> Pending: back to the initial reservation state.
    service
        .transition(entry.id, DeliveryStatus::Pending)
        .await
        .unwrap();
    let records = service.stock_view().await.unwrap();
    let record = find_record(&records, 1, DEFAULT_WAREHOUSE);
    assert_eq!(record.quantity, 100);
    assert_eq!(record.reserved, 30);
}

#[tokio::test]
async fn same_bucket_transition_only_relabels() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    let entry = service
        .deliver(deliver_req(1, 30, Some(DeliveryStatus::Pending)), "alice")
        .await
        .unwrap()
        .unwrap();
    let updated = service
        .transition(entry.id, DeliveryStatus::Ready)
        .await
        .unwrap();
    assert_eq!(updated.status, Some(DeliveryStatus::Ready));

    let records = service.stock_view().await.unwrap();
    let record = find_record(&records, 1, DEFAULT_WAREHOUSE);
    assert_eq!(record.quantity, 100);
    assert_eq!(record.reserved, 30);
    assert!(stock.pushes().is_empty());
}

#[tokio::test]
async fn transition_on_unknown_movement_is_not_found() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    let err = service
        .transition(uuid::Uuid::new_v4(), DeliveryStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ==================== Receive ====================

#[tokio::test]
async fn receive_adds_to_main_and_consumes_incoming() {
    let stock = MockStockApi::with_products(&[]);
    let service = service_with(stock.clone()).await;

    let record = service
        .create_item(CreateItemRequest {
            name: "Widget".to_string(),
            initial_qty: 50,
            warehouse: None,
            bin: None,
            lot: None,
            incoming: 25,
        })
        .await
        .unwrap();
    let product_id = record.product_id;

    let updated = service
        .receive(product_id, 10, Some("PO-7".to_string()), None, "bob")
        .await
        .unwrap()
        .expect("record");
    assert_eq!(updated.quantity, 60);
    assert_eq!(updated.incoming, 15);
    assert_eq!(updated.delivery_status, Some(DeliveryStatus::Delivered));
    assert_eq!(stock.total_of(product_id), Some(60));

    let movements = service.movements(Some(product_id), None, None).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::PurchaseReceipt);
    assert_eq!(movements[0].reference.as_deref(), Some("PO-7"));
}

#[tokio::test]
async fn receive_with_nonpositive_qty_is_a_no_op() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    assert!(service.receive(1, 0, None, None, "bob").await.unwrap().is_none());
    assert!(service.receive(1, -3, None, None, "bob").await.unwrap().is_none());
    assert!(stock.pushes().is_empty());
}

#[tokio::test]
async fn incoming_never_goes_negative_on_over_receipt() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    let updated = service
        .receive(1, 40, None, None, "bob")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.quantity, 140);
    assert_eq!(updated.incoming, 0);
}

// ==================== Transfer ====================

#[tokio::test]
async fn transfer_moves_quantity_without_touching_upstream() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    let entry = service
        .transfer(1, 30, "Main", "North", None, "carol")
        .await
        .unwrap()
        .expect("movement");
    assert_eq!(entry.movement_type, MovementType::Transfer);
    assert_eq!(entry.from_warehouse.as_deref(), Some("Main"));
    assert_eq!(entry.to_warehouse.as_deref(), Some("North"));
    assert!(stock.pushes().is_empty());

    let records = service.stock_view().await.unwrap();
    assert_eq!(find_record(&records, 1, "Main").quantity, 70);
    let dest = find_record(&records, 1, "North");
    assert_eq!(dest.quantity, 30);
    assert_eq!(dest.location.bin, DEFAULT_BIN);
    assert_eq!(dest.reserved, 0);
}

#[tokio::test]
async fn transfer_to_same_warehouse_is_a_no_op() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    let result = service
        .transfer(1, 30, "Main", "Main", None, "carol")
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn transfer_credits_full_qty_even_when_source_clamps() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    service
        .transfer(1, 500, "Main", "North", None, "carol")
        .await
        .unwrap();

    // Before the next reconcile the local sum overshoots; the pass pulls
    // it back to the authoritative total.
    let records = service.stock_view().await.unwrap();
    assert_eq!(stock.total_of(1), Some(100));
    let local_sum: i64 = records
        .iter()
        .filter(|r| r.product_id == 1)
        .map(|r| r.quantity)
        .sum();
    assert_eq!(local_sum, 100);
}

// ==================== Movement history ====================

#[tokio::test]
async fn movement_history_is_bounded_and_newest_first() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    for qty in 1..=55 {
        service
            .set_quantity_at(1, Location::main(), qty, None, None, "alice")
            .await
            .unwrap();
    }

    let movements = service.movements(Some(1), None, None).await;
    assert_eq!(movements.len(), 50);
    assert_eq!(movements[0].new_qty, Some(55));
    assert_eq!(movements[49].new_qty, Some(6));

    let limited = service.movements(Some(1), None, Some(3)).await;
    assert_eq!(limited.len(), 3);
}

#[tokio::test]
async fn movement_filters_by_warehouse() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    service
        .transfer(1, 10, "Main", "North", None, "carol")
        .await
        .unwrap();
    service
        .set_quantity_at(1, Location::in_warehouse("North"), 25, None, None, "carol")
        .await
        .unwrap();

    let north = service.movements(Some(1), Some("North"), None).await;
    assert_eq!(north.len(), 1);
    assert_eq!(north[0].movement_type, MovementType::Adjustment);
}

#[tokio::test]
async fn delete_movements_removes_selected_entries_only() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock).await;

    service
        .set_quantity_at(1, Location::main(), 90, None, None, "alice")
        .await
        .unwrap();
    service
        .set_quantity_at(1, Location::main(), 80, None, None, "alice")
        .await
        .unwrap();

    let movements = service.movements(Some(1), None, None).await;
    let removed = service.delete_movements(&[movements[0].id]).await.unwrap();
    assert_eq!(removed, 1);
    let remaining = service.movements(Some(1), None, None).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].new_qty, Some(90));
}

// ==================== Deliveries view ====================

#[tokio::test]
async fn deliveries_view_merges_backend_and_ledger_rows() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let delivery = Arc::new(MockDeliveryApi::default());
    delivery.rows.lock().unwrap().push(ExternalDelivery {
        id: 7,
        created_at: None,
        product_id: Some(1),
        product_name: Some("Widget".to_string()),
        order_amount: 3,
        delivery_status: Some("shipped".to_string()),
        company: Some("Acme".to_string()),
        tracking_number: Some("TH1".to_string()),
        courier: Some("Kerry".to_string()),
    });
    let service = service_with_deliveries(stock, delivery).await;

    service
        .deliver(deliver_req(1, 5, Some(DeliveryStatus::Pending)), "alice")
        .await
        .unwrap();

    let rows = service.deliveries_view().await;
    assert_eq!(rows.len(), 2);
    // Ledger row has a timestamp, backend row does not, so it sorts first.
    assert_eq!(rows[0].qty, 5);
    assert_eq!(rows[0].status, DeliveryStatus::Pending);
    assert_eq!(rows[1].id, "7");
    assert_eq!(rows[1].status, DeliveryStatus::Shipped);
    assert!(rows[1].tracking_url.as_deref().unwrap().contains("kerryexpress"));
}

// ==================== Row deletion ====================

#[tokio::test]
async fn deleting_every_row_of_a_product_deletes_it_upstream() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    let removed = service
        .delete_stock_rows(vec![StockRowKey {
            product_id: 1,
            warehouse: None,
            bin: None,
            lot: None,
        }])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(stock.total_of(1), None);
}

#[tokio::test]
async fn partial_row_deletion_pushes_reduced_total() {
    let stock = MockStockApi::with_products(&[(1, "Widget", 100)]);
    let service = service_with(stock.clone()).await;

    service
        .transfer(1, 30, "Main", "North", None, "carol")
        .await
        .unwrap();
    let removed = service
        .delete_stock_rows(vec![StockRowKey {
            product_id: 1,
            warehouse: Some("North".to_string()),
            bin: None,
            lot: None,
        }])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(stock.total_of(1), Some(70));

    let records = service.stock_view().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].location.warehouse, "Main");
}

// ==================== Item creation ====================

#[tokio::test]
async fn create_item_uses_upstream_id_and_requested_location() {
    let stock = MockStockApi::with_products(&[]);
    let service = service_with(stock.clone()).await;

    let record = service
        .create_item(CreateItemRequest {
            name: "  Gadget  ".to_string(),
            initial_qty: 12,
            warehouse: Some("East".to_string()),
            bin: Some("B-02-03".to_string()),
            lot: Some("L1".to_string()),
            incoming: 4,
        })
        .await
        .unwrap();
    assert_eq!(record.quantity, 12);
    assert_eq!(record.incoming, 4);
    assert_eq!(record.location.warehouse, "East");
    assert_eq!(record.location.bin, "B-02-03");
    assert_eq!(record.location.lot, "L1");
    assert_eq!(stock.total_of(record.product_id), Some(12));
}

#[tokio::test]
async fn create_item_rejects_blank_name() {
    let stock = MockStockApi::with_products(&[]);
    let service = service_with(stock).await;

    let err = service
        .create_item(CreateItemRequest {
            name: "   ".to_string(),
            initial_qty: 0,
            warehouse: None,
            bin: None,
            lot: None,
            incoming: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
