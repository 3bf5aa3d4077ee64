use crate::{
    dtos::inventory::*, error::AppError, middleware::actor::ActorContext, models::Location,
    models::StockRecord, state::AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;

// ==================== Stock Table ====================

pub async fn list_stock(
    State(AppState { service }): State<AppState>,
) -> Result<Json<Vec<StockRecord>>, AppError> {
    Ok(Json(service.stock_view().await?))
}

pub async fn create_item(
    State(AppState { service }): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<Response, AppError> {
    let record = service.create_item(payload).await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

pub async fn delete_rows(
    State(AppState { service }): State<AppState>,
    Json(payload): Json<DeleteRowsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = service.delete_stock_rows(payload.rows).await?;
    Ok(Json(json!({ "removed": removed })))
}

// ==================== Stock Operations ====================

pub async fn adjust_stock(
    State(AppState { service }): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<Json<StockRecord>, AppError> {
    let location = Location::new(payload.warehouse, payload.bin, payload.lot);
    let record = service
        .set_quantity_at(
            payload.product_id,
            location,
            payload.new_qty,
            payload.reason,
            payload.reference,
            &actor.name,
        )
        .await?;
    Ok(Json(record))
}

pub async fn receive_stock(
    State(AppState { service }): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<ReceiveStockRequest>,
) -> Result<Response, AppError> {
    let updated = service
        .receive(
            payload.product_id,
            payload.qty,
            payload.reference,
            payload.company,
            &actor.name,
        )
        .await?;
    match updated {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn deliver_stock(
    State(AppState { service }): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<DeliverStockRequest>,
) -> Result<Response, AppError> {
    match service.deliver(payload, &actor.name).await? {
        Some(entry) => Ok(Json(entry).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn transfer_stock(
    State(AppState { service }): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<TransferStockRequest>,
) -> Result<Response, AppError> {
    let entry = service
        .transfer(
            payload.product_id,
            payload.qty,
            &payload.from_warehouse,
            &payload.to_warehouse,
            payload.reference,
            &actor.name,
        )
        .await?;
    match entry {
        Some(entry) => Ok(Json(entry).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn reconcile(
    State(AppState { service }): State<AppState>,
    Json(payload): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    match payload.product_id {
        Some(product_id) => {
            let (records, warning) = service.reconcile_product(product_id).await?;
            Ok(Json(ReconcileResponse { records, warning }))
        }
        None => {
            let records = service.reconcile_all().await?;
            Ok(Json(ReconcileResponse {
                records,
                warning: None,
            }))
        }
    }
}
