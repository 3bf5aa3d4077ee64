use crate::{
    dtos::delivery::{ChangeStatusRequest, DeliveryRow},
    error::AppError,
    models::MovementEntry,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

pub async fn list_deliveries(
    State(AppState { service }): State<AppState>,
) -> Json<Vec<DeliveryRow>> {
    Json(service.deliveries_view().await)
}

/// Status transitions apply to ledger-sourced rows, addressed by the
/// sales-delivery movement id.
pub async fn change_status(
    State(AppState { service }): State<AppState>,
    Path(movement_id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> Result<Json<MovementEntry>, AppError> {
    let entry = service.transition(movement_id, payload.status).await?;
    Ok(Json(entry))
}
