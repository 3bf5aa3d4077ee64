use crate::{
    dtos::movement::{DeleteMovementsRequest, MovementQuery},
    error::AppError,
    models::MovementEntry,
    state::AppState,
};
use axum::{extract::Query, extract::State, Json};
use serde_json::json;

pub async fn list_movements(
    State(AppState { service }): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> Json<Vec<MovementEntry>> {
    Json(
        service
            .movements(query.product_id, query.warehouse.as_deref(), query.limit)
            .await,
    )
}

pub async fn delete_movements(
    State(AppState { service }): State<AppState>,
    Json(payload): Json<DeleteMovementsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = service.delete_movements(&payload.ids).await?;
    Ok(Json(json!({ "removed": removed })))
}
