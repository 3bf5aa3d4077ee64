use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub product_id: Option<i64>,
    pub warehouse: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMovementsRequest {
    pub ids: Vec<Uuid>,
}
