pub mod deliveries;
pub mod inventory;
pub mod movements;

use axum::Router;

use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(inventory::routes())
        .merge(movements::routes())
        .merge(deliveries::routes())
}
