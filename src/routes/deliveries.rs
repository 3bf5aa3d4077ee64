use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::delivery;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/deliveries", get(delivery::list_deliveries))
        .route(
            "/deliveries/{movement_id}/status",
            post(delivery::change_status),
        )
}
