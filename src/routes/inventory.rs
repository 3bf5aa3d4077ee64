use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::inventory;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/inventory",
            get(inventory::list_stock)
                .post(inventory::create_item)
                .delete(inventory::delete_rows),
        )
        .route("/inventory/adjust", post(inventory::adjust_stock))
        .route("/inventory/receive", post(inventory::receive_stock))
        .route("/inventory/deliver", post(inventory::deliver_stock))
        .route("/inventory/transfer", post(inventory::transfer_stock))
        .route("/inventory/reconcile", post(inventory::reconcile))
}
