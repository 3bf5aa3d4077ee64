use axum::{routing::get, Router};

use crate::handlers::movement;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/movements",
        get(movement::list_movements).delete(movement::delete_movements),
    )
}
