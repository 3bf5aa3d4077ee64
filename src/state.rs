use std::sync::Arc;

use crate::services::InventoryService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InventoryService>,
}

impl AppState {
    pub fn new(service: Arc<InventoryService>) -> Self {
        Self { service }
    }
}
