pub mod movement;
pub mod status;
pub mod stock;

pub use movement::{MovementEntry, MovementType};
pub use status::{DeliveryStatus, StatusBucket};
pub use stock::{Location, StockRecord, DEFAULT_BIN, DEFAULT_WAREHOUSE};
