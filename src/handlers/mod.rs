pub mod delivery;
pub mod inventory;
pub mod movement;
