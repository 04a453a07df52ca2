//! Data store modules: catalog definitions and player records

pub mod catalog;
pub mod players;

pub use catalog::{CatalogError, CatalogSource, JsonCatalog, TowerDef, TowerRole, TroopDef};
pub use players::{JsonPlayerStore, PlayerRecord, PlayerStore, StoreError};
