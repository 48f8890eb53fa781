//! Star-schema warehouse: the songplays fact table and its dimensions.

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use schema::WAREHOUSE_VERSIONED_SCHEMAS;
pub use store::SqliteWarehouse;
pub use trait_def::Warehouse;
