//! Sparkify ETL Library
//!
//! Loads the song metadata and listening-log corpora into a songplay star schema.

pub mod config;
pub mod etl;
pub mod pipeline;
pub mod sqlite_persistence;
pub mod warehouse;

pub use config::AppConfig;
pub use etl::{run_etl, EtlReport};
pub use warehouse::{SqliteWarehouse, Warehouse};
