//! Football statistics and betting odds ingestion into a local SQLite warehouse.

pub mod config;
pub mod error;
pub mod ingest;
pub mod sources;
pub mod warehouse;

pub use config::Config;
pub use error::{AdapterError, StoreError};
pub use ingest::{run, Endpoint, RunSummary};
pub use warehouse::Warehouse;
