//! Typed failures at the two library seams: the warehouse and the source adapters.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures raised by the upsert engine and the warehouse handle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("no natural-key columns supplied for table {table}")]
    NoKeyColumns { table: String },

    #[error("key column {column} is missing from the row-set for table {table}")]
    MissingKeyColumn { table: String, column: String },

    #[error("key column {column} is null in row {row} for table {table}")]
    NullKey {
        table: String,
        column: String,
        row: usize,
    },

    #[error("storage operation failed: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Failures raised by the source adapters.
///
/// Transport problems (network, 5xx, 429) are retried inside the adapter and
/// only surface as [`AdapterError::RetriesExhausted`]. Everything else is
/// reported on first sight.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to build HTTP client for {source_name}: {reason}")]
    Client { source_name: String, reason: String },

    #[error("{endpoint} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        last: String,
    },

    #[error("{endpoint} rejected the request (status {status}): {body}")]
    Rejected {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("{endpoint} reported errors {errors} for params {params}")]
    Api {
        endpoint: String,
        params: String,
        errors: serde_json::Value,
    },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} returned no usable rows ({received} received, {dropped} dropped)")]
    NoUsableRows {
        endpoint: String,
        received: usize,
        dropped: usize,
    },
}

impl AdapterError {
    /// True for failures caused by the network or an unhealthy upstream,
    /// as opposed to the upstream rejecting what was asked of it.
    pub fn is_transport(&self) -> bool {
        matches!(self, AdapterError::RetriesExhausted { .. })
    }

    /// Short machine-friendly label recorded in the run ledger.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Client { .. } => "client",
            AdapterError::RetriesExhausted { .. } => "transport",
            AdapterError::Rejected { .. } => "rejected",
            AdapterError::Api { .. } => "api",
            AdapterError::Decode { .. } => "decode",
            AdapterError::NoUsableRows { .. } => "no_rows",
        }
    }
}
