//! Store interfaces and `MySQL` implementation.
//!
//! The store layer runs the fixed lookup statements and hands rows back as
//! JSON objects. It performs no writes.

pub mod mysql;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quay_store::{Query, Row, SqlParam};
use thiserror::Error;

pub use mysql::{MySqlTerminalStore, SchemaStatus, StoreConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connect(String),
    #[error("database query failed: {0}")]
    Query(String),
    #[error("database query timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("schema bootstrap failed: {0}")]
    Bootstrap(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only access to the terminal operating database.
pub trait TerminalStore: Send + Sync {
    /// Runs `query` with positional `params` and returns every row.
    fn fetch(
        &self,
        query: Query,
        params: Vec<SqlParam>,
    ) -> impl Future<Output = StoreResult<Vec<Row>>> + Send;
}

impl<T: TerminalStore> TerminalStore for Arc<T> {
    fn fetch(
        &self,
        query: Query,
        params: Vec<SqlParam>,
    ) -> impl Future<Output = StoreResult<Vec<Row>>> + Send {
        (**self).fetch(query, params)
    }
}
